//! Fixed times and small log corpora used across harnesses.

/// 2024-01-15T10:00:00Z in epoch milliseconds.
pub const TEN_AM: i64 = 1_705_312_800_000;
pub const SECOND: i64 = 1_000;
pub const MINUTE: i64 = 60 * SECOND;

/// Access-log style messages, some of them health checks.
pub const CORPUS_ACCESS: &[&str] = &[
    "GET /api/v1/orders 200 47ms",
    "GET /healthz 200 1ms",
    "POST /api/v1/payments 201 112ms",
    "GET /healthz 200 1ms",
    "GET /api/v1/orders/42 404 8ms",
    "POST /api/v1/payments 502 3004ms",
    "GET /healthz 200 1ms",
    "DELETE /api/v1/sessions/abc 204 5ms",
];

/// Application messages at mixed levels.
pub const CORPUS_APP: &[&str] = &[
    "INFO  server started on :8080",
    "DEBUG cache miss key=user:42",
    "ERROR payment gateway timeout gateway=stripe attempt=3",
    "WARN  slow query duration_ms=4200",
    "INFO  token validated user_id=usr-999",
    "ERROR connection refused host=db.internal",
];

/// Write a config file selecting `endpoint` into `dir` and return its path.
pub fn write_config(dir: &std::path::Path, endpoint: &str) -> std::path::PathBuf {
    let path = dir.join("config.toml");
    std::fs::write(
        &path,
        format!("[tail]\ntick_interval_ms = 50\nretry_delay_ms = 50\n\n[remote]\nendpoint = \"{endpoint}\"\ntimeout_ms = 5000\n"),
    )
    .expect("write config");
    path
}
