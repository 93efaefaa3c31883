//! Configuration types for cwtail.
//!
//! [`Config::load`] reads `~/.config/cwtail/config.toml`, creating it with
//! hardcoded defaults if it does not yet exist, then applies
//! `CWTAIL__<SECTION>__<KEY>` environment overrides. [`Config::defaults`]
//! returns the same defaults without touching the filesystem (useful in tests).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Embedded defaults
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = r#"
[tail]
tick_interval_ms        = 250
refresh_interval_ms     = 5000
cache_threshold         = 5000
cache_check_interval_ms = 250
retry_delay_ms          = 250
max_streams             = 100
channel_capacity        = 1000
on_error                = "abort"

[remote]
endpoint   = "http://127.0.0.1:4586"
timeout_ms = 30000
"#;

// ---------------------------------------------------------------------------
// Public config types
// ---------------------------------------------------------------------------

/// Top-level application configuration, loaded from `~/.config/cwtail/config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tail: TailConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
}

/// What a session does when one of its sources fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Cancel every other source and fail the session.
    Abort,
    /// Keep the remaining sources running and report failures at the end.
    Continue,
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "abort" => Ok(FailurePolicy::Abort),
            "continue" => Ok(FailurePolicy::Continue),
            other => Err(format!("unknown failure policy: {other} (expected abort|continue)")),
        }
    }
}

/// `[tail]` section of `config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct TailConfig {
    /// Period of the shared rate-limit clock.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// How often prefixed sources re-resolve their stream list while following.
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
    #[serde(default = "default_cache_threshold")]
    pub cache_threshold: usize,
    #[serde(default = "default_cache_check_interval_ms")]
    pub cache_check_interval_ms: u64,
    /// Delay before the single retry of a throttled query.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_max_streams")]
    pub max_streams: usize,
    /// Capacity of each per-source output channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    #[serde(default = "default_on_error")]
    pub on_error: FailurePolicy,
}

fn default_tick_interval_ms() -> u64 { 250 }
fn default_refresh_interval_ms() -> u64 { 5_000 }
fn default_cache_threshold() -> usize { 5_000 }
fn default_cache_check_interval_ms() -> u64 { 250 }
fn default_retry_delay_ms() -> u64 { 250 }
fn default_max_streams() -> usize { 100 }
fn default_channel_capacity() -> usize { 1_000 }
fn default_on_error() -> FailurePolicy { FailurePolicy::Abort }

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            refresh_interval_ms: default_refresh_interval_ms(),
            cache_threshold: default_cache_threshold(),
            cache_check_interval_ms: default_cache_check_interval_ms(),
            retry_delay_ms: default_retry_delay_ms(),
            max_streams: default_max_streams(),
            channel_capacity: default_channel_capacity(),
            on_error: default_on_error(),
        }
    }
}

/// Periodic timers cannot run with a zero period.
const MIN_PERIOD_MS: u64 = 1;

impl TailConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(MIN_PERIOD_MS))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.max(MIN_PERIOD_MS))
    }

    pub fn cache_check_interval(&self) -> Duration {
        Duration::from_millis(self.cache_check_interval_ms.max(MIN_PERIOD_MS))
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// `[remote]` section of `config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

fn default_endpoint() -> String { "http://127.0.0.1:4586".to_string() }
fn default_timeout_ms() -> u64 { 30_000 }

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_ms: default_timeout_ms(),
            profile: None,
            region: None,
        }
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    /// Load from `~/.config/cwtail/config.toml`, layered on top of the built-in
    /// defaults. Creates the file with defaults if it does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path();

        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, DEFAULT_CONFIG.trim_start())?;
        }

        Self::load_from(&path)
    }

    /// Load from an explicit file, layered on top of the built-in defaults.
    /// A missing file is not an error.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("CWTAIL")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
            .map_err(Into::into)
    }

    /// Return the built-in defaults without touching the filesystem.
    pub fn defaults() -> Self {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .build()
            .expect("built-in default config must be valid TOML")
            .try_deserialize()
            .expect("built-in default config must deserialize correctly")
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

fn config_path() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()))
                .join(".config")
        })
        .join("cwtail")
        .join("config.toml")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
