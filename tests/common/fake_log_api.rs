//! Fake log API server for integration tests.
//!
//! Spins up a minimal `axum` HTTP server on a random TCP port bound to
//! 127.0.0.1, speaking the same JSON protocol as the real service:
//! - `POST /groups:list`: configured groups, paged
//! - `POST /streams:list`: streams of a group filtered by prefix, paged
//! - `POST /events:filter`: stored events matching the query, paged
//!
//! Pages hold `page_size` items; the `nextToken` is the offset of the next
//! page. Failures can be scripted per group: a number of throttled answers,
//! or a permanent error.
//!
//! # Example
//!
//! ```rust,ignore
//! use common::fake_log_api::FakeLogApi;
//!
//! let api = FakeLogApi::start().await.unwrap();
//! api.add_stream("app", "web-1", 0).await;
//! api.add_event(EventBuilder::new("a").group("app").stream("web-1").build()).await;
//!
//! // Point HttpLogApi at api.base_url()
//! ```

use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
use cwtail_core::Event;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

/// One request as the server saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: &'static str,
    pub body: Value,
    pub region: Option<String>,
    pub profile: Option<String>,
}

/// State shared between the router and test code.
struct ApiState {
    groups: Vec<String>,
    /// Per-group `(name, creation_time)`.
    streams: HashMap<String, Vec<(String, i64)>>,
    events: HashMap<String, Vec<Event>>,
    page_size: usize,
    /// Per-group count of upcoming filter calls to throttle.
    throttle: HashMap<String, usize>,
    /// Per-group permanent failure `(status, code, message)`.
    fail: HashMap<String, (u16, String, String)>,
    requests: Vec<Recorded>,
}

impl Default for ApiState {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            streams: HashMap::new(),
            events: HashMap::new(),
            page_size: 50,
            throttle: HashMap::new(),
            fail: HashMap::new(),
            requests: Vec::new(),
        }
    }
}

type Shared = Arc<Mutex<ApiState>>;

/// Handle to the running fake log API server.
pub struct FakeLogApi {
    addr: SocketAddr,
    state: Shared,
}

impl FakeLogApi {
    /// Start the server on a random port. Returns once it is listening.
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state: Shared = Arc::new(Mutex::new(ApiState::default()));

        let app = Router::new()
            .route("/groups:list", post(list_groups))
            .route("/streams:list", post(list_streams))
            .route("/events:filter", post(filter_events))
            .with_state(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Ok(Self { addr, state })
    }

    /// Base URL for the API (e.g. `http://127.0.0.1:PORT`).
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn add_group(&self, group: &str) {
        let mut state = self.state.lock().await;
        if !state.groups.iter().any(|g| g == group) {
            state.groups.push(group.to_string());
        }
    }

    pub async fn add_stream(&self, group: &str, name: &str, created_ms: i64) {
        self.add_group(group).await;
        self.state
            .lock()
            .await
            .streams
            .entry(group.to_string())
            .or_default()
            .push((name.to_string(), created_ms));
    }

    /// Store an event; its group and stream are registered too.
    pub async fn add_event(&self, event: Event) {
        self.add_group(&event.group).await;
        let mut state = self.state.lock().await;
        let streams = state.streams.entry(event.group.clone()).or_default();
        if !streams.iter().any(|(name, _)| *name == event.stream) {
            streams.push((event.stream.clone(), event.timestamp));
        }
        state
            .events
            .entry(event.group.clone())
            .or_default()
            .push(event);
    }

    pub async fn set_page_size(&self, page_size: usize) {
        self.state.lock().await.page_size = page_size.max(1);
    }

    /// Answer the next `times` filter calls for `group` with HTTP 429.
    pub async fn throttle(&self, group: &str, times: usize) {
        self.state
            .lock()
            .await
            .throttle
            .insert(group.to_string(), times);
    }

    /// Fail every filter call for `group`.
    pub async fn fail(&self, group: &str, status: u16, code: &str, message: &str) {
        self.state.lock().await.fail.insert(
            group.to_string(),
            (status, code.to_string(), message.to_string()),
        );
    }

    pub async fn requests(&self) -> Vec<Recorded> {
        self.state.lock().await.requests.clone()
    }

    /// Filter calls seen so far for `group`.
    pub async fn filter_calls(&self, group: &str) -> Vec<Value> {
        self.requests()
            .await
            .into_iter()
            .filter(|r| r.path == "/events:filter" && r.body["logGroupName"] == group)
            .map(|r| r.body)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

type Reply = (StatusCode, Json<Value>);

fn record(state: &mut ApiState, path: &'static str, headers: &HeaderMap, body: &Value) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    state.requests.push(Recorded {
        path,
        body: body.clone(),
        region: header("x-log-region"),
        profile: header("x-log-profile"),
    });
}

fn error(status: StatusCode, code: &str, message: &str) -> Reply {
    (status, Json(json!({ "__type": code, "message": message })))
}

/// Slice `items` into the page starting at `nextToken`.
fn page<T: Clone>(items: &[T], body: &Value, page_size: usize) -> (Vec<T>, Option<String>) {
    let offset = body["nextToken"]
        .as_str()
        .and_then(|t| t.parse::<usize>().ok())
        .unwrap_or(0);
    let end = (offset + page_size).min(items.len());
    let slice = items.get(offset..end).unwrap_or_default().to_vec();
    let next = (end < items.len()).then(|| end.to_string());
    (slice, next)
}

async fn list_groups(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    let mut state = state.lock().await;
    record(&mut state, "/groups:list", &headers, &body);
    let (groups, next) = page(&state.groups, &body, state.page_size);
    let groups: Vec<_> = groups
        .into_iter()
        .map(|g| json!({ "logGroupName": g }))
        .collect();
    (
        StatusCode::OK,
        Json(json!({ "logGroups": groups, "nextToken": next })),
    )
}

async fn list_streams(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    let mut state = state.lock().await;
    record(&mut state, "/streams:list", &headers, &body);
    let group = body["logGroupName"].as_str().unwrap_or_default();
    if !state.groups.iter().any(|g| g == group) {
        return error(
            StatusCode::NOT_FOUND,
            "ResourceNotFoundException",
            "The specified log group does not exist.",
        );
    }
    let prefix = body["logStreamNamePrefix"].as_str().unwrap_or_default();
    let matching: Vec<_> = state
        .streams
        .get(group)
        .map(|streams| {
            streams
                .iter()
                .filter(|(name, _)| name.starts_with(prefix))
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    let (streams, next) = page(&matching, &body, state.page_size);
    let streams: Vec<_> = streams
        .into_iter()
        .map(|(name, created)| json!({ "logStreamName": name, "creationTime": created }))
        .collect();
    (
        StatusCode::OK,
        Json(json!({ "logStreams": streams, "nextToken": next })),
    )
}

async fn filter_events(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    let mut state = state.lock().await;
    record(&mut state, "/events:filter", &headers, &body);
    let group = body["logGroupName"].as_str().unwrap_or_default().to_string();

    if let Some((status, code, message)) = state.fail.get(&group) {
        let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST);
        return error(status, code, message);
    }
    if let Some(left) = state.throttle.get_mut(&group).filter(|n| **n > 0) {
        *left -= 1;
        return error(StatusCode::TOO_MANY_REQUESTS, "ThrottlingException", "Rate exceeded");
    }
    if !state.groups.contains(&group) {
        return error(
            StatusCode::NOT_FOUND,
            "ResourceNotFoundException",
            "The specified log group does not exist.",
        );
    }

    let start = body["startTime"].as_i64().unwrap_or(0);
    let end = body["endTime"].as_i64();
    let streams: Option<Vec<&str>> = body["logStreamNames"]
        .as_array()
        .map(|names| names.iter().filter_map(Value::as_str).collect());
    let pattern = body["filterPattern"].as_str();

    let mut matching: Vec<Event> = state
        .events
        .get(&group)
        .map(|events| {
            events
                .iter()
                .filter(|e| e.timestamp >= start)
                .filter(|e| end.is_none_or(|end| e.timestamp <= end))
                .filter(|e| {
                    streams
                        .as_ref()
                        .is_none_or(|s| s.contains(&e.stream.as_str()))
                })
                .filter(|e| pattern.is_none_or(|p| e.message.contains(p)))
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    matching.sort_by_key(|e| e.timestamp);

    let (events, next) = page(&matching, &body, state.page_size);
    let events: Vec<_> = events
        .into_iter()
        .map(|e| {
            json!({
                "eventId": e.event_id,
                "timestamp": e.timestamp,
                "message": e.message,
                "logStreamName": e.stream,
            })
        })
        .collect();
    (
        StatusCode::OK,
        Json(json!({ "events": events, "nextToken": next })),
    )
}
