//! JSON request and response bodies of the log API.
//!
//! Every call is a `POST` with a camelCase JSON body. Paged calls carry an
//! optional `nextToken` in both directions; a response without one is the
//! last page.

use cwtail_core::{ApiError, Event, FilterQuery, StreamInfo};
use hyper::StatusCode;
use serde::{Deserialize, Serialize};

pub const GROUPS_PATH: &str = "/groups:list";
pub const STREAMS_PATH: &str = "/streams:list";
pub const EVENTS_PATH: &str = "/events:filter";

pub const THROTTLING_CODE: &str = "ThrottlingException";
pub const NOT_FOUND_CODE: &str = "ResourceNotFoundException";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListGroupsRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListGroupsResponse {
    #[serde(default)]
    pub log_groups: Vec<GroupEntry>,
    #[serde(default)]
    pub next_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupEntry {
    pub log_group_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListStreamsRequest {
    pub log_group_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_stream_name_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListStreamsResponse {
    #[serde(default)]
    pub log_streams: Vec<StreamEntry>,
    #[serde(default)]
    pub next_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamEntry {
    pub log_stream_name: String,
    #[serde(default)]
    pub creation_time: i64,
}

impl From<StreamEntry> for StreamInfo {
    fn from(entry: StreamEntry) -> Self {
        StreamInfo {
            name: entry.log_stream_name,
            created_ms: entry.creation_time,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterEventsRequest {
    pub log_group_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_stream_names: Option<Vec<String>>,
    pub start_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_pattern: Option<String>,
    #[serde(default)]
    pub interleaved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

impl FilterEventsRequest {
    pub fn new(query: &FilterQuery, next_token: Option<String>) -> Self {
        Self {
            log_group_name: query.group.clone(),
            log_stream_names: query.streams.clone(),
            start_time: query.start_ms,
            end_time: query.end_ms,
            filter_pattern: query.pattern.clone(),
            interleaved: query.interleaved,
            next_token,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterEventsResponse {
    #[serde(default)]
    pub events: Vec<FilteredEvent>,
    #[serde(default)]
    pub next_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilteredEvent {
    pub event_id: String,
    pub timestamp: i64,
    #[serde(default)]
    pub message: String,
    pub log_stream_name: String,
}

impl FilteredEvent {
    pub fn into_event(self, group: &str) -> Event {
        Event {
            event_id: self.event_id,
            timestamp: self.timestamp,
            message: self.message,
            group: group.to_string(),
            stream: self.log_stream_name,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default, alias = "__type")]
    pub code: Option<String>,
    #[serde(default, alias = "Message")]
    pub message: Option<String>,
}

/// Map a non-success response to an [`ApiError`].
pub fn error_from_response(status: StatusCode, body: &[u8]) -> ApiError {
    let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
    let code = parsed.code.unwrap_or_default();
    let message = parsed
        .message
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string());

    if status == StatusCode::TOO_MANY_REQUESTS || code == THROTTLING_CODE {
        ApiError::Throttled(message)
    } else if status == StatusCode::NOT_FOUND || code == NOT_FOUND_CODE {
        ApiError::NotFound(message)
    } else {
        ApiError::Remote {
            status: status.as_u16(),
            code,
            message,
        }
    }
}
