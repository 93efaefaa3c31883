use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use cwtail_core::config::RemoteConfig;
use cwtail_core::{ApiError, FilterPage, FilterQuery, LogApi, StreamInfo};
use http_body_util::{BodyExt, Full};
use hyper::{header, Method, Request, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::RemoteError;
use crate::wire::{self, FilterEventsRequest, FilterEventsResponse};

pub const REGION_HEADER: &str = "x-log-region";
pub const PROFILE_HEADER: &str = "x-log-profile";

/// [`LogApi`] over HTTP.
pub struct HttpLogApi {
    client: Client<HttpConnector, Full<Bytes>>,
    endpoint: String,
    region: Option<String>,
    profile: Option<String>,
    timeout: Duration,
}

impl std::fmt::Debug for HttpLogApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpLogApi")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("profile", &self.profile)
            .finish()
    }
}

impl HttpLogApi {
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let endpoint = config.endpoint.trim_end_matches('/').to_string();
        let invalid = |reason: String| RemoteError::InvalidEndpoint {
            endpoint: config.endpoint.clone(),
            reason,
        };
        let uri = endpoint
            .parse::<Uri>()
            .map_err(|e| invalid(e.to_string()))?;
        if uri.scheme_str() != Some("http") {
            return Err(invalid("only http:// endpoints are supported".into()));
        }
        if uri.host().is_none() {
            return Err(invalid("missing host".into()));
        }

        Ok(Self {
            client: Client::builder(TokioExecutor::new()).build_http(),
            endpoint,
            region: config.region.clone(),
            profile: config.profile.clone(),
            timeout: config.timeout(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST `body` to `path` and decode the JSON answer.
    async fn call<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, ApiError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body).map_err(|e| ApiError::Decode(e.to_string()))?;
        let mut request = Request::builder()
            .method(Method::POST)
            .uri(format!("{}{}", self.endpoint, path))
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json");
        if let Some(region) = &self.region {
            request = request.header(REGION_HEADER, region);
        }
        if let Some(profile) = &self.profile {
            request = request.header(PROFILE_HEADER, profile);
        }
        let request = request
            .body(Full::new(Bytes::from(payload)))
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let exchange = async {
            let response = self
                .client
                .request(request)
                .await
                .map_err(|e| ApiError::Transport(e.to_string()))?;
            let status = response.status();
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| ApiError::Transport(e.to_string()))?
                .to_bytes();
            Ok::<_, ApiError>((status, body))
        };
        let (status, body) = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| {
                ApiError::Transport(format!("{path} timed out after {}ms", self.timeout.as_millis()))
            })??;

        tracing::debug!(path, status = status.as_u16(), bytes = body.len(), "log api call");
        if !status.is_success() {
            return Err(wire::error_from_response(status, &body));
        }
        serde_json::from_slice(&body).map_err(|e| ApiError::Decode(format!("{path}: {e}")))
    }
}

#[async_trait]
impl LogApi for HttpLogApi {
    async fn filter_events(
        &self,
        query: &FilterQuery,
        next_token: Option<String>,
    ) -> Result<FilterPage, ApiError> {
        let request = FilterEventsRequest::new(query, next_token);
        let response: FilterEventsResponse = self.call(wire::EVENTS_PATH, &request).await?;
        Ok(FilterPage {
            events: response
                .events
                .into_iter()
                .map(|e| e.into_event(&query.group))
                .collect(),
            next_token: response.next_token,
        })
    }

    async fn list_streams(
        &self,
        group: &str,
        prefix: Option<&str>,
    ) -> Result<Vec<StreamInfo>, ApiError> {
        let mut streams = Vec::new();
        let mut next_token = None;
        loop {
            let request = wire::ListStreamsRequest {
                log_group_name: group.to_string(),
                log_stream_name_prefix: prefix.map(str::to_string),
                next_token,
            };
            let page: wire::ListStreamsResponse = self.call(wire::STREAMS_PATH, &request).await?;
            streams.extend(page.log_streams.into_iter().map(StreamInfo::from));
            match page.next_token {
                Some(token) => next_token = Some(token),
                None => return Ok(streams),
            }
        }
    }

    async fn list_groups(&self) -> Result<Vec<String>, ApiError> {
        let mut groups = Vec::new();
        let mut next_token = None;
        loop {
            let request = wire::ListGroupsRequest { next_token };
            let page: wire::ListGroupsResponse = self.call(wire::GROUPS_PATH, &request).await?;
            groups.extend(page.log_groups.into_iter().map(|g| g.log_group_name));
            match page.next_token {
                Some(token) => next_token = Some(token),
                None => return Ok(groups),
            }
        }
    }
}
