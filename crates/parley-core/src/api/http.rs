//! HTTP implementation of [`ChatBackend`] over reqwest.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use url::Url;

use super::wire::{PredictResponse, SessionHistoryResponse, SessionListResponse};
use super::{ApiError, ApiResult, ChatBackend};
use crate::session::{PredictReply, PredictRequest, SessionHistory, SessionSummary};

/// Standard User-Agent header for Parley requests.
pub const USER_AGENT: &str = concat!("parley/", env!("CARGO_PKG_VERSION"));

/// Backend client speaking the session/predict HTTP contract.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: Url,
    http: reqwest::Client,
}

impl HttpBackend {
    /// Creates a client for `base_url`.
    ///
    /// `timeout` of `None` keeps the transport default.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("Invalid API base URL: {base_url}"))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("API base URL cannot carry paths: {base_url}");
        }

        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;

        Ok(Self { base_url, http })
    }

    /// Builds `<base>/<segments...>/` with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments).push("");
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> ApiResult<T> {
        tracing::debug!(%url, "GET");
        let response = self
            .http
            .get(url)
            .header("accept", "application/json")
            .send()
            .await?;
        decode(ensure_success(response).await?).await
    }
}

/// Maps non-2xx responses to [`ApiError::Status`].
async fn ensure_success(response: reqwest::Response) -> ApiResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::status(status.as_u16(), &body))
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> ApiResult<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn list_sessions(&self) -> ApiResult<Vec<SessionSummary>> {
        let list: SessionListResponse = self.get_json(self.endpoint(&["api", "sessions"])).await?;
        Ok(list.sessions.into_iter().map(SessionSummary::from).collect())
    }

    async fn load_session(&self, session_id: &str) -> ApiResult<SessionHistory> {
        let history: SessionHistoryResponse = self
            .get_json(self.endpoint(&["api", "sessions", session_id]))
            .await?;
        Ok(history.into())
    }

    async fn delete_session(&self, session_id: &str) -> ApiResult<()> {
        let url = self.endpoint(&["api", "sessions", session_id, "delete"]);
        tracing::debug!(%url, "DELETE");
        let response = self.http.delete(url).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn predict(&self, request: &PredictRequest) -> ApiResult<PredictReply> {
        let url = self.endpoint(&["api", "predict"]);
        tracing::debug!(%url, has_session = request.session_id.is_some(), "POST");
        let response = self
            .http
            .post(url)
            .header("accept", "application/json")
            .json(request)
            .send()
            .await?;
        let reply: PredictResponse = decode(ensure_success(response).await?).await?;
        Ok(reply.into())
    }
}
