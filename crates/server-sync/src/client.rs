//! HTTP client for the records server.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};

use repmax_core::document::TrackerDocument;
use repmax_core::sync::{PushAck, ServerConnection, SyncExchange, SyncTransport};
use repmax_core::Result as CoreResult;

use crate::error::{Result, SyncApiError};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_LOG_BODY_CHARS: usize = 512;

const API_KEY_HEADER: &str = "X-API-Key";

#[derive(Debug, Serialize)]
struct ValidateRequest<'a> {
    api_key: &'a str,
}

#[derive(Debug, Deserialize)]
struct ValidateResponse {
    #[serde(default)]
    success: bool,
}

#[derive(Debug, Serialize)]
struct SyncRequest<'a> {
    data: &'a TrackerDocument,
    timestamp: i64,
}

#[derive(Debug, Deserialize)]
struct SyncResponseBody {
    data: Option<TrackerDocument>,
    timestamp: Option<i64>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    data: &'a TrackerDocument,
}

#[derive(Debug, Deserialize)]
struct PushResponseBody {
    timestamp: Option<i64>,
    error: Option<String>,
}

/// Client for the records server's action endpoint.
///
/// Holds no credentials; the caller passes the connection per call, so one
/// client serves validation of not-yet-saved keys and regular traffic
/// alike.
#[derive(Debug, Clone)]
pub struct SyncClient {
    http: reqwest::Client,
}

impl SyncClient {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { http }
    }

    /// Check an API key against a server before anything is stored.
    pub async fn validate_key(&self, base_url: &str, api_key: &str) -> Result<bool> {
        let response: ValidateResponse = self
            .post_json(base_url, api_key, "validate", &ValidateRequest { api_key })
            .await?;
        Ok(response.success)
    }

    /// Offer the local document and last-sync timestamp; the server hands
    /// back a newer document or an empty reply.
    pub async fn exchange_document(
        &self,
        connection: &ServerConnection,
        document: &TrackerDocument,
        last_sync: i64,
    ) -> Result<SyncExchange> {
        let body = SyncRequest {
            data: document,
            timestamp: last_sync,
        };
        let response: SyncResponseBody = self
            .post_json(&connection.api_url, &connection.api_key, "sync", &body)
            .await?;
        if let Some(message) = response.error {
            return Err(SyncApiError::rejected(message));
        }
        Ok(SyncExchange {
            data: response.data,
            timestamp: response.timestamp,
        })
    }

    /// Upload the document as the new server copy. The server timestamp in
    /// the acknowledgement is mandatory.
    pub async fn push_document(
        &self,
        connection: &ServerConnection,
        document: &TrackerDocument,
    ) -> Result<PushAck> {
        let response: PushResponseBody = self
            .post_json(
                &connection.api_url,
                &connection.api_key,
                "push",
                &PushRequest { data: document },
            )
            .await?;
        if let Some(message) = response.error {
            return Err(SyncApiError::rejected(message));
        }
        match response.timestamp {
            Some(timestamp) => Ok(PushAck { timestamp }),
            None => Err(SyncApiError::malformed(
                "push acknowledgement is missing its timestamp",
            )),
        }
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        base_url: &str,
        api_key: &str,
        action: &str,
        body: &impl Serialize,
    ) -> Result<T> {
        let url = endpoint_url(base_url, action);
        debug!("[SyncApi] POST {url}");
        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(API_KEY_HEADER, api_key)
            .json(body)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Parse a JSON response body.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        log_response(status, &body);

        if !status.is_success() {
            return Err(SyncApiError::api(status.as_u16(), body_preview(&body)));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

impl Default for SyncClient {
    fn default() -> Self {
        Self::new()
    }
}

fn endpoint_url(base_url: &str, action: &str) -> String {
    format!(
        "{}/api.php?action={}",
        base_url.trim_end_matches('/'),
        action
    )
}

fn body_preview(body: &str) -> String {
    let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
    if body.chars().count() > MAX_LOG_BODY_CHARS {
        preview.push_str("...");
    }
    preview
}

fn log_response(status: reqwest::StatusCode, body: &str) {
    if status.is_success() {
        debug!("[SyncApi] response status: {status}");
    } else {
        debug!("[SyncApi] response error ({status}): {}", body_preview(body));
    }
}

fn into_core(error: SyncApiError) -> repmax_core::Error {
    repmax_core::Error::transport(error.to_string())
}

#[async_trait]
impl SyncTransport for SyncClient {
    async fn validate(&self, api_url: &str, api_key: &str) -> CoreResult<bool> {
        self.validate_key(api_url, api_key).await.map_err(into_core)
    }

    async fn exchange(
        &self,
        connection: &ServerConnection,
        document: &TrackerDocument,
        last_sync: i64,
    ) -> CoreResult<SyncExchange> {
        self.exchange_document(connection, document, last_sync)
            .await
            .map_err(into_core)
    }

    async fn push(
        &self,
        connection: &ServerConnection,
        document: &TrackerDocument,
    ) -> CoreResult<PushAck> {
        self.push_document(connection, document)
            .await
            .map_err(into_core)
    }
}
