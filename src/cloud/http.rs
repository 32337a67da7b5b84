//! HTTP utilities for control-plane REST calls

use crate::error::ApiError;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

const USER_AGENT: &str = concat!("assetsync/", env!("CARGO_PKG_VERSION"));

/// Truncate a response body for logging and strip non-printable characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Pull a human-readable message out of an error body, falling back to the
/// sanitized body itself
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error").and_then(|e| e.get("message")))
                .or_else(|| v.get("error"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| sanitize_for_log(body))
}

/// HTTP client wrapper for control-plane API calls
#[derive(Clone)]
pub struct ApiHttpClient {
    client: Client,
    token: String,
}

impl ApiHttpClient {
    pub fn new(token: &str) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ApiError::Network(Box::new(e)))?;

        Ok(Self {
            client,
            token: token.to_string(),
        })
    }

    /// GET a JSON document; `None` when the body is empty or `null`
    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>, ApiError> {
        self.send(Method::GET, url, None::<&()>).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<Option<T>, ApiError> {
        self.send(Method::POST, url, Some(body)).await
    }

    pub async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<Option<T>, ApiError> {
        self.send(Method::PUT, url, Some(body)).await
    }

    /// DELETE a resource, discarding whatever body comes back
    pub async fn delete(&self, url: &str) -> Result<(), ApiError> {
        self.send::<(), serde_json::Value>(Method::DELETE, url, None)
            .await
            .map(|_| ())
    }

    async fn send<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<Option<T>, ApiError> {
        tracing::debug!("{} {}", method, url);

        let mut request: RequestBuilder = self
            .client
            .request(method, url)
            .bearer_auth(&self.token);

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(Box::new(e)))?;

        let status = response.status();
        let response_body = response
            .text()
            .await
            .map_err(|e| ApiError::Body(format!("failed to read response body: {}", e)))?;

        if !status.is_success() {
            // Only log sanitized/truncated error bodies
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&response_body));
            return Err(ApiError::status(status.as_u16(), error_message(&response_body)));
        }

        if response_body.trim().is_empty() {
            return Ok(None);
        }

        let value: serde_json::Value = serde_json::from_str(&response_body)
            .map_err(|e| ApiError::Body(format!("failed to parse response JSON: {}", e)))?;
        if value.is_null() {
            return Ok(None);
        }

        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| ApiError::Body(format!("unexpected response shape: {}", e)))
    }
}
