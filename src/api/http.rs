use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::transport::{Method, Transport};
use crate::utils::NetworkError;

/// reqwest-backed transport for the analysis service
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    /// Create a client for `base_url` with a per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, NetworkError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NetworkError::transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(client, base_url))
    }

    /// Wrap an already configured reqwest client
    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }

    async fn send(
        &self,
        url: &str,
        method: Method,
        body: Option<&Value>,
    ) -> Result<Response, NetworkError> {
        let mut request = match method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NetworkError::from_reqwest(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(NetworkError::status(
                status.as_u16(),
                status_message(url, status, &text),
            ));
        }

        Ok(response)
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn call(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<Value>,
    ) -> Result<Value, NetworkError> {
        let url = self.url(endpoint);
        debug!("{} {}", method, url);

        let response = self.send(&url, method, body.as_ref()).await?;
        let text = response
            .text()
            .await
            .map_err(|e| NetworkError::from_reqwest(&url, &e))?;

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text)
            .map_err(|e| NetworkError::decode(format!("Invalid JSON from {}: {}", url, e)))
    }

    async fn probe(&self, endpoint: &str) -> Result<(), NetworkError> {
        let url = self.url(endpoint);
        self.send(&url, Method::Get, None).await.map(|_| ())
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Value,
}

/// Human-readable message for a non-2xx answer, preferring the service's `detail`
fn status_message(url: &str, status: reqwest::StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|b| match b.detail {
            Value::String(s) => s,
            other => other.to_string(),
        });

    match detail {
        Some(detail) => format!("{} returned {}: {}", url, status, detail),
        None => format!("{} returned {}", url, status),
    }
}
