use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

use crate::utils::NetworkError;

/// HTTP verbs the analysis service uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

/// Core trait every way of reaching the analysis service must implement
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue one JSON request and return the decoded body
    ///
    /// Transport failures, non-2xx statuses and undecodable bodies all come back
    /// as `NetworkError`. One outbound request per call, never retried.
    async fn call(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<Value>,
    ) -> Result<Value, NetworkError>;

    /// GET an endpoint and only check for a 2xx status; the body is ignored
    async fn probe(&self, endpoint: &str) -> Result<(), NetworkError>;
}
