use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::NetworkError;

/// Availability of the analysis service as seen by the liveness monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// No probe has completed yet
    #[default]
    Loading,
    Online,
    Offline,
}

impl HealthStatus {
    /// Status implied by one probe outcome
    pub fn from_probe(outcome: &Result<(), NetworkError>) -> Self {
        match outcome {
            Ok(()) => HealthStatus::Online,
            Err(_) => HealthStatus::Offline,
        }
    }

    /// Text for the status indicator
    pub fn label(&self) -> &'static str {
        match self {
            HealthStatus::Loading => "Loading...",
            HealthStatus::Online => "API Online",
            HealthStatus::Offline => "API Offline",
        }
    }

    /// Whether at least one probe has completed
    pub fn is_settled(&self) -> bool {
        !matches!(self, HealthStatus::Loading)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Loading => f.write_str("loading"),
            HealthStatus::Online => f.write_str("online"),
            HealthStatus::Offline => f.write_str("offline"),
        }
    }
}
