pub mod api;
pub mod app;
pub mod cli;
pub mod constants;
pub mod health;
pub mod orchestrator;
pub mod runtime;
pub mod utils;
pub mod view;

pub use api::{
    AnalysisRequest, AnalysisResult, BatchRequest, HelpfulnessRequest, HttpClient, Transport,
};
pub use app::{load_config, AppState, Config};
pub use health::{HealthMonitor, HealthStatus};
pub use orchestrator::RequestOrchestrator;
pub use utils::{AnalysisError, ItemError, NetworkError};
pub use view::{ComparisonResult, Screen, ViewLifecycle};
