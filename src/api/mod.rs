// Gateway module for the analysis service API - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod http;
mod transport;
mod types;

// Public re-exports - the ONLY way to access API functionality
pub use http::HttpClient;
pub use transport::{Method, Transport};
pub use types::{
    AnalysisRequest, AnalysisResult, BatchOutcome, BatchRequest, HealthReport, HelpfulnessReport,
    HelpfulnessRequest,
    ModelCatalog, ModelDescription, ModelKind, ModelLoadStatus, ModelVerdict, RiskLevel,
    Sentiment, Signal, Slot,
};

pub(crate) use types::{
    decode_slot, BatchReport, ComparisonPayload, FakeDetectionPayload, SentimentPayload,
};

#[cfg(test)]
pub(crate) use transport::MockTransport;
