/// Constants module to avoid magic numbers in the codebase

// Network Configuration
pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const ENV_PREFIX: &str = "SENTISCOPE_";

// Endpoints
pub const HEALTH_ENDPOINT: &str = "/health";
pub const STATISTICS_ENDPOINT: &str = "/statistics";
pub const MODELS_ENDPOINT: &str = "/models";
pub const SENTIMENT_ENDPOINT: &str = "/predict/sentiment";
pub const BATCH_ENDPOINT: &str = "/predict/batch";
pub const FAKE_DETECTION_ENDPOINT: &str = "/detect/fake";
pub const HELPFULNESS_ENDPOINT: &str = "/analyze/helpfulness";
pub const COMPARE_ENDPOINT: &str = "/compare";

// Timeouts
pub const HEALTH_PROBE_INTERVAL_SECS: u64 = 30;
pub const HEALTH_PROBE_TIMEOUT_SECS: u64 = 5;
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

// Input Limits
pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;
pub const DEFAULT_RATING: u8 = 5;
pub const MAX_SUSPICION_SCORE: u8 = 7;

// Model recommendation tie-break order; names not listed rank after these, alphabetically
pub const MODEL_PREFERENCE: &[&str] = &["roberta", "vader"];

// Palette
pub const COLOR_SUCCESS: &str = "#10b981";
pub const COLOR_WARNING: &str = "#f59e0b";
pub const COLOR_ERROR: &str = "#ef4444";
pub const COLOR_NEUTRAL: &str = "#64748b";

// Suspicion score thresholds
pub const SCORE_HIGH_THRESHOLD: u8 = 4;
pub const SCORE_MEDIUM_THRESHOLD: u8 = 2;

// Placeholder shown for any statistic the service did not report
pub const PLACEHOLDER: &str = "N/A";
