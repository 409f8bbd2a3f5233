// Gateway module for view state - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod aggregate;
mod lifecycle;
mod palette;
mod screen;

// Public re-exports - the ONLY way to access view functionality
pub use aggregate::{
    batch_summary, comparison_summary, dashboard_stats, BatchSummary, ComparisonResult,
    ComparisonSummary, DashboardStats, DatasetTotals, DistributionSlice, Metric,
    ModelPerformanceRow,
};
pub use lifecycle::{Ticket, ViewLifecycle};
pub use palette::{risk_color, score_color, sentiment_color, status_color, FALLBACK_COLOR};
pub use screen::{Screen, Submission, ViewState};
