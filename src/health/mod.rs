/// Liveness monitoring of the analysis service - Gateway
mod monitor;
mod status;

pub use monitor::HealthMonitor;
pub use status::HealthStatus;
