// Gateway module for analysis requests - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod guard;
mod requests;

// Public re-exports - the ONLY way to access orchestrator functionality
pub use guard::{Permit, SubmissionGuard};
pub use requests::RequestOrchestrator;
