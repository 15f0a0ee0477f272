//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Parsed request (not OPTIONS):
//!     → gate.rs (automation enabled? else 403)
//!     → rate_limit.rs (per-peer token bucket, else 429)
//!     → Pass to routing
//! ```
//!
//! # Design Decisions
//! - The gate is checked once per request, before routing
//! - Fail closed: a disabled gate rejects everything except CORS preflight
//! - Listener binds loopback only; there is no remote trust to manage

pub mod gate;
pub mod rate_limit;

pub use gate::AutomationGate;
pub use rate_limit::RateLimiter;
