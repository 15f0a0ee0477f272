//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events with connection_id / peer_addr)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (plain or JSON)
//!     → Prometheus scrape endpoint on loopback (optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields rather than formatted messages
//! - Connection id flows through every per-connection log line
//! - Metrics are cheap (no-op without an installed recorder)

pub mod logging;
pub mod metrics;
