//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     stop() → trigger → accept loop exits → connections cancelled → active set cleared
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → graceful stop and exit
//!     SIGHUP → config reload → server.reconfigure()
//! ```
//!
//! # Design Decisions
//! - One Shutdown coordinator per listening period; restart creates a fresh one
//! - Cancelling a connection drops its in-flight handler future

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::{SignalEvent, Signals};
