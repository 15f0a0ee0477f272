//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection on 127.0.0.1
//!     → listener.rs (accept loop, connection limits)
//!     → connection.rs (registry entry, read → process → write → close)
//!     → Hand off to the HTTP service
//! ```
//!
//! # Design Decisions
//! - Bounded accept prevents resource exhaustion
//! - One request per connection; every response closes the socket
//! - Each connection tracked so stop() can cancel and forget it

pub mod connection;
pub mod listener;

pub use connection::{Connection, ConnectionId, ConnectionLimits, ConnectionRegistry, ConnectionState};
pub use listener::{Listener, ListenerError};
