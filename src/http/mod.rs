//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (net::connection)
//!     → parser.rs (frame bytes, build Request)
//!     → service.rs (preflight, gate, rate limit, route dispatch)
//!     → response.rs (status line, JSON body, injected headers)
//!     → bytes back to the connection, then close
//!
//! server.rs owns the listener and ties the pieces together.
//! ```
//!
//! # Design Decisions
//! - HTTP/1.1 subset: one request per connection, `Connection: close`
//! - Every failure path ends in a JSON error body, never a dropped socket
//! - CORS headers are added to every response

pub mod error;
pub mod parser;
pub mod request;
pub mod response;
pub mod server;
pub mod service;

pub use error::ApiError;
pub use parser::ParseError;
pub use request::{Method, Request};
pub use response::{parse_response, ParsedResponse, Response, StatusCode};
pub use server::{AutomationServer, ServerError, ServerState};
pub use service::AutomationService;
