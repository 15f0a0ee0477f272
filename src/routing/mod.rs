//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Parsed Request (method, path)
//!     → router.rs (per-method table lookup)
//!     → matcher.rs (exact / prefix+suffix / prefix, most specific first)
//!     → decode path parameter
//!     → handler future → Response
//!
//! Route Compilation (at startup):
//!     register(method, matcher, handler)
//!     → sort by (priority, literal length, registration order)
//!     → shared immutably via Arc
//! ```
//!
//! # Design Decisions
//! - No regex in the hot path (literal prefix/suffix checks only)
//! - Deterministic: same input always matches same route
//! - Every dispatch ends in a Response; no match is a JSON 404

pub mod matcher;
pub mod router;

pub use matcher::{PathMatch, PathMatcher};
pub use router::{Handler, HandlerResult, RouteRequest, Router};
