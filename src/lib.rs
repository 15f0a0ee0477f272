//! Embedded automation server for a publication library.
//!
//! A loopback-only HTTP/1.1 server that lets local scripts and tools drive
//! a reference manager: look papers up by any identifier, add and delete
//! them, tag, star, comment, and manage collections.

pub mod api;
pub mod config;
pub mod http;
pub mod identifier;
pub mod library;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::schema::AutomationConfig;
pub use http::{AutomationServer, ServerError, ServerState};
pub use identifier::{classify, Identifier};
pub use library::{InMemoryLibrary, Library, LibraryError};
pub use lifecycle::Shutdown;
