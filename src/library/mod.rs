//! Library domain-command interface.
//!
//! # Data Flow
//! ```text
//! api handler
//!     → classify identifiers
//!     → Library trait call (may suspend)
//!     → domain value (types.rs) or LibraryError
//!     → JSON response / ApiError
//! ```
//!
//! # Design Decisions
//! - The server only ever sees `Arc<dyn Library>`; storage, deduplication and
//!   merging live behind it
//! - Implementations never check the automation gate; the HTTP pipeline does
//! - Errors carry a kind so the status mapping is a fixed table

pub mod memory;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::identifier::Identifier;

pub use memory::InMemoryLibrary;
pub use types::{
    AddOutcome, Annotation, CollectionSummary, Comment, LibraryStatus, PaperDetail, PaperQuery,
    PaperRecord, PaperSummary, TagAction, TagSummary,
};

/// Errors returned by library operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LibraryError {
    #[error("Paper not found: {0}")]
    PaperNotFound(String),

    #[error("Collection not found: {0}")]
    CollectionNotFound(Uuid),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Library is busy: {0}")]
    Throttled(String),

    #[error("Library error: {0}")]
    Storage(String),
}

impl LibraryError {
    pub fn paper_not_found(id: &Identifier) -> Self {
        LibraryError::PaperNotFound(id.value())
    }
}

/// Commands the automation API can issue against the publication library.
#[async_trait]
pub trait Library: Send + Sync {
    async fn status(&self) -> Result<LibraryStatus, LibraryError>;

    async fn search_papers(&self, query: &PaperQuery) -> Result<Vec<PaperSummary>, LibraryError>;

    async fn paper(&self, id: &Identifier) -> Result<PaperDetail, LibraryError>;

    /// Add papers by identifier, optionally filing them into a collection.
    /// Identifiers already present count as existing, not as errors.
    async fn add_papers(
        &self,
        ids: &[Identifier],
        collection: Option<Uuid>,
    ) -> Result<AddOutcome, LibraryError>;

    /// Returns the number of papers removed; unknown identifiers are skipped.
    async fn delete_papers(&self, ids: &[Identifier]) -> Result<usize, LibraryError>;

    /// Returns the number of papers whose tag set changed.
    async fn update_tags(
        &self,
        ids: &[Identifier],
        action: TagAction,
        tag: &str,
    ) -> Result<usize, LibraryError>;

    async fn set_read(&self, ids: &[Identifier], read: bool) -> Result<usize, LibraryError>;

    async fn set_starred(&self, ids: &[Identifier], starred: bool) -> Result<usize, LibraryError>;

    async fn comments(&self, id: &Identifier) -> Result<Vec<Comment>, LibraryError>;

    async fn add_comment(
        &self,
        id: &Identifier,
        text: &str,
        author: Option<&str>,
    ) -> Result<Comment, LibraryError>;

    async fn annotations(&self, id: &Identifier) -> Result<Vec<Annotation>, LibraryError>;

    async fn collections(&self) -> Result<Vec<CollectionSummary>, LibraryError>;

    async fn create_collection(&self, name: &str) -> Result<CollectionSummary, LibraryError>;

    async fn delete_collection(&self, id: Uuid) -> Result<(), LibraryError>;

    async fn collection_papers(&self, id: Uuid) -> Result<Vec<PaperSummary>, LibraryError>;

    async fn add_to_collection(&self, id: Uuid, ids: &[Identifier]) -> Result<usize, LibraryError>;

    async fn remove_from_collection(
        &self,
        id: Uuid,
        ids: &[Identifier],
    ) -> Result<usize, LibraryError>;

    async fn tags(&self) -> Result<Vec<TagSummary>, LibraryError>;
}
