//! Identifier classification subsystem.
//!
//! # Data Flow
//! ```text
//! raw string (path segment or JSON body)
//!     → trim
//!     → classify.rs (ordered predicate chain, first match wins)
//!     → Identifier (typed reference key)
//!     → handed to the library layer
//! ```
//!
//! # Design Decisions
//! - Total function: unmatched input becomes a cite key, never an error
//! - Predicate order is part of the contract because shapes overlap
//! - Pure and allocation-light; safe to call on every request

pub mod classify;

use serde::Serialize;
use uuid::Uuid;

pub use classify::classify;

/// A typed reference to a publication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    /// Library-local citation key (the fallback).
    CiteKey(String),
    /// Digital Object Identifier, stored without any `doi:` or resolver prefix.
    Doi(String),
    /// arXiv identifier, stored without the `arXiv:` prefix.
    Arxiv(String),
    /// ADS bibliographic code.
    Bibcode(String),
    /// Library-internal UUID.
    Uuid(Uuid),
    /// PubMed id.
    Pmid(String),
    /// Semantic Scholar paper id (40 hex digits).
    SemanticScholar(String),
    /// OpenAlex work id (`W` followed by digits).
    OpenAlex(String),
}

impl Identifier {
    /// Short machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Identifier::CiteKey(_) => "citeKey",
            Identifier::Doi(_) => "doi",
            Identifier::Arxiv(_) => "arxiv",
            Identifier::Bibcode(_) => "bibcode",
            Identifier::Uuid(_) => "uuid",
            Identifier::Pmid(_) => "pmid",
            Identifier::SemanticScholar(_) => "semanticScholar",
            Identifier::OpenAlex(_) => "openAlex",
        }
    }

    /// The normalized value carried by the variant.
    pub fn value(&self) -> String {
        match self {
            Identifier::Uuid(id) => id.to_string(),
            Identifier::CiteKey(v)
            | Identifier::Doi(v)
            | Identifier::Arxiv(v)
            | Identifier::Bibcode(v)
            | Identifier::Pmid(v)
            | Identifier::SemanticScholar(v)
            | Identifier::OpenAlex(v) => v.clone(),
        }
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind(), self.value())
    }
}

impl From<&str> for Identifier {
    fn from(raw: &str) -> Self {
        classify(raw)
    }
}

/// Serialized as `{"kind": ..., "value": ...}`.
impl Serialize for Identifier {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("Identifier", 2)?;
        s.serialize_field("kind", self.kind())?;
        s.serialize_field("value", &self.value())?;
        s.end()
    }
}
