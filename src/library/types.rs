//! Domain value types exchanged with the library.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Counts reported by `GET /api/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryStatus {
    pub papers: usize,
    pub collections: usize,
    pub tags: usize,
}

/// Free-text search over the library.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PaperQuery {
    pub text: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperSummary {
    pub id: Uuid,
    pub cite_key: String,
    pub title: String,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub doi: Option<String>,
    pub arxiv: Option<String>,
    pub tags: Vec<String>,
    pub read: bool,
    pub starred: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperDetail {
    #[serde(flatten)]
    pub summary: PaperSummary,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub bibcode: Option<String>,
    pub pmid: Option<String>,
    pub semantic_scholar: Option<String>,
    pub open_alex: Option<String>,
    pub collections: Vec<Uuid>,
    pub comment_count: usize,
    pub annotation_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddOutcome {
    pub added: usize,
    pub existing: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub text: String,
    pub author: Option<String>,
    /// Seconds since the Unix epoch.
    pub created_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: Uuid,
    pub page: u32,
    pub kind: String,
    pub text: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSummary {
    pub id: Uuid,
    pub name: String,
    pub paper_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagSummary {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagAction {
    Add,
    Remove,
}

impl FromStr for TagAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(TagAction::Add),
            "remove" => Ok(TagAction::Remove),
            other => Err(other.to_string()),
        }
    }
}

/// A paper to seed into a library (from a JSON file or a test).
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PaperRecord {
    pub cite_key: String,
    pub title: String,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub doi: Option<String>,
    pub arxiv: Option<String>,
    pub bibcode: Option<String>,
    pub pmid: Option<String>,
    pub semantic_scholar: Option<String>,
    pub open_alex: Option<String>,
    pub tags: Vec<String>,
    pub annotations: Vec<Annotation>,
}

impl PaperRecord {
    pub fn new(cite_key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            cite_key: cite_key.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn authors(mut self, authors: &[&str]) -> Self {
        self.authors = authors.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn doi(mut self, doi: impl Into<String>) -> Self {
        self.doi = Some(doi.into());
        self
    }

    pub fn arxiv(mut self, arxiv: impl Into<String>) -> Self {
        self.arxiv = Some(arxiv.into());
        self
    }

    pub fn bibcode(mut self, bibcode: impl Into<String>) -> Self {
        self.bibcode = Some(bibcode.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn annotation(mut self, page: u32, kind: &str, text: Option<&str>) -> Self {
        self.annotations.push(Annotation {
            id: Uuid::new_v4(),
            page,
            kind: kind.to_string(),
            text: text.map(str::to_string),
            color: None,
        });
        self
    }
}
