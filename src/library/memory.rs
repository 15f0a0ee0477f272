//! In-memory library adapter.
//!
//! Backs the standalone binary and the integration tests. Papers keep
//! insertion order; collections are keyed by UUID.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use uuid::Uuid;

use crate::identifier::Identifier;
use crate::library::types::*;
use crate::library::{Library, LibraryError};

#[derive(Debug, Clone)]
struct Paper {
    id: Uuid,
    record: PaperRecord,
    tags: BTreeSet<String>,
    read: bool,
    starred: bool,
    comments: Vec<Comment>,
}

impl Paper {
    fn from_record(record: PaperRecord) -> Self {
        let tags = record.tags.iter().cloned().collect();
        Self {
            id: Uuid::new_v4(),
            record,
            tags,
            read: false,
            starred: false,
            comments: Vec::new(),
        }
    }

    /// A placeholder paper for an identifier added through the API.
    fn stub(id: &Identifier) -> Self {
        let mut record = PaperRecord::new(stub_cite_key(id), "Untitled");
        match id {
            Identifier::Doi(v) => record.doi = Some(v.clone()),
            Identifier::Arxiv(v) => record.arxiv = Some(v.clone()),
            Identifier::Bibcode(v) => record.bibcode = Some(v.clone()),
            Identifier::Pmid(v) => record.pmid = Some(v.clone()),
            Identifier::SemanticScholar(v) => record.semantic_scholar = Some(v.clone()),
            Identifier::OpenAlex(v) => record.open_alex = Some(v.clone()),
            Identifier::CiteKey(_) | Identifier::Uuid(_) => {}
        }
        let mut paper = Self::from_record(record);
        if let Identifier::Uuid(uuid) = id {
            paper.id = *uuid;
        }
        paper
    }

    fn matches(&self, id: &Identifier) -> bool {
        let r = &self.record;
        match id {
            Identifier::Uuid(u) => self.id == *u,
            Identifier::CiteKey(k) => r.cite_key == *k,
            Identifier::Doi(d) => r.doi.as_deref().is_some_and(|v| v.eq_ignore_ascii_case(d)),
            Identifier::Arxiv(a) => r
                .arxiv
                .as_deref()
                .is_some_and(|v| strip_arxiv_version(v) == strip_arxiv_version(a)),
            Identifier::Bibcode(b) => r.bibcode.as_deref() == Some(b.as_str()),
            Identifier::Pmid(p) => r.pmid.as_deref() == Some(p.as_str()),
            Identifier::SemanticScholar(s) => r
                .semantic_scholar
                .as_deref()
                .is_some_and(|v| v.eq_ignore_ascii_case(s)),
            Identifier::OpenAlex(o) => r.open_alex.as_deref() == Some(o.as_str()),
        }
    }

    fn matches_text(&self, needle: &str) -> bool {
        let r = &self.record;
        r.title.to_lowercase().contains(needle)
            || r.cite_key.to_lowercase().contains(needle)
            || r.authors.iter().any(|a| a.to_lowercase().contains(needle))
    }

    fn summary(&self) -> PaperSummary {
        PaperSummary {
            id: self.id,
            cite_key: self.record.cite_key.clone(),
            title: self.record.title.clone(),
            authors: self.record.authors.clone(),
            year: self.record.year,
            doi: self.record.doi.clone(),
            arxiv: self.record.arxiv.clone(),
            tags: self.tags.iter().cloned().collect(),
            read: self.read,
            starred: self.starred,
        }
    }
}

fn strip_arxiv_version(id: &str) -> &str {
    match id.rsplit_once('v') {
        Some((base, version))
            if !base.is_empty()
                && !version.is_empty()
                && version.bytes().all(|b| b.is_ascii_digit()) =>
        {
            base
        }
        _ => id,
    }
}

fn stub_cite_key(id: &Identifier) -> String {
    match id {
        Identifier::CiteKey(k) => k.clone(),
        other => format!(
            "{}-{}",
            other.kind(),
            other
                .value()
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                .collect::<String>()
        ),
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[derive(Debug, Clone)]
struct Collection {
    name: String,
    members: BTreeSet<Uuid>,
}

#[derive(Debug, Default)]
struct Store {
    papers: Vec<Paper>,
    collections: BTreeMap<Uuid, Collection>,
}

impl Store {
    fn find(&self, id: &Identifier) -> Option<&Paper> {
        self.papers.iter().find(|p| p.matches(id))
    }

    fn find_mut(&mut self, id: &Identifier) -> Option<&mut Paper> {
        self.papers.iter_mut().find(|p| p.matches(id))
    }

    fn require(&self, id: &Identifier) -> Result<&Paper, LibraryError> {
        self.find(id).ok_or_else(|| LibraryError::paper_not_found(id))
    }

    fn collection_mut(&mut self, id: Uuid) -> Result<&mut Collection, LibraryError> {
        self.collections
            .get_mut(&id)
            .ok_or(LibraryError::CollectionNotFound(id))
    }

    /// Apply `f` to each matching paper, counting those it reports as changed.
    fn update_each(&mut self, ids: &[Identifier], mut f: impl FnMut(&mut Paper) -> bool) -> usize {
        let mut changed = BTreeSet::new();
        for id in ids {
            if let Some(paper) = self.find_mut(id) {
                if f(paper) {
                    changed.insert(paper.id);
                }
            }
        }
        changed.len()
    }

    fn paper_ids(&self, ids: &[Identifier]) -> Vec<Uuid> {
        ids.iter().filter_map(|id| self.find(id).map(|p| p.id)).collect()
    }
}

/// Thread-safe in-memory [`Library`].
#[derive(Debug, Default)]
pub struct InMemoryLibrary {
    store: RwLock<Store>,
}

impl InMemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_papers(records: impl IntoIterator<Item = PaperRecord>) -> Self {
        let library = Self::new();
        for record in records {
            library.insert(record);
        }
        library
    }

    /// Insert a paper and return its UUID.
    pub fn insert(&self, record: PaperRecord) -> Uuid {
        let paper = Paper::from_record(record);
        let id = paper.id;
        self.write().papers.push(paper);
        id
    }

    /// Create a collection synchronously (seeding helper).
    pub fn insert_collection(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.write().collections.insert(
            id,
            Collection {
                name: name.to_string(),
                members: BTreeSet::new(),
            },
        );
        id
    }

    pub fn len(&self) -> usize {
        self.read().papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, Store> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Store> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn collection_summary(id: Uuid, c: &Collection) -> CollectionSummary {
        CollectionSummary {
            id,
            name: c.name.clone(),
            paper_count: c.members.len(),
        }
    }
}

#[async_trait]
impl Library for InMemoryLibrary {
    async fn status(&self) -> Result<LibraryStatus, LibraryError> {
        let store = self.read();
        let tags: BTreeSet<&String> = store.papers.iter().flat_map(|p| p.tags.iter()).collect();
        Ok(LibraryStatus {
            papers: store.papers.len(),
            collections: store.collections.len(),
            tags: tags.len(),
        })
    }

    async fn search_papers(&self, query: &PaperQuery) -> Result<Vec<PaperSummary>, LibraryError> {
        let store = self.read();
        let needle = query
            .text
            .as_deref()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty());
        let limit = query.limit.unwrap_or(usize::MAX);

        Ok(store
            .papers
            .iter()
            .filter(|p| needle.as_deref().map_or(true, |n| p.matches_text(n)))
            .take(limit)
            .map(Paper::summary)
            .collect())
    }

    async fn paper(&self, id: &Identifier) -> Result<PaperDetail, LibraryError> {
        let store = self.read();
        let paper = store.require(id)?;
        let collections = store
            .collections
            .iter()
            .filter(|(_, c)| c.members.contains(&paper.id))
            .map(|(cid, _)| *cid)
            .collect();
        let r = &paper.record;

        Ok(PaperDetail {
            summary: paper.summary(),
            abstract_text: r.abstract_text.clone(),
            bibcode: r.bibcode.clone(),
            pmid: r.pmid.clone(),
            semantic_scholar: r.semantic_scholar.clone(),
            open_alex: r.open_alex.clone(),
            collections,
            comment_count: paper.comments.len(),
            annotation_count: r.annotations.len(),
        })
    }

    async fn add_papers(
        &self,
        ids: &[Identifier],
        collection: Option<Uuid>,
    ) -> Result<AddOutcome, LibraryError> {
        let mut store = self.write();
        if let Some(cid) = collection {
            store.collection_mut(cid)?;
        }

        let mut outcome = AddOutcome { added: 0, existing: 0 };
        let mut filed = Vec::new();
        for id in ids {
            let known = store.find(id).map(|p| p.id);
            match known {
                Some(paper_id) => {
                    outcome.existing += 1;
                    filed.push(paper_id);
                }
                None => {
                    let paper = Paper::stub(id);
                    filed.push(paper.id);
                    store.papers.push(paper);
                    outcome.added += 1;
                }
            }
        }

        if let Some(cid) = collection {
            store.collection_mut(cid)?.members.extend(filed);
        }
        Ok(outcome)
    }

    async fn delete_papers(&self, ids: &[Identifier]) -> Result<usize, LibraryError> {
        let mut store = self.write();
        let doomed: BTreeSet<Uuid> = store.paper_ids(ids).into_iter().collect();
        store.papers.retain(|p| !doomed.contains(&p.id));
        for collection in store.collections.values_mut() {
            collection.members.retain(|m| !doomed.contains(m));
        }
        Ok(doomed.len())
    }

    async fn update_tags(
        &self,
        ids: &[Identifier],
        action: TagAction,
        tag: &str,
    ) -> Result<usize, LibraryError> {
        let tag = tag.trim().to_string();
        Ok(self.write().update_each(ids, |p| match action {
            TagAction::Add => p.tags.insert(tag.clone()),
            TagAction::Remove => p.tags.remove(&tag),
        }))
    }

    async fn set_read(&self, ids: &[Identifier], read: bool) -> Result<usize, LibraryError> {
        Ok(self
            .write()
            .update_each(ids, |p| std::mem::replace(&mut p.read, read) != read))
    }

    async fn set_starred(&self, ids: &[Identifier], starred: bool) -> Result<usize, LibraryError> {
        Ok(self
            .write()
            .update_each(ids, |p| std::mem::replace(&mut p.starred, starred) != starred))
    }

    async fn comments(&self, id: &Identifier) -> Result<Vec<Comment>, LibraryError> {
        Ok(self.read().require(id)?.comments.clone())
    }

    async fn add_comment(
        &self,
        id: &Identifier,
        text: &str,
        author: Option<&str>,
    ) -> Result<Comment, LibraryError> {
        let mut store = self.write();
        let paper = store
            .find_mut(id)
            .ok_or_else(|| LibraryError::paper_not_found(id))?;
        let comment = Comment {
            id: Uuid::new_v4(),
            text: text.to_string(),
            author: author.map(str::to_string),
            created_at: now_secs(),
        };
        paper.comments.push(comment.clone());
        Ok(comment)
    }

    async fn annotations(&self, id: &Identifier) -> Result<Vec<Annotation>, LibraryError> {
        Ok(self.read().require(id)?.record.annotations.clone())
    }

    async fn collections(&self) -> Result<Vec<CollectionSummary>, LibraryError> {
        Ok(self
            .read()
            .collections
            .iter()
            .map(|(id, c)| Self::collection_summary(*id, c))
            .collect())
    }

    async fn create_collection(&self, name: &str) -> Result<CollectionSummary, LibraryError> {
        let id = self.insert_collection(name.trim());
        let store = self.read();
        let collection = store
            .collections
            .get(&id)
            .ok_or(LibraryError::CollectionNotFound(id))?;
        Ok(Self::collection_summary(id, collection))
    }

    async fn delete_collection(&self, id: Uuid) -> Result<(), LibraryError> {
        self.write()
            .collections
            .remove(&id)
            .map(|_| ())
            .ok_or(LibraryError::CollectionNotFound(id))
    }

    async fn collection_papers(&self, id: Uuid) -> Result<Vec<PaperSummary>, LibraryError> {
        let store = self.read();
        let collection = store
            .collections
            .get(&id)
            .ok_or(LibraryError::CollectionNotFound(id))?;
        Ok(store
            .papers
            .iter()
            .filter(|p| collection.members.contains(&p.id))
            .map(Paper::summary)
            .collect())
    }

    async fn add_to_collection(&self, id: Uuid, ids: &[Identifier]) -> Result<usize, LibraryError> {
        let mut store = self.write();
        let papers = store.paper_ids(ids);
        let collection = store.collection_mut(id)?;
        Ok(papers.into_iter().filter(|p| collection.members.insert(*p)).count())
    }

    async fn remove_from_collection(
        &self,
        id: Uuid,
        ids: &[Identifier],
    ) -> Result<usize, LibraryError> {
        let mut store = self.write();
        let papers = store.paper_ids(ids);
        let collection = store.collection_mut(id)?;
        Ok(papers.into_iter().filter(|p| collection.members.remove(p)).count())
    }

    async fn tags(&self) -> Result<Vec<TagSummary>, LibraryError> {
        let store = self.read();
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for tag in store.papers.iter().flat_map(|p| p.tags.iter()) {
            *counts.entry(tag.as_str()).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(name, count)| TagSummary {
                name: name.to_string(),
                count,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::classify;

    fn library() -> InMemoryLibrary {
        InMemoryLibrary::with_papers([
            PaperRecord::new("Einstein1905", "On the Electrodynamics of Moving Bodies")
                .authors(&["A. Einstein"])
                .year(1905)
                .doi("10.1002/andp.19053221004"),
            PaperRecord::new("Vaswani2017", "Attention Is All You Need")
                .authors(&["A. Vaswani", "N. Shazeer"])
                .arxiv("1706.03762v5")
                .tag("ml"),
        ])
    }

    #[tokio::test]
    async fn finds_papers_by_any_identifier() {
        let lib = library();
        let by_key = lib.paper(&classify("Einstein1905")).await.unwrap();
        let by_doi = lib.paper(&classify("doi:10.1002/ANDP.19053221004")).await.unwrap();
        assert_eq!(by_key.summary.id, by_doi.summary.id);

        let by_arxiv = lib.paper(&classify("arXiv:1706.03762")).await.unwrap();
        assert_eq!(by_arxiv.summary.cite_key, "Vaswani2017");

        let by_uuid = lib.paper(&Identifier::Uuid(by_key.summary.id)).await.unwrap();
        assert_eq!(by_uuid.summary.cite_key, "Einstein1905");
    }

    #[tokio::test]
    async fn missing_paper_is_not_found() {
        let err = library().paper(&classify("Nobody2000")).await.unwrap_err();
        assert_eq!(err, LibraryError::PaperNotFound("Nobody2000".into()));
    }

    #[tokio::test]
    async fn tag_updates_count_changes_only() {
        let lib = library();
        let ids = [classify("Einstein1905"), classify("Vaswani2017"), classify("Ghost")];
        assert_eq!(lib.update_tags(&ids, TagAction::Add, "ml").await.unwrap(), 1);
        assert_eq!(lib.update_tags(&ids, TagAction::Add, "ml").await.unwrap(), 0);
        assert_eq!(lib.update_tags(&ids, TagAction::Remove, "ml").await.unwrap(), 2);

        // The same paper named twice counts once.
        let twice = [classify("Einstein1905"), classify("10.1002/andp.19053221004")];
        assert_eq!(lib.set_read(&twice, true).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn add_papers_distinguishes_new_and_existing() {
        let lib = library();
        let cid = lib.insert_collection("Reading");
        let outcome = lib
            .add_papers(&[classify("Einstein1905"), classify("2301.01234")], Some(cid))
            .await
            .unwrap();
        assert_eq!(outcome, AddOutcome { added: 1, existing: 1 });
        assert_eq!(lib.len(), 3);
        assert_eq!(lib.collection_papers(cid).await.unwrap().len(), 2);

        let stub = lib.paper(&classify("2301.01234")).await.unwrap();
        assert_eq!(stub.summary.cite_key, "arxiv-2301_01234");
    }

    #[tokio::test]
    async fn add_papers_into_unknown_collection_fails_without_side_effects() {
        let lib = library();
        let missing = Uuid::new_v4();
        let err = lib.add_papers(&[classify("New2024")], Some(missing)).await.unwrap_err();
        assert_eq!(err, LibraryError::CollectionNotFound(missing));
        assert_eq!(lib.len(), 2);
    }

    #[tokio::test]
    async fn delete_removes_collection_membership() {
        let lib = library();
        let cid = lib.insert_collection("Classics");
        lib.add_to_collection(cid, &[classify("Einstein1905")]).await.unwrap();
        assert_eq!(lib.delete_papers(&[classify("Einstein1905")]).await.unwrap(), 1);
        assert!(lib.collection_papers(cid).await.unwrap().is_empty());
        assert_eq!(lib.len(), 1);
    }

    #[tokio::test]
    async fn comments_round_trip() {
        let lib = library();
        let id = classify("Einstein1905");
        let c = lib.add_comment(&id, "Read section 2", Some("me")).await.unwrap();
        let all = lib.comments(&id).await.unwrap();
        assert_eq!(all, vec![c]);
    }

    #[tokio::test]
    async fn search_filters_and_limits() {
        let lib = library();
        let query = PaperQuery {
            text: Some("einstein".into()),
            limit: None,
        };
        assert_eq!(lib.search_papers(&query).await.unwrap().len(), 1);

        let everything = PaperQuery {
            text: None,
            limit: Some(1),
        };
        assert_eq!(lib.search_papers(&everything).await.unwrap().len(), 1);
    }

    #[test]
    fn arxiv_versions_are_ignored_for_matching() {
        assert_eq!(strip_arxiv_version("1706.03762v5"), "1706.03762");
        assert_eq!(strip_arxiv_version("1706.03762"), "1706.03762");
        assert_eq!(strip_arxiv_version("hep-th/9901001v2"), "hep-th/9901001");
        assert_eq!(strip_arxiv_version("v"), "v");
    }
}
