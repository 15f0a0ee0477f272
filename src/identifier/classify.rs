//! Ordered predicate chain mapping free-form strings to identifiers.
//!
//! Order: UUID → DOI → arXiv → bibcode → PubMed → Semantic Scholar →
//! OpenAlex → cite key. Shapes overlap (a 19-character string with a leading
//! year may also look numeric or like a cite key), so the first predicate
//! that accepts the trimmed input decides.

use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use super::Identifier;

/// A single classification rule.
type Predicate = fn(&str) -> Option<Identifier>;

/// The classification chain, evaluated top to bottom.
const CHAIN: &[(&str, Predicate)] = &[
    ("uuid", uuid),
    ("doi", doi),
    ("arxiv", arxiv),
    ("bibcode", bibcode),
    ("pmid", pmid),
    ("semanticScholar", semantic_scholar),
    ("openAlex", open_alex),
];

/// Resolver prefixes stripped before DOI matching.
const DOI_PREFIXES: &[&str] = &[
    "doi:",
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
];

/// Longest purely numeric string treated as a PubMed id.
const MAX_PMID_DIGITS: usize = 9;

const BIBCODE_LEN: usize = 19;
const BIBCODE_YEARS: std::ops::RangeInclusive<u32> = 1800..=2100;

/// `2301.01234`, `2301.01234v2`
static ARXIV_NEW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}\.\d{4,5}(v\d+)?$").expect("arXiv id regex should be valid")
});

/// `hep-th/9901001`, `math.GT/0309136v1`
static ARXIV_OLD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z]+(-[a-z]+)*(\.[A-Z]{2})?/\d{7}(v\d+)?$")
        .expect("legacy arXiv id regex should be valid")
});

/// `arXiv:` followed by either of the above.
static ARXIV_PREFIXED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^arxiv:\s*(.+)$").expect("arXiv prefix regex should be valid"));

/// Classify a raw string. Never fails; unmatched input yields a cite key.
pub fn classify(raw: &str) -> Identifier {
    let trimmed = raw.trim();
    for (name, predicate) in CHAIN {
        if let Some(id) = predicate(trimmed) {
            tracing::trace!(input = %trimmed, kind = name, "Identifier classified");
            return id;
        }
    }
    Identifier::CiteKey(trimmed.to_string())
}

fn uuid(s: &str) -> Option<Identifier> {
    // Only the canonical hyphenated form; `Uuid::try_parse` also accepts
    // simple and braced forms that collide with other shapes.
    if s.len() != 36 {
        return None;
    }
    Uuid::try_parse(s).ok().map(Identifier::Uuid)
}

fn doi(s: &str) -> Option<Identifier> {
    let lower = s.to_ascii_lowercase();
    let stripped = DOI_PREFIXES
        .iter()
        .find(|p| lower.starts_with(*p))
        .map(|p| s[p.len()..].trim_start())
        .unwrap_or(s);

    stripped
        .starts_with("10.")
        .then(|| Identifier::Doi(stripped.to_string()))
}

fn arxiv(s: &str) -> Option<Identifier> {
    let bare = match ARXIV_PREFIXED.captures(s) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(s),
        None => s,
    };

    (ARXIV_NEW.is_match(bare) || ARXIV_OLD.is_match(bare))
        .then(|| Identifier::Arxiv(bare.to_string()))
}

fn bibcode(s: &str) -> Option<Identifier> {
    if !s.is_ascii() || s.len() != BIBCODE_LEN {
        return None;
    }
    let year: u32 = s.get(..4)?.parse().ok()?;
    BIBCODE_YEARS
        .contains(&year)
        .then(|| Identifier::Bibcode(s.to_string()))
}

fn pmid(s: &str) -> Option<Identifier> {
    let bounded = !s.is_empty() && s.len() <= MAX_PMID_DIGITS;
    (bounded && s.bytes().all(|b| b.is_ascii_digit())).then(|| Identifier::Pmid(s.to_string()))
}

fn semantic_scholar(s: &str) -> Option<Identifier> {
    (s.len() == 40 && s.bytes().all(|b| b.is_ascii_hexdigit()))
        .then(|| Identifier::SemanticScholar(s.to_ascii_lowercase()))
}

fn open_alex(s: &str) -> Option<Identifier> {
    let digits = s.strip_prefix('W').or_else(|| s.strip_prefix('w'))?;
    (digits.len() >= 4 && digits.bytes().all(|b| b.is_ascii_digit()))
        .then(|| Identifier::OpenAlex(format!("W{}", digits)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arxiv_patterns_compile() {
        assert!(ARXIV_NEW.is_match("2301.01234v2"));
        assert!(ARXIV_OLD.is_match("math.GT/0309136v1"));
        assert!(ARXIV_PREFIXED.is_match("arXiv: hep-th/9901001"));
    }

    #[test]
    fn uuid_wins_first() {
        let raw = "3f2504e0-4f89-11d3-9a0c-0305e82c3301";
        assert!(matches!(classify(raw), Identifier::Uuid(_)));
    }

    #[test]
    fn simple_uuid_form_is_hex_not_uuid() {
        // 32 hex digits: not canonical UUID, not 40-hex either.
        let raw = "3f2504e04f8911d39a0c0305e82c3301";
        assert!(matches!(classify(raw), Identifier::CiteKey(_)));
    }

    #[test]
    fn doi_with_and_without_prefix() {
        assert_eq!(
            classify("10.1103/PhysRev.47.777"),
            Identifier::Doi("10.1103/PhysRev.47.777".into())
        );
        assert_eq!(
            classify("doi:10.1038/nature12373"),
            Identifier::Doi("10.1038/nature12373".into())
        );
        assert_eq!(
            classify("https://doi.org/10.1038/nature12373"),
            Identifier::Doi("10.1038/nature12373".into())
        );
        assert_eq!(classify("  10.5555/x  "), Identifier::Doi("10.5555/x".into()));
    }

    #[test]
    fn every_ten_dot_prefix_is_doi() {
        for raw in ["10.1", "10.1234/abc", "10.48550/arXiv.2301.01234", "10.1000/1"] {
            assert!(matches!(classify(raw), Identifier::Doi(_)), "{raw}");
        }
    }

    #[test]
    fn arxiv_shapes() {
        assert_eq!(classify("2301.01234"), Identifier::Arxiv("2301.01234".into()));
        assert_eq!(classify("2301.01234v3"), Identifier::Arxiv("2301.01234v3".into()));
        assert_eq!(classify("hep-th/9901001"), Identifier::Arxiv("hep-th/9901001".into()));
        assert_eq!(classify("math.GT/0309136"), Identifier::Arxiv("math.GT/0309136".into()));
        assert_eq!(classify("arXiv:1706.03762"), Identifier::Arxiv("1706.03762".into()));
    }

    #[test]
    fn bibcode_checked_before_numeric_and_cite_key() {
        assert_eq!(
            classify("2019ApJ...882L..12A"),
            Identifier::Bibcode("2019ApJ...882L..12A".into())
        );
        // 19 digits with a plausible leading year.
        assert_eq!(
            classify("1999123456789012345"),
            Identifier::Bibcode("1999123456789012345".into())
        );
    }

    #[test]
    fn bibcode_year_out_of_range_falls_through() {
        assert!(matches!(classify("2500ApJ...882L..12A"), Identifier::CiteKey(_)));
        assert!(matches!(classify("1700ApJ...882L..12A"), Identifier::CiteKey(_)));
    }

    #[test]
    fn numeric_is_bounded() {
        assert_eq!(classify("31452104"), Identifier::Pmid("31452104".into()));
        assert!(matches!(classify("1234567890"), Identifier::CiteKey(_)));
    }

    #[test]
    fn forty_hex_is_semantic_scholar() {
        let raw = "649DEF34F8BE52C8B66281AF98AE884C09AEF38B";
        assert_eq!(
            classify(raw),
            Identifier::SemanticScholar(raw.to_ascii_lowercase())
        );
    }

    #[test]
    fn open_alex_work_ids() {
        assert_eq!(classify("W2741809807"), Identifier::OpenAlex("W2741809807".into()));
        assert_eq!(classify("w2741809807"), Identifier::OpenAlex("W2741809807".into()));
        assert!(matches!(classify("W12"), Identifier::CiteKey(_)));
    }

    #[test]
    fn fallback_is_trimmed_cite_key() {
        assert_eq!(classify("  Einstein1905 "), Identifier::CiteKey("Einstein1905".into()));
        assert_eq!(classify(""), Identifier::CiteKey(String::new()));
    }
}
