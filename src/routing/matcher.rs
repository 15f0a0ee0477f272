//! Path matching rules.
//!
//! # Responsibilities
//! - Match a request path against a literal, a prefix, or a prefix+suffix pair
//! - Extract the single path parameter (still percent-encoded)
//! - Report a priority so the router can order matchers most-specific-first
//!
//! # Design Decisions
//! - Exact > prefix+suffix > prefix; within a kind, longer literals first
//! - Matching is case-sensitive and regex-free
//! - A parameter is never empty

use std::fmt;

/// A rule describing which paths a route accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMatcher {
    /// The whole path equals the literal.
    Exact(String),
    /// The path starts with the literal; the rest is the parameter.
    Prefix(String),
    /// The path starts with `prefix` and ends with `suffix`; the middle is the
    /// parameter. Used for resource sub-paths like `/api/papers/{id}/comments`.
    PrefixSuffix { prefix: String, suffix: String },
}

/// A successful match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathMatch<'a> {
    /// Raw (undecoded) parameter, absent for exact matches.
    pub param: Option<&'a str>,
}

impl PathMatcher {
    pub fn exact(path: impl Into<String>) -> Self {
        PathMatcher::Exact(path.into())
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        PathMatcher::Prefix(prefix.into())
    }

    pub fn prefix_suffix(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        PathMatcher::PrefixSuffix {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// Higher is tried first.
    pub fn priority(&self) -> u8 {
        match self {
            PathMatcher::Exact(_) => 3,
            PathMatcher::PrefixSuffix { .. } => 2,
            PathMatcher::Prefix(_) => 1,
        }
    }

    /// Total literal length; breaks ties within a priority.
    pub fn specificity(&self) -> usize {
        match self {
            PathMatcher::Exact(p) | PathMatcher::Prefix(p) => p.len(),
            PathMatcher::PrefixSuffix { prefix, suffix } => prefix.len() + suffix.len(),
        }
    }

    pub fn matches<'a>(&self, path: &'a str) -> Option<PathMatch<'a>> {
        match self {
            PathMatcher::Exact(literal) => (path == literal).then_some(PathMatch { param: None }),
            PathMatcher::Prefix(prefix) => path
                .strip_prefix(prefix.as_str())
                .filter(|rest| !rest.is_empty())
                .map(|rest| PathMatch { param: Some(rest) }),
            PathMatcher::PrefixSuffix { prefix, suffix } => path
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_suffix(suffix.as_str()))
                .filter(|middle| !middle.is_empty())
                .map(|middle| PathMatch {
                    param: Some(middle),
                }),
        }
    }
}

impl fmt::Display for PathMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathMatcher::Exact(p) => write!(f, "{}", p),
            PathMatcher::Prefix(p) => write!(f, "{}{{param}}", p),
            PathMatcher::PrefixSuffix { prefix, suffix } => write!(f, "{}{{param}}{}", prefix, suffix),
        }
    }
}
