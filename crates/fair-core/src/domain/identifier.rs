//! Identifier classification.
//!
//! [`classify`] is total: every input string yields an [`ItemIdentifier`],
//! falling back to [`IdScheme::Internal`] when no known scheme matches.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Identifier scheme detected for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdScheme {
    Doi,
    Handle,
    Uuid,
    Internal,
}

impl IdScheme {
    /// Whether the scheme is backed by a resolver that guarantees persistence.
    pub fn is_persistent(self) -> bool {
        matches!(self, Self::Doi | Self::Handle)
    }

    /// Whether the scheme is globally unique (persistent or not).
    pub fn is_globally_unique(self) -> bool {
        !matches!(self, Self::Internal)
    }
}

impl std::fmt::Display for IdScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Doi => "doi",
            Self::Handle => "handle",
            Self::Uuid => "uuid",
            Self::Internal => "internal",
        };
        write!(f, "{s}")
    }
}

/// A classified item identifier. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemIdentifier {
    raw: String,
    scheme: IdScheme,
    normalized: String,
}

impl ItemIdentifier {
    /// The string exactly as supplied by the caller.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn scheme(&self) -> IdScheme {
        self.scheme
    }

    /// The bare identifier with resolver prefixes stripped.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// HTTP resolver URL for persistent schemes.
    pub fn resolver_url(&self) -> Option<String> {
        match self.scheme {
            IdScheme::Doi => Some(format!("https://doi.org/{}", self.normalized)),
            IdScheme::Handle => Some(format!("https://hdl.handle.net/{}", self.normalized)),
            IdScheme::Uuid | IdScheme::Internal => None,
        }
    }
}

impl std::fmt::Display for ItemIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.scheme, self.normalized)
    }
}

fn doi_pattern() -> &'static Regex {
    static DOI: OnceLock<Regex> = OnceLock::new();
    DOI.get_or_init(|| Regex::new(r"10[.-]\d+[.-]*/\S+").expect("valid DOI pattern"))
}

fn handle_pattern() -> &'static Regex {
    static HANDLE: OnceLock<Regex> = OnceLock::new();
    HANDLE.get_or_init(|| Regex::new(r"^\d+(?:[.-]\d+)*/\S+$").expect("valid handle pattern"))
}

const HANDLE_PREFIXES: [&str; 4] = [
    "https://hdl.handle.net/",
    "http://hdl.handle.net/",
    "hdl:",
    "handle:",
];

/// Classify a raw identifier string: DOI, then Handle, then UUID, else internal.
pub fn classify(raw: &str) -> ItemIdentifier {
    let trimmed = raw.trim();

    if let Some(m) = doi_pattern().find(trimmed) {
        return ItemIdentifier {
            raw: raw.to_string(),
            scheme: IdScheme::Doi,
            normalized: m.as_str().to_string(),
        };
    }

    let handle_candidate = HANDLE_PREFIXES
        .iter()
        .find_map(|prefix| strip_prefix_ignore_case(trimmed, prefix))
        .unwrap_or(trimmed);
    if handle_pattern().is_match(handle_candidate) {
        return ItemIdentifier {
            raw: raw.to_string(),
            scheme: IdScheme::Handle,
            normalized: handle_candidate.to_string(),
        };
    }

    if let Ok(uuid) = uuid::Uuid::parse_str(trimmed) {
        return ItemIdentifier {
            raw: raw.to_string(),
            scheme: IdScheme::Uuid,
            normalized: uuid.hyphenated().to_string(),
        };
    }

    ItemIdentifier {
        raw: raw.to_string(),
        scheme: IdScheme::Internal,
        normalized: trimmed.to_string(),
    }
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &value[prefix.len()..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_doi() {
        let id = classify("10.1234/abcd.5");
        assert_eq!(id.scheme(), IdScheme::Doi);
        assert_eq!(id.normalized(), "10.1234/abcd.5");
    }

    #[test]
    fn test_classify_doi_inside_resolver_url() {
        let id = classify("https://doi.org/10.5281/zenodo.3893646");
        assert_eq!(id.scheme(), IdScheme::Doi);
        assert_eq!(id.normalized(), "10.5281/zenodo.3893646");
        assert_eq!(id.raw(), "https://doi.org/10.5281/zenodo.3893646");
    }

    #[test]
    fn test_classify_handle() {
        let id = classify("1234/abcd");
        assert_eq!(id.scheme(), IdScheme::Handle);
        assert_eq!(id.normalized(), "1234/abcd");
    }

    #[test]
    fn test_classify_handle_with_prefix() {
        let id = classify("https://hdl.handle.net/10261.1/12345");
        assert_eq!(id.scheme(), IdScheme::Handle);
        assert_eq!(id.normalized(), "10261.1/12345");
        assert_eq!(
            id.resolver_url().as_deref(),
            Some("https://hdl.handle.net/10261.1/12345")
        );
    }

    #[test]
    fn test_classify_uuid() {
        let id = classify("67E55044-10B1-426F-9247-BB680E5FE0C8");
        assert_eq!(id.scheme(), IdScheme::Uuid);
        assert_eq!(id.normalized(), "67e55044-10b1-426f-9247-bb680e5fe0c8");
        assert!(id.resolver_url().is_none());
    }

    #[test]
    fn test_classify_internal() {
        let id = classify("free-text-42");
        assert_eq!(id.scheme(), IdScheme::Internal);
        assert_eq!(id.normalized(), "free-text-42");
    }

    #[test]
    fn test_classify_url_path_is_not_a_handle() {
        let id = classify("https://example.org/2020/record");
        assert_eq!(id.scheme(), IdScheme::Internal);
    }

    #[test]
    fn test_classify_is_total_on_empty_input() {
        let id = classify("   ");
        assert_eq!(id.scheme(), IdScheme::Internal);
        assert_eq!(id.normalized(), "");
    }

    #[test]
    fn test_scheme_persistence_flags() {
        assert!(IdScheme::Doi.is_persistent());
        assert!(IdScheme::Handle.is_persistent());
        assert!(!IdScheme::Uuid.is_persistent());
        assert!(IdScheme::Uuid.is_globally_unique());
        assert!(!IdScheme::Internal.is_globally_unique());
    }
}
