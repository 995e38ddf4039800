//! Snippet types and the stable identifier / size-estimate contract.
//!
//! A snippet id is a content hash of the final, truncated text, not of
//! the query that produced it. Two queries resolving to byte-identical
//! text collapse to the same id, which is what makes cross-query
//! deduplication correct.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Maximum snippet text length in bytes. Resolution truncates at this
/// bound (on a char boundary) before hashing, so the id covers exactly
/// what gets transmitted.
pub const MAX_SNIPPET_SIZE: usize = 2000;

/// Fixed divisor for the byte-length size estimate (~4 bytes per
/// token). Not a tokenizer; stable across runs, which is all the
/// comparison needs.
pub const SIZE_DIVISOR: u64 = 4;

/// Where a snippet came from, or the fact that resolution missed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceLocator {
    Resolved {
        path: String,
        start_line: usize,
        end_line: usize,
    },
    Missing,
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved {
                path,
                start_line,
                end_line,
            } => write!(f, "{path} (lines {start_line}-{end_line})"),
            Self::Missing => write!(f, "(not found)"),
        }
    }
}

/// A resolved piece of retrieval content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snippet {
    pub snippet_id: String,
    pub text: String,
    pub locator: SourceLocator,
    pub size_estimate: u64,
    /// The query that produced this snippet, kept for trace output.
    pub query: String,
}

impl Snippet {
    /// Build a snippet from already-truncated text, deriving id and
    /// size estimate from the text itself.
    pub fn from_text(query: &str, text: String, locator: SourceLocator) -> Self {
        let snippet_id = snippet_id(&text);
        let size_estimate = size_estimate(&text);
        Self {
            snippet_id,
            text,
            locator,
            size_estimate,
            query: query.to_string(),
        }
    }

    /// Deterministic placeholder for every resolution miss. The text
    /// depends only on the query, so the id is reproducible too.
    pub fn not_found(query: &str) -> Self {
        let text = format!("// not found: {query}");
        Self::from_text(query, text, SourceLocator::Missing)
    }
}

/// First 16 hex chars of SHA-256 over the snippet text.
pub fn snippet_id(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut id = String::with_capacity(16);
    for byte in &digest[..8] {
        id.push_str(&format!("{byte:02x}"));
    }
    id
}

/// Byte-length estimate shared by every size comparison in the system.
pub fn size_estimate(text: &str) -> u64 {
    text.len() as u64 / SIZE_DIVISOR
}

/// Truncate to at most `max` bytes without splitting a UTF-8 char.
pub fn truncate_bytes(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_depends_on_text_not_query() {
        let a = Snippet::from_text(
            "file:router.rs",
            "fn route() {}".into(),
            SourceLocator::Missing,
        );
        let b = Snippet::from_text(
            "keyword-search:route",
            "fn route() {}".into(),
            SourceLocator::Missing,
        );
        assert_eq!(a.snippet_id, b.snippet_id);

        let c = Snippet::from_text(
            "file:router.rs",
            "fn route() { todo!() }".into(),
            SourceLocator::Missing,
        );
        assert_ne!(a.snippet_id, c.snippet_id);
    }

    #[test]
    fn test_id_is_16_hex_chars() {
        let id = snippet_id("anything");
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_not_found_is_deterministic() {
        let a = Snippet::not_found("function-lookup:missing");
        let b = Snippet::not_found("function-lookup:missing");
        assert_eq!(a.snippet_id, b.snippet_id);
        assert_eq!(a.text, b.text);
        assert_eq!(a.locator, SourceLocator::Missing);
    }

    #[test]
    fn test_size_estimate_integer_division() {
        assert_eq!(size_estimate(""), 0);
        assert_eq!(size_estimate("abc"), 0);
        assert_eq!(size_estimate("abcd"), 1);
        assert_eq!(size_estimate("abcdefgh"), 2);
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        // 'é' is 2 bytes; cutting at 3 would split the second one
        let s = "aéé";
        let t = truncate_bytes(s, 3);
        assert_eq!(t, "aé");
        assert_eq!(truncate_bytes("short", 100), "short");
    }
}
