//! Raw span identity and the placeholder wire format.
//!
//! A [`RawSpan`] is one protected region's exact original text plus the
//! content hash that names its store entry. The hash is a 128-bit MD5 of
//! the exact bytes, hex encoded, so store filenames are 32 characters and
//! identical spans collapse onto a single entry.

use std::sync::LazyLock;

use md5::{Digest, Md5};
use regex::Regex;

/// Matches a placeholder tag: `<escaped hash="H"></escaped>`.
///
/// Whitespace around the attribute and between the tags is tolerated;
/// the hash is the lowercase hex this system emits.
pub(crate) static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<escaped\s+hash="(?P<hash>[0-9a-f]+)"\s*>\s*</escaped>"#).unwrap()
});

/// One protected region's exact original content and its content hash.
///
/// Immutable once created. The hash is the sole link between escaped
/// output and the content store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawSpan {
    content: String,
    hash: String,
}

impl RawSpan {
    /// Create a span, computing the content hash of the exact bytes.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        let content = content.into();
        let hash = content_hash(&content);
        Self { content, hash }
    }

    /// The exact original text of the span.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Lowercase hex content hash (32 characters).
    #[must_use]
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// The placeholder tag that stands in for this span in escaped output.
    #[must_use]
    pub fn placeholder(&self) -> String {
        format!(r#"<escaped hash="{}"></escaped>"#, self.hash)
    }
}

/// Compute the lowercase hex MD5 hash of `content`.
#[must_use]
pub fn content_hash(content: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_hash_is_stable_and_hex() {
        let a = RawSpan::new("```\ncode\n```");
        let b = RawSpan::new("```\ncode\n```");
        let c = RawSpan::new("```\nother\n```");

        assert_eq!(a.hash(), b.hash());
        assert_ne!(a.hash(), c.hash());
        assert_eq!(a.hash().len(), 32, "MD5 hash is 32 hex characters");
        assert!(a.hash().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_known_digest() {
        // md5("foo") reference value
        assert_eq!(content_hash("foo"), "acbd18db4cc2f85cedef654fccc4a4d8");
    }

    #[test]
    fn test_placeholder_format() {
        let span = RawSpan::new("foo");
        assert_eq!(
            span.placeholder(),
            r#"<escaped hash="acbd18db4cc2f85cedef654fccc4a4d8"></escaped>"#
        );
    }

    #[test]
    fn test_placeholder_round_trips_through_pattern() {
        let span = RawSpan::new("    print(\"hi\")");
        let tag = span.placeholder();

        let caps = PLACEHOLDER.captures(&tag).expect("emitted tag must match");
        assert_eq!(&caps["hash"], span.hash());
    }

    #[test]
    fn test_pattern_tolerates_whitespace() {
        let variants = [
            r#"<escaped hash="acbd18db4cc2f85cedef654fccc4a4d8"></escaped>"#,
            r#"<escaped  hash="acbd18db4cc2f85cedef654fccc4a4d8" ></escaped>"#,
            "<escaped hash=\"acbd18db4cc2f85cedef654fccc4a4d8\">\n</escaped>",
        ];
        for variant in variants {
            assert!(PLACEHOLDER.is_match(variant), "should match: {variant}");
        }
    }

    #[test]
    fn test_pattern_rejects_malformed_tags() {
        let variants = [
            r#"<escaped></escaped>"#,
            r#"<escaped hash=""></escaped>"#,
            r#"<escaped hash="xyz!"></escaped>"#,
            r#"<escaped hash="abc">content</escaped>"#,
        ];
        for variant in variants {
            assert!(!PLACEHOLDER.is_match(variant), "should not match: {variant}");
        }
    }
}
