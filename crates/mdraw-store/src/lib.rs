//! Content-addressed store for raw Markdown spans.
//!
//! The escaping pass moves protected content (code blocks, inline code,
//! tagged regions) out of documents and into a store keyed by the content
//! hash of the span's exact bytes. The unescaping pass reads the bytes back
//! by hash. Two implementations are provided:
//!
//! - [`FileStore`]: flat directory of `<hash>.md` files
//! - [`NullStore`]: no-op implementation (never stores, never resolves)
//!
//! Because keys are content hashes, a stored file never changes after its
//! first write: a second writer for the same hash is carrying identical
//! bytes, so the write is skipped. Duplicate writes that do race are
//! harmless for the same reason.
//!
//! # Example
//!
//! ```
//! use mdraw_store::{NullStore, RawStore};
//!
//! let store = NullStore;
//! store.insert("d41d8cd98f00b204e9800998ecf8427e", "").unwrap();
//! assert_eq!(store.read("d41d8cd98f00b204e9800998ecf8427e").unwrap(), None);
//! ```

mod file;
pub use file::FileStore;

/// Store error type.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Underlying file I/O failed. Fatal: a span that cannot be persisted
    /// cannot be restored later.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Key-value store mapping a span's content hash to its exact text.
///
/// Implementations must be idempotent on write: inserting the same hash
/// twice leaves a single entry whose content is byte-identical to the first
/// write. Reads return exactly the stored bytes or `None` when the hash has
/// no entry.
pub trait RawStore: Send + Sync {
    /// Persist span content under its hash.
    ///
    /// First writer wins: if an entry already exists for `hash`, the
    /// content is assumed identical and the write is skipped.
    fn insert(&self, hash: &str, content: &str) -> Result<(), StoreError>;

    /// Read back the content stored under `hash`.
    ///
    /// Returns `Ok(None)` when no entry exists. I/O failures other than
    /// absence are errors.
    fn read(&self, hash: &str) -> Result<Option<String>, StoreError>;

    /// Check whether an entry exists for `hash` without reading it.
    fn contains(&self, hash: &str) -> bool;
}

/// No-op [`RawStore`] that never stores or resolves anything.
///
/// Every `insert` is silently discarded and every `read` returns `None`.
/// Useful for exercising the escaping pass without touching disk.
pub struct NullStore;

impl RawStore for NullStore {
    fn insert(&self, _hash: &str, _content: &str) -> Result<(), StoreError> {
        Ok(())
    }

    fn read(&self, _hash: &str) -> Result<Option<String>, StoreError> {
        Ok(None)
    }

    fn contains(&self, _hash: &str) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_store_always_misses() {
        let store = NullStore;

        assert_eq!(store.read("abc123").unwrap(), None);

        store.insert("abc123", "raw content").unwrap();
        assert_eq!(store.read("abc123").unwrap(), None);
        assert!(!store.contains("abc123"));
    }
}
