//! Escape and unescape error types.

use mdraw_store::StoreError;

/// Errors raised by the escaping pass.
#[derive(Debug, thiserror::Error)]
pub enum EscapeError {
    /// Persisting a span to the content store failed.
    #[error("{0}")]
    Store(#[from] StoreError),
}

/// Errors raised by the unescaping pass.
#[derive(Debug, thiserror::Error)]
pub enum UnescapeError {
    /// A placeholder references a hash with no store entry. Fatal: the
    /// original bytes are gone, so the document cannot be reconstructed.
    #[error("no stored content for hash {hash}")]
    MissingContent {
        /// The dangling hash reference.
        hash: String,
    },

    /// Reading a span from the content store failed.
    #[error("{0}")]
    Store(#[from] StoreError),
}
