//! Raw-content escaping engine for Markdown build pipelines.
//!
//! Protects code blocks, inline code spans, and custom tagged regions
//! from intermediate processing passes: [`Escaper`] moves each protected
//! span into a content-addressed store and leaves an
//! `<escaped hash="..."></escaped>` placeholder behind; [`unescape`]
//! restores the exact original bytes just before final rendering.
//!
//! Escaping is lossless by construction: untouched bytes are copied
//! verbatim, and a stored span is exactly the bytes its placeholder
//! replaced, so `unescape(escape(m)) == m` for any normalized input.
//!
//! # Example
//!
//! ```
//! use mdraw_escape::{Action, EscapeRules, apply_actions, unescape};
//! use mdraw_store::FileStore;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let store = FileStore::new(dir.path().join("cache"));
//! let actions = [Action::Normalize, Action::Escape(EscapeRules::default())];
//!
//! let escaped = apply_actions("Use the `foo` command.\n", &actions, &store).unwrap();
//! assert!(escaped.contains("<escaped hash="));
//!
//! let restored = unescape(&escaped, &store).unwrap();
//! assert_eq!(restored, "Use the `foo` command.\n");
//! ```

mod classify;
mod error;
mod escape;
mod normalize;
mod span;
mod unescape;

pub use classify::{Decision, EscapeRules, SpanClassifier, SpanKind};
pub use error::{EscapeError, UnescapeError};
pub use escape::{Action, Escaper, apply_actions};
pub use normalize::normalize;
pub use span::{RawSpan, content_hash};
pub use unescape::unescape;
