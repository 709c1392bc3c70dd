//! File-based span store.
//!
//! [`FileStore`] keeps each span in a flat directory, one file per content
//! hash, named `<hash>.md`. The directory (parents included) is created on
//! demand before the first write, so a store can point at a path that does
//! not exist yet.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::{RawStore, StoreError};

/// Flat-directory [`RawStore`] rooted at a cache directory on disk.
///
/// Directory layout:
/// ```text
/// {root}/
/// +-- d41d8cd98f00b204e9800998ecf8427e.md
/// +-- 9e107d9d372bb6826bd81d3542a419d6.md
/// +-- ...
/// ```
///
/// Eviction is the operator's responsibility; this store never deletes.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `root`.
    ///
    /// The directory is not created here; it appears on the first `insert`.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Root directory of this store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, hash: &str) -> PathBuf {
        self.root.join(format!("{hash}.md"))
    }
}

impl RawStore for FileStore {
    fn insert(&self, hash: &str, content: &str) -> Result<(), StoreError> {
        let path = self.entry_path(hash);
        if path.exists() {
            // Content-addressed: an existing entry holds identical bytes.
            tracing::debug!("span {hash} already stored, skipping write");
            return Ok(());
        }

        fs::create_dir_all(&self.root)?;
        fs::write(&path, content)?;
        tracing::debug!("stored span {hash} ({} bytes)", content.len());
        Ok(())
    }

    fn read(&self, hash: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.entry_path(hash)) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn contains(&self, hash: &str) -> bool {
        self.entry_path(hash).exists()
    }
}
