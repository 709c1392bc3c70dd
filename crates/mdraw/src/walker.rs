//! Markdown file discovery by filesystem walking.

use std::fs;
use std::path::{Path, PathBuf};

/// Recursively collect `.md` files under `dir`.
///
/// Hidden files and directories are skipped, which also keeps the walker
/// out of a `.mdrawcache` store nested under the working directory.
/// Results are sorted so runs are deterministic across platforms.
pub(crate) fn find_markdown_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            walk(&path, files)?;
        } else if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
        {
            files.push(path);
        }
    }
    Ok(())
}
