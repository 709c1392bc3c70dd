//! The `unescape` command: restore protected spans from the store.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use mdraw_config::{CliSettings, Config};
use mdraw_escape::unescape;
use mdraw_store::FileStore;

use crate::error::CliError;
use crate::output::Output;
use crate::walker::find_markdown_files;

/// Arguments for `mdraw unescape`.
#[derive(Args)]
pub(crate) struct UnescapeArgs {
    /// Working directory to scan for Markdown files.
    #[arg(long, default_value = ".")]
    pub(crate) dir: PathBuf,

    /// Path to the configuration file (default: discover mdraw.toml).
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,

    /// Content store directory (overrides configuration).
    #[arg(long)]
    pub(crate) cache_dir: Option<PathBuf>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

impl UnescapeArgs {
    pub(crate) fn execute(self, output: &Output) -> Result<(), CliError> {
        let settings = CliSettings {
            cache_dir: self.cache_dir,
        };
        let config = Config::load(self.config.as_deref(), &settings)?;
        let store = FileStore::new(config.cache_dir().to_path_buf());

        let files = find_markdown_files(&self.dir)?;
        let mut written = 0usize;
        for path in &files {
            let content = fs::read_to_string(path)?;
            let restored = unescape(&content, &store).map_err(|source| CliError::Restore {
                path: path.clone(),
                source,
            })?;
            if restored.is_empty() {
                tracing::info!("skipping write-back of empty result: {}", path.display());
                continue;
            }
            fs::write(path, &restored)?;
            written += 1;
            tracing::info!("restored {}", path.display());
        }

        output.success(&format!(
            "Restored {written} of {} Markdown files",
            files.len()
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdraw_escape::RawSpan;
    use mdraw_store::RawStore;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn args_for(tmp: &TempDir) -> UnescapeArgs {
        UnescapeArgs {
            dir: tmp.path().join("docs"),
            config: None,
            cache_dir: Some(tmp.path().join("cache")),
            verbose: false,
        }
    }

    #[test]
    fn test_restores_files_in_place() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("docs")).unwrap();

        let store = FileStore::new(tmp.path().join("cache"));
        let span = RawSpan::new("```\nfn main() {}\n```");
        store.insert(span.hash(), span.content()).unwrap();

        let doc = tmp.path().join("docs/index.md");
        fs::write(&doc, format!("# Doc\n\n{}\n", span.placeholder())).unwrap();

        args_for(&tmp).execute(&Output::new()).unwrap();

        assert_eq!(
            fs::read_to_string(&doc).unwrap(),
            "# Doc\n\n```\nfn main() {}\n```\n"
        );
    }

    #[test]
    fn test_missing_store_entry_fails_without_blanking() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("docs")).unwrap();

        let doc = tmp.path().join("docs/index.md");
        let text = "<escaped hash=\"acbd18db4cc2f85cedef654fccc4a4d8\"></escaped>\n";
        fs::write(&doc, text).unwrap();

        let err = args_for(&tmp).execute(&Output::new()).unwrap_err();

        assert!(matches!(err, CliError::Restore { .. }));
        // The file must not have been rewritten with the tag dropped.
        assert_eq!(fs::read_to_string(&doc).unwrap(), text);
    }
}
