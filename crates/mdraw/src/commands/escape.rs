//! The `escape` command: protect raw spans in a working directory.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use mdraw_config::{CliSettings, Config};
use mdraw_escape::apply_actions;
use mdraw_store::FileStore;

use crate::error::CliError;
use crate::output::Output;
use crate::walker::find_markdown_files;

/// Arguments for `mdraw escape`.
#[derive(Args)]
pub(crate) struct EscapeArgs {
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

impl EscapeArgs {
    pub(crate) fn execute(self, output: &Output) -> Result<(), CliError> {
        let settings = CliSettings {
            cache_dir: self.cache_dir,
        };
        let config = Config::load(self.config.as_deref(), &settings)?;
        let actions = config.actions()?;
        let store = FileStore::new(config.cache_dir().to_path_buf());

        let files = find_markdown_files(&self.dir)?;
        let mut written = 0usize;
        for path in &files {
            let content = fs::read_to_string(path)?;
            let processed = apply_actions(&content, &actions, &store)?;
            if processed.is_empty() {
                tracing::info!("skipping write-back of empty result: {}", path.display());
                continue;
            }
            fs::write(path, &processed)?;
            written += 1;
            tracing::info!("escaped {}", path.display());
        }

        output.success(&format!(
            "Escaped {written} of {} Markdown files",
            files.len()
        ));
        Ok(())
    }
}
