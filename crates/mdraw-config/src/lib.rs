//! Configuration management for mdraw.
//!
//! Parses `mdraw.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories. CLI settings can
//! be applied during load via [`CliSettings`].
//!
//! ## Format
//!
//! ```toml
//! cache_dir = ".mdrawcache"
//! actions = [
//!     "normalize",
//!     { escape = ["fence_blocks", "pre_blocks", "inline_code", { tags = ["plantuml"] }] },
//! ]
//!
//! [pattern_override]
//! fence_blocks = "^```mermaid"
//! ```
//!
//! Unknown action names and unknown span kinds are logged and skipped so
//! configs from newer versions keep working; an invalid exclusion pattern
//! is an error.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use mdraw_escape::{Action, EscapeRules, SpanKind};
use regex::Regex;
use serde::Deserialize;

/// Configuration filename to search for.
pub const CONFIG_FILENAME: &str = "mdraw.toml";

/// Reserved tag name: the placeholder element itself.
const PLACEHOLDER_TAG: &str = "escaped";

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the content store directory.
    pub cache_dir: Option<PathBuf>,
}

/// Configuration error type.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid exclusion pattern for {kind}: {source}")]
    Pattern {
        kind: String,
        #[source]
        source: regex::Error,
    },
}

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Content store directory, relative to the config file (or the
    /// working directory when no config file exists).
    cache_dir: String,
    /// Ordered processing actions.
    actions: Vec<RawAction>,
    /// Span-kind name to exclusion regex.
    pattern_override: HashMap<String, String>,

    /// Resolved store directory (set after loading).
    #[serde(skip)]
    cache_dir_resolved: PathBuf,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: ".mdrawcache".to_owned(),
            actions: default_actions(),
            pattern_override: HashMap::new(),
            cache_dir_resolved: PathBuf::from(".mdrawcache"),
            config_path: None,
        }
    }
}

/// One entry of the `actions` list as parsed from TOML.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum RawAction {
    /// A bare action name, e.g. `"normalize"`.
    Name(String),
    /// `{ escape = [...] }` naming the span kinds and tags to protect.
    Escape { escape: Vec<EscapeItem> },
}

/// One entry of an escape action's list.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum EscapeItem {
    /// A span kind name: `fence_blocks`, `pre_blocks`, `inline_code`.
    Kind(String),
    /// `{ tags = [...] }` custom tag names.
    Tags { tags: Vec<String> },
}

fn default_actions() -> Vec<RawAction> {
    vec![
        RawAction::Name("normalize".to_owned()),
        RawAction::Escape {
            escape: vec![
                EscapeItem::Kind("fence_blocks".to_owned()),
                EscapeItem::Kind("pre_blocks".to_owned()),
                EscapeItem::Kind("inline_code".to_owned()),
            ],
        },
    ]
}

impl Config {
    /// Load configuration, applying CLI overrides.
    ///
    /// With an explicit path the file must exist. Otherwise `mdraw.toml`
    /// is discovered by walking up from the current directory; when none
    /// is found, defaults apply.
    ///
    /// # Errors
    ///
    /// I/O or parse failures for an explicit or discovered config file.
    pub fn load(explicit: Option<&Path>, cli: &CliSettings) -> Result<Self, ConfigError> {
        let found = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => find_config(&std::env::current_dir()?),
        };

        let (mut config, base_dir) = match found {
            Some(path) => {
                let base = path
                    .parent()
                    .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
                (Self::from_file(&path)?, base)
            }
            None => (Self::default(), PathBuf::from(".")),
        };

        config.cache_dir_resolved = match &cli.cache_dir {
            Some(dir) => dir.clone(),
            None => base_dir.join(&config.cache_dir),
        };
        Ok(config)
    }

    /// Parse a configuration file.
    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Resolved content store directory.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir_resolved
    }

    /// Resolve the configured action list into pipeline actions.
    ///
    /// Unknown action names and span kinds are logged and skipped.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Pattern`] when an exclusion override is not a valid
    /// regular expression.
    pub fn actions(&self) -> Result<Vec<Action>, ConfigError> {
        let overrides = self.compiled_overrides()?;

        let mut actions = Vec::new();
        for raw in &self.actions {
            match raw {
                RawAction::Name(name) if name == "normalize" => {
                    actions.push(Action::Normalize);
                }
                RawAction::Name(name) => {
                    tracing::warn!("unknown action '{name}' ignored");
                }
                RawAction::Escape { escape } => {
                    actions.push(Action::Escape(build_rules(escape, &overrides)));
                }
            }
        }
        Ok(actions)
    }

    /// Compile the exclusion overrides for known span kinds.
    fn compiled_overrides(&self) -> Result<Vec<(SpanKind, Regex)>, ConfigError> {
        let mut compiled = Vec::new();
        for (name, pattern) in &self.pattern_override {
            let Some(kind) = SpanKind::parse(name) else {
                tracing::warn!("pattern override for unknown span kind '{name}' ignored");
                continue;
            };
            let regex = Regex::new(pattern).map_err(|source| ConfigError::Pattern {
                kind: name.clone(),
                source,
            })?;
            compiled.push((kind, regex));
        }
        Ok(compiled)
    }
}

/// Build escape rules from one escape action's item list.
fn build_rules(items: &[EscapeItem], overrides: &[(SpanKind, Regex)]) -> EscapeRules {
    let mut rules = EscapeRules::new();
    for item in items {
        match item {
            EscapeItem::Kind(name) => match SpanKind::parse(name) {
                Some(kind) => rules = rules.enable(kind),
                None => tracing::warn!("unknown span kind '{name}' ignored"),
            },
            EscapeItem::Tags { tags } => {
                for tag in tags {
                    if tag == PLACEHOLDER_TAG {
                        tracing::warn!("'{PLACEHOLDER_TAG}' is reserved and cannot be a custom tag");
                        continue;
                    }
                    rules = rules.tag(tag);
                }
            }
        }
    }
    for (kind, regex) in overrides {
        rules = rules.exclude(*kind, regex.clone());
    }
    rules
}

/// Find a config file by walking up from `start`.
#[must_use]
pub fn find_config(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(CONFIG_FILENAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}
