//! Span classification: which discovered spans get escaped.
//!
//! The escaper discovers candidate spans syntactically; [`SpanClassifier`]
//! applies policy: per-kind enablement, exclusion pattern overrides, the
//! admonition-marker exception for indented blocks, and the rule that a
//! region already carrying a placeholder is never escaped again.

use std::sync::LazyLock;

use regex::Regex;

use crate::span::PLACEHOLDER;

/// Admonition marker line: `!!! note "Title"`, `??? info`, `???+ tip`,
/// `=== "Tab"`. Structural callout syntax, not raw content, even when it
/// sits inside an indented block.
static ADMONITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*(?:===|!!!|\?\?\?\+?)\s+(?:"[^"\n]*"|\S+)"#).unwrap()
});

/// The kinds of protected span this system recognizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpanKind {
    /// Fenced code block (backtick or tilde fences).
    FenceBlock,
    /// Indented code block (4+ leading spaces).
    PreBlock,
    /// Inline code span (backtick delimited, single line).
    InlineCode,
    /// Custom tag region (`<tag>...</tag>` for a configured tag name).
    TagRegion,
}

impl SpanKind {
    /// Parse a configured span-kind name.
    ///
    /// Tag regions are configured through the tag name list, not by kind
    /// name, so only the three code kinds are nameable here.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "fence_blocks" => Some(Self::FenceBlock),
            "pre_blocks" => Some(Self::PreBlock),
            "inline_code" => Some(Self::InlineCode),
            _ => None,
        }
    }

    /// Configuration name of this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FenceBlock => "fence_blocks",
            Self::PreBlock => "pre_blocks",
            Self::InlineCode => "inline_code",
            Self::TagRegion => "tags",
        }
    }
}

/// Classification outcome for one span.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Replace the span with a placeholder and store its bytes.
    Escape,
    /// Render the span unchanged.
    Passthrough,
}

/// Which spans to protect, resolved once per run and read-only thereafter.
///
/// # Example
///
/// ```
/// use mdraw_escape::{EscapeRules, SpanKind};
///
/// let rules = EscapeRules::new()
///     .enable(SpanKind::FenceBlock)
///     .tag("plantuml");
/// ```
#[derive(Debug)]
pub struct EscapeRules {
    fence_blocks: bool,
    pre_blocks: bool,
    inline_code: bool,
    tags: Vec<String>,
    fence_exclude: Option<Regex>,
    pre_exclude: Option<Regex>,
    inline_exclude: Option<Regex>,
}

impl Default for EscapeRules {
    /// The default protection set: all three code kinds, no custom tags.
    fn default() -> Self {
        Self::new()
            .enable(SpanKind::FenceBlock)
            .enable(SpanKind::PreBlock)
            .enable(SpanKind::InlineCode)
    }
}

impl EscapeRules {
    /// Rules with nothing enabled; build up with the other methods.
    #[must_use]
    pub fn new() -> Self {
        Self {
            fence_blocks: false,
            pre_blocks: false,
            inline_code: false,
            tags: Vec::new(),
            fence_exclude: None,
            pre_exclude: None,
            inline_exclude: None,
        }
    }

    /// Enable escaping for a span kind.
    ///
    /// Tag regions are enabled by [`tag`](Self::tag), so passing
    /// [`SpanKind::TagRegion`] here is ignored.
    #[must_use]
    pub fn enable(mut self, kind: SpanKind) -> Self {
        match kind {
            SpanKind::FenceBlock => self.fence_blocks = true,
            SpanKind::PreBlock => self.pre_blocks = true,
            SpanKind::InlineCode => self.inline_code = true,
            SpanKind::TagRegion => {
                tracing::debug!("tag regions are enabled per tag name, ignoring enable()");
            }
        }
        self
    }

    /// Add a custom tag name whose `<tag>...</tag>` regions are escaped.
    #[must_use]
    pub fn tag(mut self, name: impl Into<String>) -> Self {
        self.tags.push(name.into());
        self
    }

    /// Set an exclusion pattern for a kind: a span whose raw text matches
    /// is rendered normally instead of escaped.
    ///
    /// Tag regions carry no exclusion pattern; passing
    /// [`SpanKind::TagRegion`] is ignored.
    #[must_use]
    pub fn exclude(mut self, kind: SpanKind, pattern: Regex) -> Self {
        match kind {
            SpanKind::FenceBlock => self.fence_exclude = Some(pattern),
            SpanKind::PreBlock => self.pre_exclude = Some(pattern),
            SpanKind::InlineCode => self.inline_exclude = Some(pattern),
            SpanKind::TagRegion => {
                tracing::debug!("tag regions have no exclusion pattern, ignoring exclude()");
            }
        }
        self
    }

    /// Configured custom tag names.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    fn is_enabled(&self, kind: SpanKind) -> bool {
        match kind {
            SpanKind::FenceBlock => self.fence_blocks,
            SpanKind::PreBlock => self.pre_blocks,
            SpanKind::InlineCode => self.inline_code,
            SpanKind::TagRegion => !self.tags.is_empty(),
        }
    }

    fn exclusion(&self, kind: SpanKind) -> Option<&Regex> {
        match kind {
            SpanKind::FenceBlock => self.fence_exclude.as_ref(),
            SpanKind::PreBlock => self.pre_exclude.as_ref(),
            SpanKind::InlineCode => self.inline_exclude.as_ref(),
            SpanKind::TagRegion => None,
        }
    }
}

/// Decides for each candidate span whether it is escaped or passed through.
///
/// Holds a reference to the immutable [`EscapeRules`]; the escaper invokes
/// it once per discovered span.
pub struct SpanClassifier<'r> {
    rules: &'r EscapeRules,
}

impl<'r> SpanClassifier<'r> {
    /// Create a classifier over the given rules.
    #[must_use]
    pub fn new(rules: &'r EscapeRules) -> Self {
        Self { rules }
    }

    /// Classify one candidate span given its kind and exact raw text.
    #[must_use]
    pub fn classify(&self, kind: SpanKind, raw: &str) -> Decision {
        if !self.rules.is_enabled(kind) {
            return Decision::Passthrough;
        }
        // Never re-escape a region that already carries a placeholder.
        if PLACEHOLDER.is_match(raw) {
            return Decision::Passthrough;
        }
        if kind == SpanKind::PreBlock && ADMONITION.is_match(raw) {
            return Decision::Passthrough;
        }
        if let Some(pattern) = self.rules.exclusion(kind) {
            if pattern.is_match(raw) {
                return Decision::Passthrough;
            }
        }
        Decision::Escape
    }
}
