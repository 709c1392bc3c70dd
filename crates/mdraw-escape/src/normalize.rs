//! Text normalization applied before span discovery.
//!
//! Runs on raw text, with no span awareness: downstream parsing sees one
//! canonical form of line endings, indentation, and trailing whitespace.

use std::sync::LazyLock;

use regex::Regex;

static TRAILING_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" +\n").unwrap());
static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());
static EOF_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \n]+$").unwrap());

/// Normalize Markdown text.
///
/// Pure and deterministic; idempotent: `normalize(normalize(x)) == normalize(x)`.
///
/// In order: strips a leading byte-order mark and converts any remaining
/// BOM character to a word joiner (U+2060, invisible but preserved);
/// unifies CRLF and lone CR to LF; expands tabs to 4 spaces; converts
/// form feeds and vertical tabs to spaces; strips trailing spaces before
/// each newline; collapses runs of 3+ newlines to a blank line; ensures
/// the text ends with exactly one newline.
#[must_use]
pub fn normalize(text: &str) -> String {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut content = text.replace('\u{feff}', "\u{2060}");

    content = content.replace("\r\n", "\n").replace('\r', "\n");
    content = content.replace('\t', "    ");
    content = content.replace(['\u{0c}', '\u{0b}'], " ");

    content = TRAILING_SPACES.replace_all(&content, "\n").into_owned();
    content = BLANK_RUN.replace_all(&content, "\n\n").into_owned();

    if content.ends_with(|c: char| !c.is_whitespace()) {
        content.push('\n');
    }
    EOF_WHITESPACE.replace_all(&content, "\n").into_owned()
}
