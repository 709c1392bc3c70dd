//! The escaping pass: span discovery, overlap resolution, placeholder
//! splicing, and store writes.
//!
//! Code spans are discovered by parsing the document with pulldown-cmark
//! and collecting source byte ranges from the offset iterator; custom tag
//! regions are discovered by a non-greedy multi-line scan. Untouched bytes
//! are copied into the output verbatim, so everything outside a protected
//! span (block quote markers, list prefixes, fence characters, setext
//! underlines) survives exactly as written.

use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};
use regex::Regex;

use mdraw_store::RawStore;

use crate::classify::{Decision, EscapeRules, SpanClassifier, SpanKind};
use crate::error::EscapeError;
use crate::normalize::normalize;
use crate::span::RawSpan;

/// One step of a processing pipeline.
#[derive(Debug)]
pub enum Action {
    /// Run the normalizer.
    Normalize,
    /// Run the escaping pass with the given rules.
    Escape(EscapeRules),
}

/// Apply an ordered action list to one document.
///
/// # Errors
///
/// Propagates store failures from escape actions.
pub fn apply_actions(
    text: &str,
    actions: &[Action],
    store: &dyn RawStore,
) -> Result<String, EscapeError> {
    let mut content = text.to_owned();
    for action in actions {
        content = match action {
            Action::Normalize => normalize(&content),
            Action::Escape(rules) => Escaper::new(rules, store).escape(&content)?,
        };
    }
    Ok(content)
}

/// A candidate protected span: a byte range of the document plus its kind.
#[derive(Debug)]
struct Candidate {
    start: usize,
    end: usize,
    kind: SpanKind,
}

/// The escaping renderer.
///
/// Holds a reference to the immutable rules and the content store; both
/// are injected at construction, so there is no process-wide state.
///
/// # Example
///
/// ```
/// use mdraw_escape::{Escaper, EscapeRules};
/// use mdraw_store::NullStore;
///
/// let rules = EscapeRules::default();
/// let store = NullStore;
/// let escaped = Escaper::new(&rules, &store)
///     .escape("Use the `foo` command.\n")
///     .unwrap();
/// assert!(escaped.contains("<escaped hash="));
/// ```
pub struct Escaper<'a> {
    rules: &'a EscapeRules,
    store: &'a dyn RawStore,
}

impl<'a> Escaper<'a> {
    /// Create an escaper over the given rules and store.
    #[must_use]
    pub fn new(rules: &'a EscapeRules, store: &'a dyn RawStore) -> Self {
        Self { rules, store }
    }

    /// Escape every protected span in `text`.
    ///
    /// A single deterministic left-to-right pass: candidates are sorted
    /// by position, and where candidates overlap the earliest/outermost
    /// one wins, so a fence never splits at an embedded delimiter
    /// look-alike.
    ///
    /// # Errors
    ///
    /// Propagates store write failures.
    pub fn escape(&self, text: &str) -> Result<String, EscapeError> {
        let classifier = SpanClassifier::new(self.rules);

        let mut candidates = collect_code_candidates(text);
        candidates.extend(collect_tag_candidates(text, self.rules));
        candidates
            .retain(|c| classifier.classify(c.kind, &text[c.start..c.end]) == Decision::Escape);
        // Earliest span first; at equal starts the longest (outermost) wins.
        candidates.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

        let mut output = String::with_capacity(text.len());
        let mut cursor = 0;
        for candidate in &candidates {
            if candidate.start < cursor {
                // Covered by a span already emitted.
                continue;
            }
            let span = RawSpan::new(&text[candidate.start..candidate.end]);
            self.store.insert(span.hash(), span.content())?;
            tracing::debug!(
                "escaped {} span as {}",
                candidate.kind.as_str(),
                span.hash()
            );

            output.push_str(&text[cursor..candidate.start]);
            output.push_str(&span.placeholder());
            cursor = candidate.end;
        }
        output.push_str(&text[cursor..]);
        Ok(output)
    }
}

/// Collect code-span candidates (fenced, indented, inline) from a
/// pulldown-cmark parse of `text`.
fn collect_code_candidates(text: &str) -> Vec<Candidate> {
    let parser = Parser::new_ext(text, Options::empty());
    let mut candidates = Vec::new();

    for (event, range) in parser.into_offset_iter() {
        match event {
            Event::Start(Tag::CodeBlock(block_kind)) => {
                let kind = match block_kind {
                    CodeBlockKind::Fenced(_) => SpanKind::FenceBlock,
                    CodeBlockKind::Indented => SpanKind::PreBlock,
                };
                candidates.push(block_candidate(text, &range, kind));
            }
            Event::Code(_) => {
                // Inline spans must not cross a line break.
                if !text[range.clone()].contains('\n') {
                    candidates.push(Candidate {
                        start: range.start,
                        end: range.end,
                        kind: SpanKind::InlineCode,
                    });
                }
            }
            _ => {}
        }
    }
    candidates
}

/// Turn a parser block range into a candidate.
///
/// Indented blocks expand to the start of their first line: the leading
/// whitespace is raw content. Both block kinds release the final line
/// terminator so the placeholder stays a single line in place of the
/// block.
fn block_candidate(text: &str, range: &Range<usize>, kind: SpanKind) -> Candidate {
    let mut start = range.start;
    if kind == SpanKind::PreBlock {
        start = text[..start].rfind('\n').map_or(0, |i| i + 1);
    }
    let mut end = range.end;
    if end > start && text.as_bytes()[end - 1] == b'\n' {
        end -= 1;
    }
    Candidate { start, end, kind }
}

/// Collect custom tag region candidates for every configured tag name.
///
/// An unterminated tag never matches and is left as ordinary text.
fn collect_tag_candidates(text: &str, rules: &EscapeRules) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    for name in rules.tags() {
        let pattern = tag_region_pattern(name);
        for matched in pattern.find_iter(text) {
            // A `<` immediately before the match means this is not a real
            // opening tag.
            if matched.start() > 0 && text.as_bytes()[matched.start() - 1] == b'<' {
                continue;
            }
            candidates.push(Candidate {
                start: matched.start(),
                end: matched.end(),
                kind: SpanKind::TagRegion,
            });
        }
    }
    candidates
}

/// Build the non-nested, non-greedy region pattern for one tag name.
fn tag_region_pattern(name: &str) -> Regex {
    let name = regex::escape(name);
    Regex::new(&format!(r"(?s)<{name}(?:\s[^<>]*)?>.*?</{name}>"))
        .expect("pattern is valid for any escaped tag name")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdraw_store::{FileStore, NullStore};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use crate::span::content_hash;
    use crate::unescape::unescape;

    fn tag_for(content: &str) -> String {
        format!(r#"<escaped hash="{}"></escaped>"#, content_hash(content))
    }

    fn file_store() -> (TempDir, FileStore) {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path().join("cache"));
        (tmp, store)
    }

    fn stored_hashes(store: &FileStore) -> Vec<String> {
        let mut hashes: Vec<String> = std::fs::read_dir(store.root())
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .filter_map(|e| {
                        e.path()
                            .file_stem()
                            .map(|s| s.to_string_lossy().into_owned())
                    })
                    .collect()
            })
            .unwrap_or_default();
        hashes.sort();
        hashes
    }

    #[test]
    fn test_escapes_fenced_block() {
        let (_tmp, store) = file_store();
        let rules = EscapeRules::default();
        let input = "# Title\n\n```rust\nfn main() {}\n```\n\nAfter.\n";

        let output = Escaper::new(&rules, &store).escape(input).unwrap();

        let raw = "```rust\nfn main() {}\n```";
        assert_eq!(output, format!("# Title\n\n{}\n\nAfter.\n", tag_for(raw)));
        assert_eq!(
            store.read(&content_hash(raw)).unwrap(),
            Some(raw.to_owned())
        );
    }

    #[test]
    fn test_escapes_tilde_fence() {
        let (_tmp, store) = file_store();
        let rules = EscapeRules::default();
        let input = "~~~python\nprint('hi')\n~~~\n";

        let output = Escaper::new(&rules, &store).escape(input).unwrap();

        let raw = "~~~python\nprint('hi')\n~~~";
        assert_eq!(output, format!("{}\n", tag_for(raw)));
    }

    #[test]
    fn test_fence_with_embedded_delimiter_lookalike() {
        let (_tmp, store) = file_store();
        let rules = EscapeRules::default();
        // The four-backtick fence contains a three-backtick line; the
        // outer fence must win.
        let input = "````\n```\ninner\n```\n````\n";

        let output = Escaper::new(&rules, &store).escape(input).unwrap();

        let raw = "````\n```\ninner\n```\n````";
        assert_eq!(output, format!("{}\n", tag_for(raw)));
        assert_eq!(stored_hashes(&store).len(), 1);
    }

    #[test]
    fn test_escapes_indented_block_with_indentation() {
        let (_tmp, store) = file_store();
        let rules = EscapeRules::default();
        let input = "Intro.\n\n    print(\"hi\")\n\nAfter.\n";

        let output = Escaper::new(&rules, &store).escape(input).unwrap();

        let raw = "    print(\"hi\")";
        assert_eq!(output, format!("Intro.\n\n{}\n\nAfter.\n", tag_for(raw)));
        // Stored bytes keep the leading indentation.
        assert_eq!(
            store.read(&content_hash(raw)).unwrap(),
            Some(raw.to_owned())
        );
    }

    #[test]
    fn test_escapes_multi_line_indented_block_as_one_span() {
        let (_tmp, store) = file_store();
        let rules = EscapeRules::default();
        let input = "Intro.\n\n    first\n    second\n\nAfter.\n";

        let output = Escaper::new(&rules, &store).escape(input).unwrap();

        let raw = "    first\n    second";
        assert_eq!(output, format!("Intro.\n\n{}\n\nAfter.\n", tag_for(raw)));
        assert_eq!(stored_hashes(&store).len(), 1);
    }

    #[test]
    fn test_escapes_inline_code_in_place() {
        let (_tmp, store) = file_store();
        let rules = EscapeRules::default();
        let input = "Use the `foo` command.\n";

        let output = Escaper::new(&rules, &store).escape(input).unwrap();

        assert_eq!(
            output,
            format!("Use the {} command.\n", tag_for("`foo`"))
        );
        assert_eq!(
            store.read(&content_hash("`foo`")).unwrap(),
            Some("`foo`".to_owned())
        );
    }

    #[test]
    fn test_escapes_custom_tag_region() {
        let (_tmp, store) = file_store();
        let rules = EscapeRules::new().tag("plantuml");
        let input = "<plantuml>\n@startuml\nA -> B\n@enduml\n</plantuml>\n";

        let output = Escaper::new(&rules, &store).escape(input).unwrap();

        let raw = "<plantuml>\n@startuml\nA -> B\n@enduml\n</plantuml>";
        assert_eq!(output, format!("{}\n", tag_for(raw)));
        // The whole region including both tags is stored.
        assert_eq!(
            store.read(&content_hash(raw)).unwrap(),
            Some(raw.to_owned())
        );
    }

    #[test]
    fn test_unterminated_tag_left_as_text() {
        let (_tmp, store) = file_store();
        let rules = EscapeRules::new().tag("plantuml");
        let input = "<plantuml>\nno closing tag here\n";

        let output = Escaper::new(&rules, &store).escape(input).unwrap();

        assert_eq!(output, input);
        assert!(stored_hashes(&store).is_empty());
    }

    #[test]
    fn test_tag_preceded_by_angle_bracket_ignored() {
        let (_tmp, store) = file_store();
        let rules = EscapeRules::new().tag("x");
        let input = "a <<x>not a tag</x> b\n";

        let output = Escaper::new(&rules, &store).escape(input).unwrap();

        assert_eq!(output, input);
    }

    #[test]
    fn test_deduplicates_identical_blocks() {
        let (_tmp, store) = file_store();
        let rules = EscapeRules::default();
        let input = "```\nsame\n```\n\nmiddle\n\n```\nsame\n```\n";

        let output = Escaper::new(&rules, &store).escape(input).unwrap();

        let tag = tag_for("```\nsame\n```");
        assert_eq!(output, format!("{tag}\n\nmiddle\n\n{tag}\n"));
        // One stored file, two placeholder occurrences.
        assert_eq!(stored_hashes(&store).len(), 1);
        assert_eq!(output.matches(&tag).count(), 2);
    }

    #[test]
    fn test_deterministic_across_fresh_stores() {
        let rules = EscapeRules::default();
        let input = "Use `a` and `b`.\n\n```\nblock\n```\n\n    pre\n";

        let (_tmp1, store1) = file_store();
        let first = Escaper::new(&rules, &store1).escape(input).unwrap();
        let (_tmp2, store2) = file_store();
        let second = Escaper::new(&rules, &store2).escape(input).unwrap();

        assert_eq!(first, second);
        assert_eq!(stored_hashes(&store1), stored_hashes(&store2));
    }

    #[test]
    fn test_excluded_span_emitted_verbatim_without_store_write() {
        let (_tmp, store) = file_store();
        let rules = EscapeRules::default().exclude(
            SpanKind::FenceBlock,
            Regex::new("@startuml").unwrap(),
        );
        let input = "```\n@startuml\nA -> B\n@enduml\n```\n";

        let output = Escaper::new(&rules, &store).escape(input).unwrap();

        assert_eq!(output, input);
        assert!(stored_hashes(&store).is_empty());
    }

    #[test]
    fn test_disabled_kinds_pass_through() {
        let (_tmp, store) = file_store();
        let rules = EscapeRules::new().enable(SpanKind::FenceBlock);
        let input = "Use `inline`.\n\n    pre block\n";

        let output = Escaper::new(&rules, &store).escape(input).unwrap();

        assert_eq!(output, input);
    }

    #[test]
    fn test_inline_code_inside_fence_not_escaped_separately() {
        let (_tmp, store) = file_store();
        let rules = EscapeRules::default();
        let input = "```\nUse `foo` here\n```\n";

        let output = Escaper::new(&rules, &store).escape(input).unwrap();

        let raw = "```\nUse `foo` here\n```";
        assert_eq!(output, format!("{}\n", tag_for(raw)));
        assert_eq!(stored_hashes(&store).len(), 1);
    }

    #[test]
    fn test_tag_region_inside_fence_loses_to_fence() {
        let (_tmp, store) = file_store();
        let rules = EscapeRules::default().tag("plantuml");
        let input = "```\n<plantuml>inside</plantuml>\n```\n";

        let output = Escaper::new(&rules, &store).escape(input).unwrap();

        let raw = "```\n<plantuml>inside</plantuml>\n```";
        assert_eq!(output, format!("{}\n", tag_for(raw)));
        assert_eq!(stored_hashes(&store).len(), 1);
    }

    #[test]
    fn test_lazy_continuation_is_not_a_pre_block() {
        let (_tmp, store) = file_store();
        let rules = EscapeRules::default();
        // An indented line directly under a paragraph is a continuation,
        // not an indented code block.
        let input = "A paragraph\n    still the paragraph\n";

        let output = Escaper::new(&rules, &store).escape(input).unwrap();

        assert_eq!(output, input);
        assert!(stored_hashes(&store).is_empty());
    }

    #[test]
    fn test_escaped_output_is_stable_under_second_pass() {
        let (_tmp, store) = file_store();
        let rules = EscapeRules::default().tag("plantuml");
        let input =
            "Use `foo`.\n\n```\nblock\n```\n\n<plantuml>\nA -> B\n</plantuml>\n";

        let once = Escaper::new(&rules, &store).escape(input).unwrap();
        let twice = Escaper::new(&rules, &store).escape(&once).unwrap();

        assert_eq!(twice, once);
    }

    #[test]
    fn test_null_store_still_produces_placeholders() {
        let rules = EscapeRules::default();
        let store = NullStore;

        let output = Escaper::new(&rules, &store)
            .escape("Use `foo`.\n")
            .unwrap();

        assert_eq!(output, format!("Use {}.\n", tag_for("`foo`")));
    }

    #[test]
    fn test_apply_actions_runs_in_order() {
        let (_tmp, store) = file_store();
        let actions = [Action::Normalize, Action::Escape(EscapeRules::default())];
        // CRLF input: normalize first, then escape the normalized bytes.
        let input = "Use the `foo` command.\r\n";

        let output = apply_actions(input, &actions, &store).unwrap();

        assert_eq!(
            output,
            format!("Use the {} command.\n", tag_for("`foo`"))
        );
    }

    #[test]
    fn test_round_trip_restores_normalized_input() {
        let (_tmp, store) = file_store();
        let actions = [
            Action::Normalize,
            Action::Escape(EscapeRules::default().tag("plantuml")),
        ];
        let input = "# Doc\r\n\r\nUse `foo` and `bar`.\r\n\r\n\
                     ```rust\r\nfn main() {}\r\n```\r\n\r\n\
                     \tindented()\r\n\r\n\
                     <plantuml>\r\n@startuml\r\nA -> B\r\n@enduml\r\n</plantuml>\r\n\r\n\
                     > quoted prose\r\n";

        let escaped = apply_actions(input, &actions, &store).unwrap();
        let restored = unescape(&escaped, &store).unwrap();

        assert_eq!(restored, normalize(input));
    }

    #[test]
    fn test_round_trip_example_indented_block() {
        let (_tmp, store) = file_store();
        let actions = [Action::Normalize, Action::Escape(EscapeRules::default())];
        let input = "Before.\n\n    print(\"hi\")\n\nAfter.\n";

        let escaped = apply_actions(input, &actions, &store).unwrap();

        let raw = "    print(\"hi\")";
        let hash = content_hash(raw);
        assert!(escaped.contains(&format!(r#"<escaped hash="{hash}"></escaped>"#)));
        let stored = store.read(&hash).unwrap().unwrap();
        assert!(stored.contains("print(\"hi\")"));

        assert_eq!(unescape(&escaped, &store).unwrap(), normalize(input));
    }

    #[test]
    fn test_preserves_surrounding_structure() {
        let (_tmp, store) = file_store();
        let rules = EscapeRules::default();
        let input = "1. first item\n2. second item\n\n> a quote\n\nSetext title\n============\n";

        let output = Escaper::new(&rules, &store).escape(input).unwrap();

        // Nothing protected: structural formatting must survive untouched.
        assert_eq!(output, input);
    }
}
