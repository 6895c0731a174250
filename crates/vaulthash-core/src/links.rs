//! Link occurrence parsing for prose documents
//!
//! Recognises the link constructs that can point at an attachment:
//!
//! - inline links `[display](target)` and embeds `![display](target)`,
//!   including `<angle bracket>` targets and an optional `"title"`
//! - wiki links `[[target]]`, `[[target|display]]` and embeds `![[target]]`
//! - reference definitions `[label]: target`
//!
//! Links inside fenced code blocks and inline code are ignored. Every
//! occurrence keeps byte offsets into the source text so callers can rewrite
//! the target (and display text) in place without reparsing.

use std::borrow::Cow;
use std::ops::Range;
use std::sync::LazyLock;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use regex::Regex;
use serde::Serialize;

static MARKDOWN_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(!?)\[([^\]\n]*)\]\([ \t]*(<[^>\n]*>|(?:[^()\s]|\([^()\s]*\))*)(?:[ \t]+"[^"\n]*")?[ \t]*\)"#,
    )
    .expect("markdown link pattern is valid")
});

static WIKILINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(!?)\[\[([^\]\n]+)\]\]").expect("wikilink pattern is valid"));

static REFERENCE_DEF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^ {0,3}\[([^\]\n]+)\]:[ \t]*(<[^>\n]*>|\S+)")
        .expect("reference definition pattern is valid")
});

static FENCED_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[^\n]*\n.*?```|~~~[^\n]*\n.*?~~~").expect("fence pattern is valid")
});

static INLINE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`[^`\n]*`").expect("inline code pattern is valid"));

/// Characters escaped when writing a path into an inline link target
const LINK_TARGET_ESCAPE: &AsciiSet = &CONTROLS.add(b' ').add(b'(').add(b')').add(b'<').add(b'>');

/// Syntax used by a link occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// `[display](target)`
    Markdown,
    /// `[[target|display]]`
    Wiki,
    /// `[label]: target`
    Reference,
}

/// A position in the source text
///
/// `line` and `col` are zero-based; `col` counts characters, `offset` is
/// the byte offset used for editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub line: usize,
    pub col: usize,
    pub offset: usize,
}

/// Start and end of a link construct in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

/// One located link inside a prose document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkOccurrence {
    pub kind: LinkKind,
    /// Leading `!` marker
    pub embed: bool,
    /// Whole construct, from `!`/`[` to the closing bracket
    pub span: Span,
    /// Decoded link text, including any `#fragment`
    pub link: String,
    /// Target as written, before percent-decoding
    pub raw_target: String,
    /// Byte range of the target as written (inside angle brackets, if any)
    pub target_range: Range<usize>,
    /// Display text, `None` for wiki links without an alias and references
    pub display_text: Option<String>,
    /// Byte range of the display text
    pub display_range: Option<Range<usize>>,
}

impl LinkOccurrence {
    /// Path part of the link, without `#fragment`
    pub fn path(&self) -> &str {
        split_fragment(&self.link).0
    }

    /// `#fragment` suffix, including the `#`, or an empty string
    pub fn fragment(&self) -> &str {
        split_fragment(&self.link).1
    }

    /// Whether the author chose display text different from the link
    ///
    /// Empty display text, or display text identical to the link text
    /// (as written or decoded), is considered automatic and may be relabeled.
    pub fn has_custom_display(&self) -> bool {
        match &self.display_text {
            Some(text) => !text.is_empty() && !self.is_link_text(text),
            None => false,
        }
    }

    /// Whether `text` spells this occurrence's link
    pub fn is_link_text(&self, text: &str) -> bool {
        text == self.link || text == self.raw_target
    }
}

/// A text edit: replace `remove_len` bytes at `offset` with `insert_text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    /// Byte offset in source
    pub offset: usize,
    /// Number of bytes to remove
    pub remove_len: usize,
    /// Replacement text
    pub insert_text: String,
}

/// Apply edits to `text`
///
/// Edits are applied from the highest offset down so earlier offsets stay
/// valid. Overlapping edits are not supported.
pub fn apply_edits(text: &str, edits: &[TextEdit]) -> String {
    let mut sorted: Vec<&TextEdit> = edits.iter().collect();
    sorted.sort_by(|a, b| b.offset.cmp(&a.offset));

    let mut out = text.to_string();
    for edit in sorted {
        out.replace_range(edit.offset..edit.offset + edit.remove_len, &edit.insert_text);
    }
    out
}

/// Extract every link occurrence from prose text, in source order
pub fn parse_links(text: &str) -> Vec<LinkOccurrence> {
    let excluded = build_excluded_ranges(text);
    let lines = LineIndex::new(text);
    let mut occurrences = Vec::new();

    for cap in WIKILINK_RE.captures_iter(text) {
        let (Some(whole), Some(inner)) = (cap.get(0), cap.get(2)) else {
            continue;
        };
        if is_excluded(whole.start(), &excluded) {
            continue;
        }

        let content = inner.as_str();
        let (target_len, display) = match content.find('|') {
            Some(pipe) => (pipe, Some(inner.start() + pipe + 1..inner.end())),
            None => (content.len(), None),
        };
        let untrimmed = &content[..target_len];
        let target = untrimmed.trim();
        if target.is_empty() {
            continue;
        }
        let lead = untrimmed.len() - untrimmed.trim_start().len();
        let target_range = inner.start() + lead..inner.start() + lead + target.len();

        occurrences.push(LinkOccurrence {
            kind: LinkKind::Wiki,
            embed: !cap[1].is_empty(),
            span: lines.span(whole.start(), whole.end()),
            link: target.to_string(),
            raw_target: target.to_string(),
            target_range,
            display_text: display.as_ref().map(|r| text[r.clone()].to_string()),
            display_range: display,
        });
    }

    for cap in MARKDOWN_LINK_RE.captures_iter(text) {
        let (Some(whole), Some(display), Some(target)) = (cap.get(0), cap.get(2), cap.get(3))
        else {
            continue;
        };
        if is_excluded(whole.start(), &excluded) {
            continue;
        }
        // `[[a]](b)` is a wiki link followed by text, not an inline link
        if whole.as_str().trim_start_matches('!').starts_with("[[") {
            continue;
        }

        let target_range = strip_angle_brackets(target.as_str(), target.start());
        let raw = &text[target_range.clone()];
        if raw.is_empty() {
            continue;
        }

        occurrences.push(LinkOccurrence {
            kind: LinkKind::Markdown,
            embed: !cap[1].is_empty(),
            span: lines.span(whole.start(), whole.end()),
            link: decode_target(raw).into_owned(),
            raw_target: raw.to_string(),
            target_range,
            display_text: Some(display.as_str().to_string()),
            display_range: Some(display.range()),
        });
    }

    for cap in REFERENCE_DEF_RE.captures_iter(text) {
        let (Some(whole), Some(label), Some(target)) = (cap.get(0), cap.get(1), cap.get(2)) else {
            continue;
        };
        // `[^1]: ...` is a footnote, not a link
        if label.as_str().starts_with('^') || is_excluded(whole.start(), &excluded) {
            continue;
        }

        let target_range = strip_angle_brackets(target.as_str(), target.start());
        let raw = &text[target_range.clone()];
        if raw.is_empty() {
            continue;
        }

        occurrences.push(LinkOccurrence {
            kind: LinkKind::Reference,
            embed: false,
            span: lines.span(whole.start(), whole.end()),
            link: decode_target(raw).into_owned(),
            raw_target: raw.to_string(),
            target_range,
            display_text: None,
            display_range: None,
        });
    }

    occurrences.sort_by_key(|occ| occ.span.start.offset);
    occurrences
}

/// Render a link target for the given syntax
///
/// Inline and reference targets get spaces, parentheses and control
/// characters percent-encoded unless the original used angle brackets; wiki
/// targets are written as is. Non-ASCII text is kept readable.
pub fn encode_target(kind: LinkKind, in_angle_brackets: bool, target: &str) -> String {
    match kind {
        LinkKind::Wiki => target.to_string(),
        _ if in_angle_brackets => target.to_string(),
        _ => {
            let mut out = String::with_capacity(target.len());
            let mut buf = [0u8; 4];
            for c in target.chars() {
                if c.is_ascii() {
                    out.extend(utf8_percent_encode(c.encode_utf8(&mut buf), LINK_TARGET_ESCAPE));
                } else {
                    out.push(c);
                }
            }
            out
        }
    }
}

/// Split `path#fragment` into `("path", "#fragment")`
pub fn split_fragment(link: &str) -> (&str, &str) {
    match link.find('#') {
        Some(idx) => (&link[..idx], &link[idx..]),
        None => (link, ""),
    }
}

fn decode_target(raw: &str) -> Cow<'_, str> {
    percent_decode_str(raw)
        .decode_utf8()
        .unwrap_or(Cow::Borrowed(raw))
}

/// Narrow a captured target range to exclude surrounding `<` `>`
fn strip_angle_brackets(target: &str, start: usize) -> Range<usize> {
    if target.len() >= 2 && target.starts_with('<') && target.ends_with('>') {
        start + 1..start + target.len() - 1
    } else {
        start..start + target.len()
    }
}

/// Build a set of byte ranges that are inside code blocks or inline code.
fn build_excluded_ranges(markdown: &str) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    for m in FENCED_CODE_RE.find_iter(markdown) {
        ranges.push((m.start(), m.end()));
    }
    for m in INLINE_CODE_RE.find_iter(markdown) {
        ranges.push((m.start(), m.end()));
    }
    ranges
}

/// Returns true if the byte offset falls within any excluded range.
fn is_excluded(offset: usize, excluded: &[(usize, usize)]) -> bool {
    excluded
        .iter()
        .any(|&(start, end)| offset >= start && offset < end)
}

/// Byte offset → line/column lookup
struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(idx, _)| idx + 1));
        Self { text, line_starts }
    }

    fn position(&self, offset: usize) -> Position {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let col = self.text[self.line_starts[line]..offset].chars().count();
        Position { line, col, offset }
    }

    fn span(&self, start: usize, end: usize) -> Span {
        Span {
            start: self.position(start),
            end: self.position(end),
        }
    }
}
