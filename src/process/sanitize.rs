//! Protecting logic tags a markup parser would choke on.
//!
//! Three passes run in order, each over the previous pass's output:
//!
//! 1. **Raw-text bodies**: the non-empty body of `script`, `style`, `pre`
//!    and `textarea` elements becomes one placeholder
//! 2. **Attribute values**: every logic tag inside a quoted attribute value
//!    becomes its own placeholder, the rest of the value is untouched
//! 3. **Start tags**: a logic tag in attribute position, together with
//!    everything after it up to the start tag's closing `>`, becomes one
//!    placeholder
//!
//! Each replaced substring is appended to a [`PlaceholderTable`]; the
//! rehydrator puts them back after formatting.

use std::ops::Range;

use crate::parser::patterns::{RAW_TEXT_NAME_RE, START_TAG_RE};
use crate::parser::scanner::find_tag_end;

const PLACEHOLDER_STEM: &str = "__stencilfmt_ph";

/// Ordered record of replaced substrings. The position in the table is the
/// placeholder's index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderTable {
    prefix: String,
    entries: Vec<String>,
}

impl PlaceholderTable {
    /// Create an empty table whose tokens cannot collide with `document`.
    #[must_use]
    pub fn for_document(document: &str) -> Self {
        let mut prefix = format!("{PLACEHOLDER_STEM}_");
        let mut n = 0;
        while document.contains(&prefix) {
            n += 1;
            prefix = format!("{PLACEHOLDER_STEM}{n}_");
        }
        Self {
            prefix,
            entries: Vec::new(),
        }
    }

    /// Record `original` and return the token that stands in for it.
    pub fn push(&mut self, original: String) -> String {
        self.entries.push(original);
        self.token(self.entries.len() - 1)
    }

    #[must_use]
    pub fn token(&self, index: usize) -> String {
        format!("{}{index}__", self.prefix)
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Byte ranges of this table's tokens in `text`, each with the
    /// substring it stands for, in text order.
    #[must_use]
    pub fn occurrences<'a>(&'a self, text: &str) -> Vec<(Range<usize>, &'a str)> {
        let mut found = Vec::new();
        for (start, _) in text.match_indices(&self.prefix) {
            let digits_start = start + self.prefix.len();
            let digits = text[digits_start..]
                .find(|c: char| !c.is_ascii_digit())
                .map_or(text.len(), |rel| digits_start + rel);
            if !text[digits..].starts_with("__") {
                continue;
            }
            let Some(original) = text[digits_start..digits]
                .parse::<usize>()
                .ok()
                .and_then(|index| self.get(index))
            else {
                continue;
            };
            found.push((start..digits + 2, original));
        }
        found
    }

    /// `(token, original)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (String, &str)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, original)| (self.token(i), original.as_str()))
    }
}

/// Sanitized text plus the table needed to undo it.
#[derive(Debug, Clone)]
pub struct Sanitized {
    pub text: String,
    pub placeholders: PlaceholderTable,
}

/// Sanitize a whole document.
#[must_use]
pub fn sanitize(source: &str) -> Sanitized {
    sanitize_with(source, PlaceholderTable::for_document(source))
}

/// Sanitize `text`, appending to an existing table.
#[must_use]
pub fn sanitize_with(text: &str, mut placeholders: PlaceholderTable) -> Sanitized {
    let text = replace_ranges(text, &raw_text_bodies(text), &mut placeholders);
    let text = replace_ranges(&text, &attribute_value_tags(&text), &mut placeholders);
    let text = replace_ranges(&text, &start_tag_logic(&text), &mut placeholders);
    log::debug!(
        target: "stencilfmt::sanitize",
        "protected {} region(s)",
        placeholders.len()
    );
    Sanitized { text, placeholders }
}

fn replace_ranges(text: &str, ranges: &[Range<usize>], table: &mut PlaceholderTable) -> String {
    if ranges.is_empty() {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for range in ranges {
        out.push_str(&text[last..range.start]);
        out.push_str(&table.push(text[range.clone()].to_string()));
        last = range.end;
    }
    out.push_str(&text[last..]);
    out
}

/// Pieces of a start tag that matter to the sanitizer.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TagPiece {
    /// Content of a quoted attribute value, quotes excluded.
    Value(Range<usize>),
    /// A logic tag in attribute position.
    Logic(Range<usize>),
}

#[derive(Debug)]
struct StartTag {
    name: String,
    pieces: Vec<TagPiece>,
    /// Offset of the closing `>`, if the tag is terminated.
    close: Option<usize>,
}

/// Next markup start tag at or after `from`, stepping over logic tags in text position.
fn next_start_tag(text: &str, from: usize) -> Option<(usize, StartTag)> {
    let mut pos = from;
    loop {
        let lt = pos + text[pos..].find('<')?;
        if let Some(logic) = text[pos..lt].find("{{").map(|r| pos + r) {
            pos = find_tag_end(text, logic).unwrap_or(logic + 2);
            continue;
        }
        match START_TAG_RE.captures(&text[lt..]) {
            Some(caps) => {
                let name_end = lt + caps[0].len();
                let tag = scan_start_tag(text, &caps[1], name_end);
                return Some((lt, tag));
            }
            None => pos = lt + 1,
        }
    }
}

fn scan_start_tag(text: &str, name: &str, from: usize) -> StartTag {
    let mut pieces = Vec::new();
    let mut pos = from;
    while let Some(c) = text[pos..].chars().next() {
        match c {
            '>' => {
                return StartTag {
                    name: name.to_string(),
                    pieces,
                    close: Some(pos),
                };
            }
            '"' | '\'' => {
                let end = quoted_value_end(text, pos + 1, c);
                pieces.push(TagPiece::Value(pos + 1..end));
                pos = (end + 1).min(text.len());
            }
            '{' if text[pos..].starts_with("{{") => {
                let end = find_tag_end(text, pos).unwrap_or(text.len());
                pieces.push(TagPiece::Logic(pos..end));
                pos = end;
            }
            _ => pos += c.len_utf8(),
        }
    }
    StartTag {
        name: name.to_string(),
        pieces,
        close: None,
    }
}

/// Offset of the quote closing a value that starts at `from`; logic tags
/// inside the value may contain the quote character.
fn quoted_value_end(text: &str, from: usize, quote: char) -> usize {
    let mut pos = from;
    while let Some(c) = text[pos..].chars().next() {
        if c == quote {
            return pos;
        }
        if text[pos..].starts_with("{{") {
            pos = find_tag_end(text, pos).unwrap_or(pos + 2);
        } else {
            pos += c.len_utf8();
        }
    }
    text.len()
}

/// Logic tags inside `range`, ignoring `\{{` escapes.
fn logic_tags_in(text: &str, range: Range<usize>) -> Vec<Range<usize>> {
    let mut found = Vec::new();
    let mut pos = range.start;
    while let Some(rel) = text[pos..range.end].find("{{") {
        let start = pos + rel;
        if start > 0 && text.as_bytes()[start - 1] == b'\\' {
            pos = start + 2;
            continue;
        }
        let Some(end) = find_tag_end(text, start) else {
            break;
        };
        found.push(start..end.min(range.end));
        pos = end;
        if pos >= range.end {
            break;
        }
    }
    found
}

fn raw_text_bodies(text: &str) -> Vec<Range<usize>> {
    let lower = text.to_ascii_lowercase();
    let mut ranges = Vec::new();
    let mut pos = 0;
    while let Some((lt, tag)) = next_start_tag(text, pos) {
        pos = lt + 1;
        if !RAW_TEXT_NAME_RE.is_match(&tag.name) {
            continue;
        }
        let Some(close) = tag.close else {
            break;
        };
        let body_start = close + 1;
        let closing = format!("</{}", tag.name.to_ascii_lowercase());
        let Some(rel) = lower[body_start..].find(&closing) else {
            continue;
        };
        let body_end = body_start + rel;
        if body_end > body_start {
            ranges.push(body_start..body_end);
        }
        pos = body_end;
    }
    ranges
}

fn attribute_value_tags(text: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut pos = 0;
    while let Some((lt, tag)) = next_start_tag(text, pos) {
        for piece in &tag.pieces {
            match piece {
                // The rest of this start tag belongs to the start-tag pass
                TagPiece::Logic(_) => break,
                TagPiece::Value(range) => ranges.extend(logic_tags_in(text, range.clone())),
            }
        }
        pos = tag.close.map_or(lt + 1, |close| close + 1);
    }
    ranges
}

fn start_tag_logic(text: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut pos = 0;
    while let Some((lt, tag)) = next_start_tag(text, pos) {
        let first_logic = tag.pieces.iter().find_map(|piece| match piece {
            TagPiece::Logic(range) => Some(range.start),
            TagPiece::Value(_) => None,
        });
        if let (Some(start), Some(close)) = (first_logic, tag.close) {
            ranges.push(start..close);
        }
        pos = tag.close.map_or(lt + 1, |close| close + 1);
    }
    ranges
}
