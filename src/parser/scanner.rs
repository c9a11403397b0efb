//! Tag scanner.
//!
//! Splits template text into content runs and raw logic tags. The scanner
//! only finds tag boundaries and classifies tags by their sigil; parameter
//! tokenizing and nesting are left to the tree builder.
//!
//! Tag boundaries are quote-aware: a `}}` inside a string parameter does not
//! close the tag. A `{{` preceded by a single backslash is escaped and stays
//! part of the surrounding content.

use std::ops::Range;

use crate::error::SyntaxError;
use crate::parser::ast::{CommentForm, LineIndex, Strip};
use crate::parser::patterns::{ELSE_RE, LONG_COMMENT_END_RE, SHORT_COMMENT_END_RE};

/// What a tag does, judged by its opening sigil.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    /// `{{path …}}`
    Mustache,
    /// `{{{path …}}}`
    Raw,
    /// `{{> name …}}`
    Partial,
    /// `{{#name …}}`
    OpenBlock,
    /// `{{^name …}}`
    OpenInverse,
    /// `{{#> name …}}`
    OpenPartialBlock,
    /// `{{#*name …}}`
    OpenDecoratorBlock,
    /// `{{else}}`, `{{^}}`, or `{{else name …}}` when the interior is non-empty
    Else,
    /// `{{/name}}`
    Close,
    Comment(CommentForm),
}

/// A logic tag as found in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTag<'a> {
    pub kind: TagKind,
    /// Interior after the sigil, before the closing strip marker.
    pub inner: &'a str,
    /// Byte range of the whole tag, delimiters included.
    pub range: Range<usize>,
    pub strip: Strip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    Text(Range<usize>),
    Tag(RawTag<'a>),
}

/// True when the `{{` at `at` is written as `\{{`.
fn is_escaped(source: &str, at: usize) -> bool {
    let bytes = source.as_bytes();
    at >= 1 && bytes[at - 1] == b'\\' && !(at >= 2 && bytes[at - 2] == b'\\')
}

/// Scan template text into content runs and tags.
pub fn scan(source: &str) -> Result<Vec<Token<'_>>, SyntaxError> {
    let index = LineIndex::new(source);
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut text_start = 0;

    while let Some(rel) = source[pos..].find("{{") {
        let start = pos + rel;
        if is_escaped(source, start) {
            pos = start + 2;
            continue;
        }

        let tag = scan_tag(source, start)
            .map_err(|(offset, message)| SyntaxError::new(index.position(offset), message))?;
        if text_start < start {
            tokens.push(Token::Text(text_start..start));
        }
        pos = tag.range.end;
        text_start = pos;
        tokens.push(Token::Tag(tag));
    }

    if text_start < source.len() {
        tokens.push(Token::Text(text_start..source.len()));
    }
    Ok(tokens)
}

/// Byte offset just past the tag that starts at `start` (which must point at `{{`).
///
/// Used by the sanitizer to step over tags embedded in markup.
#[must_use]
pub fn find_tag_end(source: &str, start: usize) -> Option<usize> {
    scan_tag(source, start).ok().map(|tag| tag.range.end)
}

type ScanError = (usize, String);

fn scan_tag(source: &str, start: usize) -> Result<RawTag<'_>, ScanError> {
    let mut i = start + 2;
    if source[i..].starts_with("{{") {
        return Err((start, "raw blocks (`{{{{`) are not supported".to_string()));
    }
    let open_strip = source[i..].starts_with('~');
    if open_strip {
        i += 1;
    }
    // `{{{x}}}`, or `{{~{x}~}}` with strip markers
    let triple = source[i..].starts_with('{');
    if triple {
        i += 1;
    }

    if !triple {
        if let Some(tag) = scan_comment(source, start, i, open_strip)? {
            return Ok(tag);
        }
    }

    let (inner_end, close_strip, end) = find_close(source, i, triple)
        .ok_or_else(|| (start, "unterminated tag: missing `}}`".to_string()))?;
    let inner = &source[i..inner_end];
    let strip = Strip {
        open: open_strip,
        close: close_strip,
    };
    let (kind, inner) = if triple {
        (TagKind::Raw, inner)
    } else {
        classify(inner).map_err(|message| (start, message))?
    };

    Ok(RawTag {
        kind,
        inner,
        range: start..end,
        strip,
    })
}

fn scan_comment(
    source: &str,
    start: usize,
    i: usize,
    open_strip: bool,
) -> Result<Option<RawTag<'_>>, ScanError> {
    let rest = &source[i..];
    let (form, body_start, pattern) = if rest.starts_with("!--") {
        (CommentForm::Long, i + 3, &*LONG_COMMENT_END_RE)
    } else if rest.starts_with('!') {
        (CommentForm::Short, i + 1, &*SHORT_COMMENT_END_RE)
    } else {
        return Ok(None);
    };

    let caps = pattern
        .captures(&source[body_start..])
        .ok_or_else(|| (start, "unterminated comment".to_string()))?;
    let Some(whole) = caps.get(0) else {
        return Err((start, "unterminated comment".to_string()));
    };
    let close_strip = caps.get(1).is_some_and(|m| !m.as_str().is_empty());

    Ok(Some(RawTag {
        kind: TagKind::Comment(form),
        inner: &source[body_start..body_start + whole.start()],
        range: start..body_start + whole.end(),
        strip: Strip {
            open: open_strip,
            close: close_strip,
        },
    }))
}

/// Find the closing braces of a tag whose interior starts at `from`.
///
/// Returns `(interior end, close strip, tag end)`. A triple tag closes with
/// `}}}`, or `}~}}` when stripped.
fn find_close(source: &str, from: usize, triple: bool) -> Option<(usize, bool, usize)> {
    let mut quote: Option<char> = None;
    let mut chars = source[from..].char_indices();

    while let Some((rel, c)) = chars.next() {
        let at = from + rel;
        if let Some(q) = quote {
            if c == '\\' {
                chars.next();
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '}' if triple => {
                let rest = &source[at + 1..];
                if rest.starts_with("}}") {
                    return Some((at, false, at + 3));
                }
                if rest.starts_with("~}}") {
                    return Some((at, true, at + 4));
                }
            }
            '}' if source[at..].starts_with("}}") => {
                let strip = at > from && source.as_bytes()[at - 1] == b'~';
                let inner_end = if strip { at - 1 } else { at };
                return Some((inner_end, strip, at + 2));
            }
            _ => {}
        }
    }
    None
}

fn classify(inner: &str) -> Result<(TagKind, &str), String> {
    let kind = match inner.chars().next() {
        Some('#') => {
            let rest = &inner[1..];
            if let Some(name) = rest.strip_prefix('>') {
                return Ok((TagKind::OpenPartialBlock, name));
            }
            if let Some(name) = rest.strip_prefix('*') {
                return Ok((TagKind::OpenDecoratorBlock, name));
            }
            return Ok((TagKind::OpenBlock, rest));
        }
        Some('^') => {
            let rest = &inner[1..];
            if rest.trim().is_empty() {
                return Ok((TagKind::Else, ""));
            }
            return Ok((TagKind::OpenInverse, rest));
        }
        Some('/') => return Ok((TagKind::Close, &inner[1..])),
        Some('>') => return Ok((TagKind::Partial, &inner[1..])),
        Some('*') => {
            return Err("inline decorators (`{{*name}}`) are not supported".to_string());
        }
        _ => TagKind::Mustache,
    };

    if let Some(caps) = ELSE_RE.captures(inner) {
        let chain = caps.get(1).map_or("", |m| m.as_str());
        return Ok((TagKind::Else, chain));
    }
    Ok((kind, inner))
}
