//! Document-level whitespace passes.
//!
//! - [`reset_indentation`]: drops the author's leading indentation before
//!   layout, so indentation in the output comes from block nesting only
//! - [`finalize`]: trailing whitespace, blank-line collapsing and the final
//!   newline
//!
//! Lines that start or end inside a logic tag spanning several lines belong
//! to the tag (a multi-line string literal, for instance) and keep their
//! whitespace. Comments are not protected: their text is re-indented with
//! the surrounding markup.

use std::ops::Range;

use regex::Captures;

use crate::parser::patterns::BLANK_RUN_RE;
use crate::parser::scanner::{scan, TagKind, Token};

/// Byte ranges of the non-comment logic tags in `text` whose interior
/// holds a newline. Text that does not scan yields no ranges.
fn multiline_tags(text: &str) -> Vec<Range<usize>> {
    let Ok(tokens) = scan(text) else {
        return Vec::new();
    };
    tokens
        .into_iter()
        .filter_map(|token| match token {
            Token::Tag(tag)
                if !matches!(tag.kind, TagKind::Comment(_)) && tag.inner.contains('\n') =>
            {
                Some(tag.range)
            }
            _ => None,
        })
        .collect()
}

/// `offset` lies strictly inside one of the sorted `ranges`.
fn inside(ranges: &[Range<usize>], offset: usize) -> bool {
    let i = ranges.partition_point(|range| range.end <= offset);
    ranges.get(i).is_some_and(|range| range.start < offset)
}

/// Rebuild `text` line by line; `f` gets each line and its byte offset.
fn map_lines<'a>(text: &'a str, mut f: impl FnMut(&'a str, usize) -> &'a str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut start = 0;
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(f(line, start));
        start += line.len() + 1;
    }
    out
}

/// Strip leading spaces and tabs from every line.
#[must_use]
pub fn reset_indentation(text: &str) -> String {
    let tags = multiline_tags(text);
    map_lines(text, |line, start| {
        if inside(&tags, start) {
            line
        } else {
            line.trim_start_matches([' ', '\t'])
        }
    })
}

/// Strip trailing spaces and tabs from every line.
#[must_use]
pub fn strip_trailing_whitespace(text: &str) -> String {
    let tags = multiline_tags(text);
    map_lines(text, |line, start| {
        if inside(&tags, start + line.len()) {
            line
        } else {
            line.trim_end_matches([' ', '\t'])
        }
    })
}

/// Final cleanup of a formatted document.
///
/// Trailing whitespace goes first so that whitespace-only lines count as
/// blank when runs of blank lines are collapsed to one.
#[must_use]
pub fn finalize(text: &str) -> String {
    let stripped = strip_trailing_whitespace(text);
    let tags = multiline_tags(&stripped);
    let collapsed = BLANK_RUN_RE.replace_all(&stripped, |caps: &Captures<'_>| {
        match caps.get(0) {
            Some(run) if inside(&tags, run.start()) => run.as_str().to_string(),
            _ => "\n\n".to_string(),
        }
    });
    let trimmed = collapsed.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let mut out = String::with_capacity(trimmed.len() + 1);
    out.push_str(trimmed);
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_indentation() {
        assert_eq!(
            reset_indentation("  <div>\n\t\t{{x}}\n    </div>\n"),
            "<div>\n{{x}}\n</div>\n"
        );
    }

    #[test]
    fn test_reset_indentation_keeps_inner_spacing() {
        assert_eq!(reset_indentation("   a  b"), "a  b");
    }

    #[test]
    fn test_finalize_collapses_blank_lines() {
        assert_eq!(
            finalize("{{someval}}\n\n\n{{someval}}"),
            "{{someval}}\n\n{{someval}}\n"
        );
    }

    #[test]
    fn test_finalize_treats_whitespace_lines_as_blank() {
        assert_eq!(finalize("a\n  \n\t\n\nb  \n"), "a\n\nb\n");
    }

    #[test]
    fn test_finalize_trims_document() {
        assert_eq!(finalize("\n\n  {{x}}  \n\n\n"), "{{x}}\n");
        assert_eq!(finalize(" \n \n"), "");
    }

    #[test]
    fn test_reset_indentation_keeps_string_literal_lines() {
        assert_eq!(
            reset_indentation("  <p>\n  {{t \"a\n  b\"}}\n  </p>"),
            "<p>\n{{t \"a\n  b\"}}\n</p>"
        );
    }

    #[test]
    fn test_reset_indentation_still_dedents_comments() {
        assert_eq!(
            reset_indentation("{{!--\n    note\n--}}"),
            "{{!--\nnote\n--}}"
        );
    }

    #[test]
    fn test_finalize_keeps_whitespace_inside_tags() {
        let source = "{{t \"a  \n\n\n\nb\"}}\n\n\n{{x}}";
        assert_eq!(finalize(source), "{{t \"a  \n\n\n\nb\"}}\n\n{{x}}\n");
    }
}
