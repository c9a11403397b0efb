//! Layout decisions for logic tags.
//!
//! The generic layout engine knows nothing about the template language, so
//! the language-specific choices are made here, from source spans alone,
//! and handed to the engine as a [`LayoutPlan`]: a side table indexed by
//! synthetic element number (document order of opening tags). The syntax
//! tree is never annotated.
//!
//! Rules:
//! - A tag with arguments breaks them one per line when the argument list
//!   already spanned several lines, or when the tag ends past `print_width`
//! - A block body is indented when the block spans several lines or ends
//!   past `print_width`; otherwise it stays inline as written
//! - An `{{else}}` branch decides on its own, from the else tag to the block end
//!
//! Spans are measured against the source, not the sanitized text the parser
//! saw: a [`SourceMap`] puts the replaced substrings back before columns are
//! compared with the width.

use std::ops::Range;

use crate::config::Config;
use crate::parser::ast::{Position, Span, Tag};

/// Layout of one synthetic element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Decision {
    /// Put every argument after the path on its own indented line.
    pub break_params: bool,
    /// Indent the element's body one level.
    pub indent_body: bool,
}

/// Decisions for every synthetic element of a document, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutPlan {
    decisions: Vec<Decision>,
}

impl LayoutPlan {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the decision for the next element; returns its index.
    pub fn push(&mut self, decision: Decision) -> usize {
        self.decisions.push(decision);
        self.decisions.len() - 1
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<Decision> {
        self.decisions.get(index).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }
}

/// Translates positions in prepared text into positions in the text it
/// was prepared from.
///
/// Each substitution is the byte range of a placeholder token in the
/// prepared text and the substring it replaced. Lines of the replaced
/// substring count as source lines, and a column after a substitution is
/// counted from the last newline of the replaced substring, if any.
#[derive(Debug, Clone, Default)]
pub struct SourceMap<'a> {
    text: &'a str,
    substitutions: Vec<(Range<usize>, &'a str)>,
}

impl<'a> SourceMap<'a> {
    /// A map for text that was not rewritten.
    #[must_use]
    pub fn identity() -> Self {
        Self::default()
    }

    /// `substitutions` must be sorted and must not overlap.
    #[must_use]
    pub fn new(text: &'a str, substitutions: Vec<(Range<usize>, &'a str)>) -> Self {
        Self {
            text,
            substitutions,
        }
    }

    #[must_use]
    pub fn position(&self, pos: Position) -> Position {
        if self.substitutions.is_empty() {
            return pos;
        }
        let before = self
            .substitutions
            .partition_point(|(range, _)| range.end <= pos.offset);
        let done = &self.substitutions[..before];

        let added: usize = done.iter().map(|(_, original)| original.len()).sum();
        let removed: usize = done.iter().map(|(range, _)| range.len()).sum();
        let extra_lines: usize = done
            .iter()
            .map(|(_, original)| original.matches('\n').count())
            .sum();

        let line_start = self.text[..pos.offset].rfind('\n').map_or(0, |i| i + 1);
        let mut column = 0;
        let mut cursor = line_start;
        for (range, original) in done.iter().filter(|(range, _)| range.start >= line_start) {
            column += self.text[cursor..range.start].chars().count();
            column = match original.rfind('\n') {
                Some(nl) => original[nl + 1..].chars().count(),
                None => column + original.chars().count(),
            };
            cursor = range.end;
        }
        column += self.text[cursor..pos.offset].chars().count();

        Position {
            offset: pos.offset - removed + added,
            line: pos.line + extra_lines,
            column,
        }
    }

    #[must_use]
    pub fn span(&self, span: &Span) -> Span {
        Span::new(self.position(span.start), self.position(span.end))
    }
}

/// The range ends past the configured width. A tag ending exactly at
/// `print_width` still fits.
fn exceeds_width(span: &Span, config: &Config) -> bool {
    span.end.column > config.print_width
}

/// Whether `tag`, found at source range `span`, breaks its arguments.
#[must_use]
pub fn break_params(tag: &Tag, span: &Span, config: &Config) -> bool {
    tag.has_args() && (tag.params_multiline || exceeds_width(span, config))
}

#[must_use]
pub fn indent_body(span: &Span, config: &Config) -> bool {
    span.is_multiline() || exceeds_width(span, config)
}

/// Self-closing output tags and partials.
#[must_use]
pub fn tag_decision(tag: &Tag, span: &Span, config: &Config) -> Decision {
    Decision {
        break_params: break_params(tag, span, config),
        indent_body: false,
    }
}

/// Blocks, partial blocks and decorator blocks. `open_span` covers the
/// opening tag, `span` the whole block.
#[must_use]
pub fn block_decision(open: &Tag, open_span: &Span, span: &Span, config: &Config) -> Decision {
    Decision {
        break_params: break_params(open, open_span, config),
        indent_body: indent_body(span, config),
    }
}

/// A plain `{{else}}` branch spanning `span`.
#[must_use]
pub fn else_decision(span: &Span, config: &Config) -> Decision {
    Decision {
        break_params: false,
        indent_body: indent_body(span, config),
    }
}
