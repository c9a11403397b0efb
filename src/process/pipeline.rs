//! Formatting pipeline
//!
//! One run over a document:
//! - Normalize line endings and reject reserved `hbs:` markup
//! - Split off front matter, which is laid out on its own and keeps its indentation
//! - Sanitize the body and reset its indentation
//! - Parse, lower, lay out and lift the logic tags
//! - Final whitespace pass, then rehydrate the sanitized regions

use std::borrow::Cow;
use std::io::{BufRead, Write};

use crate::config::Config;
use crate::error::{FormatError, SyntaxError};
use crate::format::lift::lift;
use crate::format::lower::{find_reserved, lower_mapped};
use crate::format::rules::SourceMap;
use crate::format::whitespace::{finalize, reset_indentation};
use crate::layout::{DocLayout, LayoutEngine};
use crate::parser::parse;
use crate::process::front_matter::{join_front_matter, split_front_matter, FENCE};
use crate::process::rehydrate::rehydrate;
use crate::process::sanitize::{sanitize_with, PlaceholderTable, Sanitized};

const LOG_TARGET: &str = "stencilfmt::pipeline";

/// Format a template with the built-in layout engine.
pub fn format_template(source: &str, config: &Config) -> Result<String, FormatError> {
    format_with_engine(source, config, &DocLayout::new(config))
}

/// Format a template with a caller-supplied layout engine.
pub fn format_with_engine<E: LayoutEngine + ?Sized>(
    source: &str,
    config: &Config,
    engine: &E,
) -> Result<String, FormatError> {
    let source = normalize_line_endings(source);
    if let Some(offset) = find_reserved(&source) {
        return Err(FormatError::ReservedMarkup { offset });
    }

    let table = PlaceholderTable::for_document(&source);
    let (laid_out, placeholders) = match split_front_matter(&source) {
        Some(front_matter) => {
            log::debug!(
                target: LOG_TARGET,
                "front matter: {} bytes",
                front_matter.content.len()
            );
            let content =
                layout_logic(front_matter.content, &SourceMap::identity(), config, engine)
                    .map_err(|err| locate(err, front_matter.content, &source, FENCE.len() + 1))?;
            let body_start = source.len() - front_matter.body.len();
            let sanitized = sanitize_with(front_matter.body, table);
            let body = layout_body(&sanitized, config, engine)
                .map_err(|err| locate(err, front_matter.body, &source, body_start))?;
            (join_front_matter(&content, &body), sanitized.placeholders)
        }
        None => {
            let sanitized = sanitize_with(&source, table);
            let body = layout_body(&sanitized, config, engine)
                .map_err(|err| locate(err, &source, &source, 0))?;
            (body, sanitized.placeholders)
        }
    };

    let finished = if config.preserve_newlines {
        laid_out
    } else {
        finalize(&laid_out)
    };
    rehydrate(&finished, &placeholders)
}

/// Layout of a sanitized body. Widths are measured with the placeholders
/// put back, against the de-indented lines.
fn layout_body<E: LayoutEngine + ?Sized>(
    sanitized: &Sanitized,
    config: &Config,
    engine: &E,
) -> Result<String, FormatError> {
    let prepared = reset_indentation(&sanitized.text);
    let map = SourceMap::new(&prepared, sanitized.placeholders.occurrences(&prepared));
    layout_logic(&prepared, &map, config, engine)
}

/// Logic-tag layout of prepared text: parse, lower, lay out, lift.
fn layout_logic<E: LayoutEngine + ?Sized>(
    text: &str,
    map: &SourceMap<'_>,
    config: &Config,
    engine: &E,
) -> Result<String, FormatError> {
    let program = parse(text)?;
    let lowered = lower_mapped(&program, config, map)?;
    log::debug!(
        target: LOG_TARGET,
        "{} top-level nodes, {} synthetic elements",
        program.body.len(),
        lowered.plan.len()
    );
    log::trace!(target: LOG_TARGET, "synthetic markup:\n{}", lowered.markup);
    let laid_out = engine.layout(&lowered.markup, &lowered.plan)?;
    log::trace!(target: LOG_TARGET, "laid out:\n{laid_out}");
    lift(&laid_out, config)
}

/// Re-report a syntax error against the untouched document.
///
/// Sanitizing and de-indenting move text around, so positions found in the
/// prepared text are only approximate. When `region` (which starts at byte
/// `start` of `document`) fails to parse as written, that error is reported
/// instead, shifted to document coordinates.
fn locate(err: FormatError, region: &str, document: &str, start: usize) -> FormatError {
    let FormatError::Syntax(prepared) = err else {
        return err;
    };
    match parse(region) {
        Err(found) => {
            let lines_before = document[..start].matches('\n').count();
            let mut position = found.position;
            position.offset += start;
            position.line += lines_before;
            FormatError::Syntax(SyntaxError {
                position,
                ..found
            })
        }
        Ok(_) => FormatError::Syntax(prepared),
    }
}

fn normalize_line_endings(source: &str) -> Cow<'_, str> {
    if source.contains('\r') {
        Cow::Owned(source.replace("\r\n", "\n"))
    } else {
        Cow::Borrowed(source)
    }
}

/// Format a whole file from a reader into a writer.
///
/// Errors are rendered against the source, with `filename` in the location line.
pub fn format_file<R: BufRead, W: Write>(
    mut input: R,
    output: &mut W,
    config: &Config,
    filename: &str,
) -> crate::Result<()> {
    let mut source = String::new();
    input.read_to_string(&mut source)?;
    let formatted = format_template(&source, config)
        .map_err(|err| anyhow::anyhow!(err.render(&source, filename)))?;
    output.write_all(formatted.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::format::rules::LayoutPlan;

    fn fmt(source: &str) -> String {
        format_template(source, &Config::default()).unwrap()
    }

    #[test]
    fn test_format_simple_tag_unchanged() {
        assert_eq!(fmt("{{test key=value}}"), "{{test key=value}}\n");
    }

    #[test]
    fn test_format_indents_block_body() {
        assert_eq!(
            fmt("{{#if true}}\n<div>\n{{> 'test'}}\n</div>\n{{/if}}"),
            "{{#if true}}\n    <div>\n    {{> \"test\"}}\n    </div>\n{{/if}}\n"
        );
    }

    #[test]
    fn test_format_crlf_input() {
        assert_eq!(
            fmt("{{#if a}}\r\n{{b}}\r\n{{/if}}\r\n"),
            "{{#if a}}\n    {{b}}\n{{/if}}\n"
        );
    }

    #[test]
    fn test_preserve_newlines_skips_final_pass() {
        let config = Config {
            preserve_newlines: true,
            ..Config::default()
        };
        assert_eq!(
            format_template("{{a}}\n\n\n\n{{b}}", &config).unwrap(),
            "{{a}}\n\n\n\n{{b}}"
        );
    }

    #[test]
    fn test_reserved_markup_is_rejected() {
        assert_eq!(
            format_template("<p><hbs:m _0=\"x\" /></p>", &Config::default()).unwrap_err(),
            FormatError::ReservedMarkup { offset: 3 }
        );
    }

    #[test]
    fn test_syntax_error_points_into_document() {
        let source = "<script>\nlet a = 1;\n</script>\n<p>\n  {{/each}}\n</p>";
        let err = format_template(source, &Config::default()).unwrap_err();
        let FormatError::Syntax(err) = err else {
            panic!("expected a syntax error");
        };
        assert_eq!(err.position.line, 5);
        assert_eq!(err.position.column, 2);
    }

    #[test]
    fn test_syntax_error_in_body_after_front_matter() {
        let source = "---\na: 1\n---\n{{#if a}}";
        let FormatError::Syntax(err) = format_template(source, &Config::default()).unwrap_err()
        else {
            panic!("expected a syntax error");
        };
        assert_eq!(err.position.line, 4);
        assert_eq!(err.position.offset, 13);
    }

    #[test]
    fn test_width_counts_attribute_tags_as_written() {
        // The tag ends at column 70 in the source
        let source = format!("<a href=\"{{{{u}}}}\">{{{{t k={}}}}}</a>\n", "v".repeat(46));
        assert_eq!(fmt(&source), source);
    }

    #[test]
    fn test_width_counts_long_attribute_tags() {
        // The attribute tag is longer than its placeholder; the tag ends at column 81
        let attr = format!("{{{{u {}}}}}", "x".repeat(22));
        let source = format!("<a href=\"{attr}\">{{{{t k={}}}}}</a>", "v".repeat(34));
        assert_eq!(
            fmt(&source),
            format!("<a href=\"{attr}\">{{{{t\n    k={}}}}}</a>\n", "v".repeat(34))
        );
    }

    #[test]
    fn test_multiline_string_literal_keeps_its_value() {
        assert_eq!(
            fmt("{{#if a}}\n{{t \"line1\nline2\"}}\n{{/if}}"),
            "{{#if a}}\n    {{t \"line1\nline2\"}}\n{{/if}}\n"
        );
        let indented = "{{#if a}}\n    {{t \"a\n  b\"}}\n{{/if}}\n";
        assert_eq!(fmt(indented), indented);
    }

    struct Passthrough;

    impl LayoutEngine for Passthrough {
        fn layout(&self, markup: &str, _plan: &LayoutPlan) -> Result<String, FormatError> {
            Ok(markup.to_string())
        }
    }

    #[test]
    fn test_custom_engine() {
        let out = format_with_engine("{{#if a}}\n  {{x}}\n{{/if}}", &Config::default(), &Passthrough)
            .unwrap();
        assert_eq!(out, "{{#if a}}\n{{x}}\n{{/if}}\n");
    }

    #[test]
    fn test_format_file() {
        let mut output = Vec::new();
        format_file(
            Cursor::new("{{> 'card' title=t}}"),
            &mut output,
            &Config::default(),
            "card.hbs",
        )
        .unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "{{> \"card\" title=t}}\n");
    }

    #[test]
    fn test_format_file_renders_errors() {
        let mut output = Vec::new();
        let err = format_file(
            Cursor::new("<p>{{#if a}}</p>"),
            &mut output,
            &Config::default(),
            "page.html",
        )
        .unwrap_err();
        assert!(err.to_string().contains("--> page.html:1:4"));
        assert!(output.is_empty());
    }
}
