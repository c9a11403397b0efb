/// Regex patterns for template syntax
///
/// All patterns are compiled once on first use with `LazyLock`.
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

/// Build a regex from a compile-time constant pattern.
///
/// # Panics
///
/// Panics if the pattern is invalid. This is acceptable because all patterns
/// in this module are compile-time constants that are verified by tests.
/// The panic occurs at first access of the `LazyLock` static.
fn build_re(pattern: &str, case_insensitive: bool) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .unicode(true)
        .build()
        .unwrap_or_else(|_| panic!("Invalid regex pattern: {pattern}"))
}

// ===== LOGIC TAGS =====

/// Closing delimiter of a long comment: `--}}` or `--~}}`
pub static LONG_COMMENT_END_RE: LazyLock<Regex> =
    LazyLock::new(|| build_re(r"--(~?)\}\}", false));

/// Closing delimiter of a short comment: `}}` or `~}}`
pub static SHORT_COMMENT_END_RE: LazyLock<Regex> =
    LazyLock::new(|| build_re(r"(~?)\}\}", false));

/// `{{else}}` / `{{else if cond}}` interior
pub static ELSE_RE: LazyLock<Regex> =
    LazyLock::new(|| build_re(r"(?s)^\s*else(?:\s+(.*))?\s*$", false));

/// Number literal as accepted by the logic language
pub static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| build_re(r"^-?[0-9]+(?:\.[0-9]+)?$", false));

// ===== MARKUP =====

/// Markup start tag opening at the beginning of the haystack: `<` and the element name
pub static START_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| build_re(r"^<([a-zA-Z][a-zA-Z0-9:._-]*)", false));

/// Elements whose body is raw text that must not be touched
pub static RAW_TEXT_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| build_re(r"^(?:script|style|pre|textarea)$", true));

// ===== SYNTHETIC MARKUP =====

/// Open, close or self-closing synthetic tag.
///
/// Captures: 1 = `/` for a close tag, 2 = element name, 3 = attribute list,
/// 4 = `/` for a self-closing tag.
pub static SYNTHETIC_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    build_re(
        r#"<(/?)hbs:([A-Za-z]+)((?:\s+[^\s=/>]+="[^"]*")*)\s*(/?)>"#,
        false,
    )
});

/// One attribute with the whitespace in front of it.
///
/// Captures: 1 = leading whitespace, 2 = name, 3 = encoded value.
pub static ATTRIBUTE_RE: LazyLock<Regex> =
    LazyLock::new(|| build_re(r#"(\s+)([^\s=/>]+)="([^"]*)""#, false));

// ===== WHITESPACE =====

/// Three or more consecutive newlines
pub static BLANK_RUN_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"\n{3,}", false));
