//! Integration tests for stencilfmt
//!
//! These tests run whole documents through the public pipeline and check the
//! formatted text, the way a template author would see it.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use std::io::Cursor;

use stencilfmt::format::LayoutPlan;
use stencilfmt::layout::LayoutEngine;
use stencilfmt::{format_file, format_template, format_with_engine, Config, FormatError};

fn fmt(source: &str) -> String {
    format_template(source, &Config::default())
        .unwrap_or_else(|e| panic!("formatting failed for {source:?}: {e}"))
}

fn fmt_with(source: &str, config: &Config) -> String {
    format_template(source, config)
        .unwrap_or_else(|e| panic!("formatting failed for {source:?}: {e}"))
}

// ============================================================================
// Tags
// ============================================================================

#[test]
fn test_simple_hash_is_unchanged() {
    assert_eq!(fmt("{{test key=value}}"), "{{test key=value}}\n");
}

#[test]
fn test_extra_spaces_are_removed() {
    assert_eq!(
        fmt("{{test  \"somevalue\"  key=value}}\n\n"),
        "{{test \"somevalue\" key=value}}\n"
    );
    assert_eq!(fmt("{{>   \"test\"}}"), "{{> \"test\"}}\n");
}

#[test]
fn test_literals_and_paths() {
    assert_eq!(fmt("{{test}}"), "{{test}}\n");
    assert_eq!(fmt("{{\"test\"}}"), "{{\"test\"}}\n");
    assert_eq!(fmt("{{test true}}"), "{{test true}}\n");
    assert_eq!(fmt("{{test 1.5 null undefined}}"), "{{test 1.5 null undefined}}\n");
    assert_eq!(fmt("{{test \"somevalue\"}}"), "{{test \"somevalue\"}}\n");
}

#[test]
fn test_triple_mustache() {
    assert_eq!(
        fmt("{{{test \"somevalue\"}}}"),
        "{{{test \"somevalue\"}}}\n"
    );
}

#[test]
fn test_long_hash_breaks_one_pair_per_line() {
    let source = "{{test key1=value1 key2=value2 key3=value3 key4=value4 key5=value5 \
                  key6=value6 key7=value7 key8=value8 key9=value9 key10=value10}}";
    let expected = "{{test
    key1=value1
    key2=value2
    key3=value3
    key4=value4
    key5=value5
    key6=value6
    key7=value7
    key8=value8
    key9=value9
    key10=value10}}
";
    assert_eq!(fmt(source), expected);
}

#[test]
fn test_width_threshold() {
    let exact = format!("{{{{test key={}}}}}", "v".repeat(67));
    assert_eq!(exact.chars().count(), 80);
    assert_eq!(fmt(&exact), format!("{exact}\n"));

    let over = format!("{{{{test key={}}}}}", "v".repeat(68));
    assert_eq!(
        fmt(&over),
        format!("{{{{test\n    key={}}}}}\n", "v".repeat(68))
    );
}

#[test]
fn test_wider_print_width_keeps_tag_inline() {
    let over = format!("{{{{test key={}}}}}", "v".repeat(68));
    let config = Config {
        print_width: 100,
        ..Config::default()
    };
    assert_eq!(fmt_with(&over, &config), format!("{over}\n"));
}

#[test]
fn test_multiline_arguments_stay_broken() {
    assert_eq!(
        fmt("{{card title=t\n  size=\"large\"}}"),
        "{{card\n    title=t\n    size=\"large\"}}\n"
    );
}

#[test]
fn test_width_threshold_after_attribute_logic() {
    // `<a href="{{url}}">` is 18 columns; the tag ends at column 80
    let exact = format!("<a href=\"{{{{url}}}}\">{{{{t key={}}}}}</a>\n", "v".repeat(52));
    assert_eq!(fmt(&exact), exact);

    let over = format!("<a href=\"{{{{url}}}}\">{{{{t key={}}}}}</a>", "v".repeat(53));
    assert_eq!(
        fmt(&over),
        format!(
            "<a href=\"{{{{url}}}}\">{{{{t\n    key={}}}}}</a>\n",
            "v".repeat(53)
        )
    );
}

// ============================================================================
// Quotes and escaping
// ============================================================================

#[test]
fn test_partial_quotes_are_normalized() {
    assert_eq!(fmt("{{> 'test'}}"), "{{> \"test\"}}\n");
}

#[test]
fn test_single_quote_option() {
    let config = Config {
        single_quote: true,
        ..Config::default()
    };
    assert_eq!(fmt_with("{{> \"test\"}}", &config), "{{> 'test'}}\n");
    assert_eq!(
        fmt_with("{{t \"a \\\"b\\\" c\" k=\"it's\"}}", &config),
        "{{t 'a \"b\" c' k='it\\'s'}}\n"
    );
}

#[test]
fn test_escaped_quotes_survive() {
    assert_eq!(
        fmt("{{test \"some\\\"value\"}}"),
        "{{test \"some\\\"value\"}}\n"
    );
    assert_eq!(
        fmt("{{test key=\"some\\\"value\"}}"),
        "{{test key=\"some\\\"value\"}}\n"
    );
    assert_eq!(fmt("{{t k='it\\'s'}}"), "{{t k=\"it's\"}}\n");
}

#[test]
fn test_entities_in_strings_are_kept() {
    assert_eq!(
        fmt("{{t \"&quot; &amp; &lt;\"}}"),
        "{{t \"&quot; &amp; &lt;\"}}\n"
    );
}

#[test]
fn test_multiline_string_literal_is_not_reindented() {
    let source = "<div>\n{{#each items}}\n    {{t \"first\n  second\" k=v}}\n{{/each}}\n</div>\n";
    assert_eq!(fmt(source), source);

    assert_eq!(
        fmt("{{#if a}}\n{{#if b}}\n{{t \"a\n  b\"}}\n{{/if}}\n{{/if}}"),
        "{{#if a}}\n    {{#if b}}\n        {{t \"a\n  b\"}}\n    {{/if}}\n{{/if}}\n"
    );
}

#[test]
fn test_sub_expressions_use_canonical_quote() {
    assert_eq!(
        fmt("{{t (concat 'a' \"b\") key=(lang 'x')}}"),
        "{{t (concat \"a\" \"b\") key=(lang \"x\")}}\n"
    );
}

// ============================================================================
// Blocks
// ============================================================================

#[test]
fn test_inline_block_is_unchanged() {
    assert_eq!(
        fmt("{{#if true}}{{add 1 2}}{{/if}}"),
        "{{#if true}}{{add 1 2}}{{/if}}\n"
    );
}

#[test]
fn test_multiline_block_indents_body() {
    assert_eq!(
        fmt("{{#if true}}\n{{add 1 2}}{{/if}}"),
        "{{#if true}}\n    {{add 1 2}}\n{{/if}}\n"
    );
}

#[test]
fn test_block_indentation_with_markup() {
    let source = "{{#if true}}\n<div>\n{{> 'test'}}\n</div>\n{{/if}}";
    let expected = "{{#if true}}
    <div>
    {{> \"test\"}}
    </div>
{{/if}}
";
    assert_eq!(fmt(source), expected);
}

#[test]
fn test_nested_blocks_and_block_params() {
    let source = "  {{#each items as |item|}}
  <li>
      {{#if item.active}}
  <b>{{item.name}}</b>
    {{/if}}
  </li>
{{/each}}";
    let expected = "{{#each items as |item|}}
    <li>
    {{#if item.active}}
        <b>{{item.name}}</b>
    {{/if}}
    </li>
{{/each}}
";
    assert_eq!(fmt(source), expected);
}

#[test]
fn test_inverse_section() {
    assert_eq!(
        fmt("{{#if true}}\n{{else}}\n{{/if}}"),
        "{{#if true}}\n{{else}}\n{{/if}}\n"
    );
    assert_eq!(
        fmt("{{#if a}}\nyes\n{{else}}\nno\n{{/if}}"),
        "{{#if a}}\n    yes\n{{else}}\n    no\n{{/if}}\n"
    );
}

#[test]
fn test_block_with_hash() {
    assert_eq!(
        fmt("{{#if true key=value}}\n{{/if}}"),
        "{{#if true key=value}}\n{{/if}}\n"
    );
}

#[test]
fn test_else_if_chain() {
    let source = "{{#if a}}\nA\n{{else if b}}\nB\n{{else}}\nC\n{{/if}}";
    let expected = "{{#if a}}
    A
{{else if b}}
    B
{{else}}
    C
{{/if}}
";
    assert_eq!(fmt(source), expected);
}

#[test]
fn test_strip_markers_are_kept() {
    assert_eq!(
        fmt("{{~#if a~}}\n{{b}}\n{{~/if~}}"),
        "{{~#if a~}}\n    {{b}}\n{{~/if~}}\n"
    );
    assert_eq!(fmt("{{~{body}~}}"), "{{~{body}~}}\n");
}

#[test]
fn test_inverted_block() {
    assert_eq!(fmt("{{^if a}}x{{/if}}"), "{{^if a}}x{{/if}}\n");
}

#[test]
fn test_partial_and_decorator_blocks() {
    assert_eq!(
        fmt("{{#> layout title='Home'}}\n<main></main>\n{{/layout}}"),
        "{{#> layout title=\"Home\"}}\n    <main></main>\n{{/layout}}\n"
    );
    assert_eq!(
        fmt("{{#*inline \"card\"}}\n<div></div>\n{{/inline}}"),
        "{{#*inline \"card\"}}\n    <div></div>\n{{/inline}}\n"
    );
}

// ============================================================================
// Comments
// ============================================================================

#[test]
fn test_comments() {
    assert_eq!(fmt("{{!-- comment --}}"), "{{!-- comment --}}\n");
    assert_eq!(fmt("{{! short }}"), "{{! short }}\n");
    assert_eq!(
        fmt("{{#if a}}\n{{!-- note --}}\n{{/if}}"),
        "{{#if a}}\n    {{!-- note --}}\n{{/if}}\n"
    );
}

// ============================================================================
// Whitespace and options
// ============================================================================

#[test]
fn test_blank_lines_collapse() {
    assert_eq!(
        fmt("{{someval}}\n\n\n{{someval}}"),
        "{{someval}}\n\n{{someval}}\n"
    );
    assert_eq!(fmt("{{a}}\n\n\n\n\n{{b}}  \n"), "{{a}}\n\n{{b}}\n");
}

#[test]
fn test_preserve_newlines() {
    let config = Config {
        preserve_newlines: true,
        ..Config::default()
    };
    assert_eq!(
        fmt_with("{{a}}  \n\n\n\n{{b}}", &config),
        "{{a}}  \n\n\n\n{{b}}"
    );
}

#[test]
fn test_indent_options() {
    let source = "{{#if a}}\n{{b}}\n{{/if}}";
    let tabs = Config {
        use_tabs: true,
        ..Config::default()
    };
    assert_eq!(fmt_with(source, &tabs), "{{#if a}}\n\t{{b}}\n{{/if}}\n");
    let narrow = Config {
        tab_width: 2,
        ..Config::default()
    };
    assert_eq!(fmt_with(source, &narrow), "{{#if a}}\n  {{b}}\n{{/if}}\n");
}

#[test]
fn test_empty_document() {
    assert_eq!(fmt(""), "");
    assert_eq!(fmt("\n\n  \n"), "");
}

// ============================================================================
// Front matter
// ============================================================================

#[test]
fn test_front_matter_keeps_indentation() {
    let source = "---
products:
    new:
        limit: {{theme_settings.homepage_new_products_count}}
    featured:
        limit: {{theme_settings.homepage_featured_products_count}}
carousel: {{theme_settings.homepage_show_carousel}}
blog:
    recent_posts:
        limit: {{theme_settings.homepage_blog_posts_count}}
---
{{#partial \"hero\"}}

{{/partial}}";
    assert_eq!(fmt(source), format!("{source}\n"));
}

#[test]
fn test_front_matter_tags_are_formatted() {
    assert_eq!(
        fmt("---\ntitle: {{lang  'home'}}\n---\n  <h1>{{title}}</h1>"),
        "---\ntitle: {{lang \"home\"}}\n---\n<h1>{{title}}</h1>\n"
    );
}

// ============================================================================
// Protected regions
// ============================================================================

#[test]
fn test_script_and_attribute_logic_are_untouched() {
    let source = "<div class=\"{{#if a}}on{{/if}}\">
<script>
  if (a < b) { render('{{x}}'); }
</script>
</div>";
    assert_eq!(fmt(source), format!("{source}\n"));
}

#[test]
fn test_script_inside_indented_block() {
    let source = "{{#if a}}\n<script>\n  var x = 1;\n</script>\n{{/if}}";
    assert_eq!(
        fmt(source),
        "{{#if a}}\n    <script>\n  var x = 1;\n</script>\n{{/if}}\n"
    );
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn test_formatting_is_idempotent() {
    let sources = [
        "{{test key1=value1 key2=value2 key3=value3 key4=value4 key5=value5 key6=value6 key7=value7 key8=value8}}",
        "{{#if a}}\nA\n{{else if b}}\nB\n{{else}}\nC\n{{/if}}",
        "{{#each items as |item|}}\n<li>{{item}}</li>\n{{/each}}",
        "{{#if a}}\n{{!--\n  long\n  note\n--}}\n{{/if}}",
        "<p>{{t 'x' (sub \"y\")}}</p>\n\n\n<p>{{~> card~}}</p>",
        "---\nmeta:\n    a: {{x}}\n---\n{{#> layout}}\n<main></main>\n{{/layout}}",
    ];
    for source in sources {
        let once = fmt(source);
        let twice = fmt(&once);
        assert_eq!(once, twice, "not idempotent for {source:?}");
    }
}

#[test]
fn test_formatted_output_is_a_fixed_point() {
    let canonical = "<ul>\n{{#each products}}\n    <li>{{name}}</li>\n{{/each}}\n</ul>\n";
    assert_eq!(fmt(canonical), canonical);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_unclosed_block_is_syntax_error() {
    let err = format_template("<p>{{#if a}}</p>", &Config::default()).unwrap_err();
    let FormatError::Syntax(err) = err else {
        panic!("expected a syntax error, got {err:?}");
    };
    assert_eq!(err.position.line, 1);
    assert_eq!(err.position.column, 3);
}

#[test]
fn test_mismatched_close_is_syntax_error() {
    assert!(matches!(
        format_template("{{#if a}}{{/each}}", &Config::default()),
        Err(FormatError::Syntax(_))
    ));
}

#[test]
fn test_reserved_markup_is_rejected() {
    assert_eq!(
        format_template("<div>\n</hbs:m>\n</div>", &Config::default()).unwrap_err(),
        FormatError::ReservedMarkup { offset: 6 }
    );
}

struct Dropping;

impl LayoutEngine for Dropping {
    fn layout(&self, _markup: &str, _plan: &LayoutPlan) -> Result<String, FormatError> {
        Ok(String::new())
    }
}

#[test]
fn test_lost_placeholder_is_reported() {
    let err = format_with_engine("<script>var a;</script>", &Config::default(), &Dropping)
        .unwrap_err();
    assert_eq!(err, FormatError::PlaceholderMissing { index: 0 });
}

#[test]
fn test_format_file_round_trip() {
    let mut output = Vec::new();
    format_file(
        Cursor::new("{{#if a}}\r\n{{b}}\r\n{{/if}}\r\n"),
        &mut output,
        &Config::default(),
        "page.html",
    )
    .unwrap();
    assert_eq!(
        String::from_utf8(output).unwrap(),
        "{{#if a}}\n    {{b}}\n{{/if}}\n"
    );
}
