//! Lowering the syntax tree into synthetic markup.
//!
//! Every logic construct becomes an element in the reserved `hbs:`
//! namespace so the markup layout engine can treat tags and blocks like
//! ordinary elements:
//!
//! | Construct              | Element                    |
//! |------------------------|----------------------------|
//! | `{{x}}`                | `<hbs:m _0="x" />`         |
//! | `{{{x}}}`              | `<hbs:r _0="x" />`         |
//! | `{{> x}}`              | `<hbs:p _0="x" />`         |
//! | `{{!-- x --}}`         | `<hbs:c> x </hbs:c>`       |
//! | `{{#x}}…{{/x}}`        | `<hbs:b _0="x">…</hbs:b>`  |
//! | `{{else}}…`            | `<hbs:e>…</hbs:e>`         |
//! | `{{#> x}}…{{/x}}`      | `<hbs:pb _0="x">…</hbs:pb>`|
//! | `{{#*x}}…{{/x}}`       | `<hbs:db _0="x">…</hbs:db>`|
//!
//! Argument attributes: `_N` holds positional argument `N` (slot 0 is the
//! path) and `_key` a hash value, both already in canonical text. A
//! string literal uses a doubled underscore (`__N`, `__key`) and holds the
//! raw string value. Flags (`s`, `sc`, `i`, `ch`, `f`) record strip
//! markers, inversion, else-if chains and the short comment form.

use std::fmt::Write;

use crate::config::Config;
use crate::error::FormatError;
use crate::format::lift::quote_string;
use crate::format::rules::{self, Decision, LayoutPlan, SourceMap};
use crate::parser::ast::{Block, Call, CommentForm, ContainerBlock, Expr, Inverse, Literal, Node, Program, Strip, Tag};

/// Namespace prefix shared by every synthetic element.
pub const RESERVED_PREFIX: &str = "hbs:";

/// Synthetic markup for a document plus the layout plan for its elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lowered {
    pub markup: String,
    pub plan: LayoutPlan,
}

/// Lower a parsed program.
///
/// Fails when content or a comment already contains `hbs:` markup, which
/// could not be told apart from the synthetic elements.
pub fn lower(program: &Program, config: &Config) -> Result<Lowered, FormatError> {
    lower_mapped(program, config, &SourceMap::identity())
}

/// Lower a program parsed from rewritten text; layout decisions measure
/// spans through `map`.
pub fn lower_mapped(
    program: &Program,
    config: &Config,
    map: &SourceMap<'_>,
) -> Result<Lowered, FormatError> {
    let mut lowerer = Lowerer {
        config,
        map,
        out: String::new(),
        plan: LayoutPlan::new(),
    };
    lowerer.program(program)?;
    log::trace!(
        target: "stencilfmt::lower",
        "lowered {} nodes into {} elements",
        program.body.len(),
        lowerer.plan.len()
    );
    Ok(Lowered {
        markup: lowerer.out,
        plan: lowerer.plan,
    })
}

/// Byte offset of the first reserved open or close tag in `text`.
#[must_use]
pub fn find_reserved(text: &str) -> Option<usize> {
    let open = text.find("<hbs:");
    let close = text.find("</hbs:");
    match (open, close) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Escape an attribute value: `&` first, then `"`.
#[must_use]
pub fn encode_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

/// Canonical text of an expression, with string literals in `quote`.
#[must_use]
pub fn render_expr(expr: &Expr, quote: char) -> String {
    match expr {
        Expr::Path(path) => path.clone(),
        Expr::Literal(literal) => match literal {
            Literal::String(s) => quote_string(s, quote),
            Literal::Number(n) => n.clone(),
            Literal::Boolean(b) => b.to_string(),
            Literal::Undefined => "undefined".to_string(),
            Literal::Null => "null".to_string(),
        },
        Expr::SubExpression(call) => format!("({})", render_call(call, quote)),
    }
}

/// Flatten a call into `(name, value)` attribute pairs.
///
/// The path takes slot `first_slot` and positional parameters the slots
/// after it; hash pairs keep their key. Values are not yet entity-encoded.
#[must_use]
pub fn encode_call(call: &Call, first_slot: usize, quote: char) -> Vec<(String, String)> {
    let positional = std::iter::once(&call.path)
        .chain(&call.params)
        .enumerate()
        .map(|(i, expr)| ((first_slot + i).to_string(), expr));
    let hash = call.hash.pairs.iter().map(|pair| (pair.key.clone(), &pair.value));
    positional
        .chain(hash)
        .map(|(key, expr)| match expr {
            Expr::Literal(Literal::String(value)) => (format!("__{key}"), value.clone()),
            _ => (format!("_{key}"), render_expr(expr, quote)),
        })
        .collect()
}

fn render_call(call: &Call, quote: char) -> String {
    let mut parts = vec![render_expr(&call.path, quote)];
    parts.extend(call.params.iter().map(|p| render_expr(p, quote)));
    parts.extend(
        call.hash
            .pairs
            .iter()
            .map(|pair| format!("{}={}", pair.key, render_expr(&pair.value, quote))),
    );
    parts.join(" ")
}

struct Lowerer<'a> {
    config: &'a Config,
    map: &'a SourceMap<'a>,
    out: String,
    plan: LayoutPlan,
}

impl Lowerer<'_> {
    fn program(&mut self, program: &Program) -> Result<(), FormatError> {
        for node in &program.body {
            self.node(node)?;
        }
        Ok(())
    }

    fn node(&mut self, node: &Node) -> Result<(), FormatError> {
        match node {
            Node::Content(content) => {
                if let Some(at) = find_reserved(&content.text) {
                    return Err(FormatError::ReservedMarkup {
                        offset: content.span.start.offset + at,
                    });
                }
                self.out.push_str(&content.text);
            }
            Node::Mustache(tag) => self.leaf("m", tag),
            Node::RawMustache(tag) => self.leaf("r", tag),
            Node::Partial(tag) => self.leaf("p", tag),
            Node::Comment(comment) => {
                if let Some(at) = find_reserved(&comment.value) {
                    return Err(FormatError::ReservedMarkup {
                        offset: comment.span.start.offset + at,
                    });
                }
                self.plan.push(Decision::default());
                self.out.push_str("<hbs:c");
                if comment.form == CommentForm::Short {
                    self.attr("f", "short");
                }
                self.strip_flag("s", comment.strip);
                self.out.push('>');
                self.out.push_str(&comment.value);
                self.out.push_str("</hbs:c>");
            }
            Node::Block(block) => self.block(block)?,
            Node::PartialBlock(container) => self.container("pb", container)?,
            Node::DecoratorBlock(container) => self.container("db", container)?,
        }
        Ok(())
    }

    fn leaf(&mut self, name: &str, tag: &Tag) {
        let span = self.map.span(&tag.span);
        self.plan.push(rules::tag_decision(tag, &span, self.config));
        self.out.push_str("<hbs:");
        self.out.push_str(name);
        self.strip_flag("s", tag.strip);
        self.tag_attrs(tag);
        self.out.push_str(" />");
    }

    fn block(&mut self, block: &Block) -> Result<(), FormatError> {
        self.plan.push(rules::block_decision(
            &block.open,
            &self.map.span(&block.open.span),
            &self.map.span(&block.span),
            self.config,
        ));
        self.out.push_str("<hbs:b");
        self.strip_flag("s", block.open.strip);
        if let Some(close) = &block.close {
            self.strip_flag("sc", close.strip);
        }
        if block.inverted {
            self.attr("i", "1");
        }
        self.tag_attrs(&block.open);
        self.out.push('>');
        self.program(&block.program)?;

        match &block.inverse {
            Some(Inverse::Else { tag, program, span }) => {
                self.plan
                    .push(rules::else_decision(&self.map.span(span), self.config));
                self.out.push_str("<hbs:e");
                self.strip_flag("s", tag.strip);
                self.out.push('>');
                self.program(program)?;
                self.out.push_str("</hbs:e>");
            }
            Some(Inverse::Chained(chained)) => {
                self.plan.push(Decision::default());
                self.out.push_str("<hbs:e");
                self.attr("ch", "1");
                self.out.push('>');
                self.block(chained)?;
                self.out.push_str("</hbs:e>");
            }
            None => {}
        }

        self.out.push_str("</hbs:b>");
        Ok(())
    }

    fn container(&mut self, name: &str, container: &ContainerBlock) -> Result<(), FormatError> {
        self.plan.push(rules::block_decision(
            &container.open,
            &self.map.span(&container.open.span),
            &self.map.span(&container.span),
            self.config,
        ));
        let _ = write!(self.out, "<hbs:{name}");
        self.strip_flag("s", container.open.strip);
        self.strip_flag("sc", container.close.strip);
        self.tag_attrs(&container.open);
        self.out.push('>');
        self.program(&container.program)?;
        let _ = write!(self.out, "</hbs:{name}>");
        Ok(())
    }

    fn tag_attrs(&mut self, tag: &Tag) {
        for (name, value) in encode_call(&tag.call, 0, self.config.quote_char()) {
            self.attr(&name, &value);
        }
        if !tag.block_params.is_empty() {
            self.attr("bp", &tag.block_params.join(" "));
        }
    }

    fn strip_flag(&mut self, name: &str, strip: Strip) {
        if !strip.is_empty() {
            self.attr(name, strip.code());
        }
    }

    fn attr(&mut self, name: &str, value: &str) {
        let _ = write!(self.out, " {name}=\"{}\"", encode_attribute(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn lower_str(source: &str) -> Lowered {
        lower(&parse(source).unwrap(), &Config::default()).unwrap()
    }

    #[test]
    fn test_lowers_mustache_with_arguments() {
        let lowered = lower_str("<p>{{test 'a' 1 key=value}}</p>");
        assert_eq!(
            lowered.markup,
            "<p><hbs:m _0=\"test\" __1=\"a\" _2=\"1\" _key=\"value\" /></p>"
        );
        assert_eq!(lowered.plan.len(), 1);
    }

    #[test]
    fn test_lowers_block_with_else() {
        let lowered = lower_str("{{#if a}}x{{else}}y{{/if}}");
        assert_eq!(
            lowered.markup,
            "<hbs:b _0=\"if\" _1=\"a\">x<hbs:e>y</hbs:e></hbs:b>"
        );
        assert_eq!(lowered.plan.len(), 2);
    }

    #[test]
    fn test_lowers_chained_else() {
        let lowered = lower_str("{{#if a}}x{{else if b}}y{{/if}}");
        assert_eq!(
            lowered.markup,
            "<hbs:b _0=\"if\" _1=\"a\">x<hbs:e ch=\"1\"><hbs:b _0=\"if\" _1=\"b\">y</hbs:b></hbs:e></hbs:b>"
        );
        assert_eq!(lowered.plan.len(), 3);
    }

    #[test]
    fn test_lowers_flags_before_arguments() {
        let lowered = lower_str("{{~^each items as |item|~}}{{/each~}}");
        assert_eq!(
            lowered.markup,
            "<hbs:b s=\"oc\" sc=\"c\" i=\"1\" _0=\"each\" _1=\"items\" bp=\"item\"></hbs:b>"
        );
    }

    #[test]
    fn test_lowers_comments() {
        assert_eq!(
            lower_str("{{!-- note --}}{{! short }}").markup,
            "<hbs:c> note </hbs:c><hbs:c f=\"short\"> short </hbs:c>"
        );
    }

    #[test]
    fn test_encodes_attribute_values() {
        let lowered = lower_str("{{test \"a \\\"b\\\" & c\"}}");
        assert_eq!(
            lowered.markup,
            "<hbs:m _0=\"test\" __1=\"a &quot;b&quot; &amp; c\" />"
        );
    }

    #[test]
    fn test_sub_expression_uses_canonical_quote() {
        let lowered = lower_str("{{t (concat 'a' b)}}");
        assert_eq!(
            lowered.markup,
            "<hbs:m _0=\"t\" _1=\"(concat &quot;a&quot; b)\" />"
        );
    }

    #[test]
    fn test_partial_and_containers() {
        let lowered = lower_str("{{> card}}{{#> layout}}x{{/layout}}{{#*inline \"n\"}}y{{/inline}}");
        assert_eq!(
            lowered.markup,
            "<hbs:p _0=\"card\" /><hbs:pb _0=\"layout\">x</hbs:pb><hbs:db _0=\"inline\" __1=\"n\">y</hbs:db>"
        );
    }

    #[test]
    fn test_rejects_reserved_markup_in_content() {
        let err = lower(&parse("ab<hbs:m />").unwrap(), &Config::default()).unwrap_err();
        assert_eq!(err, FormatError::ReservedMarkup { offset: 2 });
    }

    #[test]
    fn test_encode_call_from_slot() {
        let program = parse("{{t 'a' x k=\"v\"}}").unwrap();
        let Node::Mustache(tag) = &program.body[0] else {
            panic!("expected a mustache");
        };
        let pairs = |slot| {
            encode_call(&tag.call, slot, '"')
                .into_iter()
                .map(|(name, _)| name)
                .collect::<Vec<_>>()
        };
        assert_eq!(pairs(0), vec!["_0", "__1", "_2", "__k"]);
        assert_eq!(pairs(1), vec!["_1", "__2", "_3", "__k"]);
        assert_eq!(encode_call(&tag.call, 0, '"')[1].1, "a");
    }

    #[test]
    fn test_mapped_spans_decide_width() {
        let token = "__stencilfmt_ph_0__";
        let prepared = format!("<a href=\"{token}\">{{{{t k={}}}}}</a>", "v".repeat(46));
        let program = parse(&prepared).unwrap();
        let config = Config::default();
        // Measured on the placeholder, the tag ends past column 80
        assert!(lower(&program, &config).unwrap().plan.get(0).unwrap().break_params);

        let map = SourceMap::new(&prepared, vec![(9..9 + token.len(), "{{u}}")]);
        let lowered = lower_mapped(&program, &config, &map).unwrap();
        assert!(!lowered.plan.get(0).unwrap().break_params);
    }

    #[test]
    fn test_render_expr() {
        assert_eq!(render_expr(&Expr::Literal(Literal::String("it's".into())), '\''), "'it\\'s'");
        assert_eq!(render_expr(&Expr::Literal(Literal::Null), '"'), "null");
    }
}
