//! Synthetic markup tree to [`Doc`].
//!
//! - Opening tags are groups: flags stay next to the element name, the
//!   first argument too, and every further argument sits behind a soft line
//!   one level deeper. The plan decides whether the group breaks.
//! - Container bodies are either kept inline as written or indented one
//!   level on lines of their own.
//! - Text is reproduced verbatim; indentation is added by the renderer.
//!   Attribute values are written as [`Doc::Verbatim`], so a string literal
//!   spanning lines is never re-indented.

use crate::format::rules::LayoutPlan;
use crate::layout::doc::{Doc, GroupMode};
use crate::layout::markup::{Element, ElementKind, MarkupNode};

/// Build the document for a synthetic markup tree.
///
/// Elements without a plan entry fit their arguments to the width and keep
/// their body inline.
#[must_use]
pub fn print(nodes: &[MarkupNode], plan: &LayoutPlan) -> Doc {
    Printer { plan }.nodes(nodes)
}

struct Printer<'a> {
    plan: &'a LayoutPlan,
}

impl Printer<'_> {
    fn nodes(&self, nodes: &[MarkupNode]) -> Doc {
        Doc::concat(nodes.iter().map(|node| self.node(node)).collect())
    }

    fn node(&self, node: &MarkupNode) -> Doc {
        match node {
            MarkupNode::Text(text) => Doc::text(text.as_str()),
            MarkupNode::Element(element) => self.element(element),
        }
    }

    fn element(&self, element: &Element) -> Doc {
        let name = element.kind.name();
        match element.kind {
            ElementKind::Mustache | ElementKind::Raw | ElementKind::Partial => {
                self.open_tag(element, " />")
            }
            ElementKind::Comment => Doc::concat(vec![
                self.open_tag(element, ">"),
                self.nodes(&element.children),
                Doc::text("</hbs:c>"),
            ]),
            ElementKind::Else => Doc::concat(vec![
                self.open_tag(element, ">"),
                self.body(element, &element.children),
                Doc::text("</hbs:e>"),
            ]),
            ElementKind::Block | ElementKind::PartialBlock | ElementKind::DecoratorBlock => {
                let (primary, inverse) = match element.children.split_last() {
                    Some((MarkupNode::Element(last), rest)) if last.kind == ElementKind::Else => {
                        (rest, Some(last))
                    }
                    _ => (element.children.as_slice(), None),
                };
                Doc::concat(vec![
                    self.open_tag(element, ">"),
                    self.body(element, primary),
                    inverse.map_or(Doc::Nil, |e| self.element(e)),
                    Doc::text(format!("</hbs:{name}>")),
                ])
            }
        }
    }

    fn open_tag(&self, element: &Element, closing: &str) -> Doc {
        let mode = match self.plan.get(element.id) {
            Some(decision) if decision.break_params => GroupMode::Break,
            Some(_) => GroupMode::Flat,
            None => GroupMode::Fit,
        };

        let mut head = format!("<hbs:{}", element.kind.name());
        let mut rest = Vec::new();
        let mut first_argument = true;
        for attr in &element.attrs {
            let text = format!("{}=\"{}\"", attr.name, attr.value);
            if !attr.is_argument() || first_argument {
                first_argument &= !attr.is_argument();
                head.push(' ');
                head.push_str(&text);
            } else {
                rest.push(Doc::Line);
                rest.push(Doc::Verbatim(text));
            }
        }

        Doc::concat(vec![
            Doc::Verbatim(head),
            Doc::concat(rest).indent(),
            Doc::text(closing),
        ])
        .group(mode)
    }

    fn body(&self, element: &Element, children: &[MarkupNode]) -> Doc {
        let indent = self
            .plan
            .get(element.id)
            .is_some_and(|decision| decision.indent_body);
        if !indent {
            return self.nodes(children);
        }

        let is_blank = children
            .iter()
            .all(|child| matches!(child, MarkupNode::Text(t) if t.trim_matches([' ', '\t']).is_empty()));
        if is_blank {
            return Doc::HardLine;
        }

        let last = children.len() - 1;
        let mut starts_with_newline = false;
        let mut ends_with_newline = false;
        let mut docs = Vec::with_capacity(children.len() + 1);
        for (i, child) in children.iter().enumerate() {
            match child {
                MarkupNode::Text(text) => {
                    let mut text = text.as_str();
                    if i == 0 {
                        text = text.trim_start_matches([' ', '\t']);
                        starts_with_newline = text.starts_with('\n');
                    }
                    if i == last {
                        text = text.trim_end_matches([' ', '\t']);
                        ends_with_newline = text.ends_with('\n');
                    }
                    docs.push(Doc::text(text));
                }
                MarkupNode::Element(child) => docs.push(self.element(child)),
            }
        }
        if !starts_with_newline {
            docs.insert(0, Doc::HardLine);
        }

        Doc::concat(vec![
            Doc::concat(docs).indent(),
            if ends_with_newline {
                Doc::Nil
            } else {
                Doc::HardLine
            },
        ])
    }
}
