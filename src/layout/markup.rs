//! Parser for synthetic markup.
//!
//! Only elements in the reserved `hbs:` namespace are structural. Everything
//! else, ordinary markup included, is kept as text, since the layout rules
//! only move logic tags and block bodies.

use crate::error::FormatError;
use crate::parser::patterns::{ATTRIBUTE_RE, SYNTHETIC_TAG_RE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Mustache,
    Raw,
    Partial,
    Comment,
    Block,
    Else,
    PartialBlock,
    DecoratorBlock,
}

impl ElementKind {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "m" => ElementKind::Mustache,
            "r" => ElementKind::Raw,
            "p" => ElementKind::Partial,
            "c" => ElementKind::Comment,
            "b" => ElementKind::Block,
            "e" => ElementKind::Else,
            "pb" => ElementKind::PartialBlock,
            "db" => ElementKind::DecoratorBlock,
            _ => return None,
        })
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ElementKind::Mustache => "m",
            ElementKind::Raw => "r",
            ElementKind::Partial => "p",
            ElementKind::Comment => "c",
            ElementKind::Block => "b",
            ElementKind::Else => "e",
            ElementKind::PartialBlock => "pb",
            ElementKind::DecoratorBlock => "db",
        }
    }

    /// Written as a self-closing tag.
    #[must_use]
    pub fn is_void(self) -> bool {
        matches!(
            self,
            ElementKind::Mustache | ElementKind::Raw | ElementKind::Partial
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    /// Value exactly as written between the quotes (still entity-encoded).
    pub value: String,
}

impl Attribute {
    /// Argument attributes (`_N`, `__key`, `bp`) may move to their own line;
    /// flags stay next to the element name.
    #[must_use]
    pub fn is_argument(&self) -> bool {
        self.name.starts_with('_') || self.name == "bp"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Position of the opening tag in document order.
    pub id: usize,
    pub kind: ElementKind,
    pub attrs: Vec<Attribute>,
    pub children: Vec<MarkupNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Text(String),
    Element(Element),
}

/// Parse synthetic markup into a tree.
pub fn parse(text: &str) -> Result<Vec<MarkupNode>, FormatError> {
    let mut root = Vec::new();
    let mut open: Vec<Element> = Vec::new();
    let mut next_id = 0;
    let mut last = 0;

    for caps in SYNTHETIC_TAG_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let name = &caps[2];
        let kind = ElementKind::from_name(name)
            .ok_or_else(|| FormatError::UnknownConstruct(format!("hbs:{name}")))?;

        if whole.start() > last {
            let run = MarkupNode::Text(text[last..whole.start()].to_string());
            children_of(&mut root, &mut open).push(run);
        }
        last = whole.end();

        if &caps[1] == "/" {
            let element = open.pop().ok_or_else(|| {
                FormatError::Markup(format!("unexpected `</hbs:{name}>` at byte {}", whole.start()))
            })?;
            if element.kind != kind {
                return Err(FormatError::Markup(format!(
                    "`</hbs:{name}>` closes `<hbs:{}>`",
                    element.kind.name()
                )));
            }
            children_of(&mut root, &mut open).push(MarkupNode::Element(element));
            continue;
        }

        let self_closing = &caps[4] == "/";
        if self_closing != kind.is_void() {
            return Err(FormatError::Markup(format!(
                "`<hbs:{name}>` at byte {} has the wrong closing form",
                whole.start()
            )));
        }
        let element = Element {
            id: next_id,
            kind,
            attrs: parse_attributes(&caps[3]),
            children: Vec::new(),
        };
        next_id += 1;
        if self_closing {
            children_of(&mut root, &mut open).push(MarkupNode::Element(element));
        } else {
            open.push(element);
        }
    }

    if let Some(element) = open.last() {
        return Err(FormatError::Markup(format!(
            "unclosed `<hbs:{}>`",
            element.kind.name()
        )));
    }
    if last < text.len() {
        root.push(MarkupNode::Text(text[last..].to_string()));
    }
    Ok(root)
}

fn children_of<'a>(root: &'a mut Vec<MarkupNode>, open: &'a mut [Element]) -> &'a mut Vec<MarkupNode> {
    match open.last_mut() {
        Some(element) => &mut element.children,
        None => root,
    }
}

fn parse_attributes(list: &str) -> Vec<Attribute> {
    ATTRIBUTE_RE
        .captures_iter(list)
        .map(|caps| Attribute {
            name: caps[2].to_string(),
            value: caps[3].to_string(),
        })
        .collect()
}

/// Number of elements in the tree.
#[must_use]
pub fn element_count(nodes: &[MarkupNode]) -> usize {
    nodes
        .iter()
        .map(|node| match node {
            MarkupNode::Text(_) => 0,
            MarkupNode::Element(element) => 1 + element_count(&element.children),
        })
        .sum()
}
