//! Syntax tree construction.
//!
//! Consumes the scanner's token stream with a push/pop stack of open
//! blocks. Every block opener pushes a frame, `{{else}}` switches the top
//! frame to its inverse branch, `{{else if …}}` pushes a chained frame that
//! closes through its parent, and a close tag pops back to the matching
//! opener. Mismatched or missing close tags are syntax errors.

use crate::error::SyntaxError;
use crate::parser::ast::{
    Block, Call, CloseTag, Comment, ContainerBlock, Content, ElseTag, Expr, Hash, HashPair,
    Inverse, LineIndex, Literal, Node, Program, Tag,
};
use crate::parser::params::{parse_params, Param, ParamToken, ParamValue};
use crate::parser::patterns::NUMBER_RE;
use crate::parser::scanner::{scan, RawTag, TagKind, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Block { inverted: bool, chained: bool },
    PartialBlock,
    DecoratorBlock,
}

impl FrameKind {
    fn sigil(self) -> &'static str {
        match self {
            FrameKind::Block { inverted: true, .. } => "^",
            FrameKind::Block { chained: true, .. } => "else ",
            FrameKind::Block { .. } => "#",
            FrameKind::PartialBlock => "#>",
            FrameKind::DecoratorBlock => "#*",
        }
    }
}

struct ElseBranch {
    tag: ElseTag,
    start: usize,
    body: Vec<Node>,
}

struct Frame {
    kind: FrameKind,
    open: Tag,
    start: usize,
    program: Vec<Node>,
    else_branch: Option<ElseBranch>,
    /// An `{{else …}}` chain continues in the frame above this one.
    chain_pending: bool,
    chain: Option<Box<Block>>,
}

impl Frame {
    fn new(kind: FrameKind, open: Tag, start: usize) -> Self {
        Self {
            kind,
            open,
            start,
            program: Vec::new(),
            else_branch: None,
            chain_pending: false,
            chain: None,
        }
    }

    fn body_mut(&mut self) -> &mut Vec<Node> {
        match &mut self.else_branch {
            Some(branch) => &mut branch.body,
            None => &mut self.program,
        }
    }

    fn into_block(self, close: Option<CloseTag>, end: usize, index: &LineIndex<'_>) -> Block {
        let inverse = match (self.chain, self.else_branch) {
            (Some(chained), _) => Some(Inverse::Chained(chained)),
            (None, Some(branch)) => Some(Inverse::Else {
                tag: branch.tag,
                program: Program { body: branch.body },
                span: index.span(branch.start, end),
            }),
            (None, None) => None,
        };
        let inverted = matches!(self.kind, FrameKind::Block { inverted: true, .. });
        Block {
            open: self.open,
            inverted,
            program: Program { body: self.program },
            inverse,
            close,
            span: index.span(self.start, end),
        }
    }
}

struct Builder<'a> {
    index: LineIndex<'a>,
    root: Vec<Node>,
    stack: Vec<Frame>,
}

/// Parse template text into a [`Program`].
pub fn parse(source: &str) -> Result<Program, SyntaxError> {
    let mut builder = Builder {
        index: LineIndex::new(source),
        root: Vec::new(),
        stack: Vec::new(),
    };

    for token in scan(source)? {
        match token {
            Token::Text(range) => {
                let node = Node::Content(Content {
                    text: source[range.clone()].to_string(),
                    span: builder.index.span(range.start, range.end),
                });
                builder.push_node(node);
            }
            Token::Tag(raw) => builder.tag(&raw)?,
        }
    }

    if let Some(frame) = builder.stack.iter().rev().find(|f| {
        !matches!(f.kind, FrameKind::Block { chained: true, .. })
    }) {
        return Err(SyntaxError::new(
            builder.index.position(frame.start),
            format!(
                "unclosed block `{{{{{}{}}}}}`",
                frame.kind.sigil(),
                close_name(&frame.open.call.path)
            ),
        ));
    }

    Ok(Program { body: builder.root })
}

impl Builder<'_> {
    fn push_node(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(frame) => frame.body_mut().push(node),
            None => self.root.push(node),
        }
    }

    fn error(&self, offset: usize, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(self.index.position(offset), message)
    }

    fn tag(&mut self, raw: &RawTag<'_>) -> Result<(), SyntaxError> {
        let start = raw.range.start;
        match raw.kind {
            TagKind::Mustache => {
                let tag = self.build_tag(raw, false)?;
                self.push_node(Node::Mustache(tag));
            }
            TagKind::Raw => {
                let tag = self.build_tag(raw, false)?;
                self.push_node(Node::RawMustache(tag));
            }
            TagKind::Partial => {
                let tag = self.build_tag(raw, false)?;
                self.push_node(Node::Partial(tag));
            }
            TagKind::Comment(form) => {
                let node = Node::Comment(Comment {
                    value: raw.inner.to_string(),
                    form,
                    strip: raw.strip,
                    span: self.index.span(start, raw.range.end),
                });
                self.push_node(node);
            }
            TagKind::OpenBlock | TagKind::OpenInverse => {
                let tag = self.build_tag(raw, true)?;
                let kind = FrameKind::Block {
                    inverted: raw.kind == TagKind::OpenInverse,
                    chained: false,
                };
                self.stack.push(Frame::new(kind, tag, start));
            }
            TagKind::OpenPartialBlock => {
                let tag = self.build_tag(raw, false)?;
                self.stack
                    .push(Frame::new(FrameKind::PartialBlock, tag, start));
            }
            TagKind::OpenDecoratorBlock => {
                let tag = self.build_tag(raw, false)?;
                self.stack
                    .push(Frame::new(FrameKind::DecoratorBlock, tag, start));
            }
            TagKind::Else => self.else_tag(raw)?,
            TagKind::Close => self.close_tag(raw)?,
        }
        Ok(())
    }

    fn else_tag(&mut self, raw: &RawTag<'_>) -> Result<(), SyntaxError> {
        let start = raw.range.start;
        match self.stack.last() {
            None => {
                return Err(self
                    .error(start, "`{{else}}` outside of a block")
                    .with_hint("`{{else}}` must appear between a block's open and close tags"));
            }
            Some(frame) if !matches!(frame.kind, FrameKind::Block { .. }) => {
                return Err(self.error(start, "`{{else}}` is only allowed in block helpers"));
            }
            Some(frame) if frame.else_branch.is_some() || frame.chain_pending => {
                return Err(self.error(start, "a block can only have one `{{else}}` branch"));
            }
            Some(_) => {}
        }

        if raw.inner.trim().is_empty() {
            let tag = ElseTag {
                strip: raw.strip,
                span: self.index.span(start, raw.range.end),
            };
            if let Some(frame) = self.stack.last_mut() {
                frame.else_branch = Some(ElseBranch {
                    tag,
                    start,
                    body: Vec::new(),
                });
            }
            return Ok(());
        }

        let open = self.build_tag(raw, true)?;
        if let Some(frame) = self.stack.last_mut() {
            frame.chain_pending = true;
        }
        let kind = FrameKind::Block {
            inverted: false,
            chained: true,
        };
        self.stack.push(Frame::new(kind, open, start));
        Ok(())
    }

    fn close_tag(&mut self, raw: &RawTag<'_>) -> Result<(), SyntaxError> {
        let start = raw.range.start;
        let end = raw.range.end;
        let name = raw.inner.trim();
        let close = CloseTag {
            path: name.to_string(),
            strip: raw.strip,
            span: self.index.span(start, end),
        };

        loop {
            let Some(frame) = self.stack.pop() else {
                return Err(self
                    .error(start, format!("unexpected closing tag `{{{{/{name}}}}}`"))
                    .with_hint("no block is open here"));
            };

            if matches!(frame.kind, FrameKind::Block { chained: true, .. }) {
                let block = frame.into_block(None, end, &self.index);
                match self.stack.last_mut() {
                    Some(parent) => parent.chain = Some(Box::new(block)),
                    None => return Err(self.error(start, "`{{else}}` chain without a block")),
                }
                continue;
            }

            let expected = close_name(&frame.open.call.path);
            if expected != name {
                return Err(self.error(
                    start,
                    format!(
                        "closing tag `{{{{/{name}}}}}` does not match `{{{{{}{expected}}}}}`",
                        frame.kind.sigil()
                    ),
                ));
            }

            let node = match frame.kind {
                FrameKind::Block { .. } => {
                    Node::Block(frame.into_block(Some(close), end, &self.index))
                }
                FrameKind::PartialBlock | FrameKind::DecoratorBlock => {
                    let container = ContainerBlock {
                        span: self.index.span(frame.start, end),
                        open: frame.open,
                        program: Program {
                            body: frame.program,
                        },
                        close,
                    };
                    if frame.kind == FrameKind::PartialBlock {
                        Node::PartialBlock(container)
                    } else {
                        Node::DecoratorBlock(container)
                    }
                }
            };
            self.push_node(node);
            return Ok(());
        }
    }

    fn build_tag(&self, raw: &RawTag<'_>, allow_block_params: bool) -> Result<Tag, SyntaxError> {
        let at = raw.range.start;
        let inner = raw.inner;
        let mut tokens = parse_params(inner);
        if tokens.is_empty() {
            return Err(self.error(at, "empty tag"));
        }

        let params_multiline = tokens
            .windows(2)
            .any(|pair| inner[pair[0].span.end..pair[1].span.start].contains('\n'));

        let block_params = take_block_params(&mut tokens);
        if !block_params.is_empty() && !allow_block_params {
            return Err(self.error(
                at,
                "block parameters (`as |x|`) are only allowed on block helpers",
            ));
        }

        Ok(Tag {
            call: self.call(tokens, at)?,
            block_params,
            strip: raw.strip,
            span: self.index.span(at, raw.range.end),
            params_multiline,
        })
    }

    fn call(&self, tokens: Vec<ParamToken>, at: usize) -> Result<Call, SyntaxError> {
        let mut tokens = tokens.into_iter();
        let path = match tokens.next().map(|t| t.param) {
            Some(Param::Positional(value)) => self.expr(&value, at)?,
            Some(Param::Hash(key, _)) => {
                return Err(self.error(at, format!("expected a helper or path before `{key}=`")));
            }
            None => return Err(self.error(at, "empty sub-expression")),
        };

        let mut params = Vec::new();
        let mut hash = Hash::default();
        for token in tokens {
            match token.param {
                Param::Positional(value) => {
                    if !hash.pairs.is_empty() {
                        return Err(self.error(
                            at,
                            format!("positional argument `{}` after hash arguments", value.as_str()),
                        ));
                    }
                    params.push(self.expr(&value, at)?);
                }
                Param::Hash(key, value) => {
                    if key.chars().all(|c| c.is_ascii_digit()) {
                        return Err(
                            self.error(at, format!("numeric hash key `{key}` is not supported"))
                        );
                    }
                    if value == ParamValue::Bare(String::new()) {
                        return Err(
                            self.error(at, format!("missing value for hash argument `{key}`"))
                        );
                    }
                    let value = self.expr(&value, at)?;
                    hash.pairs.push(HashPair { key, value });
                }
            }
        }
        Ok(Call { path, params, hash })
    }

    fn expr(&self, value: &ParamValue, at: usize) -> Result<Expr, SyntaxError> {
        let text = match value {
            ParamValue::Quoted(s) => return Ok(Expr::Literal(Literal::String(s.clone()))),
            ParamValue::Bare(s) => s.as_str(),
        };

        let literal = match text {
            "true" => Some(Literal::Boolean(true)),
            "false" => Some(Literal::Boolean(false)),
            "undefined" => Some(Literal::Undefined),
            "null" => Some(Literal::Null),
            _ if NUMBER_RE.is_match(text) => Some(Literal::Number(text.to_string())),
            _ => None,
        };
        if let Some(literal) = literal {
            return Ok(Expr::Literal(literal));
        }

        if text.starts_with('(') {
            if text.len() < 2 || !text.ends_with(')') {
                return Err(self.error(at, "unterminated sub-expression: missing `)`"));
            }
            let call = self.call(parse_params(&text[1..text.len() - 1]), at)?;
            return Ok(Expr::SubExpression(Box::new(call)));
        }
        if text.starts_with('"') || text.starts_with('\'') {
            return Err(self.error(at, "unterminated string literal"));
        }
        if text.starts_with('|') {
            return Err(self.error(at, format!("unexpected block parameter list `{text}`")));
        }
        Ok(Expr::Path(text.to_string()))
    }
}

/// Remove a trailing `as |a b|` from the token list and return the names.
fn take_block_params(tokens: &mut Vec<ParamToken>) -> Vec<String> {
    let n = tokens.len();
    if n < 3 {
        return Vec::new();
    }
    let is_as = matches!(&tokens[n - 2].param, Param::Positional(ParamValue::Bare(s)) if s == "as");
    let names = match &tokens[n - 1].param {
        Param::Positional(ParamValue::Bare(s))
            if is_as && s.len() >= 2 && s.starts_with('|') && s.ends_with('|') =>
        {
            s[1..s.len() - 1]
                .split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>()
        }
        _ => return Vec::new(),
    };
    tokens.truncate(n - 2);
    names
}

/// Name a close tag must repeat for a block opened with `path`.
#[must_use]
pub fn close_name(path: &Expr) -> String {
    match path {
        Expr::Path(p) => p.clone(),
        Expr::Literal(Literal::String(s) | Literal::Number(s)) => s.clone(),
        Expr::Literal(Literal::Boolean(b)) => b.to_string(),
        Expr::Literal(Literal::Undefined) => "undefined".to_string(),
        Expr::Literal(Literal::Null) => "null".to_string(),
        Expr::SubExpression(call) => close_name(&call.path),
    }
}
