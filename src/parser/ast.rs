//! Typed syntax tree for the template logic language.
//!
//! The tree is a closed sum type: every construct the formatter understands
//! has a [`Node`] variant, and anything else is rejected by the parser.
//! All nodes carry a [`Span`] so layout rules can measure source extent.

/// A location in the source text.
///
/// `line` is 1-based, `column` is 0-based and counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

/// Half-open source range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    #[must_use]
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// True when the range covers more than one source line.
    #[must_use]
    pub fn is_multiline(&self) -> bool {
        self.end.line > self.start.line
    }
}

/// Maps byte offsets to line/column positions.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.char_indices()
                .filter(|&(_, c)| c == '\n')
                .map(|(i, _)| i + 1),
        );
        Self { text, line_starts }
    }

    #[must_use]
    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.text.len());
        let line_idx = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let line_start = self.line_starts[line_idx];
        Position {
            offset,
            line: line_idx + 1,
            column: self.text[line_start..offset].chars().count(),
        }
    }

    #[must_use]
    pub fn span(&self, start: usize, end: usize) -> Span {
        Span::new(self.position(start), self.position(end))
    }
}

/// Whitespace control markers (`~`) on the two delimiters of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Strip {
    pub open: bool,
    pub close: bool,
}

impl Strip {
    #[must_use]
    pub fn is_empty(self) -> bool {
        !self.open && !self.close
    }

    /// Compact code used by the synthetic markup: `o`, `c` or `oc`.
    #[must_use]
    pub fn code(self) -> &'static str {
        match (self.open, self.close) {
            (true, true) => "oc",
            (true, false) => "o",
            (false, true) => "c",
            (false, false) => "",
        }
    }

    #[must_use]
    pub fn from_code(code: &str) -> Self {
        Self {
            open: code.contains('o'),
            close: code.contains('c'),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    String(String),
    /// Numbers keep their source spelling (`1.50` stays `1.50`).
    Number(String),
    Boolean(bool),
    Undefined,
    Null,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Path(String),
    Literal(Literal),
    SubExpression(Box<Call>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashPair {
    pub key: String,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Hash {
    pub pairs: Vec<HashPair>,
}

/// Helper invocation shape shared by mustaches, block openers, partials
/// and sub-expressions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub path: Expr,
    pub params: Vec<Expr>,
    pub hash: Hash,
}

impl Call {
    /// Number of arguments besides the path.
    #[must_use]
    pub fn arg_count(&self) -> usize {
        self.params.len() + self.hash.pairs.len()
    }
}

/// A single `{{ … }}` tag as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub call: Call,
    pub block_params: Vec<String>,
    pub strip: Strip,
    pub span: Span,
    /// Some gap between two of the tag's tokens contained a line break.
    pub params_multiline: bool,
}

impl Tag {
    #[must_use]
    pub fn has_args(&self) -> bool {
        self.call.arg_count() > 0 || !self.block_params.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseTag {
    pub path: String,
    pub strip: Strip,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Program {
    pub body: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentForm {
    /// `{{!-- … --}}`
    Long,
    /// `{{! … }}`
    Short,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub value: String,
    pub form: CommentForm,
    pub strip: Strip,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElseTag {
    pub strip: Strip,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inverse {
    /// Plain `{{else}}` branch; `span` runs from the else tag to the end of the block.
    Else {
        tag: ElseTag,
        program: Program,
        span: Span,
    },
    /// `{{else if …}}` continues the chain with another block that shares our close tag.
    Chained(Box<Block>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub open: Tag,
    /// Opened with `{{^name}}` rather than `{{#name}}`.
    pub inverted: bool,
    pub program: Program,
    pub inverse: Option<Inverse>,
    /// `None` for a chained block, which closes through its parent.
    pub close: Option<CloseTag>,
    pub span: Span,
}

/// `{{#> layout}}…{{/layout}}` and `{{#*inline "name"}}…{{/inline}}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerBlock {
    pub open: Tag,
    pub program: Program,
    pub close: CloseTag,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Content(Content),
    Mustache(Tag),
    RawMustache(Tag),
    Block(Block),
    Partial(Tag),
    PartialBlock(ContainerBlock),
    DecoratorBlock(ContainerBlock),
    Comment(Comment),
}

impl Node {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Node::Content(c) => c.span,
            Node::Mustache(t) | Node::RawMustache(t) | Node::Partial(t) => t.span,
            Node::Block(b) => b.span,
            Node::PartialBlock(b) | Node::DecoratorBlock(b) => b.span,
            Node::Comment(c) => c.span,
        }
    }
}
