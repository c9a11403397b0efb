//! Template logic-language parsing.
//!
//! This module turns template text into a typed syntax tree:
//! - [`params`]: Tokenizes the interior of a tag into positional values and hash pairs
//! - [`scanner`]: Finds tag boundaries and classifies tags by sigil
//! - [`builder`]: Builds the [`ast::Program`] with a stack of open blocks
//! - [`ast`]: The node types, source spans and line index
//! - [`patterns`]: Precompiled regex patterns for template syntax
//!
//! Markup between tags is kept as opaque content; only the logic tags are
//! understood structurally.

pub mod ast;
pub mod builder;
pub mod params;
pub mod patterns;
pub mod scanner;

pub use ast::{Node, Position, Program, Span};
pub use builder::parse;
pub use params::{parse_params, Param, ParamToken, ParamValue};
