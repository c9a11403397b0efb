//! stencilfmt - Formatter for Handlebars and Stencil templates
//!
//! Re-indents and wraps the logic tags of templates that mix markup with
//! `{{ … }}` expressions, leaving the markup itself as written.
//!
//! The pipeline ([`process::pipeline`]) protects regions a markup parser
//! cannot handle, parses the logic tags ([`parser`]), lowers them into
//! synthetic `hbs:` markup ([`format::lower`]), lays that markup out
//! ([`layout`]) and lifts the result back to template syntax
//! ([`format::lift`]).

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod layout;
pub mod parser;
pub mod process;

// Re-export commonly used types
pub use cli::{build_cli, parse_args, parse_args_from, CliArgs};
pub use config::Config;
pub use error::{FormatError, Result, SyntaxError};
pub use process::{format_file, format_template, format_with_engine};
