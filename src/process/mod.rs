//! Document processing around the logic-tag formatter.
//!
//! - [`pipeline`]: One formatting run, from source text to formatted text
//! - [`sanitize`]: Replaces regions a markup parser cannot handle with placeholders
//! - [`rehydrate`]: Puts the original regions back
//! - [`front_matter`]: Splits off and reassembles a leading `---` block
//!
//! The main entry points are [`format_template`] for in-memory text and
//! [`format_file`], which processes a buffered reader and writes formatted
//! output to any `Write` implementation.

pub mod front_matter;
pub mod pipeline;
pub mod rehydrate;
pub mod sanitize;

pub use pipeline::{format_file, format_template, format_with_engine};
