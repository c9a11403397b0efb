//! Template logic formatting.
//!
//! This module turns a parsed template into synthetic markup and back:
//! - [`lower`]: Emits one `hbs:` element per logic construct
//! - [`rules`]: Decides, from source spans, where tags break and bodies indent
//! - [`lift`]: Rewrites laid-out synthetic markup as template syntax
//! - [`whitespace`]: Indentation reset before layout and the final whitespace pass

pub mod lift;
pub mod lower;
pub mod rules;
pub mod whitespace;

pub use lift::lift;
pub use lower::{lower, Lowered};
pub use rules::{Decision, LayoutPlan};
pub use whitespace::{finalize, reset_indentation};
