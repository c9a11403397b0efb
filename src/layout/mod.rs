//! Markup layout engine.
//!
//! The formatter hands the engine synthetic markup and a [`LayoutPlan`];
//! the engine knows nothing about the template language beyond the `hbs:`
//! element vocabulary.
//!
//! - [`markup`]: Parses synthetic markup into elements and text
//! - [`printer`]: Turns the element tree into a [`doc::Doc`] following the plan
//! - [`doc`]: The document algebra and its renderer

pub mod doc;
pub mod markup;
pub mod printer;

use crate::config::Config;
use crate::error::FormatError;
use crate::format::rules::LayoutPlan;
use doc::RenderOptions;

/// Lays out synthetic markup.
pub trait LayoutEngine {
    fn layout(&self, markup: &str, plan: &LayoutPlan) -> Result<String, FormatError>;
}

/// The built-in engine: markup tree, then [`doc::Doc`], then text.
#[derive(Debug, Clone)]
pub struct DocLayout {
    options: RenderOptions,
}

impl DocLayout {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            options: RenderOptions {
                indent_unit: config.indent_unit(),
                width: config.print_width,
                tab_width: config.tab_width,
            },
        }
    }
}

impl LayoutEngine for DocLayout {
    fn layout(&self, markup: &str, plan: &LayoutPlan) -> Result<String, FormatError> {
        let nodes = markup::parse(markup)?;
        let elements = markup::element_count(&nodes);
        if elements != plan.len() {
            return Err(FormatError::Markup(format!(
                "layout plan has {} entries for {elements} elements",
                plan.len()
            )));
        }
        let doc = printer::print(&nodes, plan);
        Ok(doc::render(&doc, &self.options))
    }
}
