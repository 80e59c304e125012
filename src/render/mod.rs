//! Printing decompiled elements as Java-like source text.
//!
//! Every [`ElementType`] has at least one rule in the [`RenderRegistry`]; rules with a
//! predicate take precedence over the unconditional one of the same type when they apply,
//! e.g. boxing calls render as their argument.

mod context;
mod registry;
mod rules;

use thiserror::Error;

use crate::decompile::{DecompileError, Element, ElementType};

pub use self::context::{ClassResolver, CodeStyle, RenderConfig, RenderContext, Renderer};
pub use self::registry::{
    RenderFn, RenderPredicate, RenderRegistry, RenderRegistryBuilder, RenderRule, RenderRuleBuilder,
};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no rendering rule for {0:?}")]
    Unsupported(ElementType),

    /// A lambda body or accessor could not be found through the class resolver.
    #[error("unable to resolve method {0}")]
    UnresolvedMethod(String),

    #[error(transparent)]
    Decompile(#[from] DecompileError),
}

pub type RenderResult<T> = Result<T, RenderError>;

/// Render one element with the core rules.
pub fn render(element: &Element, style: &CodeStyle) -> RenderResult<String> {
    Renderer::new((*style).into()).render(element)
}

/// Render statements, one per line.
pub fn render_all(elements: &[Element], style: &CodeStyle) -> RenderResult<String> {
    Renderer::new((*style).into()).render_all(elements)
}
