//! Render orchestration: options in, [`RenderResult`] out.
//!
//! Captures runtime facts once per call, resolves the environment and runs
//! the passes against the builtin registry.

use tracing::debug;

use crate::components::Registry;
use crate::core::environment::{EnvironmentConfig, RenderContext, RuntimeFacts, resolve_environment};
use crate::core::error::RenderError;
use crate::core::iterator::InputIterator;
use crate::core::renderer::render_tree;
use crate::core::types::{RenderResult, Values};
use crate::io::runtime;
use crate::tree::Node;

/// Options for a single render call.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Answers keyed by input name.
    pub inputs: Values,
    pub env: EnvironmentConfig,
    /// Overrides `env.output.trim` when set.
    pub trim: Option<bool>,
}

impl RenderOptions {
    /// Context for these options with the given runtime facts.
    pub fn context(&self, runtime: RuntimeFacts) -> RenderContext {
        let ctx = resolve_environment(&self.env, runtime);
        match self.trim {
            Some(trim) => ctx.with_trim(trim),
            None => ctx,
        }
    }
}

/// Render `tree` with the builtin components and freshly captured host facts.
pub fn render(tree: &Node, options: &RenderOptions) -> RenderResult {
    let registry = Registry::default();
    let ctx = options.context(runtime::capture());
    render_tree(tree, &registry, &ctx, &options.inputs)
}

/// Fill every outstanding input with its default (or empty value), starting
/// from `inputs`. Returns the complete value map.
pub fn collect_non_interactive(
    tree: &Node,
    registry: &Registry,
    ctx: &RenderContext,
    inputs: Values,
) -> Result<Values, RenderError> {
    let supplied = inputs.len();
    let mut iterator = InputIterator::new(tree, registry, ctx).with_values(inputs);
    let values = iterator.run_non_interactive()?;
    debug!(
        supplied,
        filled = values.len() - supplied,
        "non-interactive collection finished"
    );
    Ok(values)
}
