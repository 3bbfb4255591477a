//! Caller-driven input collection over repeated discovery passes.
//!
//! ```text
//! NotStarted --start--> Collecting --advance (nothing left)--> Done
//!                          |  ^
//!                     submit  advance
//!                          v  |
//!                       (answer stored)
//! ```
//!
//! Every `start`/`advance` re-runs discovery with the values collected so
//! far, so answers that open or close conditional branches change what is
//! asked next. Requirements always come out in document order.

use std::collections::VecDeque;

use serde_json::Value;
use tracing::debug;

use crate::components::Registry;
use crate::core::environment::RenderContext;
use crate::core::error::{IteratorError, RenderError, ValidationError};
use crate::core::input::InputRequirement;
use crate::core::renderer::discover;
use crate::core::types::Values;
use crate::tree::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    NotStarted,
    Collecting,
    Done,
}

/// Outcome of [`InputIterator::submit`].
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitResult {
    Accepted,
    /// The answer was not stored; submit again for the same requirement.
    Rejected(Vec<ValidationError>),
}

impl SubmitResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitResult::Accepted)
    }
}

pub struct InputIterator<'a> {
    tree: &'a Node,
    registry: &'a Registry,
    ctx: &'a RenderContext,
    values: Values,
    queue: VecDeque<InputRequirement>,
    phase: Phase,
    errors: Vec<RenderError>,
}

impl<'a> InputIterator<'a> {
    pub fn new(tree: &'a Node, registry: &'a Registry, ctx: &'a RenderContext) -> Self {
        Self {
            tree,
            registry,
            ctx,
            values: Values::new(),
            queue: VecDeque::new(),
            phase: Phase::NotStarted,
            errors: Vec::new(),
        }
    }

    /// Pre-seed answers supplied up front; they are never asked for.
    pub fn with_values(mut self, values: Values) -> Self {
        self.values = values;
        self
    }

    pub fn start(&mut self) -> Result<(), RenderError> {
        if self.phase != Phase::NotStarted {
            return Err(IteratorError::AlreadyStarted.into());
        }
        self.phase = Phase::Collecting;
        self.rediscover()
    }

    /// Next requirement that still needs an answer.
    pub fn current(&self) -> Result<&InputRequirement, IteratorError> {
        self.ensure_collecting()?;
        self.queue.front().ok_or(IteratorError::PendingAdvance)
    }

    /// Validate and store an answer for [`Self::current`].
    pub fn submit(&mut self, answer: Value) -> Result<SubmitResult, IteratorError> {
        let requirement = self.current()?;
        match requirement.validate(answer) {
            Ok(value) => {
                let name = requirement.name.clone();
                debug!(name = %name, "answer accepted");
                self.values.insert(name, value);
                self.queue.pop_front();
                Ok(SubmitResult::Accepted)
            }
            Err(errors) => {
                debug!(name = %requirement.name, errors = errors.len(), "answer rejected");
                Ok(SubmitResult::Rejected(errors))
            }
        }
    }

    /// Re-run discovery with the answers collected so far.
    pub fn advance(&mut self) -> Result<(), RenderError> {
        self.ensure_collecting()?;
        self.rediscover()
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    /// Non-fatal errors from the latest discovery pass.
    pub fn errors(&self) -> &[RenderError] {
        &self.errors
    }

    /// Answer every requirement with its default (or empty value) until done.
    pub fn run_non_interactive(&mut self) -> Result<Values, RenderError> {
        if self.phase == Phase::NotStarted {
            self.start()?;
        }
        while !self.is_done() {
            let requirement = self.current()?;
            let name = requirement.name.clone();
            let value = requirement.fallback_value();
            debug!(name = %name, "filled with fallback");
            self.values.insert(name, value);
            self.queue.pop_front();
            self.advance()?;
        }
        Ok(self.values.clone())
    }

    fn ensure_collecting(&self) -> Result<(), IteratorError> {
        match self.phase {
            Phase::NotStarted => Err(IteratorError::NotStarted),
            Phase::Done => Err(IteratorError::Done),
            Phase::Collecting => Ok(()),
        }
    }

    fn rediscover(&mut self) -> Result<(), RenderError> {
        let mut discovery = discover(self.tree, self.registry, self.ctx, &self.values);
        if let Some(index) = discovery.errors.iter().position(RenderError::is_fatal) {
            return Err(discovery.errors.swap_remove(index));
        }
        self.errors = discovery.errors;
        self.queue = discovery.requirements.into();
        if self.queue.is_empty() {
            self.phase = Phase::Done;
        }
        debug!(
            pending = self.queue.len(),
            collected = self.values.len(),
            done = self.is_done(),
            "requirements recomputed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ask_text, fixed_context};
    use crate::tree::Element;
    use serde_json::json;

    #[test]
    fn misuse_is_an_iterator_error() {
        let tree = ask_text("name");
        let registry = Registry::default();
        let ctx = fixed_context();
        let mut it = InputIterator::new(&tree, &registry, &ctx);

        assert_eq!(it.current().err(), Some(IteratorError::NotStarted));
        assert_eq!(it.submit(json!("x")), Err(IteratorError::NotStarted));
        assert_eq!(it.advance(), Err(IteratorError::NotStarted.into()));

        it.start().expect("start");
        assert_eq!(it.start(), Err(IteratorError::AlreadyStarted.into()));

        assert!(it.submit(json!("Ada")).expect("submit").is_accepted());
        assert_eq!(it.current().err(), Some(IteratorError::PendingAdvance));
        it.advance().expect("advance");
        assert!(it.is_done());
        assert_eq!(it.current().err(), Some(IteratorError::Done));
        assert_eq!(it.submit(json!("x")), Err(IteratorError::Done));
    }

    #[test]
    fn empty_tree_is_done_after_start() {
        let tree = Node::text("static");
        let registry = Registry::default();
        let ctx = fixed_context();
        let mut it = InputIterator::new(&tree, &registry, &ctx);
        it.start().expect("start");
        assert!(it.is_done());
    }

    #[test]
    fn rejected_answer_keeps_requirement_current() {
        let tree: Node = Element::new("Ask.Number")
            .prop("name", "count")
            .prop("min", 1)
            .into();
        let registry = Registry::default();
        let ctx = fixed_context();
        let mut it = InputIterator::new(&tree, &registry, &ctx);
        it.start().expect("start");

        let result = it.submit(json!("0")).expect("submit");
        assert!(matches!(result, SubmitResult::Rejected(ref errors) if errors.len() == 1));
        assert_eq!(it.current().expect("current").name, "count");
        assert!(it.values().is_empty());

        assert!(it.submit(json!("3")).expect("submit").is_accepted());
        assert_eq!(it.values().get("count"), Some(&json!(3)));
    }

    #[test]
    fn seeded_values_are_not_asked() {
        let tree = Node::fragment([ask_text("a"), ask_text("b")]);
        let registry = Registry::default();
        let ctx = fixed_context();
        let seeded: Values = [("a".to_string(), json!("given"))].into_iter().collect();
        let mut it = InputIterator::new(&tree, &registry, &ctx).with_values(seeded);
        it.start().expect("start");
        assert_eq!(it.current().expect("current").name, "b");
    }

    #[test]
    fn formula_errors_abort_start() {
        let tree: Node = Element::new("If").prop("when", "=OR(").into();
        let registry = Registry::default();
        let ctx = fixed_context();
        let mut it = InputIterator::new(&tree, &registry, &ctx);
        assert!(matches!(it.start(), Err(RenderError::Formula(_))));
    }
}
