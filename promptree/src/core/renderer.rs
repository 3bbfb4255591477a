//! Tree walk shared by discovery and final rendering.
//!
//! One [`Pass`] walks the tree once. In discovery mode it records unanswered
//! `Ask` leaves; in final mode it substitutes collected values and reports
//! missing required inputs. Both modes skip a branch whose condition reads a
//! name that has not been collected, and an `Ask` whose templated name does,
//! so a final render reaches exactly the leaves discovery reported.
//!
//! Only author text is rendered as a template. [`Node::Literal`] output from
//! components (answers, runtime facts, code bodies) is copied verbatim.
//!
//! Error handling:
//! - props errors skip the offending subtree and the walk continues,
//! - formula errors stop the walk; text produced so far is kept.

use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::LazyLock;

use minijinja::{Environment, UndefinedBehavior};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::components::{Component, ComponentInput, Intrinsic, Registry, Resolved};
use crate::core::environment::{DelimiterStyle, RenderContext};
use crate::core::error::{FormulaError, PropsError, RenderError};
use crate::core::formula::Condition;
use crate::core::input::InputRequirement;
use crate::core::scope::Scope;
use crate::core::types::{Action, RenderMode, RenderResult, Values};
use crate::tree::{Element, Node, Props};

/// Deepest element nesting a pass will walk.
pub const MAX_DEPTH: usize = 128;

const DEFAULT_LOOP_BINDING: &str = "item";
const DEFAULT_ITEM_MARKER: &str = "-";

static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\n(?:[ \t]*\n){2,}").expect("blank-run regex should be valid")
});

/// Outcome of a discovery pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Discovery {
    /// Unanswered inputs reachable under the given values, in document order.
    pub requirements: Vec<InputRequirement>,
    pub errors: Vec<RenderError>,
}

impl Discovery {
    /// First error that stopped the walk, if any.
    pub fn fatal(&self) -> Option<&RenderError> {
        self.errors.iter().find(|err| err.is_fatal())
    }
}

/// Find the inputs `tree` still needs given `values`.
pub fn discover(tree: &Node, registry: &Registry, ctx: &RenderContext, values: &Values) -> Discovery {
    let pass = Pass::new(registry, ctx, RenderMode::Discovery).run(tree, values);
    debug!(
        requirements = pass.requirements.len(),
        errors = pass.errors.len(),
        "discovery pass finished"
    );
    Discovery {
        requirements: pass.requirements,
        errors: pass.errors,
    }
}

/// Render `tree` to text with every collected value substituted.
pub fn render_tree(
    tree: &Node,
    registry: &Registry,
    ctx: &RenderContext,
    values: &Values,
) -> RenderResult {
    let pass = Pass::new(registry, ctx, RenderMode::Final).run(tree, values);
    debug!(
        chars = pass.text.len(),
        actions = pass.actions.len(),
        errors = pass.errors.len(),
        "final pass finished"
    );
    RenderResult {
        ok: pass.errors.is_empty(),
        text: pass.text,
        post_execution_actions: pass.actions,
        errors: pass.errors,
    }
}

/// Nesting position of the node being walked.
#[derive(Debug, Clone, Copy, Default)]
struct Level {
    /// Element depth, bounded by [`MAX_DEPTH`].
    depth: usize,
    /// Enclosing sections; drives markdown heading levels.
    sections: usize,
}

impl Level {
    fn deeper(self) -> Self {
        Self {
            depth: self.depth + 1,
            ..self
        }
    }

    fn in_section(self) -> Self {
        Self {
            sections: self.sections + 1,
            ..self
        }
    }
}

struct Pass<'a> {
    registry: &'a Registry,
    ctx: &'a RenderContext,
    mode: RenderMode,
    templates: Environment<'static>,
    env: Value,
    seen: HashSet<String>,
    requirements: Vec<InputRequirement>,
    actions: Vec<Action>,
    errors: Vec<RenderError>,
    text: String,
}

impl<'a> Pass<'a> {
    fn new(registry: &'a Registry, ctx: &'a RenderContext, mode: RenderMode) -> Self {
        let mut templates = Environment::new();
        templates.set_undefined_behavior(UndefinedBehavior::Lenient);
        templates.set_keep_trailing_newline(true);
        Self {
            registry,
            ctx,
            mode,
            templates,
            env: ctx.template_value(),
            seen: HashSet::new(),
            requirements: Vec::new(),
            actions: Vec::new(),
            errors: Vec::new(),
            text: String::new(),
        }
    }

    fn run(mut self, tree: &Node, values: &Values) -> Self {
        debug!(mode = ?self.mode, inputs = values.len(), "render pass started");
        let scope = Scope::new(values);
        let mut out = String::new();
        if let Err(err) = self.walk(tree, &scope, Level::default(), &mut out) {
            warn!(%err, "stopping render");
            self.errors.push(err.into());
        }
        self.text = normalize(&out, self.ctx.output.trim);
        self
    }

    fn skip(&mut self, err: PropsError) {
        warn!(%err, "skipping subtree");
        self.errors.push(err.into());
    }

    fn walk(
        &mut self,
        node: &Node,
        scope: &Scope<'_>,
        level: Level,
        out: &mut String,
    ) -> Result<(), FormulaError> {
        match node {
            Node::Empty => Ok(()),
            Node::Text(text) => {
                out.push_str(&self.interpolate(text, scope)?);
                Ok(())
            }
            Node::Literal(text) => {
                out.push_str(text);
                Ok(())
            }
            Node::Fragment(nodes) => self.walk_all(nodes, scope, level, out),
            Node::Element(element) => self.element(element, scope, level, out),
        }
    }

    fn walk_all(
        &mut self,
        nodes: &[Node],
        scope: &Scope<'_>,
        level: Level,
        out: &mut String,
    ) -> Result<(), FormulaError> {
        for node in nodes {
            self.walk(node, scope, level, out)?;
        }
        Ok(())
    }

    fn element(
        &mut self,
        element: &Element,
        scope: &Scope<'_>,
        level: Level,
        out: &mut String,
    ) -> Result<(), FormulaError> {
        if level.depth >= MAX_DEPTH {
            self.skip(PropsError::DepthExceeded {
                tag: element.tag.clone(),
                limit: MAX_DEPTH,
            });
            return Ok(());
        }
        if self.registry.asks_input(&element.tag)
            && let Some(name) = self.unresolved_reference(element.props.get("name"), scope)?
        {
            debug!(tag = %element.tag, name = %name, "input name undecided");
            return Ok(());
        }
        let props = self.interpolate_props(&element.props, scope)?;
        let registry = self.registry;
        match registry.resolve(&element.tag, &props) {
            Ok(Resolved::Intrinsic(intrinsic)) => {
                self.intrinsic(intrinsic, element, &props, scope, level.deeper(), out)
            }
            Ok(Resolved::Component(component)) => {
                self.component(component, element, &props, scope, level.deeper(), out)
            }
            Err(err) => {
                self.skip(err);
                Ok(())
            }
        }
    }

    fn intrinsic(
        &mut self,
        intrinsic: Intrinsic,
        element: &Element,
        props: &Props,
        scope: &Scope<'_>,
        level: Level,
        out: &mut String,
    ) -> Result<(), FormulaError> {
        let children = element.children.as_slice();
        match intrinsic {
            Intrinsic::Fragment => self.walk_all(children, scope, level, out),
            Intrinsic::If => {
                let condition = Condition::parse(props.get("when").unwrap_or(&Value::Null))?;
                if let Some(name) = condition
                    .references()
                    .into_iter()
                    .find(|name| !scope.is_resolved(name))
                {
                    debug!(condition = condition.source(), name = %name, "branch undecided");
                    return Ok(());
                }
                if condition.evaluate(scope) {
                    self.walk_all(children, scope, level, out)?;
                }
                Ok(())
            }
            Intrinsic::ForEach => {
                let binding = props
                    .get("as")
                    .and_then(Value::as_str)
                    .unwrap_or(DEFAULT_LOOP_BINDING);
                let index = props.get("index").and_then(Value::as_str);
                for (i, item) in loop_items(props.get("items"), scope).into_iter().enumerate() {
                    let mut inner = scope.bind(binding, item);
                    if let Some(index) = index {
                        inner = inner.bind(index, Value::from(i));
                    }
                    self.walk_all(children, &inner, level, out)?;
                }
                Ok(())
            }
            Intrinsic::Section => {
                let mut body = String::new();
                let result = self.walk_all(children, scope, level.in_section(), &mut body);
                self.wrap_section(props, level, &body, out);
                result
            }
            Intrinsic::Item => {
                let mut body = String::new();
                let result = self.walk_all(children, scope, level, &mut body);
                let marker = props
                    .get("marker")
                    .and_then(Value::as_str)
                    .unwrap_or(DEFAULT_ITEM_MARKER);
                self.write_item(marker, &body, out);
                result
            }
        }
    }

    fn component(
        &mut self,
        component: &dyn Component,
        element: &Element,
        props: &Props,
        scope: &Scope<'_>,
        level: Level,
        out: &mut String,
    ) -> Result<(), FormulaError> {
        let requirement = match component.requirement(props) {
            Ok(requirement) => requirement,
            Err(err) => {
                self.skip(err);
                return Ok(());
            }
        };
        let resolved = match requirement {
            Some(requirement) => match self.answer(requirement, scope) {
                Ok(resolved) => resolved,
                Err(err) => {
                    self.skip(err);
                    return Ok(());
                }
            },
            None => None,
        };

        if let Some(action) = component.action(props, self.ctx) {
            self.actions.push(action);
        }

        let input = ComponentInput {
            tag: &element.tag,
            props,
            children: &element.children,
            resolved: resolved.as_ref(),
        };
        match component.render(&input, self.ctx) {
            Ok(node) => self.walk(&node, scope, level, out),
            Err(err) => {
                self.skip(err);
                Ok(())
            }
        }
    }

    /// Value an `Ask` leaf prints, recording it as a requirement when unanswered.
    fn answer(
        &mut self,
        requirement: InputRequirement,
        scope: &Scope<'_>,
    ) -> Result<Option<Value>, PropsError> {
        if !self.seen.insert(requirement.name.clone()) {
            return Err(PropsError::DuplicateInput {
                name: requirement.name,
            });
        }
        if let Some(value) = scope.input(&requirement.name) {
            return Ok(Some(value.clone()));
        }
        match self.mode {
            RenderMode::Discovery => {
                debug!(name = %requirement.name, kind = ?requirement.kind, "input discovered");
                self.requirements.push(requirement);
                Ok(None)
            }
            RenderMode::Final => {
                if let Some(default) = requirement.default {
                    return Ok(Some(default));
                }
                if requirement.required {
                    warn!(name = %requirement.name, "required input missing");
                    self.errors.push(RenderError::MissingInput {
                        name: requirement.name,
                    });
                    return Ok(None);
                }
                Ok(Some(requirement.kind.empty_value()))
            }
        }
    }

    fn wrap_section(&self, props: &Props, level: Level, body: &str, out: &mut String) {
        let body = if self.ctx.output.trim { body.trim() } else { body };
        if body.trim().is_empty() {
            return;
        }
        let name = props.get("name").and_then(Value::as_str).unwrap_or_default();
        let style = props
            .get("delimiter")
            .and_then(Value::as_str)
            .and_then(|raw| raw.parse::<DelimiterStyle>().ok())
            .unwrap_or(self.ctx.delimiter);
        match style {
            DelimiterStyle::Xml => {
                out.push_str(&format!("\n\n<{name}>\n{body}\n</{name}>\n\n"));
            }
            DelimiterStyle::Markdown => {
                let hashes = "#".repeat((level.sections + 2).min(6));
                let title = props
                    .get("title")
                    .and_then(Value::as_str)
                    .map_or_else(|| title_case(name), String::from);
                out.push_str(&format!("\n\n{hashes} {title}\n\n{body}\n\n"));
            }
            DelimiterStyle::None => {
                out.push_str(&format!("\n\n{body}\n\n"));
            }
        }
    }

    fn write_item(&self, marker: &str, body: &str, out: &mut String) {
        let body = body.trim();
        if body.is_empty() {
            return;
        }
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        for (i, line) in body.lines().enumerate() {
            if i == 0 {
                out.push_str(marker);
                out.push(' ');
            } else if !line.is_empty() {
                out.push_str(&self.ctx.output.indent);
            }
            out.push_str(line);
            out.push('\n');
        }
    }

    /// Render `text` as a template when it contains template markup.
    fn interpolate<'t>(&self, text: &'t str, scope: &Scope<'_>) -> Result<Cow<'t, str>, FormulaError> {
        if !is_template(text) {
            return Ok(Cow::Borrowed(text));
        }
        self.templates
            .render_str(text, scope.to_template_value(self.env.clone()))
            .map(Cow::Owned)
            .map_err(|err| template_error(text, &err))
    }

    /// First name a templated prop reads that is neither collected nor bound.
    /// `env` is always available.
    fn unresolved_reference(
        &self,
        prop: Option<&Value>,
        scope: &Scope<'_>,
    ) -> Result<Option<String>, FormulaError> {
        let Some(Value::String(text)) = prop else {
            return Ok(None);
        };
        if !is_template(text) {
            return Ok(None);
        }
        let template = self
            .templates
            .template_from_str(text)
            .map_err(|err| template_error(text, &err))?;
        let mut names: Vec<String> = template.undeclared_variables(true).into_iter().collect();
        names.sort_unstable();
        Ok(names.into_iter().find(|name| {
            name.split('.').next() != Some("env") && !scope.is_resolved(name)
        }))
    }

    /// Interpolate string props and string entries of array props.
    fn interpolate_props(&self, props: &Props, scope: &Scope<'_>) -> Result<Props, FormulaError> {
        let mut rendered = Props::new();
        for (key, value) in props {
            let value = match value {
                Value::String(text) => Value::String(self.interpolate(text, scope)?.into_owned()),
                Value::Array(items) => Value::Array(
                    items
                        .iter()
                        .map(|item| match item {
                            Value::String(text) => self
                                .interpolate(text, scope)
                                .map(|text| Value::String(text.into_owned())),
                            other => Ok(other.clone()),
                        })
                        .collect::<Result<_, _>>()?,
                ),
                other => other.clone(),
            };
            rendered.insert(key.clone(), value);
        }
        Ok(rendered)
    }
}

fn is_template(text: &str) -> bool {
    text.contains("{{") || text.contains("{%")
}

fn template_error(text: &str, err: &minijinja::Error) -> FormulaError {
    let offset = err.range().map_or(0, |range| range.start);
    FormulaError::new(text, offset, err.to_string())
}

/// Items a `ForEach` iterates: a literal array, or a name whose value is an
/// array or comma-separated string. Unknown names iterate nothing.
fn loop_items(items: Option<&Value>, scope: &Scope<'_>) -> Vec<Value> {
    let value = match items {
        Some(Value::String(name)) => scope.get(name.trim()),
        Some(other) => other.clone(),
        None => Value::Null,
    };
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items,
        Value::String(text) => text
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| Value::String(part.to_string()))
            .collect(),
        other => vec![other],
    }
}

fn title_case(name: &str) -> String {
    name.split(['-', '_', '.'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapse blank-line runs to one blank line; optionally trim the ends.
fn normalize(text: &str, trim: bool) -> String {
    let collapsed = BLANK_RUNS.replace_all(text, "\n\n");
    if trim {
        collapsed.trim().to_string()
    } else {
        collapsed.into_owned()
    }
}
