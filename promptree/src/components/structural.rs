//! Structural prompt sections: `Prompt`, `Role`, `Task`, lists and examples.

use serde_json::{Value, json};

use crate::components::{Component, ComponentInput, Intrinsic, Registry, has_content, section};
use crate::core::environment::RenderContext;
use crate::core::error::PropsError;
use crate::tree::{Element, Node};

pub(super) fn register(registry: &mut Registry) -> Result<(), PropsError> {
    registry.register("Prompt", Prompt)?;
    registry.register("Role", Role)?;
    registry.register("Format", Format)?;
    registry.register("Constraints", Constraints)?;
    registry.register("Constraint", Constraint)?;
    registry.register("Steps", Steps)?;
    registry.register("Step", ListItem)?;
    registry.register("Criterion", ListItem)?;
    registry.register("Examples", Examples)?;
    registry.register("Example", Example)?;
    for (tag, name) in [
        ("Task", "task"),
        ("Context", "context"),
        ("Audience", "audience"),
        ("Tone", "tone"),
        ("Objective", "objective"),
        ("SuccessCriteria", "success-criteria"),
    ] {
        registry.register(tag, SimpleSection { name })?;
    }
    Ok(())
}

const DEFAULT_ROLE: &str = "You are a helpful assistant.";

/// Kinds of section `Prompt` fills in by default, in output order.
const DEFAULT_KINDS: [DefaultKind; 3] = [DefaultKind::Role, DefaultKind::Format, DefaultKind::Constraints];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DefaultKind {
    Role,
    Format,
    Constraints,
}

impl DefaultKind {
    fn tag(self) -> &'static str {
        match self {
            DefaultKind::Role => "Role",
            DefaultKind::Format => "Format",
            DefaultKind::Constraints => "Constraints",
        }
    }

    fn slot(self) -> &'static str {
        match self {
            DefaultKind::Role => "role",
            DefaultKind::Format => "format",
            DefaultKind::Constraints => "constraints",
        }
    }

    fn omit_flag(self) -> &'static str {
        match self {
            DefaultKind::Role => "noRole",
            DefaultKind::Format => "noFormat",
            DefaultKind::Constraints => "noConstraints",
        }
    }

    fn default_node(self) -> Node {
        match self {
            DefaultKind::Role | DefaultKind::Format => Element::new(self.tag()).into(),
            DefaultKind::Constraints => Element::new("Constraints")
                .child(
                    Element::new("Constraint")
                        .prop("type", "must")
                        .child("Be accurate and do not invent facts, names or sources."),
                )
                .child(
                    Element::new("Constraint")
                        .prop("type", "should")
                        .child("Keep the response focused on the task."),
                )
                .into(),
        }
    }
}

/// Root component. Adds default role, format and constraint sections.
///
/// For each default kind the first applicable source wins: an explicit child
/// of that kind, then `slots.<kind>`, then the built-in default. `bare` or the
/// kind's `no*` flag removes the built-in default only.
pub struct Prompt;

impl Prompt {
    fn slot(input: &ComponentInput<'_>, kind: DefaultKind) -> Result<Option<Node>, PropsError> {
        let Some(raw) = input
            .props
            .get("slots")
            .and_then(|slots| slots.get(kind.slot()))
        else {
            return Ok(None);
        };
        let node: Node = serde_json::from_value(raw.clone()).map_err(|err| {
            PropsError::component(input.tag, format!("slot '{}': {err}", kind.slot()))
        })?;
        if node.tag() == Some(kind.tag()) {
            return Ok(Some(node));
        }
        Ok(Some(Element::new(kind.tag()).child(node).into()))
    }
}

impl Component for Prompt {
    fn schema(&self) -> Value {
        let slot = json!({ "type": ["string", "array", "object", "null"] });
        json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "description": { "type": "string" },
                "version": { "type": "string" },
                "tags": { "type": "array", "items": { "type": "string" } },
                "bare": { "type": "boolean" },
                "noRole": { "type": "boolean" },
                "noFormat": { "type": "boolean" },
                "noConstraints": { "type": "boolean" },
                "slots": {
                    "type": "object",
                    "properties": { "role": slot, "format": slot, "constraints": slot },
                    "additionalProperties": false
                }
            },
            "additionalProperties": false
        })
    }

    fn render(&self, input: &ComponentInput<'_>, _ctx: &RenderContext) -> Result<Node, PropsError> {
        let flat = Node::flatten(input.children);
        let bare = input.props.get("bare").and_then(Value::as_bool).unwrap_or(false);

        let mut defaults = Vec::new();
        for kind in DEFAULT_KINDS {
            if flat.iter().any(|child| child.tag() == Some(kind.tag())) {
                defaults.push(None);
                continue;
            }
            if let Some(node) = Self::slot(input, kind)? {
                defaults.push(Some(node));
                continue;
            }
            let omitted = bare
                || input
                    .props
                    .get(kind.omit_flag())
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
            defaults.push((!omitted).then(|| kind.default_node()));
        }

        let mut defaults = defaults.into_iter();
        let role = defaults.next().flatten();
        let mut nodes: Vec<Node> = role.into_iter().collect();
        nodes.extend(input.children.iter().cloned());
        nodes.extend(defaults.flatten());
        Ok(Node::Fragment(nodes))
    }
}

pub struct Role;

impl Component for Role {
    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "expertise": { "type": "string" } },
            "additionalProperties": false
        })
    }

    fn render(&self, input: &ComponentInput<'_>, _ctx: &RenderContext) -> Result<Node, PropsError> {
        if has_content(input.children) {
            return Ok(section("role", input.children.to_vec()));
        }
        let text = match input.props.get("expertise").and_then(Value::as_str) {
            Some(expertise) => format!("You are a helpful assistant with expertise in {expertise}."),
            None => DEFAULT_ROLE.to_string(),
        };
        Ok(section("role", Node::literal(text)))
    }
}

/// Section with no behavior beyond wrapping its children.
pub struct SimpleSection {
    pub name: &'static str,
}

impl Component for SimpleSection {
    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "title": { "type": "string" } },
            "additionalProperties": false
        })
    }

    fn render(&self, input: &ComponentInput<'_>, _ctx: &RenderContext) -> Result<Node, PropsError> {
        if !has_content(input.children) {
            return Ok(Node::Empty);
        }
        let mut element = Element::new(Intrinsic::Section.tag())
            .prop("name", self.name)
            .children(input.children.iter().cloned());
        if let Some(title) = input.props.get("title") {
            element = element.prop("title", title.clone());
        }
        Ok(element.into())
    }
}

pub struct Format;

impl Component for Format {
    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "type": { "type": "string" },
                "schema": { "type": "object" },
                "strict": { "type": "boolean" }
            },
            "additionalProperties": false
        })
    }

    fn render(&self, input: &ComponentInput<'_>, ctx: &RenderContext) -> Result<Node, PropsError> {
        let format = input
            .props
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or(ctx.output.format.as_str());
        let mut body = vec![Node::literal(format!("Respond in {format} format.\n"))];
        if input.props.get("strict").and_then(Value::as_bool).unwrap_or(false) {
            body.push(Node::text("Return only the formatted output, with no extra commentary.\n"));
        }
        if let Some(schema) = input.props.get("schema") {
            let pretty = serde_json::to_string_pretty(schema)
                .map_err(|err| PropsError::component(input.tag, err.to_string()))?;
            body.push(Node::literal(format!(
                "The response must match this JSON schema:\n```json\n{pretty}\n```\n"
            )));
        }
        body.extend(input.children.iter().cloned());
        Ok(section("format", body))
    }
}

pub struct Constraints;

impl Component for Constraints {
    fn schema(&self) -> Value {
        json!({ "type": "object", "additionalProperties": false })
    }

    fn render(&self, input: &ComponentInput<'_>, _ctx: &RenderContext) -> Result<Node, PropsError> {
        if !has_content(input.children) {
            return Ok(Node::Empty);
        }
        Ok(section("constraints", input.children.to_vec()))
    }
}

/// One constraint, rendered as a list item with a strength prefix.
pub struct Constraint;

impl Component for Constraint {
    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "type": { "enum": ["must", "should", "may", "must-not", "should-not"] }
            },
            "additionalProperties": false
        })
    }

    fn render(&self, input: &ComponentInput<'_>, _ctx: &RenderContext) -> Result<Node, PropsError> {
        let prefix = match input.props.get("type").and_then(Value::as_str) {
            Some("must") => "MUST: ",
            Some("should") => "SHOULD: ",
            Some("may") => "MAY: ",
            Some("must-not") => "MUST NOT: ",
            Some("should-not") => "SHOULD NOT: ",
            _ => "",
        };
        Ok(Element::new(Intrinsic::Item.tag())
            .child(prefix)
            .children(input.children.iter().cloned())
            .into())
    }
}

/// Plain list entry (`Criterion`, `Step`). Steps carry a `number` marker.
pub struct ListItem;

impl Component for ListItem {
    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "number": { "type": "integer", "minimum": 1 } },
            "additionalProperties": false
        })
    }

    fn render(&self, input: &ComponentInput<'_>, _ctx: &RenderContext) -> Result<Node, PropsError> {
        let mut item = Element::new(Intrinsic::Item.tag());
        if let Some(number) = input.props.get("number").and_then(Value::as_u64) {
            item = item.prop("marker", format!("{number}."));
        }
        Ok(item.children(input.children.iter().cloned()).into())
    }
}

/// Numbered list of `Step` children.
pub struct Steps;

impl Component for Steps {
    fn schema(&self) -> Value {
        json!({ "type": "object", "additionalProperties": false })
    }

    fn render(&self, input: &ComponentInput<'_>, _ctx: &RenderContext) -> Result<Node, PropsError> {
        let mut number = 0u64;
        let children: Vec<Node> = Node::flatten(input.children)
            .into_iter()
            .map(|child| match child {
                Node::Element(step) if step.tag == "Step" => {
                    number += 1;
                    let mut step = step.clone();
                    step.props
                        .entry("number")
                        .or_insert_with(|| Value::from(number));
                    Node::Element(step)
                }
                other => other.clone(),
            })
            .collect();
        if number == 0 && !has_content(&children) {
            return Ok(Node::Empty);
        }
        Ok(section("steps", children))
    }
}

pub struct Examples;

impl Component for Examples {
    fn schema(&self) -> Value {
        json!({ "type": "object", "additionalProperties": false })
    }

    fn render(&self, input: &ComponentInput<'_>, _ctx: &RenderContext) -> Result<Node, PropsError> {
        if !has_content(input.children) {
            return Ok(Node::Empty);
        }
        Ok(section("examples", input.children.to_vec()))
    }
}

pub struct Example;

impl Component for Example {
    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "label": { "type": "string" },
                "input": { "type": "string" },
                "output": { "type": "string" }
            },
            "additionalProperties": false
        })
    }

    fn render(&self, input: &ComponentInput<'_>, _ctx: &RenderContext) -> Result<Node, PropsError> {
        let mut body = Vec::new();
        if let Some(text) = input.props.get("input").and_then(Value::as_str) {
            body.push(Node::literal(format!("Input: {text}\n")));
        }
        body.extend(input.children.iter().cloned());
        if let Some(text) = input.props.get("output").and_then(Value::as_str) {
            body.push(Node::literal(format!("\nOutput: {text}")));
        }
        let title = input
            .props
            .get("label")
            .and_then(Value::as_str)
            .unwrap_or("Example");
        Ok(Element::new(Intrinsic::Section.tag())
            .prop("name", "example")
            .prop("title", title)
            .children(body)
            .into())
    }
}
