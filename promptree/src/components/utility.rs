//! Leaves that print runtime facts, dates, code blocks and JSON.

use std::fmt::Write as _;

use serde_json::{Value, json};

use crate::components::{Component, ComponentInput, Registry};
use crate::core::environment::RenderContext;
use crate::core::error::PropsError;
use crate::tree::Node;

pub(super) fn register(registry: &mut Registry) -> Result<(), PropsError> {
    registry.register("Hostname", RuntimeFact::Hostname)?;
    registry.register("Username", RuntimeFact::Username)?;
    registry.register("Cwd", RuntimeFact::Cwd)?;
    registry.register("DateTime", DateTime)?;
    registry.register("Timestamp", Timestamp)?;
    registry.register("Code", Code)?;
    registry.register("Json", Json)?;
    Ok(())
}

fn no_props() -> Value {
    json!({ "type": "object", "additionalProperties": false })
}

/// Host fact captured when the render call started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeFact {
    Hostname,
    Username,
    Cwd,
}

impl Component for RuntimeFact {
    fn schema(&self) -> Value {
        no_props()
    }

    fn render(&self, _input: &ComponentInput<'_>, ctx: &RenderContext) -> Result<Node, PropsError> {
        let runtime = &ctx.runtime;
        let text = match self {
            RuntimeFact::Hostname => &runtime.hostname,
            RuntimeFact::Username => &runtime.username,
            RuntimeFact::Cwd => &runtime.cwd,
        };
        Ok(Node::literal(text.clone()))
    }
}

const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Render-call time in UTC, strftime-formatted.
pub struct DateTime;

impl Component for DateTime {
    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "format": { "type": "string", "minLength": 1 } },
            "additionalProperties": false
        })
    }

    fn render(&self, input: &ComponentInput<'_>, ctx: &RenderContext) -> Result<Node, PropsError> {
        let format = input
            .props
            .get("format")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_DATETIME_FORMAT);
        let mut text = String::new();
        write!(text, "{}", ctx.runtime.now.format(format)).map_err(|_| {
            PropsError::component(input.tag, format!("invalid date format '{format}'"))
        })?;
        Ok(Node::literal(text))
    }
}

/// Render-call time as a Unix timestamp.
pub struct Timestamp;

impl Component for Timestamp {
    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "unit": { "enum": ["seconds", "millis"] } },
            "additionalProperties": false
        })
    }

    fn render(&self, input: &ComponentInput<'_>, ctx: &RenderContext) -> Result<Node, PropsError> {
        let now = ctx.runtime.now;
        let value = match input.props.get("unit").and_then(Value::as_str) {
            Some("millis") => now.timestamp_millis(),
            _ => now.timestamp(),
        };
        Ok(Node::literal(value.to_string()))
    }
}

/// Fenced code block. Language comes from the prop, then the environment.
pub struct Code;

impl Component for Code {
    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "language": { "type": "string" } },
            "additionalProperties": false
        })
    }

    fn render(&self, input: &ComponentInput<'_>, ctx: &RenderContext) -> Result<Node, PropsError> {
        let language = input
            .props
            .get("language")
            .and_then(Value::as_str)
            .or(ctx.code.language.as_deref())
            .filter(|_| ctx.code.highlight)
            .unwrap_or_default();
        let mut nodes = vec![Node::literal(format!("\n```{language}\n"))];
        nodes.extend(input.children.iter().cloned().map(Node::into_literal));
        nodes.push(Node::literal("\n```\n"));
        Ok(Node::Fragment(nodes))
    }
}

/// Serialized `data` prop.
pub struct Json;

impl Component for Json {
    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "data": {},
                "pretty": { "type": "boolean" }
            },
            "required": ["data"],
            "additionalProperties": false
        })
    }

    fn render(&self, input: &ComponentInput<'_>, _ctx: &RenderContext) -> Result<Node, PropsError> {
        let data = input.props.get("data").unwrap_or(&Value::Null);
        let pretty = input.props.get("pretty").and_then(Value::as_bool).unwrap_or(true);
        let text = if pretty {
            serde_json::to_string_pretty(data)
        } else {
            serde_json::to_string(data)
        }
        .map_err(|err| PropsError::component(input.tag, err.to_string()))?;
        Ok(Node::literal(text))
    }
}
