//! Post-execution leaves. They print nothing and emit an [`Action`].

use std::collections::BTreeMap;

use serde_json::{Value, json};

use crate::components::{Component, ComponentInput, Registry};
use crate::core::environment::RenderContext;
use crate::core::error::PropsError;
use crate::core::types::Action;
use crate::tree::{Node, Props};

pub(super) fn register(registry: &mut Registry) -> Result<(), PropsError> {
    registry.register("PostExecution", PostExecution)?;
    registry.register("ReviewFile", ReviewFile)?;
    registry.register("OpenUrl", OpenUrl)?;
    registry.register("RunCommand", RunCommand)?;
    Ok(())
}

fn string_prop(props: &Props, key: &str) -> Option<String> {
    props.get(key).and_then(Value::as_str).map(String::from)
}

/// Groups post-execution leaves; renders its children unchanged.
pub struct PostExecution;

impl Component for PostExecution {
    fn schema(&self) -> Value {
        json!({ "type": "object", "additionalProperties": false })
    }

    fn render(&self, input: &ComponentInput<'_>, _ctx: &RenderContext) -> Result<Node, PropsError> {
        Ok(Node::Fragment(input.children.to_vec()))
    }
}

pub struct ReviewFile;

impl Component for ReviewFile {
    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file": { "type": "string", "minLength": 1 },
                "editor": { "type": "string" }
            },
            "required": ["file"],
            "additionalProperties": false
        })
    }

    fn render(&self, _input: &ComponentInput<'_>, _ctx: &RenderContext) -> Result<Node, PropsError> {
        Ok(Node::Empty)
    }

    fn action(&self, props: &Props, ctx: &RenderContext) -> Option<Action> {
        Some(Action::ReviewFile {
            file: string_prop(props, "file")?,
            editor: string_prop(props, "editor").or_else(|| ctx.editor.clone()),
        })
    }
}

pub struct OpenUrl;

impl Component for OpenUrl {
    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": { "type": "string", "pattern": "^[A-Za-z][A-Za-z0-9+.-]*://" },
                "browser": { "type": "string" }
            },
            "required": ["url"],
            "additionalProperties": false
        })
    }

    fn render(&self, _input: &ComponentInput<'_>, _ctx: &RenderContext) -> Result<Node, PropsError> {
        Ok(Node::Empty)
    }

    fn action(&self, props: &Props, _ctx: &RenderContext) -> Option<Action> {
        Some(Action::OpenUrl {
            url: string_prop(props, "url")?,
            browser: string_prop(props, "browser"),
        })
    }
}

pub struct RunCommand;

impl Component for RunCommand {
    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": { "type": "string", "minLength": 1 },
                "cwd": { "type": "string" },
                "env": {
                    "type": "object",
                    "additionalProperties": { "type": "string" }
                }
            },
            "required": ["command"],
            "additionalProperties": false
        })
    }

    fn render(&self, _input: &ComponentInput<'_>, _ctx: &RenderContext) -> Result<Node, PropsError> {
        Ok(Node::Empty)
    }

    fn action(&self, props: &Props, _ctx: &RenderContext) -> Option<Action> {
        let env: BTreeMap<String, String> = props
            .get("env")
            .and_then(Value::as_object)
            .map(|vars| {
                vars.iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default();
        Some(Action::RunCommand {
            command: string_prop(props, "command")?,
            cwd: string_prop(props, "cwd"),
            env,
        })
    }
}
