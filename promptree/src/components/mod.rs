//! Component contract, shared helpers and the tag registry.
//!
//! A component turns its props and children into another [`Node`]; the
//! renderer keeps walking whatever it returns. Props are checked against the
//! component's JSON Schema before `render` is called, so implementations can
//! read them without re-validating types.
//!
//! Intrinsic tags (`If`, `ForEach`, `Section`, `Item`, `Fragment`) are
//! interpreted by the renderer itself and cannot be overridden.

mod actions;
mod ask;
mod structural;
mod utility;

use std::collections::HashMap;

use jsonschema::Validator;
use serde_json::{Value, json};

use crate::core::environment::{DelimiterStyle, Provider, RenderContext};
use crate::core::error::PropsError;
use crate::core::input::InputRequirement;
use crate::core::types::Action;
use crate::tree::{Element, Node, Props};

pub use actions::{OpenUrl, PostExecution, ReviewFile, RunCommand};
pub use ask::Ask;
pub use structural::{
    Constraint, Constraints, Example, Examples, Format, ListItem, Prompt, Role, SimpleSection,
    Steps,
};
pub use utility::{Code, DateTime, Json, RuntimeFact, Timestamp};

/// What a component sees when it renders.
#[derive(Debug, Clone, Copy)]
pub struct ComponentInput<'a> {
    pub tag: &'a str,
    pub props: &'a Props,
    pub children: &'a [Node],
    /// Collected value for an answered `Ask` leaf; `None` otherwise.
    pub resolved: Option<&'a Value>,
}

pub trait Component: Send + Sync {
    /// JSON Schema the props object must satisfy.
    fn schema(&self) -> Value;

    fn render(&self, input: &ComponentInput<'_>, ctx: &RenderContext) -> Result<Node, PropsError>;

    /// Whether this leaf asks for an input named by its `name` prop.
    fn asks_input(&self) -> bool {
        false
    }

    /// Input this leaf asks for. Only `Ask` components return `Some`.
    fn requirement(&self, _props: &Props) -> Result<Option<InputRequirement>, PropsError> {
        Ok(None)
    }

    /// Post-execution request this leaf emits.
    fn action(&self, _props: &Props, _ctx: &RenderContext) -> Option<Action> {
        None
    }

    fn provider(&self, ctx: &RenderContext) -> Provider {
        provider(ctx)
    }

    fn delimiter_style(&self, ctx: &RenderContext) -> DelimiterStyle {
        delimiter_style(ctx)
    }

    fn has_content(&self, children: &[Node]) -> bool {
        has_content(children)
    }
}

pub fn provider(ctx: &RenderContext) -> Provider {
    ctx.provider
}

pub fn delimiter_style(ctx: &RenderContext) -> DelimiterStyle {
    ctx.delimiter
}

/// True if any child would produce visible output (non-blank text or an element).
pub fn has_content(children: &[Node]) -> bool {
    children.iter().any(|child| match child {
        Node::Empty => false,
        Node::Text(text) | Node::Literal(text) => !text.trim().is_empty(),
        Node::Fragment(nodes) => has_content(nodes),
        Node::Element(_) => true,
    })
}

/// Wrap `children` in a delimited section named `name`.
pub fn section(name: &str, children: impl Into<Node>) -> Node {
    Element::new(Intrinsic::Section.tag())
        .prop("name", name)
        .child(children)
        .into()
}

/// Renderer-interpreted tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intrinsic {
    If,
    ForEach,
    Section,
    Item,
    Fragment,
}

impl Intrinsic {
    const ALL: [Intrinsic; 5] = [
        Intrinsic::If,
        Intrinsic::ForEach,
        Intrinsic::Section,
        Intrinsic::Item,
        Intrinsic::Fragment,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Intrinsic::If => "If",
            Intrinsic::ForEach => "ForEach",
            Intrinsic::Section => "Section",
            Intrinsic::Item => "Item",
            Intrinsic::Fragment => "Fragment",
        }
    }

    fn schema(self) -> Value {
        match self {
            Intrinsic::If => json!({
                "type": "object",
                "properties": { "when": { "type": ["string", "boolean"] } },
                "required": ["when"],
                "additionalProperties": false
            }),
            Intrinsic::ForEach => json!({
                "type": "object",
                "properties": {
                    "items": { "type": ["array", "string"] },
                    "as": { "type": "string", "pattern": "^[A-Za-z_][A-Za-z0-9_]*$" },
                    "index": { "type": "string", "pattern": "^[A-Za-z_][A-Za-z0-9_]*$" }
                },
                "required": ["items"],
                "additionalProperties": false
            }),
            Intrinsic::Section => json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string", "pattern": "^[A-Za-z_][A-Za-z0-9_.-]*$" },
                    "title": { "type": "string" },
                    "delimiter": { "enum": ["xml", "markdown", "none"] }
                },
                "required": ["name"],
                "additionalProperties": false
            }),
            Intrinsic::Item => json!({
                "type": "object",
                "properties": { "marker": { "type": "string" } },
                "additionalProperties": false
            }),
            Intrinsic::Fragment => json!({
                "type": "object",
                "additionalProperties": false
            }),
        }
    }
}

/// Outcome of resolving a tag with validated props.
pub enum Resolved<'a> {
    Intrinsic(Intrinsic),
    Component(&'a dyn Component),
}

enum Handler {
    Intrinsic(Intrinsic),
    Component(Box<dyn Component>),
}

struct Entry {
    handler: Handler,
    validator: Validator,
}

/// Maps tags to components and their compiled prop schemas.
pub struct Registry {
    entries: HashMap<String, Entry>,
}

impl Registry {
    /// Registry holding only the intrinsic tags.
    pub fn intrinsics_only() -> Self {
        let mut entries = HashMap::new();
        for intrinsic in Intrinsic::ALL {
            let validator = compile(intrinsic.tag(), &intrinsic.schema())
                .expect("intrinsic schema should be valid");
            entries.insert(
                intrinsic.tag().to_string(),
                Entry {
                    handler: Handler::Intrinsic(intrinsic),
                    validator,
                },
            );
        }
        Self { entries }
    }

    /// Register (or replace) a component under `tag`.
    pub fn register(
        &mut self,
        tag: &str,
        component: impl Component + 'static,
    ) -> Result<(), PropsError> {
        if let Some(Entry {
            handler: Handler::Intrinsic(_),
            ..
        }) = self.entries.get(tag)
        {
            return Err(PropsError::component(tag, "intrinsic tags cannot be replaced"));
        }
        let validator = compile(tag, &component.schema())?;
        self.entries.insert(
            tag.to_string(),
            Entry {
                handler: Handler::Component(Box::new(component)),
                validator,
            },
        );
        Ok(())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.entries.contains_key(tag)
    }

    /// True when `tag` is a component that asks for an input.
    pub fn asks_input(&self, tag: &str) -> bool {
        matches!(
            self.entries.get(tag),
            Some(Entry { handler: Handler::Component(component), .. }) if component.asks_input()
        )
    }

    /// Find the handler for `tag` and check `props` against its schema.
    pub fn resolve(&self, tag: &str, props: &Props) -> Result<Resolved<'_>, PropsError> {
        let entry = self
            .entries
            .get(tag)
            .ok_or_else(|| PropsError::UnknownComponent {
                tag: tag.to_string(),
            })?;

        let instance = Value::Object(props.clone());
        let messages: Vec<String> = entry
            .validator
            .iter_errors(&instance)
            .map(|err| err.to_string())
            .collect();
        if !messages.is_empty() {
            return Err(PropsError::InvalidProps {
                tag: tag.to_string(),
                messages,
            });
        }

        Ok(match &entry.handler {
            Handler::Intrinsic(intrinsic) => Resolved::Intrinsic(*intrinsic),
            Handler::Component(component) => Resolved::Component(component.as_ref()),
        })
    }
}

impl Default for Registry {
    /// Every builtin component.
    fn default() -> Self {
        let mut registry = Self::intrinsics_only();
        structural::register(&mut registry).expect("structural schemas should be valid");
        ask::register(&mut registry).expect("ask schemas should be valid");
        utility::register(&mut registry).expect("utility schemas should be valid");
        actions::register(&mut registry).expect("action schemas should be valid");
        registry
    }
}

fn compile(tag: &str, schema: &Value) -> Result<Validator, PropsError> {
    jsonschema::validator_for(schema)
        .map_err(|err| PropsError::component(tag, format!("invalid schema: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixed_context;

    struct Shout;

    impl Component for Shout {
        fn schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": { "word": { "type": "string" } },
                "required": ["word"],
                "additionalProperties": false
            })
        }

        fn render(
            &self,
            input: &ComponentInput<'_>,
            _ctx: &RenderContext,
        ) -> Result<Node, PropsError> {
            let word = input.props.get("word").and_then(Value::as_str).unwrap_or_default();
            Ok(Node::text(word.to_uppercase()))
        }
    }

    fn props(value: Value) -> Props {
        match value {
            Value::Object(map) => map,
            _ => Props::new(),
        }
    }

    #[test]
    fn unknown_tag_is_props_error() {
        let registry = Registry::default();
        let err = registry
            .resolve("Nope", &Props::new())
            .err()
            .expect("unknown");
        assert_eq!(
            err,
            PropsError::UnknownComponent {
                tag: "Nope".to_string()
            }
        );
    }

    #[test]
    fn schema_violations_are_reported() {
        let mut registry = Registry::intrinsics_only();
        registry.register("Shout", Shout).expect("register");
        let err = registry
            .resolve("Shout", &props(json!({ "word": 3, "extra": true })))
            .err()
            .expect("invalid");
        match err {
            PropsError::InvalidProps { tag, messages } => {
                assert_eq!(tag, "Shout");
                assert_eq!(messages.len(), 2, "{messages:?}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn custom_component_renders() {
        let mut registry = Registry::intrinsics_only();
        registry.register("Shout", Shout).expect("register");
        let props = props(json!({ "word": "hi" }));
        let Ok(Resolved::Component(component)) = registry.resolve("Shout", &props) else {
            panic!("expected component");
        };
        let input = ComponentInput {
            tag: "Shout",
            props: &props,
            children: &[],
            resolved: None,
        };
        let node = component.render(&input, &fixed_context()).expect("render");
        assert_eq!(node, Node::text("HI"));
    }

    #[test]
    fn intrinsic_tags_cannot_be_replaced() {
        let mut registry = Registry::default();
        assert!(registry.register("If", Shout).is_err());
    }

    #[test]
    fn has_content_ignores_blank_text() {
        assert!(!has_content(&[Node::text("  \n"), Node::Empty]));
        assert!(!has_content(&[Node::fragment([Node::text(" ")])]));
        assert!(has_content(&[Node::text("x")]));
        assert!(!has_content(&[Node::literal(" ")]));
        assert!(has_content(&[Element::new("Hostname").into()]));
    }

    #[test]
    fn default_registry_has_builtins() {
        let registry = Registry::default();
        for tag in ["Prompt", "Role", "Ask.Text", "ForEach", "ReviewFile", "Hostname"] {
            assert!(registry.contains(tag), "{tag} missing");
        }
        assert!(registry.asks_input("Ask.Rating"));
        assert!(!registry.asks_input("Role"));
        assert!(!registry.asks_input("If"));
    }
}
