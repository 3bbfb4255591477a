//! `Ask.*` leaves: each declares one input and renders the collected value.

use regex::Regex;
use serde_json::{Map, Value, json};

use crate::components::{Component, ComponentInput, Registry};
use crate::core::environment::RenderContext;
use crate::core::error::PropsError;
use crate::core::input::{InputKind, InputRequirement, Validator};
use crate::core::scope::display_value;
use crate::tree::{Node, Props};

const KINDS: [(&str, InputKind); 11] = [
    ("Ask.Text", InputKind::Text),
    ("Ask.Editor", InputKind::Editor),
    ("Ask.Secret", InputKind::Secret),
    ("Ask.Number", InputKind::Number),
    ("Ask.Select", InputKind::Select),
    ("Ask.MultiSelect", InputKind::MultiSelect),
    ("Ask.Confirm", InputKind::Confirm),
    ("Ask.Date", InputKind::Date),
    ("Ask.File", InputKind::File),
    ("Ask.Path", InputKind::Path),
    ("Ask.Rating", InputKind::Rating),
];

const DEFAULT_RATING_MAX: f64 = 5.0;

pub(super) fn register(registry: &mut Registry) -> Result<(), PropsError> {
    for (tag, kind) in KINDS {
        registry.register(tag, Ask { kind })?;
    }
    Ok(())
}

pub struct Ask {
    pub kind: InputKind,
}

impl Ask {
    fn kind_properties(&self) -> Map<String, Value> {
        let options = json!({
            "type": "array",
            "minItems": 1,
            "items": {
                "oneOf": [
                    { "type": "string" },
                    {
                        "type": "object",
                        "properties": {
                            "value": { "type": "string" },
                            "label": { "type": "string" }
                        },
                        "required": ["value"],
                        "additionalProperties": false
                    }
                ]
            }
        });
        let extra = match self.kind {
            InputKind::Text | InputKind::Editor | InputKind::Secret => json!({
                "pattern": { "type": "string" },
                "minLength": { "type": "integer", "minimum": 0 },
                "maxLength": { "type": "integer", "minimum": 0 },
                "placeholder": { "type": "string" }
            }),
            InputKind::Number => json!({
                "min": { "type": "number" },
                "max": { "type": "number" }
            }),
            InputKind::Select => json!({ "options": options }),
            InputKind::MultiSelect => json!({
                "options": options,
                "min": { "type": "integer", "minimum": 0 },
                "max": { "type": "integer", "minimum": 1 }
            }),
            InputKind::Rating => json!({ "max": { "type": "integer", "minimum": 1 } }),
            InputKind::File | InputKind::Path => json!({ "mustExist": { "type": "boolean" } }),
            InputKind::Confirm | InputKind::Date => json!({}),
        };
        match extra {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    fn validators(&self, tag: &str, props: &Props) -> Result<Vec<Validator>, PropsError> {
        let number = |key: &str| props.get(key).and_then(Value::as_f64);
        let count = |key: &str| {
            props
                .get(key)
                .and_then(Value::as_u64)
                .and_then(|n| usize::try_from(n).ok())
        };

        let mut validators = Vec::new();
        match self.kind {
            InputKind::Text | InputKind::Editor | InputKind::Secret => {
                if let Some(pattern) = props.get("pattern").and_then(Value::as_str) {
                    Regex::new(pattern).map_err(|err| {
                        PropsError::component(tag, format!("invalid pattern: {err}"))
                    })?;
                    validators.push(Validator::Pattern {
                        pattern: pattern.to_string(),
                    });
                }
                let (min, max) = (count("minLength"), count("maxLength"));
                if min.is_some() || max.is_some() {
                    validators.push(Validator::Length { min, max });
                }
            }
            InputKind::Number => {
                let (min, max) = (number("min"), number("max"));
                if min.is_some() || max.is_some() {
                    validators.push(Validator::Range { min, max });
                }
            }
            InputKind::Rating => validators.push(Validator::Range {
                min: Some(1.0),
                max: Some(number("max").unwrap_or(DEFAULT_RATING_MAX)),
            }),
            InputKind::Select => validators.push(Validator::OneOf {
                options: option_values(props),
            }),
            InputKind::MultiSelect => validators.push(Validator::SubsetOf {
                options: option_values(props),
                min: count("min"),
                max: count("max"),
            }),
            InputKind::Confirm | InputKind::Date | InputKind::File | InputKind::Path => {}
        }
        Ok(validators)
    }
}

fn option_values(props: &Props) -> Vec<String> {
    props
        .get("options")
        .and_then(Value::as_array)
        .map(|options| {
            options
                .iter()
                .filter_map(|option| match option {
                    Value::String(value) => Some(value.clone()),
                    Value::Object(map) => map.get("value").and_then(Value::as_str).map(String::from),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

impl Component for Ask {
    fn schema(&self) -> Value {
        let mut properties = match json!({
            "name": { "type": "string", "pattern": "^[A-Za-z_][A-Za-z0-9_]*$" },
            "label": { "type": "string" },
            "description": { "type": "string" },
            "required": { "type": "boolean" },
            "default": {}
        }) {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        properties.extend(self.kind_properties());
        json!({
            "type": "object",
            "properties": properties,
            "required": ["name"],
            "additionalProperties": false
        })
    }

    fn render(&self, input: &ComponentInput<'_>, _ctx: &RenderContext) -> Result<Node, PropsError> {
        Ok(input
            .resolved
            .map(|value| Node::literal(display_value(value)))
            .unwrap_or_default())
    }

    fn asks_input(&self) -> bool {
        true
    }

    fn requirement(&self, props: &Props) -> Result<Option<InputRequirement>, PropsError> {
        let tag = KINDS
            .iter()
            .find(|(_, kind)| *kind == self.kind)
            .map_or("Ask", |(tag, _)| tag);
        let name = props
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| PropsError::component(tag, "missing name"))?;

        let mut requirement = InputRequirement::new(name, self.kind);
        if let Some(label) = props.get("label").and_then(Value::as_str) {
            requirement.label = label.to_string();
        }
        requirement.description = props
            .get("description")
            .and_then(Value::as_str)
            .map(String::from);
        requirement.required = props
            .get("required")
            .and_then(Value::as_bool)
            .unwrap_or(true);
        requirement.default = props.get("default").filter(|v| !v.is_null()).cloned();
        requirement.validators = self.validators(tag, props)?;
        Ok(Some(requirement))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Resolved;
    use crate::test_support::fixed_context;

    fn props(value: Value) -> Props {
        match value {
            Value::Object(map) => map,
            _ => Props::new(),
        }
    }

    fn requirement_for(tag: &str, value: Value) -> Result<Option<InputRequirement>, PropsError> {
        let registry = Registry::default();
        let props = props(value);
        match registry.resolve(tag, &props)? {
            Resolved::Component(component) => component.requirement(&props),
            Resolved::Intrinsic(_) => Ok(None),
        }
    }

    #[test]
    fn text_requirement_carries_label_and_pattern() {
        let req = requirement_for(
            "Ask.Text",
            json!({ "name": "ticket", "label": "Ticket id", "pattern": "[A-Z]+-[0-9]+" }),
        )
        .expect("valid")
        .expect("requirement");
        assert_eq!(req.name, "ticket");
        assert_eq!(req.label, "Ticket id");
        assert!(req.required);
        assert!(req.validate(json!("ABC-12")).is_ok());
        assert!(req.validate(json!("abc")).is_err());
    }

    #[test]
    fn invalid_pattern_is_props_error() {
        let err = requirement_for("Ask.Text", json!({ "name": "x", "pattern": "(" }))
            .expect_err("bad regex");
        assert!(matches!(err, PropsError::Component { .. }), "{err:?}");
    }

    #[test]
    fn select_options_accept_labelled_entries() {
        let req = requirement_for(
            "Ask.Select",
            json!({
                "name": "type",
                "options": ["user", { "value": "admin", "label": "Administrator" }]
            }),
        )
        .expect("valid")
        .expect("requirement");
        assert_eq!(
            req.validators,
            vec![Validator::OneOf {
                options: vec!["user".to_string(), "admin".to_string()]
            }]
        );
    }

    #[test]
    fn rating_defaults_to_five_stars() {
        let req = requirement_for("Ask.Rating", json!({ "name": "score" }))
            .expect("valid")
            .expect("requirement");
        assert!(req.validate(json!(5)).is_ok());
        assert!(req.validate(json!(6)).is_err());
    }

    #[test]
    fn unknown_kind_prop_is_rejected() {
        let err = requirement_for("Ask.Confirm", json!({ "name": "ok", "options": ["y"] }))
            .expect_err("schema");
        assert!(matches!(err, PropsError::InvalidProps { .. }), "{err:?}");
    }

    #[test]
    fn renders_resolved_value() {
        let ask = Ask {
            kind: InputKind::MultiSelect,
        };
        let props = props(json!({ "name": "tags" }));
        let value = json!(["a", "b"]);
        let input = ComponentInput {
            tag: "Ask.MultiSelect",
            props: &props,
            children: &[],
            resolved: Some(&value),
        };
        let node = ask.render(&input, &fixed_context()).expect("render");
        assert_eq!(node, Node::literal("a, b"));
    }
}
