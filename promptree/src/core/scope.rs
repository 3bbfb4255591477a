//! Name lookup for conditions, loops and templates.
//!
//! A [`Scope`] layers loop bindings over the collected input values. Lookups
//! of names that are neither bound nor collected return `Value::Null`, the
//! neutral value: it reads as `0`, `""` or `false` depending on use.

use serde_json::{Map, Value};

use crate::core::types::Values;

#[derive(Debug, Clone)]
pub struct Scope<'a> {
    values: &'a Values,
    locals: Vec<(String, Value)>,
}

impl<'a> Scope<'a> {
    pub fn new(values: &'a Values) -> Self {
        Self {
            values,
            locals: Vec::new(),
        }
    }

    /// Child scope with `name` bound to `value` (shadows outer bindings).
    pub fn bind(&self, name: &str, value: Value) -> Scope<'a> {
        let mut locals = self.locals.clone();
        locals.push((name.to_string(), value));
        Scope {
            values: self.values,
            locals,
        }
    }

    /// Collected value for an input name; loop bindings are not consulted.
    pub fn input(&self, name: &str) -> Option<&'a Value> {
        self.values.get(name)
    }

    /// Look up a possibly dotted name (`user.role`, `items.0`).
    pub fn get(&self, path: &str) -> Value {
        let mut segments = path.split('.');
        let root = segments.next().unwrap_or_default();
        let Some(mut current) = self.root(root) else {
            return Value::Null;
        };
        for segment in segments {
            let next = match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            match next {
                Some(value) => current = value,
                None => return Value::Null,
            }
        }
        current.clone()
    }

    /// True when the root segment of `path` is bound or collected.
    pub fn is_resolved(&self, path: &str) -> bool {
        let root = path.split('.').next().unwrap_or_default();
        self.root(root).is_some()
    }

    fn root(&self, name: &str) -> Option<&Value> {
        self.locals
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
            .or_else(|| self.values.get(name))
    }

    /// Flattened view for template rendering: inputs, then loop bindings.
    pub fn to_template_value(&self, env: Value) -> Value {
        let mut map: Map<String, Value> = self
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (name, value) in &self.locals {
            map.insert(name.clone(), value.clone());
        }
        map.insert("env".to_string(), env);
        Value::Object(map)
    }
}

/// Truthiness of a value; the neutral value is falsy.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Null, whitespace-only strings and empty collections are blank.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Text form of a value as it appears in rendered output.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_names_are_neutral() {
        let values = Values::new();
        let scope = Scope::new(&values);
        assert_eq!(scope.get("nope"), Value::Null);
        assert_eq!(scope.get("nope.deeper"), Value::Null);
        assert!(!scope.is_resolved("nope"));
    }

    #[test]
    fn bindings_shadow_inputs() {
        let values: Values = [("t".to_string(), json!("outer"))].into_iter().collect();
        let scope = Scope::new(&values);
        let inner = scope.bind("t", json!("inner"));
        assert_eq!(inner.get("t"), json!("inner"));
        assert_eq!(scope.get("t"), json!("outer"));
        assert_eq!(inner.input("t"), Some(&json!("outer")));
    }

    #[test]
    fn dotted_paths_walk_objects_and_arrays() {
        let values: Values = [("cfg".to_string(), json!({ "tags": ["a", "b"] }))]
            .into_iter()
            .collect();
        let scope = Scope::new(&values);
        assert_eq!(scope.get("cfg.tags.1"), json!("b"));
        assert!(scope.is_resolved("cfg.missing"));
    }

    #[test]
    fn display_joins_arrays() {
        assert_eq!(display_value(&json!(["a", 2, true])), "a, 2, true");
        assert_eq!(display_value(&Value::Null), "");
        assert_eq!(display_value(&json!(1.5)), "1.5");
    }
}
