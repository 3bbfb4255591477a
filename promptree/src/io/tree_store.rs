//! Node tree loading with schema validation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use jsonschema::Draft;
use serde_json::Value;

use crate::tree::Node;

/// JSON Schema for the node tree wire form.
pub const NODE_TREE_SCHEMA: &str = include_str!("../../../schemas/node_tree/v1.schema.json");

/// Load a node tree from a JSON file, checking it against the v1 schema.
pub fn load_tree(path: &Path) -> Result<Node> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read tree {}", path.display()))?;
    parse_tree(&contents).with_context(|| format!("load tree {}", path.display()))
}

/// Parse and validate a node tree from JSON text.
pub fn parse_tree(contents: &str) -> Result<Node> {
    let value: Value = serde_json::from_str(contents).context("parse tree json")?;
    validate_schema(&value)?;
    serde_json::from_value(value).context("deserialize tree")
}

fn validate_schema(tree: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(NODE_TREE_SCHEMA).context("parse tree schema")?;
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .map_err(|err| anyhow!("invalid schema: {}", err))?;
    let messages: Vec<String> = compiled
        .iter_errors(tree)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        return Err(anyhow!(
            "tree schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Element;

    #[test]
    fn loads_tree_from_disk() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("tree.json");
        fs::write(
            &path,
            r#"{ "tag": "Prompt", "props": { "bare": true }, "children": [
                "Hello ",
                { "tag": "Ask.Text", "props": { "name": "who" } },
                null,
                ["!"]
            ] }"#,
        )
        .expect("write tree");

        let tree = load_tree(&path).expect("load tree");
        let expected: Node = Element::new("Prompt")
            .prop("bare", true)
            .child("Hello ")
            .child(Element::new("Ask.Text").prop("name", "who"))
            .child(Node::Empty)
            .child(Node::fragment(["!"]))
            .into();
        assert_eq!(tree, expected);
    }

    #[test]
    fn schema_rejects_unknown_element_keys() {
        let err = parse_tree(r#"{ "tag": "Task", "kids": [] }"#).expect_err("invalid");
        assert!(format!("{err:#}").contains("tree schema validation failed"));
    }

    #[test]
    fn schema_rejects_numbers() {
        assert!(parse_tree("[1]").is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_tree(Path::new("/nonexistent/tree.json")).expect_err("missing");
        assert!(format!("{err:#}").contains("/nonexistent/tree.json"));
    }
}
