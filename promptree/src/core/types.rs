//! Shared deterministic types for the render core.
//!
//! These types define stable contracts between core components and callers.
//! They carry no I/O and serialize to a stable JSON shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::RenderError;

/// Collected input values keyed by requirement name.
pub type Values = BTreeMap<String, Value>;

/// How a pass treats unanswered `Ask` leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Record unanswered leaves as requirements; unknown names are neutral.
    Discovery,
    /// Substitute collected values; every required input must be present.
    Final,
}

/// Post-execution request emitted by a render. Executing it is the caller's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    #[serde(rename_all = "camelCase")]
    ReviewFile {
        file: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        editor: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    OpenUrl {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        browser: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    RunCommand {
        command: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cwd: Option<String>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        env: BTreeMap<String, String>,
    },
}

/// Outcome of a final render.
///
/// `ok` is false whenever `errors` is non-empty; `text` is then best-effort.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderResult {
    pub ok: bool,
    pub text: String,
    pub post_execution_actions: Vec<Action>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<RenderError>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn actions_serialize_with_type_tag() {
        let action = Action::RunCommand {
            command: "npm test".to_string(),
            cwd: Some("/repo".to_string()),
            env: BTreeMap::new(),
        };
        assert_eq!(
            serde_json::to_value(&action).expect("serialize"),
            json!({ "type": "runCommand", "command": "npm test", "cwd": "/repo" })
        );
    }

    #[test]
    fn render_result_omits_empty_errors() {
        let result = RenderResult {
            ok: true,
            text: "hi".to_string(),
            post_execution_actions: vec![Action::OpenUrl {
                url: "https://example.com".to_string(),
                browser: None,
            }],
            errors: Vec::new(),
        };
        assert_eq!(
            serde_json::to_value(&result).expect("serialize"),
            json!({
                "ok": true,
                "text": "hi",
                "postExecutionActions": [{ "type": "openUrl", "url": "https://example.com" }]
            })
        );
    }
}
