//! Error taxonomy for rendering, discovery and input collection.
//!
//! - [`PropsError`]: a component subtree could not render; siblings continue.
//! - [`FormulaError`]: a condition or template is malformed; the walk stops.
//! - [`ValidationError`]: a submitted answer was rejected; local to one submit.
//! - [`IteratorError`]: the collection protocol was driven in the wrong state.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PropsError {
    #[error("unknown component '{tag}'")]
    UnknownComponent { tag: String },

    #[error("invalid props for '{tag}': {}", .messages.join("; "))]
    InvalidProps { tag: String, messages: Vec<String> },

    #[error("duplicate input name '{name}'")]
    DuplicateInput { name: String },

    #[error("'{tag}': {message}")]
    Component { tag: String, message: String },

    #[error("'{tag}': nesting deeper than {limit} elements")]
    DepthExceeded { tag: String, limit: usize },
}

impl PropsError {
    pub fn component(tag: &str, message: impl Into<String>) -> Self {
        PropsError::Component {
            tag: tag.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("malformed expression {expression:?} at offset {offset}: {message}")]
pub struct FormulaError {
    pub expression: String,
    pub offset: usize,
    pub message: String,
}

impl FormulaError {
    pub fn new(expression: &str, offset: usize, message: impl Into<String>) -> Self {
        Self {
            expression: expression.to_string(),
            offset,
            message: message.into(),
        }
    }
}

/// Field-level rejection of a submitted answer.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IteratorError {
    #[error("input iterator has not been started")]
    NotStarted,
    #[error("input iterator was already started")]
    AlreadyStarted,
    #[error("every discovered input is answered; call advance")]
    PendingAdvance,
    #[error("input iterator is done; no requirements remain")]
    Done,
}

/// Any error surfaced by a render or discovery pass.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "type", content = "error", rename_all = "snake_case")]
pub enum RenderError {
    #[error(transparent)]
    Props(#[from] PropsError),

    #[error(transparent)]
    Formula(#[from] FormulaError),

    #[error(transparent)]
    Iterator(#[from] IteratorError),

    #[error("missing value for required input '{name}'")]
    MissingInput { name: String },
}

impl RenderError {
    /// Fatal errors stop the current walk; the rest are collected.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RenderError::Formula(_) | RenderError::Iterator(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_props_lists_every_message() {
        let err = PropsError::InvalidProps {
            tag: "Ask.Text".to_string(),
            messages: vec!["\"name\" is a required property".to_string(), "x".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "invalid props for 'Ask.Text': \"name\" is a required property; x"
        );
    }

    #[test]
    fn only_formula_and_protocol_errors_are_fatal() {
        assert!(RenderError::from(FormulaError::new("=AND(", 5, "eof")).is_fatal());
        assert!(RenderError::from(IteratorError::Done).is_fatal());
        assert!(
            !RenderError::from(PropsError::UnknownComponent {
                tag: "Nope".to_string()
            })
            .is_fatal()
        );
        assert!(
            !RenderError::MissingInput {
                name: "a".to_string()
            }
            .is_fatal()
        );
    }
}
