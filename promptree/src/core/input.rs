//! Input requirements discovered from `Ask` leaves, and answer validation.

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::ValidationError;
use crate::core::scope::is_blank;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Text,
    Editor,
    Secret,
    Number,
    Select,
    MultiSelect,
    Confirm,
    Date,
    File,
    Path,
    Rating,
}

impl InputKind {
    /// Value used when no answer and no default exist.
    pub fn empty_value(self) -> Value {
        match self {
            InputKind::Number | InputKind::Rating => Value::from(0),
            InputKind::Confirm => Value::Bool(false),
            InputKind::MultiSelect => Value::Array(Vec::new()),
            _ => Value::String(String::new()),
        }
    }
}

/// Constraint an answer must satisfy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Validator {
    /// Whole-string regular expression match.
    Pattern { pattern: String },
    Range {
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    Length {
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<usize>,
    },
    OneOf { options: Vec<String> },
    SubsetOf {
        options: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<usize>,
    },
}

impl Validator {
    fn check(&self, field: &str, value: &Value) -> Option<ValidationError> {
        let fail = |message: String| Some(ValidationError::new(field, message));
        match self {
            Validator::Pattern { pattern } => {
                let text = value.as_str().unwrap_or_default();
                match Regex::new(&format!("^(?:{pattern})$")) {
                    Ok(re) if re.is_match(text) => None,
                    Ok(_) => fail(format!("must match pattern {pattern}")),
                    Err(err) => fail(format!("invalid pattern {pattern}: {err}")),
                }
            }
            Validator::Range { min, max } => {
                let n = value.as_f64().unwrap_or_default();
                match (min, max) {
                    (Some(lo), _) if n < *lo => fail(format!("must be at least {lo}")),
                    (_, Some(hi)) if n > *hi => fail(format!("must be at most {hi}")),
                    _ => None,
                }
            }
            Validator::Length { min, max } => {
                let len = value.as_str().map(|s| s.chars().count()).unwrap_or_default();
                match (min, max) {
                    (Some(lo), _) if len < *lo => fail(format!("must be at least {lo} characters")),
                    (_, Some(hi)) if len > *hi => fail(format!("must be at most {hi} characters")),
                    _ => None,
                }
            }
            Validator::OneOf { options } => {
                let text = value.as_str().unwrap_or_default();
                if options.iter().any(|option| option == text) {
                    None
                } else {
                    fail(format!("must be one of: {}", options.join(", ")))
                }
            }
            Validator::SubsetOf { options, min, max } => {
                let picked: Vec<&str> = value
                    .as_array()
                    .map(|items| items.iter().filter_map(Value::as_str).collect())
                    .unwrap_or_default();
                if let Some(bad) = picked.iter().find(|p| !options.iter().any(|o| o == *p)) {
                    return fail(format!("'{bad}' is not one of: {}", options.join(", ")));
                }
                match (min, max) {
                    (Some(lo), _) if picked.len() < *lo => {
                        fail(format!("pick at least {lo} option(s)"))
                    }
                    (_, Some(hi)) if picked.len() > *hi => {
                        fail(format!("pick at most {hi} option(s)"))
                    }
                    _ => None,
                }
            }
        }
    }
}

/// A single value a render still needs. Identified by `name` alone.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputRequirement {
    pub name: String,
    pub kind: InputKind,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<Validator>,
}

impl InputRequirement {
    pub fn new(name: impl Into<String>, kind: InputKind) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            kind,
            description: None,
            required: true,
            default: None,
            validators: Vec::new(),
        }
    }

    /// Declared default, else the kind's empty value.
    pub fn fallback_value(&self) -> Value {
        self.default
            .clone()
            .unwrap_or_else(|| self.kind.empty_value())
    }

    /// Coerce and check an answer. Returns the value to store.
    pub fn validate(&self, answer: Value) -> Result<Value, Vec<ValidationError>> {
        let value = self.coerce(answer).map_err(|err| vec![err])?;
        if is_blank(&value) {
            if let Some(default) = &self.default {
                return Ok(default.clone());
            }
            if self.required {
                return Err(vec![ValidationError::new(&self.name, "a value is required")]);
            }
            return Ok(self.kind.empty_value());
        }

        let mut errors: Vec<ValidationError> = self
            .validators
            .iter()
            .filter_map(|validator| validator.check(&self.name, &value))
            .collect();
        if self.kind == InputKind::Date {
            let text = value.as_str().unwrap_or_default();
            if NaiveDate::parse_from_str(text, "%Y-%m-%d").is_err() {
                errors.push(ValidationError::new(&self.name, "must be a date (YYYY-MM-DD)"));
            }
        }
        if errors.is_empty() {
            Ok(value)
        } else {
            Err(errors)
        }
    }

    fn coerce(&self, answer: Value) -> Result<Value, ValidationError> {
        let invalid = |what: &str| ValidationError::new(&self.name, format!("must be {what}"));
        match (self.kind, answer) {
            (_, Value::Null) => Ok(Value::Null),
            (InputKind::Number | InputKind::Rating, Value::Number(n)) => Ok(Value::Number(n)),
            (InputKind::Number | InputKind::Rating, Value::String(s)) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(Value::Null);
                }
                if let Ok(int) = trimmed.parse::<i64>() {
                    return Ok(Value::from(int));
                }
                trimmed
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(|| invalid("a number"))
            }
            (InputKind::Number | InputKind::Rating, _) => Err(invalid("a number")),
            (InputKind::Confirm, Value::Bool(b)) => Ok(Value::Bool(b)),
            (InputKind::Confirm, Value::String(s)) => {
                match s.trim().to_ascii_lowercase().as_str() {
                    "" => Ok(Value::Null),
                    "y" | "yes" | "true" | "1" => Ok(Value::Bool(true)),
                    "n" | "no" | "false" | "0" => Ok(Value::Bool(false)),
                    _ => Err(invalid("yes or no")),
                }
            }
            (InputKind::Confirm, _) => Err(invalid("yes or no")),
            (InputKind::MultiSelect, Value::Array(items)) => Ok(Value::Array(items)),
            (InputKind::MultiSelect, Value::String(s)) => Ok(Value::Array(
                s.split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(|part| Value::String(part.to_string()))
                    .collect(),
            )),
            (InputKind::MultiSelect, _) => Err(invalid("a list of options")),
            (_, Value::String(s)) => Ok(Value::String(s)),
            (_, Value::Number(n)) => Ok(Value::String(n.to_string())),
            (_, Value::Bool(b)) => Ok(Value::String(b.to_string())),
            (_, _) => Err(invalid("text")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn requirement(kind: InputKind) -> InputRequirement {
        InputRequirement::new("field", kind)
    }

    #[test]
    fn required_blank_answer_is_rejected() {
        let errors = requirement(InputKind::Text)
            .validate(json!("  "))
            .expect_err("blank");
        assert_eq!(errors, vec![ValidationError::new("field", "a value is required")]);
    }

    #[test]
    fn blank_answer_uses_default() {
        let mut req = requirement(InputKind::Text);
        req.default = Some(json!("fallback"));
        assert_eq!(req.validate(json!("")), Ok(json!("fallback")));
    }

    #[test]
    fn optional_blank_answer_stores_empty_value() {
        let mut req = requirement(InputKind::Confirm);
        req.required = false;
        assert_eq!(req.validate(json!("")), Ok(json!(false)));
    }

    #[test]
    fn numbers_are_coerced_and_range_checked() {
        let mut req = requirement(InputKind::Number);
        req.validators.push(Validator::Range {
            min: Some(1.0),
            max: Some(10.0),
        });
        assert_eq!(req.validate(json!("7")), Ok(json!(7)));
        assert_eq!(req.validate(json!("2.5")), Ok(json!(2.5)));
        assert!(req.validate(json!("11")).is_err());
        assert!(req.validate(json!("many")).is_err());
    }

    #[test]
    fn pattern_must_match_whole_answer() {
        let mut req = requirement(InputKind::Text);
        req.validators.push(Validator::Pattern {
            pattern: "[a-z]+".to_string(),
        });
        assert!(req.validate(json!("abc")).is_ok());
        assert!(req.validate(json!("abc1")).is_err());
    }

    #[test]
    fn select_and_multiselect_options() {
        let options = vec!["bug".to_string(), "feature".to_string()];
        let mut select = requirement(InputKind::Select);
        select.validators.push(Validator::OneOf {
            options: options.clone(),
        });
        assert!(select.validate(json!("bug")).is_ok());
        assert!(select.validate(json!("chore")).is_err());

        let mut multi = requirement(InputKind::MultiSelect);
        multi.validators.push(Validator::SubsetOf {
            options,
            min: Some(1),
            max: None,
        });
        assert_eq!(
            multi.validate(json!("bug, feature")),
            Ok(json!(["bug", "feature"]))
        );
        assert!(multi.validate(json!(["chore"])).is_err());
    }

    #[test]
    fn confirm_accepts_yes_no_words() {
        let req = requirement(InputKind::Confirm);
        assert_eq!(req.validate(json!("Yes")), Ok(json!(true)));
        assert_eq!(req.validate(json!("n")), Ok(json!(false)));
        assert!(req.validate(json!("maybe")).is_err());
    }

    #[test]
    fn dates_must_be_iso() {
        let req = requirement(InputKind::Date);
        assert!(req.validate(json!("2026-10-16")).is_ok());
        assert!(req.validate(json!("16/10/2026")).is_err());
    }

    #[test]
    fn fallback_prefers_default() {
        let mut req = requirement(InputKind::Number);
        assert_eq!(req.fallback_value(), json!(0));
        req.default = Some(json!(3));
        assert_eq!(req.fallback_value(), json!(3));
    }
}
