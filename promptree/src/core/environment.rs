//! Environment resolution: configuration in, read-only render context out.
//!
//! Resolution is pure. Runtime facts (host, user, cwd, clock) are captured by
//! the caller once per render call and passed in, so a discovery pass and the
//! final pass can share one context.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

/// Environment configuration (TOML or JSON). Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub llm: LlmConfig,
    pub output: OutputConfig,
    pub code: CodeConfig,
    pub user: UserConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub model: Option<String>,
    /// Explicit provider; wins over inference from `model`.
    pub provider: Option<String>,
    #[serde(alias = "maxTokens")]
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Preferred response format named by default `Format` sections.
    pub format: Option<String>,
    pub trim: Option<bool>,
    pub indent: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CodeConfig {
    pub language: Option<String>,
    pub highlight: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UserConfig {
    pub editor: Option<String>,
}

pub const DEFAULT_INDENT: &str = "  ";
pub const DEFAULT_FORMAT: &str = "markdown";

/// Target LLM vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Anthropic,
    OpenAi,
    Google,
    Meta,
    Mistral,
    DeepSeek,
    Xai,
    Cohere,
    Unspecified,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Anthropic => "anthropic",
            Provider::OpenAi => "openai",
            Provider::Google => "google",
            Provider::Meta => "meta",
            Provider::Mistral => "mistral",
            Provider::DeepSeek => "deepseek",
            Provider::Xai => "xai",
            Provider::Cohere => "cohere",
            Provider::Unspecified => "unspecified",
        }
    }

    /// Section delimiters the vendor's models follow best.
    pub fn delimiter_style(self) -> DelimiterStyle {
        match self {
            Provider::Anthropic => DelimiterStyle::Xml,
            Provider::Unspecified => DelimiterStyle::None,
            _ => DelimiterStyle::Markdown,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            "openai" => Ok(Provider::OpenAi),
            "google" | "gemini" => Ok(Provider::Google),
            "meta" => Ok(Provider::Meta),
            "mistral" => Ok(Provider::Mistral),
            "deepseek" => Ok(Provider::DeepSeek),
            "xai" | "grok" => Ok(Provider::Xai),
            "cohere" => Ok(Provider::Cohere),
            "unspecified" | "" => Ok(Provider::Unspecified),
            other => Err(format!("unknown provider '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelimiterStyle {
    Xml,
    Markdown,
    None,
}

impl DelimiterStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            DelimiterStyle::Xml => "xml",
            DelimiterStyle::Markdown => "markdown",
            DelimiterStyle::None => "none",
        }
    }
}

impl FromStr for DelimiterStyle {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "xml" => Ok(DelimiterStyle::Xml),
            "markdown" => Ok(DelimiterStyle::Markdown),
            "none" => Ok(DelimiterStyle::None),
            other => Err(format!("unknown delimiter style '{other}'")),
        }
    }
}

/// Model-name prefixes; the longest matching prefix wins.
const MODEL_PREFIXES: &[(&str, Provider)] = &[
    ("claude", Provider::Anthropic),
    ("gpt", Provider::OpenAi),
    ("chatgpt", Provider::OpenAi),
    ("o1", Provider::OpenAi),
    ("o3", Provider::OpenAi),
    ("o4", Provider::OpenAi),
    ("text-davinci", Provider::OpenAi),
    ("gemini", Provider::Google),
    ("gemma", Provider::Google),
    ("palm", Provider::Google),
    ("llama", Provider::Meta),
    ("codellama", Provider::Meta),
    ("mistral", Provider::Mistral),
    ("mixtral", Provider::Mistral),
    ("codestral", Provider::Mistral),
    ("ministral", Provider::Mistral),
    ("pixtral", Provider::Mistral),
    ("deepseek", Provider::DeepSeek),
    ("grok", Provider::Xai),
    ("command", Provider::Cohere),
];

/// Keywords matched anywhere in the name (e.g. `us.anthropic.claude-3-haiku`).
const MODEL_KEYWORDS: &[(&str, Provider)] = &[
    ("claude", Provider::Anthropic),
    ("gpt", Provider::OpenAi),
    ("gemini", Provider::Google),
    ("llama", Provider::Meta),
    ("mistral", Provider::Mistral),
    ("mixtral", Provider::Mistral),
    ("deepseek", Provider::DeepSeek),
    ("grok", Provider::Xai),
];

/// Infer a provider from a model name, `None` when nothing matches.
pub fn infer_provider(model: &str) -> Option<Provider> {
    let lowered = model.trim().to_ascii_lowercase();
    if let Some((vendor, rest)) = lowered.split_once('/') {
        if let Ok(provider) = vendor.parse::<Provider>() {
            if provider != Provider::Unspecified {
                return Some(provider);
            }
        }
        return infer_provider(rest);
    }

    let by_prefix = MODEL_PREFIXES
        .iter()
        .filter(|(prefix, _)| lowered.starts_with(prefix))
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|(_, provider)| *provider);
    by_prefix.or_else(|| {
        MODEL_KEYWORDS
            .iter()
            .find(|(keyword, _)| lowered.contains(keyword))
            .map(|(_, provider)| *provider)
    })
}

/// Host facts captured once per render call.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeFacts {
    pub hostname: String,
    pub username: String,
    pub cwd: String,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputPrefs {
    pub trim: bool,
    pub indent: String,
    pub format: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodePrefs {
    pub language: Option<String>,
    pub highlight: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LlmPrefs {
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

/// Read-only snapshot shared by every pass over one tree.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderContext {
    pub provider: Provider,
    pub delimiter: DelimiterStyle,
    pub output: OutputPrefs,
    pub code: CodePrefs,
    pub llm: LlmPrefs,
    pub editor: Option<String>,
    pub runtime: RuntimeFacts,
}

impl RenderContext {
    /// Copy of this context with a different trim preference.
    pub fn with_trim(&self, trim: bool) -> Self {
        let mut ctx = self.clone();
        ctx.output.trim = trim;
        ctx
    }

    /// Template-visible view exposed as `env` in interpolated props and text.
    pub fn template_value(&self) -> Value {
        json!({
            "provider": self.provider.as_str(),
            "delimiter": self.delimiter.as_str(),
            "model": self.llm.model,
            "maxTokens": self.llm.max_tokens,
            "temperature": self.llm.temperature,
            "format": self.output.format,
            "language": self.code.language,
            "editor": self.editor,
            "hostname": self.runtime.hostname,
            "username": self.runtime.username,
            "cwd": self.runtime.cwd,
            "now": self.runtime.now.to_rfc3339(),
        })
    }
}

/// Build a render context from configuration and captured runtime facts.
pub fn resolve_environment(config: &EnvironmentConfig, runtime: RuntimeFacts) -> RenderContext {
    let provider = resolve_provider(&config.llm);
    let delimiter = provider.delimiter_style();
    debug!(provider = %provider, delimiter = delimiter.as_str(), "resolved environment");

    RenderContext {
        provider,
        delimiter,
        output: OutputPrefs {
            trim: config.output.trim.unwrap_or(true),
            indent: config
                .output
                .indent
                .clone()
                .unwrap_or_else(|| DEFAULT_INDENT.to_string()),
            format: config
                .output
                .format
                .clone()
                .unwrap_or_else(|| DEFAULT_FORMAT.to_string()),
        },
        code: CodePrefs {
            language: config.code.language.clone(),
            highlight: config.code.highlight.unwrap_or(true),
        },
        llm: LlmPrefs {
            model: config.llm.model.clone(),
            max_tokens: config.llm.max_tokens,
            temperature: config.llm.temperature,
        },
        editor: config.user.editor.clone(),
        runtime,
    }
}

fn resolve_provider(llm: &LlmConfig) -> Provider {
    if let Some(raw) = llm.provider.as_deref() {
        match raw.parse::<Provider>() {
            Ok(provider) => return provider,
            Err(err) => warn!(provider = raw, %err, "ignoring unknown provider"),
        }
    }
    llm.model
        .as_deref()
        .and_then(infer_provider)
        .unwrap_or(Provider::Unspecified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixed_runtime;

    fn config_with(model: Option<&str>, provider: Option<&str>) -> EnvironmentConfig {
        EnvironmentConfig {
            llm: LlmConfig {
                model: model.map(str::to_string),
                provider: provider.map(str::to_string),
                ..LlmConfig::default()
            },
            ..EnvironmentConfig::default()
        }
    }

    #[test]
    fn infers_provider_from_model_names() {
        assert_eq!(infer_provider("claude-sonnet-4-5"), Some(Provider::Anthropic));
        assert_eq!(infer_provider("gpt-4o-mini"), Some(Provider::OpenAi));
        assert_eq!(infer_provider("o3-mini"), Some(Provider::OpenAi));
        assert_eq!(infer_provider("gemini-2.0-flash"), Some(Provider::Google));
        assert_eq!(infer_provider("Llama-3.1-70B"), Some(Provider::Meta));
        assert_eq!(infer_provider("codestral-latest"), Some(Provider::Mistral));
        assert_eq!(infer_provider("deepseek-chat"), Some(Provider::DeepSeek));
        assert_eq!(infer_provider("grok-2"), Some(Provider::Xai));
        assert_eq!(infer_provider("something-else"), None);
    }

    #[test]
    fn longest_prefix_wins_over_shorter_prefix() {
        assert_eq!(infer_provider("codellama-34b"), Some(Provider::Meta));
        assert_eq!(infer_provider("chatgpt-4o-latest"), Some(Provider::OpenAi));
    }

    #[test]
    fn vendor_qualified_and_keyword_names() {
        assert_eq!(infer_provider("openai/gpt-4.1"), Some(Provider::OpenAi));
        assert_eq!(
            infer_provider("meta-llama/Llama-3-8b"),
            Some(Provider::Meta)
        );
        assert_eq!(
            infer_provider("us.anthropic.claude-3-haiku"),
            Some(Provider::Anthropic)
        );
    }

    #[test]
    fn explicit_provider_wins_over_model() {
        let ctx = resolve_environment(
            &config_with(Some("claude-3-opus"), Some("openai")),
            fixed_runtime(),
        );
        assert_eq!(ctx.provider, Provider::OpenAi);
        assert_eq!(ctx.delimiter, DelimiterStyle::Markdown);
    }

    #[test]
    fn nothing_configured_is_unspecified_without_delimiters() {
        let ctx = resolve_environment(&EnvironmentConfig::default(), fixed_runtime());
        assert_eq!(ctx.provider, Provider::Unspecified);
        assert_eq!(ctx.delimiter, DelimiterStyle::None);
        assert!(ctx.output.trim);
        assert_eq!(ctx.output.indent, "  ");
        assert!(ctx.code.highlight);
    }

    #[test]
    fn unknown_explicit_provider_falls_back_to_model() {
        let ctx = resolve_environment(
            &config_with(Some("claude-3-opus"), Some("acme")),
            fixed_runtime(),
        );
        assert_eq!(ctx.provider, Provider::Anthropic);
        assert_eq!(ctx.delimiter, DelimiterStyle::Xml);
    }

    #[test]
    fn resolution_is_deterministic() {
        let config = config_with(Some("gpt-4o"), None);
        assert_eq!(
            resolve_environment(&config, fixed_runtime()),
            resolve_environment(&config, fixed_runtime())
        );
    }
}
