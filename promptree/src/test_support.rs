//! Test-only helpers for building contexts, trees and value maps.

use chrono::{TimeZone, Utc};
use serde_json::Value;

use crate::core::environment::{
    EnvironmentConfig, LlmConfig, Provider, RenderContext, RuntimeFacts, resolve_environment,
};
use crate::core::types::Values;
use crate::tree::{Element, Node};

/// Deterministic host facts.
pub fn fixed_runtime() -> RuntimeFacts {
    RuntimeFacts {
        hostname: "devbox".to_string(),
        username: "ada".to_string(),
        cwd: "/work/project".to_string(),
        now: Utc
            .with_ymd_and_hms(2026, 3, 14, 15, 9, 26)
            .single()
            .unwrap_or_default(),
    }
}

/// Context with nothing configured: unspecified provider, no delimiters.
pub fn fixed_context() -> RenderContext {
    resolve_environment(&EnvironmentConfig::default(), fixed_runtime())
}

/// Context for an explicit provider.
pub fn context_for(provider: Provider) -> RenderContext {
    let config = EnvironmentConfig {
        llm: LlmConfig {
            provider: Some(provider.as_str().to_string()),
            ..LlmConfig::default()
        },
        ..EnvironmentConfig::default()
    };
    resolve_environment(&config, fixed_runtime())
}

/// Required `Ask.Text` leaf named `name`.
pub fn ask_text(name: &str) -> Node {
    Element::new("Ask.Text").prop("name", name).into()
}

/// Value map from `(name, value)` pairs.
pub fn values<'a, I>(pairs: I) -> Values
where
    I: IntoIterator<Item = (&'a str, Value)>,
{
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}
