//! Environment configuration stored as TOML (`promptree.toml` by default).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};

use crate::core::environment::{EnvironmentConfig, Provider};

/// File name looked up in the working directory when no `--env` is given.
pub const DEFAULT_ENV_FILE: &str = "promptree.toml";

/// Check values serde cannot: provider names, indent, temperature range.
pub fn validate_environment(cfg: &EnvironmentConfig) -> Result<()> {
    if let Some(provider) = cfg.llm.provider.as_deref() {
        provider
            .parse::<Provider>()
            .map_err(|err| anyhow!("llm.provider: {err}"))?;
    }
    if let Some(temperature) = cfg.llm.temperature {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(anyhow!("llm.temperature must be within 0..=2"));
        }
    }
    if cfg.llm.max_tokens == Some(0) {
        return Err(anyhow!("llm.max_tokens must be > 0"));
    }
    if let Some(indent) = cfg.output.indent.as_deref() {
        if indent.chars().any(|c| !c.is_whitespace()) {
            return Err(anyhow!("output.indent must contain only whitespace"));
        }
    }
    Ok(())
}

/// Load environment config from a TOML file.
///
/// If the file is missing, returns `EnvironmentConfig::default()`.
pub fn load_environment(path: &Path) -> Result<EnvironmentConfig> {
    if !path.exists() {
        return Ok(EnvironmentConfig::default());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: EnvironmentConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    validate_environment(&cfg).with_context(|| format!("invalid {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_environment(path: &Path, cfg: &EnvironmentConfig) -> Result<()> {
    validate_environment(cfg)?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize environment toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_environment(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, EnvironmentConfig::default());
    }

    #[test]
    fn load_reads_partial_tables() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("promptree.toml");
        fs::write(
            &path,
            "[llm]\nmodel = \"claude-sonnet-4-5\"\nmaxTokens = 2048\n\n[output]\ntrim = false\n",
        )
        .expect("write");
        let cfg = load_environment(&path).expect("load");
        assert_eq!(cfg.llm.model.as_deref(), Some("claude-sonnet-4-5"));
        assert_eq!(cfg.llm.max_tokens, Some(2048));
        assert_eq!(cfg.output.trim, Some(false));
        assert_eq!(cfg.code.highlight, None);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("promptree.toml");
        fs::write(&path, "[llm]\nprovider = \"acme\"\n").expect("write");
        let err = load_environment(&path).expect_err("invalid provider");
        assert!(format!("{err:#}").contains("unknown provider 'acme'"));
    }

    #[test]
    fn validate_checks_ranges() {
        let mut cfg = EnvironmentConfig::default();
        cfg.llm.temperature = Some(2.5);
        assert!(validate_environment(&cfg).is_err());
        cfg.llm.temperature = Some(0.2);
        cfg.output.indent = Some("->".to_string());
        assert!(validate_environment(&cfg).is_err());
        cfg.output.indent = Some("\t".to_string());
        assert!(validate_environment(&cfg).is_ok());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("promptree.toml");
        let mut cfg = EnvironmentConfig::default();
        cfg.llm.provider = Some("openai".to_string());
        cfg.user.editor = Some("code".to_string());
        write_environment(&path, &cfg).expect("write");
        assert_eq!(load_environment(&path).expect("load"), cfg);
    }
}
