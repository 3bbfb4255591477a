//! Prompt tree renderer.
//!
//! Loads a node tree (`--tree prompt.json`) and an environment file
//! (`promptree.toml`), collects the inputs the tree asks for and prints the
//! rendered prompt on stdout.

use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;

use promptree::components::Registry;
use promptree::core::environment::EnvironmentConfig;
use promptree::core::error::RenderError;
use promptree::core::input::InputRequirement;
use promptree::core::iterator::InputIterator;
use promptree::core::renderer::{discover, render_tree};
use promptree::core::types::{RenderResult, Values};
use promptree::io::config::{DEFAULT_ENV_FILE, load_environment, write_environment};
use promptree::io::{answers, runtime, tree_store};
use promptree::render::{RenderOptions, collect_non_interactive};
use promptree::{exit_codes, logging};

#[derive(Parser)]
#[command(
    name = "promptree",
    version,
    about = "Two-phase prompt tree renderer"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a starter environment file if missing.
    Init {
        /// Destination path.
        #[arg(long, default_value = DEFAULT_ENV_FILE)]
        path: PathBuf,
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
    /// Print the inputs the tree still needs, as JSON.
    Inputs(TreeArgs),
    /// Render the tree to text.
    Render {
        #[command(flatten)]
        tree: TreeArgs,
        /// Fill missing inputs with their defaults instead of failing.
        #[arg(long, conflicts_with = "interactive")]
        non_interactive: bool,
        /// Prompt for missing inputs on stderr, reading answers from stdin.
        #[arg(long)]
        interactive: bool,
        /// Print the full render result as JSON.
        #[arg(long)]
        json: bool,
        /// Keep surrounding whitespace in sections and output.
        #[arg(long)]
        no_trim: bool,
    },
}

#[derive(Args)]
struct TreeArgs {
    /// Node tree JSON file.
    #[arg(long)]
    tree: PathBuf,
    /// Environment TOML file.
    #[arg(long, default_value = DEFAULT_ENV_FILE)]
    env: PathBuf,
    /// Pre-supplied answer (`name=value`; JSON values are parsed).
    #[arg(long = "input", value_name = "NAME=VALUE")]
    inputs: Vec<String>,
}

/// Output of `promptree inputs`.
#[derive(Serialize)]
struct InputsReport<'a> {
    requirements: &'a [InputRequirement],
    #[serde(skip_serializing_if = "<[RenderError]>::is_empty")]
    errors: &'a [RenderError],
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { path, force } => cmd_init(&path, force),
        Command::Inputs(args) => cmd_inputs(&args),
        Command::Render {
            tree,
            non_interactive,
            interactive,
            json,
            no_trim,
        } => cmd_render(&tree, non_interactive, interactive, json, no_trim),
    }
}

fn cmd_init(path: &Path, force: bool) -> Result<i32> {
    if !force && path.exists() {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    write_environment(path, &EnvironmentConfig::default())?;
    println!("{}", path.display());
    Ok(exit_codes::OK)
}

fn cmd_inputs(args: &TreeArgs) -> Result<i32> {
    let options = load_options(args)?;
    let tree = tree_store::load_tree(&args.tree)?;
    let registry = Registry::default();
    let ctx = options.context(runtime::capture());
    let discovery = discover(&tree, &registry, &ctx, &options.inputs);
    let report = InputsReport {
        requirements: &discovery.requirements,
        errors: &discovery.errors,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("serialize inputs")?
    );
    Ok(match discovery.fatal() {
        Some(_) => exit_codes::INVALID,
        None => exit_codes::OK,
    })
}

fn cmd_render(
    args: &TreeArgs,
    non_interactive: bool,
    interactive: bool,
    json: bool,
    no_trim: bool,
) -> Result<i32> {
    let mut options = load_options(args)?;
    if no_trim {
        options.trim = Some(false);
    }
    let tree = tree_store::load_tree(&args.tree)?;
    let registry = Registry::default();
    let ctx = options.context(runtime::capture());

    let values = if interactive {
        let mut iterator =
            InputIterator::new(&tree, &registry, &ctx).with_values(options.inputs.clone());
        answers::collect_interactive(&mut iterator, BufReader::new(io::stdin()), io::stderr())?
    } else if non_interactive {
        collect_non_interactive(&tree, &registry, &ctx, options.inputs.clone())?
    } else {
        options.inputs.clone()
    };

    let result = render_tree(&tree, &registry, &ctx, &values);
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("serialize render result")?
        );
    } else {
        println!("{}", result.text);
        for err in &result.errors {
            eprintln!("error: {err}");
        }
    }
    Ok(exit_code(&result))
}

fn exit_code(result: &RenderResult) -> i32 {
    if result.ok {
        exit_codes::OK
    } else if result.errors.iter().any(RenderError::is_fatal) {
        exit_codes::INVALID
    } else {
        exit_codes::INCOMPLETE
    }
}

fn load_options(args: &TreeArgs) -> Result<RenderOptions> {
    Ok(RenderOptions {
        inputs: parse_inputs(&args.inputs)?,
        env: load_environment(&args.env)?,
        trim: None,
    })
}

/// Parse `name=value` pairs. Values that parse as JSON keep their type.
fn parse_inputs(raw: &[String]) -> Result<Values> {
    let mut values = Values::new();
    for pair in raw {
        let Some((name, value)) = pair.split_once('=') else {
            bail!("invalid --input '{pair}': expected NAME=VALUE");
        };
        let name = name.trim();
        if name.is_empty() {
            bail!("invalid --input '{pair}': empty name");
        }
        let value = serde_json::from_str::<Value>(value)
            .unwrap_or_else(|_| Value::String(value.to_string()));
        values.insert(name.to_string(), value);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_render_flags() {
        let cli = Cli::parse_from([
            "promptree",
            "render",
            "--tree",
            "t.json",
            "--input",
            "count=10",
            "--non-interactive",
            "--json",
        ]);
        let Command::Render {
            tree,
            non_interactive,
            interactive,
            json,
            no_trim,
        } = cli.command
        else {
            panic!("expected render");
        };
        assert_eq!(tree.tree, PathBuf::from("t.json"));
        assert_eq!(tree.env, PathBuf::from(DEFAULT_ENV_FILE));
        assert_eq!(tree.inputs, vec!["count=10".to_string()]);
        assert!(non_interactive && json);
        assert!(!interactive && !no_trim);
    }

    #[test]
    fn interactive_conflicts_with_non_interactive() {
        let parsed = Cli::try_parse_from([
            "promptree",
            "render",
            "--tree",
            "t.json",
            "--interactive",
            "--non-interactive",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn inputs_keep_json_types() {
        let values = parse_inputs(&[
            "count=10".to_string(),
            "type=admin".to_string(),
            "tags=[\"a\",\"b\"]".to_string(),
            "note=a=b".to_string(),
        ])
        .expect("parse");
        assert_eq!(values.get("count"), Some(&json!(10)));
        assert_eq!(values.get("type"), Some(&json!("admin")));
        assert_eq!(values.get("tags"), Some(&json!(["a", "b"])));
        assert_eq!(values.get("note"), Some(&json!("a=b")));
        assert!(parse_inputs(&["novalue".to_string()]).is_err());
    }
}
