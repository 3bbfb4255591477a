//! Line-based answer collection for interactive CLI renders.

use std::io::{BufRead, Write};

use anyhow::{Context, Result, bail};
use serde_json::Value;

use crate::core::error::IteratorError;
use crate::core::input::{InputRequirement, Validator};
use crate::core::iterator::{InputIterator, SubmitResult};
use crate::core::scope::display_value;
use crate::core::types::Values;

/// Drive `iterator` to completion, prompting on `output` and reading one
/// answer per line from `input`. Rejected answers are re-prompted.
pub fn collect_interactive<R, W>(
    iterator: &mut InputIterator<'_>,
    mut input: R,
    mut output: W,
) -> Result<Values>
where
    R: BufRead,
    W: Write,
{
    if matches!(iterator.current(), Err(IteratorError::NotStarted)) {
        iterator.start()?;
    }
    while !iterator.is_done() {
        let requirement = iterator.current()?;
        let name = requirement.name.clone();
        write_prompt(&mut output, requirement)?;

        let mut line = String::new();
        let read = input.read_line(&mut line).context("read answer")?;
        if read == 0 {
            bail!("input closed before '{name}' was answered");
        }
        let answer = Value::String(line.trim_end_matches(['\r', '\n']).to_string());

        match iterator.submit(answer)? {
            SubmitResult::Accepted => iterator.advance()?,
            SubmitResult::Rejected(errors) => {
                for err in errors {
                    writeln!(output, "  ! {}", err.message).context("write prompt")?;
                }
            }
        }
    }
    Ok(iterator.values().clone())
}

fn write_prompt<W: Write>(output: &mut W, requirement: &InputRequirement) -> Result<()> {
    if let Some(description) = &requirement.description {
        writeln!(output, "{description}").context("write prompt")?;
    }
    let mut hints = Vec::new();
    for validator in &requirement.validators {
        match validator {
            Validator::OneOf { options } | Validator::SubsetOf { options, .. } => {
                hints.push(options.join("/"));
            }
            Validator::Range {
                min: Some(min),
                max: Some(max),
            } => hints.push(format!("{min}-{max}")),
            _ => {}
        }
    }
    if let Some(default) = &requirement.default {
        hints.push(format!("default: {}", display_value(default)));
    }
    let hint = if hints.is_empty() {
        String::new()
    } else {
        format!(" [{}]", hints.join(", "))
    };
    write!(output, "{}{}: ", requirement.label, hint).context("write prompt")?;
    output.flush().context("flush prompt")
}
