//! One-shot action commands

use std::io::Write;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::AppContext;

/// Runs `target` (`"<agent>.<actionName>"`) with optional JSON parameters.
///
/// With `json` set the whole result, including structured data, is printed
/// as JSON instead of just its text.
pub async fn run_action(
    ctx: &AppContext,
    target: &str,
    parameters: Option<&str>,
    json: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let parameters = match parameters {
        Some(raw) if !raw.trim().is_empty() => {
            serde_json::from_str(raw).with_context(|| format!("parameters for {target} are not valid JSON"))?
        }
        _ => Value::Null,
    };

    let result = ctx.dispatcher.dispatch(target, parameters).await?;
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&result)?)?;
    } else {
        writeln!(out, "{}", result.text)?;
    }
    Ok(())
}

pub async fn list_recipes(ctx: &AppContext, out: &mut dyn Write) -> Result<()> {
    if !ctx.dispatcher.has_agent("taskflow") {
        writeln!(out, "TaskFlow is disabled.")?;
        return Ok(());
    }
    let result = ctx.dispatcher.dispatch("taskflow.listRecipes", Value::Null).await?;
    writeln!(out, "{}", result.text)?;
    Ok(())
}
