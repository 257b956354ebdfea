//! Interactive prompts with CI/non-interactive fallback

use super::context::UiContext;
use crate::error::{ShopError, ShopResult};

/// Prompt for confirmation, returns default if non-interactive or auto-yes
pub async fn confirm(ctx: &UiContext, message: &str, default: bool) -> ShopResult<bool> {
    if ctx.auto_yes() {
        println!("  {} (auto-approved)", message);
        return Ok(true);
    }

    if !ctx.is_interactive() {
        return Ok(default);
    }

    // cliclack blocks on stdin
    let message = message.to_string();
    let result = tokio::task::spawn_blocking(move || {
        cliclack::confirm(&message)
            .initial_value(default)
            .interact()
    })
    .await
    .map_err(|e| ShopError::User(format!("Prompt task failed: {}", e)))?;

    result.map_err(|e| ShopError::User(format!("Prompt failed: {}", e)))
}

/// Prompt for a line of text. Non-interactive runs get `default`, or an
/// error naming the flag to pass when there is none.
pub async fn input(
    ctx: &UiContext,
    message: &str,
    default: Option<&str>,
    flag: &str,
) -> ShopResult<String> {
    if !ctx.is_interactive() || ctx.auto_yes() {
        return default
            .map(str::to_string)
            .ok_or_else(|| ShopError::User(format!("{} is required (pass {})", message, flag)));
    }

    let message = message.to_string();
    let default = default.map(str::to_string);
    let result = tokio::task::spawn_blocking(move || {
        let mut prompt = cliclack::input(&message);
        if let Some(default) = default {
            prompt = prompt.default_input(&default);
        }
        prompt.interact::<String>()
    })
    .await
    .map_err(|e| ShopError::User(format!("Prompt task failed: {}", e)))?;

    result.map_err(|e| ShopError::User(format!("Prompt failed: {}", e)))
}
