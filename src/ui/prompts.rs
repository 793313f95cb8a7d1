//! Confirmation prompt with a non-interactive fallback

use super::context::UiContext;
use crate::error::{PhpsmithError, PhpsmithResult};

/// Ask for confirmation.
///
/// `--yes` approves without asking; a non-interactive session gets `default`.
pub async fn confirm(ctx: &UiContext, message: &str, default: bool) -> PhpsmithResult<bool> {
    if ctx.auto_yes() {
        return Ok(true);
    }

    if !ctx.is_interactive() {
        return Ok(default);
    }

    let message = message.to_string();
    let result = tokio::task::spawn_blocking(move || {
        cliclack::confirm(&message)
            .initial_value(default)
            .interact()
    })
    .await
    .map_err(|e| PhpsmithError::Internal(format!("prompt task failed: {}", e)))?;

    result.map_err(|e| PhpsmithError::User(format!("Prompt failed: {}", e)))
}
