//! Startup helpers: bot token and log channel resolution.

use gemibot_core::Config;
use teloxide::types::ChatId;


/// Resolve the bot token with the following priority:
///
/// 1. `TELEGRAM_BOT_TOKEN` environment variable (if set and non-empty).
/// 2. `telegram.token` in `config.toml`.
///
/// The token is **never** passed to any tracing macro.
///
/// # Errors
///
/// Returns an error if neither source provides a token.
pub fn resolve_bot_token(config: &Config) -> anyhow::Result<String> {
    if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN")
        && !token.is_empty()
    {
        return Ok(token);
    }
    config
        .telegram
        .token
        .clone()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Bot token required: set TELEGRAM_BOT_TOKEN env var or telegram.token in config"
            )
        })
}

/// Chat that receives the activity log, if one is configured.
pub fn log_chat(config: &Config) -> Option<ChatId> {
    config.telegram.log_chat_id.map(ChatId)
}
