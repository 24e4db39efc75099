//! Gemibot Telegram Bot: a Telegram front end for Google's Gemini models.
//!
//! Connects the Telegram Bot API to `gemibot-core`. Text messages feed a
//! per-chat conversation, photos go to the vision model, and every update
//! is mirrored to an optional activity log channel.

mod activity;
mod commands;
mod format;
mod handlers;
mod startup;

use std::path::PathBuf;
use std::sync::Arc;

use activity::ActivityLog;
use anyhow::Context;
use clap::Parser;
use gemibot_core::config::Rotation;
use gemibot_core::{ChatManager, Config, LlmProvider, create_provider};
use startup::{log_chat, resolve_bot_token};
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing_subscriber::prelude::*;

/// Gemibot Telegram Bot, a Gemini chat bot for Telegram
#[derive(Parser)]
#[command(name = "gemibot-telegram", version)]
struct Args {
    /// Path to a custom config file (overrides default search locations)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,
}

/// Default tracing directives enabling info-level logs for this crate and gemibot-core.
const DEFAULT_DIRECTIVES: &[&str] = &["gemibot_telegram=info", "gemibot_core=info"];

/// Build the default `EnvFilter`: RUST_LOG (if set) plus our default directives.
fn default_env_filter() -> anyhow::Result<tracing_subscriber::EnvFilter> {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in DEFAULT_DIRECTIVES {
        filter = filter.add_directive(directive.parse()?);
    }
    Ok(filter)
}

/// Initialize the tracing subscriber.
///
/// With a `[logging]` section, logs go to stdout and a rolling file.
/// Without one, stdout only.
///
/// Returns the non-blocking writer guard that must be held for the process lifetime.
fn init_tracing(
    config: &Config,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(ref lc) = config.logging else {
        tracing_subscriber::fmt()
            .with_env_filter(default_env_filter()?)
            .init();
        return Ok(None);
    };

    if let Err(e) = std::fs::create_dir_all(&lc.directory) {
        eprintln!(
            "Warning: Failed to create log directory '{}': {}. Falling back to stdout-only.",
            lc.directory, e
        );
        tracing_subscriber::fmt()
            .with_env_filter(default_env_filter()?)
            .init();
        return Ok(None);
    }

    let rotation = match lc.rotation {
        Rotation::Daily => tracing_appender::rolling::Rotation::DAILY,
        Rotation::Hourly => tracing_appender::rolling::Rotation::HOURLY,
        Rotation::Never => tracing_appender::rolling::Rotation::NEVER,
    };

    let file_appender = tracing_appender::rolling::RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix("gemibot-telegram")
        .filename_suffix("log")
        .max_log_files(lc.max_files)
        .build(&lc.directory)
        .context("Failed to create rolling file appender")?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(default_env_filter()?)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(Some(guard))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 1. Config first; tracing depends on it.
    let config = Config::load(args.config.as_deref()).context("Failed to load config")?;

    // 2. Tracing (stdout-only or stdout+file based on config).
    let _guard = init_tracing(&config)?;

    tracing::info!("Starting Gemibot Telegram Bot");

    // 3. Bot token (env var > config file). Never logged.
    let token = resolve_bot_token(&config).context("Failed to obtain bot token")?;
    let bot = Bot::new(token);

    // 4. Gemini provider.
    let provider: Arc<dyn LlmProvider> =
        Arc::from(create_provider(&config).context("Failed to create Gemini provider")?);
    tracing::info!(
        model = %config.gemini.model,
        vision_model = %config.gemini.vision_model,
        "Gemini provider ready"
    );

    let chats = Arc::new(ChatManager::new());
    let activity = ActivityLog::new(bot.clone(), log_chat(&config));
    if config.telegram.log_chat_id.is_none() {
        tracing::info!("No telegram.log_chat_id set; activity goes to tracing only");
    }
    let config = Arc::new(config);

    // 5. Bot identity, required for filter_command parsing.
    let me = bot.get_me().await.context("Failed to fetch bot identity")?;

    // 6. Slash commands for the autocomplete UI. Non-fatal on failure.
    if let Err(e) = bot.set_my_commands(commands::Command::bot_commands()).await {
        tracing::warn!("Failed to register bot commands: {}", e);
    }

    // 7. Known commands route separately from everything else.
    let handler = Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<commands::Command>()
                .endpoint(commands::handle_command),
        )
        .branch(dptree::entry().endpoint(handlers::handle_message));

    tracing::info!("Dispatcher ready, polling for updates as @{}", me.username());

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![me, config, provider, chats, activity])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::info!("Dispatcher stopped, shutting down");
    Ok(())
}
