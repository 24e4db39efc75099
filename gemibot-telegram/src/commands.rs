//! Telegram bot slash-command handlers for Gemibot.
//!
//! Public commands cover help, conversation reset, id lookups, the model
//! catalog and the speed test joke. Hidden admin commands send messages on
//! the bot's behalf or dump configuration to the activity log when debug
//! mode is on.

use std::sync::Arc;
use std::time::Duration;

use gemibot_core::conversation::NEW_CHAT_REPLY;
use gemibot_core::models::format_catalog;
use gemibot_core::provider::{ModelSummary, resolve_api_key};
use gemibot_core::text::mask_secret;
use gemibot_core::{ChatManager, Config, LlmProvider, is_admin};
use teloxide::prelude::*;
use teloxide::types::{Message as TgMessage, Recipient};
use teloxide::utils::command::BotCommands;

use crate::activity::{self, ActivityLog, Sender};
use crate::format::escape_html;
use crate::handlers::{COMMAND_FORMAT_ERROR_REPLY, admit, send_reply};


/// Greeting shown above the command list.
pub const HELP_TEXT: &str = "Hi! I'm a Gemini-powered chat bot. Send me a message to talk, \
    or a photo with a question about it. Use /new to forget the conversation.";

/// Reply to a non-admin calling an admin command.
pub const ADMIN_ONLY_REPLY: &str = "This command is only available to the bot admins.";

/// Reply to a debug command while debug mode is off.
pub const DEBUG_MODE_OFF_REPLY: &str =
    "Debug mode is off. Enable telegram.debug_mode to use this command.";

const SPEED_TEST_START: &str = "Starting speed test";

const SPEED_TEST_RESULT: &str = "Test complete, your 5G speed is:\n**114514B/s**";

const SPEED_TEST_DELAY: Duration = Duration::from_secs(5);

// `///` docs on this enum would leak into the command descriptions.
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "snake_case", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "Show the welcome text")]
    Start,
    #[command(description = "Show available commands")]
    Help,
    #[command(description = "Start a fresh chat")]
    New,
    #[command(description = "Show your Telegram id")]
    GetMyInfo,
    #[command(description = "Show this group's id")]
    GetGroupInfo,
    #[command(rename = "5g_test", description = "Test your 5G speed")]
    SpeedTest,
    #[command(description = "List the Gemini models")]
    Models,
    // `/send_message <chat_id|@channel> <text>`, admins only.
    #[command(hide)]
    SendMessage(String),
    #[command(hide)]
    GetAllowedUsers,
    #[command(hide)]
    GetAllowedGroups,
    #[command(hide)]
    GetApiKey,
    // Models the API key can call with `generateContent`.
    #[command(hide)]
    ListModels,
}

impl Command {
    /// Commands that dump configuration and need debug mode.
    fn needs_debug(&self) -> bool {
        matches!(
            self,
            Command::GetAllowedUsers
                | Command::GetAllowedGroups
                | Command::GetApiKey
                | Command::ListModels
        )
    }

    fn needs_admin(&self) -> bool {
        self.needs_debug() || matches!(self, Command::SendMessage(_))
    }
}

/// Entry-point handler for all slash commands.
///
/// Logs and authorizes the update like any other message, then dispatches.
/// Replies are logged together with the command text.
pub async fn handle_command(
    bot: Bot,
    msg: TgMessage,
    cmd: Command,
    config: Arc<Config>,
    provider: Arc<dyn LlmProvider>,
    chats: Arc<ChatManager>,
    activity: ActivityLog,
) -> ResponseResult<()> {
    let Some(sender) = admit(&bot, &msg, &config, &activity).await? else {
        return Ok(());
    };

    let reply = match command_gate(&config, sender.user_id, &cmd) {
        Err(reply) => Some(reply.to_string()),
        Ok(()) => {
            execute(
                &bot,
                &msg,
                cmd,
                &sender,
                &config,
                provider.as_ref(),
                &chats,
                &activity,
            )
            .await?
        }
    };

    if let Some(reply) = reply {
        send_reply(&bot, msg.chat.id, &reply, None).await?;
        activity
            .send(&activity::exchange(
                &sender,
                msg.text().unwrap_or_default(),
                &reply,
                None,
            ))
            .await;
    }
    Ok(())
}

/// Run a command that passed the gate. Returns the chat reply, if any.
#[allow(clippy::too_many_arguments)]
async fn execute(
    bot: &Bot,
    msg: &TgMessage,
    cmd: Command,
    sender: &Sender,
    config: &Config,
    provider: &dyn LlmProvider,
    chats: &ChatManager,
    activity: &ActivityLog,
) -> ResponseResult<Option<String>> {
    let reply = match cmd {
        Command::Start | Command::Help => Some(help_text()),
        Command::New => {
            chats.reset(msg.chat.id.0).await;
            Some(NEW_CHAT_REPLY.to_string())
        }
        Command::GetMyInfo => Some(my_info_reply(sender.user_id)),
        Command::GetGroupInfo => Some(group_info_reply(sender.is_group, sender.chat_id)),
        Command::SpeedTest => {
            bot.send_message(msg.chat.id, SPEED_TEST_START).await?;
            tokio::time::sleep(SPEED_TEST_DELAY).await;
            Some(SPEED_TEST_RESULT.to_string())
        }
        Command::Models => Some(format_catalog()),
        Command::SendMessage(args) => match parse_send_message_args(&args) {
            Ok((recipient, text)) => {
                relay_message(bot, recipient, text, activity).await;
                None
            }
            Err(reply) => Some(reply.to_string()),
        },
        Command::GetAllowedUsers => {
            activity
                .send(&json_entry(&serde_json::json!(
                    config.access.allowed_users
                )))
                .await;
            None
        }
        Command::GetAllowedGroups => {
            activity
                .send(&json_entry(&serde_json::json!(
                    config.access.allowed_groups
                )))
                .await;
            None
        }
        Command::GetApiKey => {
            let entry = match resolve_api_key(config) {
                Ok(key) => json_entry(&serde_json::json!({ "api_key": mask_secret(&key) })),
                Err(e) => format!("err:\n{}", escape_html(&e.to_string())),
            };
            activity.send(&entry).await;
            None
        }
        Command::ListModels => {
            let entry = match provider.list_models().await {
                Ok(models) => json_entry(&serde_json::json!(format_model_names(&models))),
                Err(e) => {
                    tracing::error!("Failed to list models: {}", e);
                    format!("err:\n{}", escape_html(&e.to_string()))
                }
            };
            activity.send(&entry).await;
            None
        }
    };
    Ok(reply)
}

/// Send `text` to another chat and record the outcome in the activity log.
async fn relay_message(bot: &Bot, recipient: Recipient, text: &str, activity: &ActivityLog) {
    match bot.send_message(recipient.clone(), text).await {
        Ok(_) => {
            tracing::info!("Relayed admin message to {:?}", recipient);
            activity.send("success").await;
        }
        Err(e) => {
            tracing::warn!("Failed to relay admin message to {:?}: {}", recipient, e);
            activity
                .send(&format!("err:\n{}", escape_html(&e.to_string())))
                .await;
        }
    }
}

/// Welcome text followed by the visible command list.
pub fn help_text() -> String {
    format!("{}\n\n{}", HELP_TEXT, Command::descriptions())
}

pub fn my_info_reply(user_id: u64) -> String {
    format!("your telegram id is: `{}`", user_id)
}

pub fn group_info_reply(is_group: bool, chat_id: i64) -> String {
    if is_group {
        format!("this group id is: `{}`", chat_id)
    } else {
        "Please use this command in a group".to_string()
    }
}

/// Check admin rights and debug mode for `cmd`.
///
/// Returns the refusal reply when the command may not run.
pub fn command_gate(config: &Config, user_id: u64, cmd: &Command) -> Result<(), &'static str> {
    if cmd.needs_admin() && !is_admin(&config.access, user_id) {
        return Err(ADMIN_ONLY_REPLY);
    }
    if cmd.needs_debug() && !config.telegram.debug_mode {
        return Err(DEBUG_MODE_OFF_REPLY);
    }
    Ok(())
}

/// Split `/send_message` arguments into the target chat and the text.
///
/// The target is a numeric chat id or an `@channel` username. Both the
/// target and a non-empty text are required.
pub fn parse_send_message_args(args: &str) -> Result<(Recipient, &str), &'static str> {
    let (target, text) = args
        .trim()
        .split_once(char::is_whitespace)
        .ok_or(COMMAND_FORMAT_ERROR_REPLY)?;
    let text = text.trim_start();
    if text.is_empty() {
        return Err(COMMAND_FORMAT_ERROR_REPLY);
    }

    let recipient = if target.len() > 1 && target.starts_with('@') {
        Recipient::ChannelUsername(target.to_string())
    } else {
        let id = target
            .parse::<i64>()
            .map_err(|_| COMMAND_FORMAT_ERROR_REPLY)?;
        Recipient::Id(ChatId(id))
    };
    Ok((recipient, text))
}

/// Names of the models that support `generateContent`.
pub fn format_model_names(models: &[ModelSummary]) -> Vec<String> {
    models
        .iter()
        .filter(|m| m.supports_generate_content())
        .map(|m| m.name.clone())
        .collect()
}

/// Pretty JSON in a code block, escaped for Telegram HTML.
pub fn json_entry(value: &serde_json::Value) -> String {
    let json = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    format!(
        "<pre><code class=\"language-json\">{}</code></pre>",
        escape_html(&json)
    )
}
