//! Telegram message handler for the Gemibot bot.
//!
//! Handles every non-command update: activity logging, authorization,
//! routing to the conversation or the vision model, and reply delivery.

use std::sync::Arc;

use anyhow::Context;
use gemibot_core::provider::ImageInput;
use gemibot_core::{ChatManager, Config, LlmProvider, is_authorized};
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{
    ChatAction, FileId, Me, Message as TgMessage, MessageId, ParseMode, ReplyParameters,
};

use crate::activity::{self, ActivityLog, Sender};
use crate::format::{TELEGRAM_MSG_LIMIT, chunk_text, md_to_telegram_html};

/// Prefix of the reply sent when the Gemini call fails.
pub const GEMINI_ERROR_REPLY: &str = "Something went wrong while talking to Gemini.";

/// Prefix of the reply sent when a photo cannot be fetched from Telegram.
pub const PHOTO_DOWNLOAD_ERROR_REPLY: &str = "Couldn't download the photo from Telegram.";

/// Reply to a group that is not on the allow list.
pub const GROUP_NO_PERMISSION_REPLY: &str =
    "This group is not authorized to use the bot. Ask the bot owner to add it.";

/// Reply to a user who is not on the allow list.
pub const USER_NO_PERMISSION_REPLY: &str =
    "You are not authorized to use the bot. Ask the bot owner to add you.";

/// Reply to unknown commands and malformed arguments.
pub const COMMAND_FORMAT_ERROR_REPLY: &str = "Command format error, please check and try again.";

/// Reply to stickers, voice notes and other unsupported content.
pub const UNRECOGNIZED_CONTENT_REPLY: &str = "Sorry, I can't recognize the content you sent.";

/// Appended to answers once a conversation grows long.
pub const PROMPT_NEW_HINT: &str =
    "The conversation is getting long. Send /new to start a fresh chat and keep answers sharp.";

/// Prompt used for photos sent without a caption.
pub const DEFAULT_PHOTO_PROMPT: &str = "Describe this image.";

/// Source chunk size; leaves room for the HTML tags added by rendering.
const REPLY_CHUNK_BYTES: usize = 3500;

/// What an authorized message should be answered with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route<'a> {
    /// A `/command` the dispatcher did not recognize.
    UnknownCommand,
    /// Plain text for the conversation.
    Chat(&'a str),
    /// A photo, with its caption if any.
    Photo(Option<&'a str>),
    /// Anything else.
    Unrecognized,
}

/// Decide how to answer a message from its text and photo presence.
pub fn route<'a>(text: Option<&'a str>, caption: Option<&'a str>, has_photo: bool) -> Route<'a> {
    if has_photo {
        return Route::Photo(caption.filter(|c| !c.trim().is_empty()));
    }
    match text {
        Some(t) if t.starts_with('/') => Route::UnknownCommand,
        Some(t) if !t.trim().is_empty() => Route::Chat(t),
        _ => Route::Unrecognized,
    }
}

/// True for a `/command@name` aimed at a bot other than `bot_name`.
///
/// Several bots can share a group; their commands are not ours to answer.
pub fn addressed_to_other_bot(text: Option<&str>, bot_name: &str) -> bool {
    let Some(command) = text
        .and_then(|t| t.strip_prefix('/'))
        .and_then(|t| t.split_whitespace().next())
    else {
        return false;
    };
    match command.split_once('@') {
        Some((_, target)) => !target.eq_ignore_ascii_case(bot_name),
        None => false,
    }
}

/// Append the `/new` hint when the history reached the threshold.
///
/// A threshold of zero disables the hint.
pub fn with_new_hint(answer: &str, history_len: usize, threshold: usize) -> String {
    if threshold > 0 && history_len >= threshold * 2 {
        format!("{}\n\n{}", answer, PROMPT_NEW_HINT)
    } else {
        answer.to_string()
    }
}

/// Reply text for a failed provider call.
pub fn gemini_error_reply(error: &dyn std::fmt::Display) -> String {
    format!("{}\n{}", GEMINI_ERROR_REPLY, error)
}

/// Reply text for a photo that could not be downloaded.
pub fn download_error_reply(error: &anyhow::Error) -> String {
    format!("{}\n{:#}", PHOTO_DOWNLOAD_ERROR_REPLY, error)
}

/// Denial text for a sender who failed authorization.
pub fn denial_reply(sender: &Sender) -> String {
    if sender.is_group {
        format!("{}\nID:`{}`", GROUP_NO_PERMISSION_REPLY, sender.chat_id)
    } else {
        format!("{}\nID:`{}`", USER_NO_PERMISSION_REPLY, sender.user_id)
    }
}

/// Log the update and check the access lists.
///
/// Returns the sender when the update may proceed. Unauthorized senders get
/// a denial reply and a log entry, and `None` is returned.
pub(crate) async fn admit(
    bot: &Bot,
    msg: &TgMessage,
    config: &Config,
    activity: &ActivityLog,
) -> ResponseResult<Option<Sender>> {
    let sender = Sender::from_message(msg);
    let text = msg.text().or_else(|| msg.caption());
    let dump = serde_json::to_string(msg).unwrap_or_default();
    activity
        .send(&activity::received(&sender, text, &dump))
        .await;

    if is_authorized(&config.access, &sender.requester()) {
        return Ok(Some(sender));
    }

    tracing::info!(
        user_id = sender.user_id,
        chat_id = sender.chat_id,
        "rejected unauthorized sender"
    );
    send_reply(bot, msg.chat.id, &denial_reply(&sender), None).await?;
    activity.send(&activity::unauthorized(&sender, text)).await;
    Ok(None)
}

/// Handle an incoming non-command Telegram message.
pub async fn handle_message(
    bot: Bot,
    msg: TgMessage,
    me: Me,
    config: Arc<Config>,
    provider: Arc<dyn LlmProvider>,
    chats: Arc<ChatManager>,
    activity: ActivityLog,
) -> ResponseResult<()> {
    if addressed_to_other_bot(msg.text(), me.username()) {
        tracing::debug!(chat_id = msg.chat.id.0, "ignoring command for another bot");
        return Ok(());
    }

    let Some(sender) = admit(&bot, &msg, &config, &activity).await? else {
        return Ok(());
    };

    match route(msg.text(), msg.caption(), msg.photo().is_some()) {
        Route::UnknownCommand => {
            let text = msg.text().unwrap_or_default();
            send_reply(&bot, msg.chat.id, COMMAND_FORMAT_ERROR_REPLY, None).await?;
            activity
                .send(&activity::exchange(
                    &sender,
                    text,
                    COMMAND_FORMAT_ERROR_REPLY,
                    None,
                ))
                .await;
        }
        Route::Chat(text) => {
            chat(
                &bot,
                &msg,
                text,
                &sender,
                &config,
                provider.as_ref(),
                &chats,
                &activity,
            )
            .await?;
        }
        Route::Photo(caption) => {
            photo(&bot, &msg, caption, &sender, provider.as_ref(), &activity).await?;
        }
        Route::Unrecognized => {
            let reply = format!("{}\n\n/help", UNRECOGNIZED_CONTENT_REPLY);
            send_reply(&bot, msg.chat.id, &reply, None).await?;
            activity.send(&activity::unrecognized(&sender)).await;
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn chat(
    bot: &Bot,
    msg: &TgMessage,
    text: &str,
    sender: &Sender,
    config: &Config,
    provider: &dyn LlmProvider,
    chats: &ChatManager,
    activity: &ActivityLog,
) -> ResponseResult<()> {
    let handle = chats.get_or_create(msg.chat.id.0).await;
    let mut conversation = handle.lock().await;

    bot.send_chat_action(msg.chat.id, ChatAction::Typing)
        .await
        .ok();

    let answer = match conversation.send(provider, text).await {
        Ok(answer) => answer,
        Err(e) => {
            tracing::error!("Gemini error for chat {}: {}", msg.chat.id, e);
            gemini_error_reply(&e)
        }
    };
    let reply = with_new_hint(
        &answer,
        conversation.history_len(),
        config.telegram.prompt_new_threshold,
    );
    let rounds = conversation.rounds();
    drop(conversation);

    send_reply(bot, msg.chat.id, &reply, None).await?;
    activity
        .send(&activity::exchange(sender, text, &reply, Some(rounds)))
        .await;
    Ok(())
}

async fn photo(
    bot: &Bot,
    msg: &TgMessage,
    caption: Option<&str>,
    sender: &Sender,
    provider: &dyn LlmProvider,
    activity: &ActivityLog,
) -> ResponseResult<()> {
    // Telegram lists sizes smallest first.
    let Some(largest) = msg.photo().and_then(|sizes| sizes.last()) else {
        return Ok(());
    };
    let file_id = largest.file.id.clone();

    bot.send_chat_action(msg.chat.id, ChatAction::Typing)
        .await
        .ok();

    let prompt = caption.unwrap_or(DEFAULT_PHOTO_PROMPT);
    let reply = match download_photo(bot, &file_id).await {
        Ok(bytes) => match provider
            .describe_image(prompt, &ImageInput::jpeg(bytes))
            .await
        {
            Ok(answer) => answer,
            Err(e) => {
                tracing::error!("Gemini vision error for chat {}: {}", msg.chat.id, e);
                gemini_error_reply(&e)
            }
        },
        Err(e) => {
            tracing::error!("Photo download failed for chat {}: {:#}", msg.chat.id, e);
            download_error_reply(&e)
        }
    };

    send_reply(bot, msg.chat.id, &reply, Some(msg.id)).await?;
    activity.send_photo(&file_id).await;
    activity
        .send(&activity::photo_exchange(sender, caption, &reply))
        .await;
    Ok(())
}

async fn download_photo(bot: &Bot, file_id: &FileId) -> anyhow::Result<Vec<u8>> {
    let file = bot
        .get_file(file_id.clone())
        .await
        .context("Failed to resolve photo file")?;
    let mut bytes = Vec::new();
    bot.download_file(&file.path, &mut bytes)
        .await
        .context("Failed to download photo")?;
    Ok(bytes)
}

/// Send `text` as Markdown rendered to Telegram HTML.
///
/// The source is chunked first so every chunk renders to balanced HTML.
/// A chunk whose HTML is too long or is rejected by Telegram is sent as
/// plain text instead. Only the first chunk quotes `reply_to`.
pub(crate) async fn send_reply(
    bot: &Bot,
    chat_id: ChatId,
    text: &str,
    reply_to: Option<MessageId>,
) -> ResponseResult<()> {
    if text.trim().is_empty() {
        return Ok(());
    }

    for (i, chunk) in chunk_text(text, REPLY_CHUNK_BYTES).into_iter().enumerate() {
        let quote = if i == 0 { reply_to } else { None };

        let html = md_to_telegram_html(chunk);
        if !html.is_empty() && html.len() <= TELEGRAM_MSG_LIMIT {
            let mut req = bot.send_message(chat_id, html).parse_mode(ParseMode::Html);
            if let Some(id) = quote {
                req.reply_parameters = Some(ReplyParameters::new(id));
            }
            match req.await {
                Ok(_) => continue,
                Err(e) => tracing::warn!(
                    "HTML send failed for chat {}, falling back to plain text: {}",
                    chat_id,
                    e
                ),
            }
        }

        let mut req = bot.send_message(chat_id, chunk);
        if let Some(id) = quote {
            req.reply_parameters = Some(ReplyParameters::new(id));
        }
        req.await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender(is_group: bool) -> Sender {
        Sender {
            user_name: Some("alice".to_string()),
            user_id: 42,
            chat_id: -100,
            group_name: is_group.then(|| "club".to_string()),
            is_group,
        }
    }

    #[test]
    fn test_route_plain_text_goes_to_chat() {
        assert_eq!(route(Some("hello"), None, false), Route::Chat("hello"));
    }

    #[test]
    fn test_route_unknown_command() {
        assert_eq!(route(Some("/nope"), None, false), Route::UnknownCommand);
    }

    #[test]
    fn test_route_photo_with_and_without_caption() {
        assert_eq!(
            route(None, Some("what is it?"), true),
            Route::Photo(Some("what is it?"))
        );
        assert_eq!(route(None, None, true), Route::Photo(None));
        assert_eq!(route(None, Some("   "), true), Route::Photo(None));
    }

    #[test]
    fn test_route_other_content_is_unrecognized() {
        assert_eq!(route(None, None, false), Route::Unrecognized);
        assert_eq!(route(Some("  "), None, false), Route::Unrecognized);
    }

    #[test]
    fn test_command_for_other_bot_is_skipped() {
        assert!(addressed_to_other_bot(Some("/start@otherbot"), "gemibot"));
        assert!(addressed_to_other_bot(
            Some("/nope@otherbot some args"),
            "gemibot"
        ));
    }

    #[test]
    fn test_command_for_this_bot_is_kept() {
        assert!(!addressed_to_other_bot(Some("/nope@GemiBot"), "gemibot"));
        assert!(!addressed_to_other_bot(Some("/nope"), "gemibot"));
        assert!(!addressed_to_other_bot(Some("mail me@otherbot"), "gemibot"));
        assert!(!addressed_to_other_bot(None, "gemibot"));
    }

    #[test]
    fn test_download_error_reply_does_not_blame_gemini() {
        let error = anyhow::anyhow!("timed out").context("Failed to download photo");
        let reply = download_error_reply(&error);
        assert_eq!(
            reply,
            format!(
                "{}\nFailed to download photo: timed out",
                PHOTO_DOWNLOAD_ERROR_REPLY
            )
        );
        assert!(!reply.contains(GEMINI_ERROR_REPLY));
    }

    #[test]
    fn test_new_hint_below_threshold() {
        assert_eq!(with_new_hint("answer", 19, 10), "answer");
    }

    #[test]
    fn test_new_hint_at_threshold() {
        let reply = with_new_hint("answer", 20, 10);
        assert!(reply.starts_with("answer\n\n"));
        assert!(reply.ends_with(PROMPT_NEW_HINT));
    }

    #[test]
    fn test_new_hint_disabled_by_zero_threshold() {
        assert_eq!(with_new_hint("answer", 500, 0), "answer");
    }

    #[test]
    fn test_gemini_error_reply_includes_error() {
        let reply = gemini_error_reply(&"HTTP 500: boom");
        assert_eq!(reply, format!("{}\nHTTP 500: boom", GEMINI_ERROR_REPLY));
    }

    #[test]
    fn test_denial_reply_for_group_uses_chat_id() {
        let reply = denial_reply(&sender(true));
        assert!(reply.starts_with(GROUP_NO_PERMISSION_REPLY));
        assert!(reply.ends_with("ID:`-100`"));
    }

    #[test]
    fn test_denial_reply_for_user_uses_user_id() {
        let reply = denial_reply(&sender(false));
        assert!(reply.starts_with(USER_NO_PERMISSION_REPLY));
        assert!(reply.ends_with("ID:`42`"));
    }
}
