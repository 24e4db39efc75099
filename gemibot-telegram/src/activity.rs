//! Activity log posted to the administrative channel.
//!
//! Every update, denial and exchange is rendered as a short HTML entry and
//! mirrored to `tracing`. When `telegram.log_chat_id` is configured the entry
//! is also posted to that chat; posting failures are logged and swallowed so
//! they never affect the user-facing reply.

use gemibot_core::access;
use gemibot_core::text::truncate;
use teloxide::prelude::*;
use teloxide::types::{FileId, InputFile, Message as TgMessage, ParseMode};

use crate::format::escape_html;

/// Longest user content quoted in an entry, in characters.
const CONTENT_PREVIEW_CHARS: usize = 800;

/// Longest model reply quoted in an entry, in characters.
const REPLY_PREVIEW_CHARS: usize = 1200;

/// Longest raw update dump quoted in an entry, in characters.
const UPDATE_DUMP_CHARS: usize = 1200;

/// Handle to the log channel, injected into every handler.
#[derive(Clone)]
pub struct ActivityLog {
    bot: Bot,
    chat: Option<ChatId>,
}

impl ActivityLog {
    pub fn new(bot: Bot, chat: Option<ChatId>) -> Self {
        Self { bot, chat }
    }

    /// Record an HTML entry.
    pub async fn send(&self, html: &str) {
        tracing::info!(target: "gemibot_telegram::activity", "{}", html);
        let Some(chat) = self.chat else {
            return;
        };
        if let Err(e) = self
            .bot
            .send_message(chat, html)
            .parse_mode(ParseMode::Html)
            .await
        {
            tracing::warn!("Failed to post activity entry to log chat {}: {}", chat, e);
        }
    }

    /// Forward a photo to the log channel by its file id.
    pub async fn send_photo(&self, file_id: &FileId) {
        let Some(chat) = self.chat else {
            return;
        };
        if let Err(e) = self
            .bot
            .send_photo(chat, InputFile::file_id(file_id.clone()))
            .await
        {
            tracing::warn!("Failed to forward photo to log chat {}: {}", chat, e);
        }
    }
}

/// Who sent an update and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub user_name: Option<String>,
    pub user_id: u64,
    pub chat_id: i64,
    /// Group username, or the title for groups without one.
    pub group_name: Option<String>,
    /// Group or supergroup.
    pub is_group: bool,
}

impl Sender {
    pub fn from_message(msg: &TgMessage) -> Self {
        let user = msg.from.as_ref();
        let is_group = msg.chat.is_group() || msg.chat.is_supergroup();
        let group_name = if is_group {
            msg.chat
                .username()
                .or_else(|| msg.chat.title())
                .map(str::to_string)
        } else {
            None
        };
        Self {
            user_name: user.and_then(|u| u.username.clone()),
            user_id: user.map(|u| u.id.0).unwrap_or(0),
            chat_id: msg.chat.id.0,
            group_name,
            is_group,
        }
    }

    /// Identity in the shape the access lists expect.
    pub fn requester(&self) -> access::Requester {
        access::Requester {
            is_group: self.is_group,
            user_id: self.user_id,
            user_name: self.user_name.clone(),
            chat_id: self.chat_id,
            group_name: self.group_name.clone(),
        }
    }

    /// `@user id:<code>1</code>`, plus the group in group chats.
    pub fn describe(&self) -> String {
        let mut out = format!(
            "@{} id:<code>{}</code>",
            escape_html(self.user_name.as_deref().unwrap_or("unknown")),
            self.user_id
        );
        if self.is_group {
            out.push_str(&format!(
                " in group @{} id:<code>{}</code>",
                escape_html(self.group_name.as_deref().unwrap_or("unknown")),
                self.chat_id
            ));
        }
        out
    }
}

fn quote(text: &str, max_chars: usize) -> String {
    escape_html(&truncate(text, max_chars))
}

/// Entry for every incoming update, with its JSON dump.
pub fn received(sender: &Sender, text: Option<&str>, update_json: &str) -> String {
    format!(
        "Event received\n{}\nThe content sent is:\n{}\n<pre><code class=\"language-json\">{}</code></pre>",
        sender.describe(),
        quote(text.unwrap_or(""), CONTENT_PREVIEW_CHARS),
        quote(update_json, UPDATE_DUMP_CHARS)
    )
}

/// Entry for a sender who is not on the access lists.
pub fn unauthorized(sender: &Sender, text: Option<&str>) -> String {
    format!(
        "{} has no rights to use the bot. The content sent is:\n{}",
        sender.describe(),
        quote(text.unwrap_or(""), CONTENT_PREVIEW_CHARS)
    )
}

/// Entry for a command or chat exchange. `rounds` is the conversation
/// length after the exchange, shown for chat messages only.
pub fn exchange(sender: &Sender, content: &str, reply: &str, rounds: Option<usize>) -> String {
    let mut out = format!(
        "{}\nThe content sent is:\n{}\nThe reply content is:\n{}",
        sender.describe(),
        quote(content, CONTENT_PREVIEW_CHARS),
        quote(reply, REPLY_PREVIEW_CHARS)
    );
    if let Some(rounds) = rounds {
        out.push_str(&format!("\nRounds of conversation so far: {}", rounds));
    }
    out
}

/// Entry for a photo prompt and the model's answer.
pub fn photo_exchange(sender: &Sender, caption: Option<&str>, reply: &str) -> String {
    format!(
        "{}\n[photo], the accompanying message is:\n{}\nThe reply content is:\n{}",
        sender.describe(),
        quote(caption.unwrap_or(""), CONTENT_PREVIEW_CHARS),
        quote(reply, REPLY_PREVIEW_CHARS)
    )
}

/// Entry for content the bot cannot handle (stickers, voice, ...).
pub fn unrecognized(sender: &Sender) -> String {
    format!("{}\nsent content the bot cannot recognize", sender.describe())
}
