//! Per-chat conversation state.
//!
//! Each Telegram chat owns one [`Conversation`], an ordered list of
//! user/model turns sent in full with every request. [`ChatManager`] maps
//! chat ids to conversations and serializes access per chat.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::message::{Message, Role};
use crate::provider::{LlmProvider, ProviderError};

/// Reply shown after the history of a chat has been cleared.
pub const NEW_CHAT_REPLY: &str = "We're having a fresh chat.";

/// Shared handle to one chat's conversation.
pub type ConversationHandle = Arc<Mutex<Conversation>>;

/// Ordered user/model turns of one chat.
#[derive(Debug, Default, Clone)]
pub struct Conversation {
    history: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send `prompt` with the full history and record the exchange.
    ///
    /// The history only grows when the provider answers; a failed call
    /// leaves it untouched so the next attempt does not carry a dangling
    /// user turn.
    pub async fn send(
        &mut self,
        provider: &dyn LlmProvider,
        prompt: &str,
    ) -> Result<String, ProviderError> {
        self.history.push(Message::new(Role::User, prompt));
        match provider.complete(&self.history).await {
            Ok(reply) => {
                let text = reply.content.clone();
                self.history.push(Message::new(Role::Model, reply.content));
                Ok(text)
            }
            Err(e) => {
                self.history.pop();
                Err(e)
            }
        }
    }

    /// Forget every turn.
    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Number of stored messages (user and model turns).
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Completed question/answer rounds.
    pub fn rounds(&self) -> usize {
        self.history.len() / 2
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }
}

/// In-memory map from chat id to its conversation.
///
/// The outer lock only guards the map; the per-chat mutex is held across
/// the provider call so turns of one chat never interleave, while other
/// chats proceed concurrently.
#[derive(Debug, Default)]
pub struct ChatManager {
    chats: RwLock<HashMap<i64, ConversationHandle>>,
}

impl ChatManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the conversation of `chat_id`, creating an empty one if needed.
    pub async fn get_or_create(&self, chat_id: i64) -> ConversationHandle {
        {
            let chats = self.chats.read().await;
            if let Some(handle) = chats.get(&chat_id) {
                return Arc::clone(handle);
            }
        }

        let mut chats = self.chats.write().await;
        Arc::clone(chats.entry(chat_id).or_default())
    }

    /// Clear the history of `chat_id`. Chats without a conversation are
    /// left alone.
    pub async fn reset(&self, chat_id: i64) {
        let handle = self.chats.read().await.get(&chat_id).cloned();
        if let Some(handle) = handle {
            handle.lock().await.reset();
            tracing::debug!(chat_id, "conversation reset");
        }
    }

    /// Number of chats with a conversation.
    pub async fn chat_count(&self) -> usize {
        self.chats.read().await.len()
    }
}
