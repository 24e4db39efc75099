//! Gemibot core library.
//!
//! Provides configuration, the Gemini provider abstraction, per-chat
//! conversations, and access control. Nothing here depends on Telegram.

pub mod access;
pub mod config;
pub mod conversation;
pub mod message;
pub mod models;
pub mod provider;
pub mod text;

pub use access::{Requester, is_admin, is_authorized};
pub use config::{
    AccessConfig, Config, ConfigError, GeminiConfig, LoggingConfig, TelegramConfig,
};
pub use conversation::{ChatManager, Conversation};
pub use provider::{LlmProvider, ProviderError, create_provider};
