//! Configuration management for Gemibot.
//!
//! Provides configuration loading from TOML files with support for
//! multiple file locations, environment variable overrides, and sensible defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(test)]
mod tests;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        /// Path to the configuration file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the configuration file as TOML.
    #[error("failed to parse config file '{path}': {source}")]
    ParseError {
        /// Path to the configuration file that could not be parsed.
        path: PathBuf,
        /// The underlying TOML parse error.
        source: toml::de::Error,
    },

    /// An environment override holds a value that cannot be parsed.
    #[error("invalid value '{value}' in environment variable {var}")]
    Env {
        /// Name of the offending variable.
        var: &'static str,
        /// The raw value.
        value: String,
    },
}

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    /// LLM provider name. Only "gemini" is supported.
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Gemini API settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Telegram bot settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Who may talk to the bot.
    #[serde(default)]
    pub access: AccessConfig,

    /// Optional file logging. `None` keeps stdout-only logging.
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

fn default_provider() -> String {
    "gemini".to_string()
}

/// Gemini API settings from the `[gemini]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeminiConfig {
    /// API key. `GOOGLE_API_KEY` takes priority when set.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model used for text conversations.
    #[serde(default = "default_model")]
    pub model: String,

    /// Model used for photo prompts.
    #[serde(default = "default_model")]
    pub vision_model: String,

    /// Inline system instruction sent with every conversation request.
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Path to a file holding the system instruction. Ignored when
    /// `system_prompt` is set.
    #[serde(default)]
    pub system_prompt_file: Option<String>,

    /// API root, overridable for tests and proxies.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sampling parameters.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Safety thresholds per harm category.
    #[serde(default)]
    pub safety_settings: Vec<SafetySetting>,
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

/// Public Generative Language API root.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            vision_model: default_model(),
            system_prompt: None,
            system_prompt_file: None,
            base_url: default_base_url(),
            generation: GenerationConfig::default(),
            safety_settings: Vec::new(),
        }
    }
}

/// Sampling parameters forwarded as `generationConfig`. Unset fields are
/// left to the API defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(alias = "top_p")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(alias = "top_k")]
    pub top_k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(alias = "max_output_tokens")]
    pub max_output_tokens: Option<u32>,
}

impl GenerationConfig {
    /// True when no parameter is set and the field can be omitted.
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.top_p.is_none()
            && self.top_k.is_none()
            && self.max_output_tokens.is_none()
    }
}

/// One `safetySettings` entry, e.g. `HARM_CATEGORY_HARASSMENT` / `BLOCK_NONE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

/// Telegram bot settings from the `[telegram]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TelegramConfig {
    /// Bot token. `TELEGRAM_BOT_TOKEN` takes priority when set.
    #[serde(default)]
    pub token: Option<String>,

    /// Administrative channel receiving the activity log.
    #[serde(default)]
    pub log_chat_id: Option<i64>,

    /// Enables the admin diagnostic commands.
    #[serde(default)]
    pub debug_mode: bool,

    /// Number of conversation rounds after which replies suggest `/new`.
    #[serde(default = "default_prompt_new_threshold")]
    pub prompt_new_threshold: usize,
}

fn default_prompt_new_threshold() -> usize {
    10
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: None,
            log_chat_id: None,
            debug_mode: false,
            prompt_new_threshold: default_prompt_new_threshold(),
        }
    }
}

/// Authorization lists from the `[access]` section.
///
/// Entries of `allowed_users` and `allowed_groups` are numeric ids,
/// usernames (with or without `@`), or `*` for everyone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Telegram user ids with admin rights.
    #[serde(default)]
    pub admins: Vec<u64>,

    /// Users allowed to chat privately with the bot.
    #[serde(default, deserialize_with = "access_entries")]
    pub allowed_users: Vec<String>,

    /// Groups the bot answers in.
    #[serde(default, deserialize_with = "access_entries")]
    pub allowed_groups: Vec<String>,
}

/// An access list item as written in TOML: a bare id or a string.
#[derive(Deserialize)]
#[serde(untagged)]
enum AccessEntry {
    Id(i64),
    Name(String),
}

fn access_entries<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let entries = Vec::<AccessEntry>::deserialize(deserializer)?;
    Ok(entries
        .into_iter()
        .map(|entry| match entry {
            AccessEntry::Id(id) => id.to_string(),
            AccessEntry::Name(name) => name,
        })
        .collect())
}

/// Log file rotation strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    #[default]
    Daily,
    Hourly,
    Never,
}

/// Optional rolling file logging from the `[logging]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoggingConfig {
    /// Directory for log files.
    #[serde(default = "default_log_directory")]
    pub directory: String,

    /// Maximum number of rotated files to keep.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Rotation period.
    #[serde(default)]
    pub rotation: Rotation,
}

fn default_log_directory() -> String {
    "logs".to_string()
}

fn default_max_files() -> usize {
    7
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            max_files: default_max_files(),
            rotation: Rotation::default(),
        }
    }
}

impl Config {
    /// Load configuration from the file system and apply environment overrides.
    ///
    /// Priority order:
    /// 1. `path` argument (e.g. from `--config`)
    /// 2. GEMIBOT_CONFIG environment variable
    /// 3. ./config.toml (local directory)
    /// 4. ~/.config/gemibot/config.toml (user config)
    ///
    /// Returns default config if no config file found.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IoError`] if a found file cannot be read.
    /// Returns [`ConfigError::ParseError`] if a found file is not valid TOML.
    /// Returns [`ConfigError::Env`] if an override variable is malformed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match Self::find_config_file(path) {
            Some(found) => Self::load_from(found)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.resolve_system_prompt()?;
        Ok(config)
    }

    fn find_config_file(path: Option<&Path>) -> Option<PathBuf> {
        if let Some(p) = path {
            // An explicit path is used as-is so a typo surfaces as an IoError.
            return Some(p.to_path_buf());
        }

        if let Ok(env_path) = std::env::var("GEMIBOT_CONFIG") {
            let p = PathBuf::from(env_path);
            if p.exists() {
                return Some(p);
            }
        }

        let local = PathBuf::from("config.toml");
        if local.exists() {
            return Some(local);
        }

        dirs::home_dir()
            .map(|home| home.join(".config/gemibot/config.toml"))
            .filter(|p| p.exists())
    }

    /// Load configuration from a specific path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IoError`] if the file cannot be read.
    /// Returns [`ConfigError::ParseError`] if the file is not valid TOML.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `ALLOWED_USERS`, `ALLOWED_GROUPS`, `ADMIN_IDS` and `LOG_CHAT_ID`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] when a numeric variable does not parse.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|var| std::env::var(var).ok())
    }

    /// Apply overrides read through `lookup`. Empty values are ignored.
    pub(crate) fn apply_overrides_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(users) = get("ALLOWED_USERS") {
            self.access.allowed_users = split_list(&users);
        }
        if let Some(groups) = get("ALLOWED_GROUPS") {
            self.access.allowed_groups = split_list(&groups);
        }
        if let Some(admins) = get("ADMIN_IDS") {
            self.access.admins = split_list(&admins)
                .into_iter()
                .map(|id| {
                    id.parse::<u64>().map_err(|_| ConfigError::Env {
                        var: "ADMIN_IDS",
                        value: admins.clone(),
                    })
                })
                .collect::<Result<_, _>>()?;
        }
        if let Some(chat) = get("LOG_CHAT_ID") {
            let id = chat.trim().parse::<i64>().map_err(|_| ConfigError::Env {
                var: "LOG_CHAT_ID",
                value: chat.clone(),
            })?;
            self.telegram.log_chat_id = Some(id);
        }
        Ok(())
    }

    /// Fill `gemini.system_prompt` from `gemini.system_prompt_file` when only
    /// the file is configured. The file contents are trimmed; an empty file
    /// leaves the prompt unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IoError`] if the file cannot be read.
    pub fn resolve_system_prompt(&mut self) -> Result<(), ConfigError> {
        if self.gemini.system_prompt.is_some() {
            return Ok(());
        }
        let Some(ref file) = self.gemini.system_prompt_file else {
            return Ok(());
        };
        let path = PathBuf::from(file);
        let content = std::fs::read_to_string(&path)
            .map_err(|source| ConfigError::IoError { path, source })?;
        let trimmed = content.trim();
        if !trimmed.is_empty() {
            self.gemini.system_prompt = Some(trimmed.to_string());
        }
        Ok(())
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            gemini: GeminiConfig::default(),
            telegram: TelegramConfig::default(),
            access: AccessConfig::default(),
            logging: None,
        }
    }
}
