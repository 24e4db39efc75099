//! LLM provider abstraction layer.
//!
//! Defines the [`LlmProvider`] trait that the Gemini client and the test mock
//! implement, and the [`ProviderError`] type for error handling.

mod factory;
mod gemini;
mod mock;

pub use factory::{create_provider, resolve_api_key};
pub use gemini::GeminiProvider;
pub use mock::MockProvider;

use async_trait::async_trait;

use crate::message::Message;

/// Error type for provider operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The provider returned a response that could not be understood.
    #[error("provider error: {message}")]
    ProviderError {
        /// Description of the failure.
        message: String,
    },

    /// Request failed due to network issues or a non-success status.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// Authentication failed (e.g., invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationError(String),

    /// No API key in the environment or config.
    #[error("missing API key: {0}")]
    MissingApiKey(String),

    /// The configured provider name is not supported.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// The prompt or the answer was blocked by safety filters.
    #[error("response blocked: {0}")]
    Blocked(String),

    /// The model answered without any text.
    #[error("empty response from model")]
    EmptyResponse,
}

/// An image attached to a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    /// MIME type such as `image/jpeg`.
    pub mime_type: String,
    /// Raw image bytes.
    pub data: Vec<u8>,
}

impl ImageInput {
    /// JPEG image, the format Telegram re-encodes photos to.
    pub fn jpeg(data: Vec<u8>) -> Self {
        Self {
            mime_type: "image/jpeg".to_string(),
            data,
        }
    }
}

/// A model visible to the API key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSummary {
    /// Resource name, e.g. `models/gemini-2.0-flash`.
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    /// API methods the model accepts, e.g. `generateContent`.
    pub supported_generation_methods: Vec<String>,
}

impl ModelSummary {
    /// True when the model can be used for chat and vision prompts.
    pub fn supports_generate_content(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|m| m == "generateContent")
    }
}

/// Trait for LLM providers.
///
/// Implementations must be thread-safe (`Send + Sync`) for use
/// in async contexts.
///
/// # Examples
///
/// ```
/// use gemibot_core::provider::{LlmProvider, MockProvider};
/// use gemibot_core::message::{Message, Role};
///
/// # async fn example() {
/// let provider = MockProvider::new();
/// let messages = vec![Message::new(Role::User, "Hello")];
///
/// let response = provider.complete(&messages).await.unwrap();
/// assert_eq!(response.role, Role::Model);
/// # }
/// ```
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send the conversation history to the chat model and get its reply.
    async fn complete(&self, messages: &[Message]) -> Result<Message, ProviderError>;

    /// Ask the vision model about a single image.
    async fn describe_image(
        &self,
        prompt: &str,
        image: &ImageInput,
    ) -> Result<String, ProviderError>;

    /// List every model available to the configured key.
    async fn list_models(&self) -> Result<Vec<ModelSummary>, ProviderError>;
}
