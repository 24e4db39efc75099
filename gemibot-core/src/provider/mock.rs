//! Mock LLM provider for testing.
//!
//! Provides [`MockProvider`], a configurable mock implementation
//! of [`LlmProvider`] for unit and integration testing.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{ImageInput, LlmProvider, ModelSummary, ProviderError};
use crate::message::{Message, Role};

/// A mock LLM provider for testing.
///
/// Returns configurable responses. If no responses are configured,
/// returns a default response.
///
/// # Examples
///
/// ```
/// use gemibot_core::provider::{LlmProvider, MockProvider};
/// use gemibot_core::message::{Message, Role};
///
/// # async fn example() {
/// let provider = MockProvider::new()
///     .with_response("Hello from mock!");
/// let messages = vec![Message::new(Role::User, "Hi")];
///
/// let response = provider.complete(&messages).await.unwrap();
/// assert_eq!(response.content, "Hello from mock!");
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MockProvider {
    responses: Mutex<Vec<String>>,
    failure: Option<String>,
    seen_history_lengths: Mutex<Vec<usize>>,
}

/// Recover from a poisoned mutex; a panic in another test thread must not
/// cascade.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl MockProvider {
    /// Create a new mock provider with no predefined responses.
    ///
    /// When no responses are configured, calls return `"Mock response"`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock whose every call fails with
    /// [`ProviderError::RequestFailed`] carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Add a response to be returned by a later call.
    ///
    /// Responses are returned in LIFO order (last added = first returned).
    #[must_use]
    pub fn with_response(self, content: impl Into<String>) -> Self {
        lock(&self.responses).push(content.into());
        self
    }

    /// Lengths of the histories passed to `complete`, in call order.
    pub fn seen_history_lengths(&self) -> Vec<usize> {
        lock(&self.seen_history_lengths).clone()
    }

    fn next_response(&self) -> Result<String, ProviderError> {
        if let Some(ref message) = self.failure {
            return Err(ProviderError::RequestFailed(message.clone()));
        }
        Ok(lock(&self.responses)
            .pop()
            .unwrap_or_else(|| "Mock response".to_string()))
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn complete(&self, messages: &[Message]) -> Result<Message, ProviderError> {
        lock(&self.seen_history_lengths).push(messages.len());
        self.next_response()
            .map(|content| Message::new(Role::Model, content))
    }

    async fn describe_image(
        &self,
        _prompt: &str,
        _image: &ImageInput,
    ) -> Result<String, ProviderError> {
        self.next_response()
    }

    async fn list_models(&self) -> Result<Vec<ModelSummary>, ProviderError> {
        if let Some(ref message) = self.failure {
            return Err(ProviderError::RequestFailed(message.clone()));
        }
        Ok(vec![ModelSummary {
            name: "models/mock".to_string(),
            display_name: Some("Mock".to_string()),
            description: None,
            supported_generation_methods: vec!["generateContent".to_string()],
        }])
    }
}
