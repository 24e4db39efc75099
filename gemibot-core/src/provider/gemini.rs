//! Google Gemini LLM provider.
//!
//! Implements the [`LlmProvider`] trait for the Generative Language API
//! (`v1beta`), covering multi-turn chat, single-image prompts and model
//! listing.

mod types;


use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use self::types::{
    ApiError, Content, GenerateRequest, GenerateResponse, InlineData, ListModelsResponse, Part,
};
use super::{ImageInput, LlmProvider, ModelSummary, ProviderError};
use crate::config::{DEFAULT_BASE_URL, GeminiConfig, GenerationConfig, SafetySetting};
use crate::message::{Message, Role};

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Largest page the `models` endpoint serves.
const MODELS_PAGE_SIZE: &str = "1000";

/// Gemini provider.
///
/// # Examples
///
/// ```no_run
/// use gemibot_core::provider::{GeminiProvider, LlmProvider};
/// use gemibot_core::message::{Message, Role};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = GeminiProvider::new("AIza...", "gemini-2.0-flash");
/// let messages = vec![Message::new(Role::User, "Hello, Gemini!")];
///
/// let response = provider.complete(&messages).await?;
/// println!("{}", response.content);
/// # Ok(())
/// # }
/// ```
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    /// Model for text conversations.
    model: String,
    /// Model for image prompts.
    vision_model: String,
    base_url: String,
    system_prompt: Option<String>,
    generation: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

impl GeminiProvider {
    /// Create a provider using `model` for both chat and images.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            vision_model: model.clone(),
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            system_prompt: None,
            generation: GenerationConfig::default(),
            safety_settings: Vec::new(),
        }
    }

    /// Create a provider from the `[gemini]` config section.
    pub fn from_config(api_key: impl Into<String>, config: &GeminiConfig) -> Self {
        let provider = Self::new(api_key, &config.model)
            .with_vision_model(&config.vision_model)
            .with_base_url(&config.base_url)
            .with_generation(config.generation.clone())
            .with_safety_settings(config.safety_settings.clone());
        match config.system_prompt {
            Some(ref prompt) => provider.with_system_prompt(prompt),
            None => provider,
        }
    }

    #[must_use]
    pub fn with_vision_model(mut self, model: impl Into<String>) -> Self {
        self.vision_model = model.into();
        self
    }

    /// Point the provider at another API root (tests, proxies).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// System instruction sent with every conversation request.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    #[must_use]
    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    #[must_use]
    pub fn with_safety_settings(mut self, settings: Vec<SafetySetting>) -> Self {
        self.safety_settings = settings;
        self
    }

    fn generate_url(&self, model: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    /// Convert conversation history into API contents.
    fn build_contents(messages: &[Message]) -> Vec<Content> {
        messages
            .iter()
            .map(|m| Content::text(Some(m.role.as_str()), m.content.clone()))
            .collect()
    }

    fn build_request(&self, contents: Vec<Content>, with_system: bool) -> GenerateRequest {
        GenerateRequest {
            contents,
            system_instruction: self
                .system_prompt
                .as_ref()
                .filter(|_| with_system)
                .map(|p| Content::text(None, p.clone())),
            generation_config: if self.generation.is_empty() {
                None
            } else {
                Some(self.generation.clone())
            },
            safety_settings: self.safety_settings.clone(),
        }
    }

    /// Send a generateContent request and return the reply text.
    async fn generate(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> Result<String, ProviderError> {
        tracing::debug!(model, turns = request.contents.len(), "gemini generateContent");

        let response = self
            .client
            .post(self.generate_url(model))
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let body: GenerateResponse =
            response
                .json()
                .await
                .map_err(|e| ProviderError::ProviderError {
                    message: format!("failed to parse response: {}", e),
                })?;

        Self::extract_text(body)
    }

    /// Map a non-success HTTP response to a [`ProviderError`].
    async fn error_from_response(response: reqwest::Response) -> ProviderError {
        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        let message = serde_json::from_str::<ApiError>(&text)
            .map(|e| e.error.message)
            .unwrap_or(text);

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            ProviderError::AuthenticationError(message)
        } else {
            ProviderError::RequestFailed(format!("HTTP {}: {}", status, message))
        }
    }

    /// Pull the reply text out of the first candidate.
    fn extract_text(body: GenerateResponse) -> Result<String, ProviderError> {
        if let Some(reason) = body.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(ProviderError::Blocked(reason));
        }

        let candidate = body
            .candidates
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyResponse)?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if !text.is_empty() {
            return Ok(text);
        }
        match candidate.finish_reason.as_deref() {
            Some(reason @ ("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT")) => {
                Err(ProviderError::Blocked(reason.to_string()))
            }
            _ => Err(ProviderError::EmptyResponse),
        }
    }

    fn models_url(&self, page_token: Option<&str>) -> Result<reqwest::Url, ProviderError> {
        let mut url = reqwest::Url::parse(&format!("{}/v1beta/models", self.base_url))
            .map_err(|e| ProviderError::RequestFailed(format!("invalid base URL: {}", e)))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("pageSize", MODELS_PAGE_SIZE);
            if let Some(token) = page_token {
                query.append_pair("pageToken", token);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn complete(&self, messages: &[Message]) -> Result<Message, ProviderError> {
        let request = self.build_request(Self::build_contents(messages), true);
        let text = self.generate(&self.model, &request).await?;
        Ok(Message::new(Role::Model, text))
    }

    async fn describe_image(
        &self,
        prompt: &str,
        image: &ImageInput,
    ) -> Result<String, ProviderError> {
        let content = Content {
            role: Some(Role::User.as_str().to_string()),
            parts: vec![
                Part::text(prompt),
                Part {
                    text: None,
                    inline_data: Some(InlineData {
                        mime_type: image.mime_type.clone(),
                        data: BASE64.encode(&image.data),
                    }),
                },
            ],
        };
        let request = self.build_request(vec![content], false);
        self.generate(&self.vision_model, &request).await
    }

    async fn list_models(&self) -> Result<Vec<ModelSummary>, ProviderError> {
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let response = self
                .client
                .get(self.models_url(page_token.as_deref())?)
                .header(API_KEY_HEADER, &self.api_key)
                .send()
                .await
                .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

            if !response.status().is_success() {
                return Err(Self::error_from_response(response).await);
            }

            let page: ListModelsResponse =
                response
                    .json()
                    .await
                    .map_err(|e| ProviderError::ProviderError {
                        message: format!("failed to parse model list: {}", e),
                    })?;

            models.extend(page.models.into_iter().map(|m| ModelSummary {
                name: m.name,
                display_name: m.display_name,
                description: m.description,
                supported_generation_methods: m.supported_generation_methods,
            }));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(models)
    }
}
