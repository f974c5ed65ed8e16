//! The extraction-service seam and its LLM-provider implementation.
//!
//! [`ExtractionService`] is the only interface the pipeline has to the
//! outside model: one call taking the instruction text and one page image,
//! answering with text or an error. Tests substitute a fake that returns
//! canned or failing replies.
//!
//! [`LlmExtractionService`] forwards the call to any vision-capable
//! `edgequake-llm` provider (Gemini, OpenAI, Anthropic, Mistral, Ollama, …).

use crate::config::{ExtractionConfig, ServiceSettings};
use crate::error::{ExtractError, ServiceError};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use tracing::{debug, info};

/// A successful reply from the extraction service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceReply {
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl ServiceReply {
    /// A reply with no token accounting.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// External multimodal extraction service.
#[async_trait]
pub trait ExtractionService: Send + Sync {
    /// Submit one page image together with the instruction.
    async fn extract(&self, instruction: &str, image: ImageData)
        -> Result<ServiceReply, ServiceError>;
}

/// [`ExtractionService`] backed by an `edgequake-llm` provider.
pub struct LlmExtractionService {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
}

impl LlmExtractionService {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ExtractionConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    /// Build the service from resolved settings.
    ///
    /// A pre-built provider in `config` wins over `settings`. Otherwise the
    /// provider factory creates one, reading the credential variable that
    /// [`ServiceSettings`] already checked.
    pub fn from_settings(
        settings: &ServiceSettings,
        config: &ExtractionConfig,
    ) -> Result<Self, ExtractError> {
        if let Some(ref provider) = config.provider {
            return Ok(Self::new(Arc::clone(provider), config));
        }

        let provider = ProviderFactory::create_llm_provider(&settings.provider, &settings.model)
            .map_err(|e| ExtractError::Configuration {
                provider: settings.provider.clone(),
                hint: format!("{e}"),
            })?;
        info!(
            "Extraction service: provider={} model={}",
            settings.provider, settings.model
        );
        Ok(Self::new(provider, config))
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ExtractionService for LlmExtractionService {
    async fn extract(
        &self,
        instruction: &str,
        image: ImageData,
    ) -> Result<ServiceReply, ServiceError> {
        // Instruction and image travel together in a single user turn.
        let messages = vec![ChatMessage::user_with_images(instruction, vec![image])];
        let options = self.options();

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ServiceError::new(format!("{e}")))?;

        debug!(
            "Service reply: {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );

        Ok(ServiceReply {
            text: response.content,
            input_tokens: response.prompt_tokens as usize,
            output_tokens: response.completion_tokens as usize,
        })
    }
}
