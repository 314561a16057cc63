use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

use crate::config::LlmConfig;
use crate::error::CompletionError;

/// Text-completion capability used by the pipeline.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, system_instructions: &str, user_prompt: &str) -> Result<String, CompletionError>;
}

#[derive(Clone)]
pub struct LLMClient {
    pub client: Client<OpenAIConfig>,
    pub model: String,
    pub timeout: Duration,
}

impl LLMClient {
    pub fn new(api_key: String, base_url: Option<String>, model: String, timeout: Duration) -> Self {
        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(url) = base_url {
            config = config.with_api_base(url);
        }
        let client = Client::with_config(config);
        Self { client, model, timeout }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(
            config.api_key.clone().unwrap_or_default(),
            config.base_url.clone(),
            config.model.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    async fn chat(&self, system_prompt: &str, user_input: &str) -> Result<String, CompletionError> {
        info!("🤖 [LLM] Sending request (Model: {})...", self.model);

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([
                ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessageArgs::default()
                        .content(system_prompt)
                        .build()?,
                ),
                ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(user_input)
                        .build()?,
                ),
            ])
            .build()?;

        let response = self.client.chat().create(request).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(CompletionError::EmptyResponse)?;

        info!("🤖 [LLM] Response received ({} chars).", content.chars().count());
        Ok(content)
    }
}

#[async_trait]
impl CompletionService for LLMClient {
    async fn complete(&self, system_instructions: &str, user_prompt: &str) -> Result<String, CompletionError> {
        match tokio::time::timeout(self.timeout, self.chat(system_instructions, user_prompt)).await {
            Ok(result) => result,
            Err(_) => Err(CompletionError::Timeout {
                secs: self.timeout.as_secs(),
            }),
        }
    }
}
