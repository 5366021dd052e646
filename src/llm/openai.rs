//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url）；
//! 支持 OpenAI、DeepSeek、自建代理等。

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::conversation::types::Role;
use crate::llm::{ReasoningClient, ReasoningError};

/// OpenAI 兼容客户端：持有 Client 与 model 名
pub struct OpenAiReasoningClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiReasoningClient {
    pub fn new(base_url: Option<&str>, model: &str, api_key: &str) -> Self {
        let config = if let Some(url) = base_url {
            OpenAIConfig::new().with_api_base(url).with_api_key(api_key)
        } else {
            OpenAIConfig::new().with_api_key(api_key)
        };

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl ReasoningClient for OpenAiReasoningClient {
    async fn generate(
        &self,
        role: Role,
        system_prompt: &str,
        input: &str,
    ) -> Result<String, ReasoningError> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system_prompt.to_string())
                    .build()
                    .map_err(|e| ReasoningError::Api(e.to_string()))?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(input.to_string())
                    .build()
                    .map_err(|e| ReasoningError::Api(e.to_string()))?,
            ),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .build()
            .map_err(|e| ReasoningError::Api(e.to_string()))?;

        tracing::debug!("Reasoning call for role {} (model {})", role, self.model);

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| ReasoningError::Api(e.to_string()))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        Ok(content)
    }
}
