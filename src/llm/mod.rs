//! LLM 层：推理客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）

pub mod deepseek;
pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

pub use deepseek::{create_deepseek_client, DEEPSEEK_BASE_URL, DEEPSEEK_CHAT};
pub use mock::MockReasoningClient;
pub use openai::OpenAiReasoningClient;
pub use traits::{ReasoningClient, ReasoningError};

use crate::config::LlmSection;

/// 根据配置创建推理客户端
///
/// 非 mock 后端在既无配置 api_key 也无对应环境变量时返回 None，
/// 由提交接口以配置错误拒绝请求。
pub fn create_reasoning_client(cfg: &LlmSection) -> Option<Arc<dyn ReasoningClient>> {
    match cfg.provider.as_str() {
        "mock" => Some(Arc::new(MockReasoningClient)),

        "deepseek" => {
            let api_key = cfg
                .api_key
                .clone()
                .or_else(|| std::env::var("DEEPSEEK_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())?;
            Some(Arc::new(create_deepseek_client(cfg.model.as_deref(), &api_key)))
        }

        _ => {
            let api_key = cfg
                .api_key
                .clone()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())?;
            let model = cfg.model.as_deref().unwrap_or("gpt-4");
            Some(Arc::new(OpenAiReasoningClient::new(
                cfg.base_url.as_deref(),
                model,
                &api_key,
            )))
        }
    }
}
