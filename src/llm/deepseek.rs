//! DeepSeek API 客户端（OpenAI 兼容格式）
//!
//! DeepSeek 提供与 OpenAI 完全兼容的 API 接口。
//! - Base URL: https://api.deepseek.com
//! - 模型: deepseek-chat (常规对话), deepseek-reasoner (思考模式)

use crate::llm::OpenAiReasoningClient;

/// DeepSeek API 常量
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const DEEPSEEK_CHAT: &str = "deepseek-chat";

/// 创建 DeepSeek 客户端
///
/// 模型未指定时默认 `deepseek-chat`（响应快，适合流水线分阶段调用）。
pub fn create_deepseek_client(model: Option<&str>, api_key: &str) -> OpenAiReasoningClient {
    let model = model.unwrap_or(DEEPSEEK_CHAT);
    OpenAiReasoningClient::new(Some(DEEPSEEK_BASE_URL), model, api_key)
}
