//! 推理客户端抽象
//!
//! 所有后端（OpenAI 兼容 / DeepSeek / Mock）实现 ReasoningClient：
//! 以指定角色身份、给定 system prompt 与输入上下文，产出一段文本。
//! 外部推理服务被视为不可信、高延迟且可能失败的 I/O。

use async_trait::async_trait;
use thiserror::Error;

use crate::conversation::types::Role;

/// 推理调用错误
#[derive(Error, Debug, Clone)]
pub enum ReasoningError {
    /// 网络 / API 错误
    #[error("Reasoning API error: {0}")]
    Api(String),

    /// 调用超时（秒）
    #[error("Reasoning call timed out after {0}s")]
    Timeout(u64),
}

/// 推理客户端 trait
#[async_trait]
pub trait ReasoningClient: Send + Sync {
    /// 单次非流式推理调用
    async fn generate(
        &self,
        role: Role,
        system_prompt: &str,
        input: &str,
    ) -> Result<String, ReasoningError>;
}
