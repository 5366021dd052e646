//! 核心错误类型
//!
//! 错误处理策略：每个会话内部的失败在会话边界被吸收（记一条 error 轨迹并
//! 转入终态），绝不跨会话传播；状态机违例（InvalidTransition /
//! InvalidTaskTransition）返回给调用方而不是静默忽略。

use thiserror::Error;

use crate::conversation::types::{ConversationStatus, TaskStatus};
use crate::llm::ReasoningError;

/// 编排核心错误
#[derive(Error, Debug)]
pub enum CoreError {
    /// 配置错误（如缺少推理服务 API Key），在请求受理时同步暴露
    #[error("Config error: {0}")]
    Config(String),

    /// 外部推理调用失败，在流水线层面可恢复（转入 Failed）
    #[error("Reasoning call failed: {0}")]
    Reasoning(#[from] ReasoningError),

    /// 未知会话 ID
    #[error("Conversation not found: {0}")]
    NotFound(String),

    /// 未知任务 ID
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// 会话状态机违例：试图离开终态
    #[error("Invalid status transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: ConversationStatus,
        to: ConversationStatus,
    },

    /// 任务状态机违例（如 completed -> in-progress）
    #[error("Invalid task transition: {from:?} -> {to:?}")]
    InvalidTaskTransition { from: TaskStatus, to: TaskStatus },
}
