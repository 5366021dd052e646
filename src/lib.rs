//! Hive - 多智能体协作后端
//!
//! 一条固定的四角色流水线（coordinator / researcher / planner / executor）
//! 协作回答单个用户请求，所有状态变更实时广播给观察者。
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **conversation**: 会话数据模型、注册表（追加式账本）与任务跟踪
//! - **core**: 错误类型
//! - **hub**: 广播中枢（观察者连接管理与事件扇出）
//! - **llm**: 推理客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **pipeline**: 固定四阶段流水线编排器
//! - **server**: HTTP / WebSocket 服务
//! - **observability**: tracing 初始化

pub mod config;
pub mod conversation;
pub mod core;
pub mod hub;
pub mod llm;
pub mod observability;
pub mod pipeline;
pub mod server;
