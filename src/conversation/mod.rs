//! 会话层：数据模型、注册表（账本）与任务跟踪

pub mod registry;
pub mod tasks;
pub mod types;

pub use registry::ConversationRegistry;
pub use tasks::TaskTracker;
