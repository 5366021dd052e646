//! 会话数据模型
//!
//! 一个会话（Conversation）拥有三类账本条目：消息（Message）、轨迹（Trace）、
//! 任务（Task）。三类条目共用一条全局追加顺序，每次追加都会通过广播中枢
//! 推送给观察者（见 `hub` 模块）。

use serde::{Deserialize, Serialize};

/// 当前毫秒时间戳
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// 参与角色：固定的四个内部角色 + 外部 user
///
/// 序列化为前端使用的角色 ID（`coordinator-1` 等），与原有协议保持一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "coordinator-1")]
    Coordinator,
    #[serde(rename = "researcher-1")]
    Researcher,
    #[serde(rename = "planner-1")]
    Planner,
    #[serde(rename = "executor-1")]
    Executor,
}

impl Role {
    /// 角色 ID（与序列化结果一致）
    pub fn id(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Coordinator => "coordinator-1",
            Role::Researcher => "researcher-1",
            Role::Planner => "planner-1",
            Role::Executor => "executor-1",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// 消息类型：用户请求 / 角色间内部消息 / 最终响应
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Request,
    Internal,
    Response,
}

/// 角色间消息（追加后不可变）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// 消息 ID
    pub id: String,
    /// 发送方角色
    pub from: Role,
    /// 接收方角色
    pub to: Role,
    /// 消息内容
    pub content: String,
    /// 毫秒时间戳
    pub timestamp: i64,
    /// 消息类型
    #[serde(rename = "type")]
    pub kind: MessageKind,
}

impl Message {
    pub fn new(from: Role, to: Role, content: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            id: format!("msg_{}", uuid::Uuid::new_v4()),
            from,
            to,
            content: content.into(),
            timestamp: now_millis(),
            kind,
        }
    }
}

/// 轨迹：角色正在做什么的审计记录，不参与控制流
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    /// 轨迹 ID
    pub id: String,
    /// 执行角色
    #[serde(rename = "agentId")]
    pub agent_id: Role,
    /// 动作标签（短字符串，如 `received_request`）
    pub action: String,
    /// 详情文本
    pub details: String,
    /// 毫秒时间戳
    pub timestamp: i64,
}

impl Trace {
    pub fn new(agent_id: Role, action: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            id: format!("trace_{}", uuid::Uuid::new_v4()),
            agent_id,
            action: action.into(),
            details: details.into(),
            timestamp: now_millis(),
        }
    }
}

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    /// 等待执行
    Pending,
    /// 正在执行
    InProgress,
    /// 已完成
    Completed,
    /// 执行失败
    Failed,
}

impl TaskStatus {
    /// 是否为终态（completed / failed）
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// 任务：由 TaskTracker 原地更新，每次变更都整体重新广播
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// 任务 ID
    pub id: String,
    /// 负责角色
    pub assigned_to: Role,
    /// 任务描述
    pub description: String,
    /// 任务状态
    pub status: TaskStatus,
    /// 创建时间（毫秒时间戳）
    pub created_at: i64,
    /// 完成时间（进入终态时设置，且只设置一次）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    /// 执行结果（一旦设置不再清除）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl Task {
    pub fn new(assigned_to: Role, description: impl Into<String>) -> Self {
        Self {
            id: format!("task_{}", uuid::Uuid::new_v4()),
            assigned_to,
            description: description.into(),
            status: TaskStatus::Pending,
            created_at: now_millis(),
            completed_at: None,
            result: None,
        }
    }
}

/// 会话状态（单调：processing → completed / failed，终态不可离开）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Processing,
    Completed,
    Failed,
}

impl ConversationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConversationStatus::Completed | ConversationStatus::Failed)
    }
}

/// 会话：账本（messages / traces / tasks）的唯一所有者
///
/// 注册表持有全部可变引用；编排器与观察者只拿到克隆或事件。
#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    /// 会话 ID
    pub id: String,
    /// 原始请求文本
    pub request: String,
    /// 选定的流水线变体
    pub pipeline_variant: String,
    /// 会话状态
    pub status: ConversationStatus,
    /// 创建时间（毫秒时间戳）
    pub created_at: i64,
    /// 消息账本
    pub messages: Vec<Message>,
    /// 轨迹账本
    pub traces: Vec<Trace>,
    /// 任务账本
    pub tasks: Vec<Task>,
}

impl Conversation {
    pub fn new(request: impl Into<String>, pipeline_variant: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            request: request.into(),
            pipeline_variant: pipeline_variant.into(),
            status: ConversationStatus::Processing,
            created_at: now_millis(),
            messages: Vec::new(),
            traces: Vec::new(),
            tasks: Vec::new(),
        }
    }
}

/// 账本事件：追加消息 / 轨迹 / 新任务 / 任务更新
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum LedgerEvent {
    Message(Message),
    Trace(Trace),
    Task(Task),
    TaskUpdate(Task),
}

/// 广播信封：`{type, data, timestamp}`，推给观察者的最终载荷
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    #[serde(flatten)]
    pub event: LedgerEvent,
    /// 广播时间（毫秒时间戳）
    pub timestamp: i64,
}

impl Envelope {
    pub fn new(event: LedgerEvent) -> Self {
        Self {
            event,
            timestamp: now_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ids() {
        assert_eq!(Role::User.id(), "user");
        assert_eq!(Role::Coordinator.id(), "coordinator-1");
        assert_eq!(
            serde_json::to_value(Role::Researcher).unwrap(),
            serde_json::json!("researcher-1")
        );
    }

    #[test]
    fn test_task_status_wire_format() {
        assert_eq!(
            serde_json::to_value(TaskStatus::InProgress).unwrap(),
            serde_json::json!("in-progress")
        );
        assert!(TaskStatus::Completed.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
    }

    #[test]
    fn test_envelope_wire_shape() {
        let msg = Message::new(Role::User, Role::Coordinator, "hello", MessageKind::Request);
        let env = Envelope::new(LedgerEvent::Message(msg));
        let value = serde_json::to_value(&env).unwrap();

        assert_eq!(value["type"], "message");
        assert_eq!(value["data"]["from"], "user");
        assert_eq!(value["data"]["to"], "coordinator-1");
        assert_eq!(value["data"]["type"], "request");
        assert!(value["timestamp"].is_i64());
    }

    #[test]
    fn test_task_update_envelope_tag() {
        let task = Task::new(Role::Researcher, "Research relevant information");
        let env = Envelope::new(LedgerEvent::TaskUpdate(task));
        let value = serde_json::to_value(&env).unwrap();

        assert_eq!(value["type"], "task_update");
        assert_eq!(value["data"]["assignedTo"], "researcher-1");
        assert_eq!(value["data"]["status"], "pending");
    }
}
