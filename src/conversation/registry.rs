//! 会话注册表：进程级 id → Conversation 映射 + 追加式账本
//!
//! 注册表是会话及其账本的唯一所有者。追加是原子单元：持有写锁完成内存
//! 变更并同步推送广播中枢，保证新订阅者看到的快照与事件流不会互相超前。
//! 纯内存存储，进程退出即丢弃（范围内无持久化要求）。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::conversation::types::{
    Conversation, ConversationStatus, Envelope, LedgerEvent, Message, MessageKind, Role, Task,
    Trace,
};
use crate::core::CoreError;
use crate::hub::BroadcastHub;

/// 会话注册表
pub struct ConversationRegistry {
    conversations: RwLock<HashMap<String, Conversation>>,
    hub: Arc<BroadcastHub>,
}

impl ConversationRegistry {
    pub fn new(hub: Arc<BroadcastHub>) -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
            hub,
        }
    }

    /// 创建会话（status=processing，空账本），返回会话 ID
    pub async fn create(&self, request: &str, pipeline_variant: &str) -> String {
        let conversation = Conversation::new(request, pipeline_variant);
        let id = conversation.id.clone();

        self.conversations
            .write()
            .await
            .insert(id.clone(), conversation);

        tracing::info!("Created conversation {}", id);
        id
    }

    /// 取会话快照（克隆，调用方拿不到账本的可变引用）
    pub async fn snapshot(&self, id: &str) -> Option<Conversation> {
        self.conversations.read().await.get(id).cloned()
    }

    /// 当前会话数
    pub async fn conversation_count(&self) -> usize {
        self.conversations.read().await.len()
    }

    /// 标记会话状态（单调：终态不可离开；同终态重复标记幂等）
    pub async fn mark_status(
        &self,
        id: &str,
        status: ConversationStatus,
    ) -> Result<(), CoreError> {
        let mut conversations = self.conversations.write().await;
        let conv = conversations
            .get_mut(id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;

        if conv.status == status {
            return Ok(());
        }
        if conv.status.is_terminal() {
            return Err(CoreError::InvalidTransition {
                from: conv.status,
                to: status,
            });
        }

        conv.status = status;
        Ok(())
    }

    /// 追加账本事件并广播
    ///
    /// 广播在写锁内完成：对同一会话，事件到达观察者的顺序必然等于追加顺序。
    pub async fn append(&self, id: &str, event: LedgerEvent) -> Result<(), CoreError> {
        let mut conversations = self.conversations.write().await;
        let conv = conversations
            .get_mut(id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;

        match &event {
            LedgerEvent::Message(m) => conv.messages.push(m.clone()),
            LedgerEvent::Trace(t) => conv.traces.push(t.clone()),
            LedgerEvent::Task(t) => conv.tasks.push(t.clone()),
            LedgerEvent::TaskUpdate(t) => {
                if let Some(slot) = conv.tasks.iter_mut().find(|x| x.id == t.id) {
                    *slot = t.clone();
                }
            }
        }

        let envelope = Envelope::new(event);
        self.hub.publish(id, &envelope).await;
        Ok(())
    }

    /// 追加一条消息
    pub async fn append_message(
        &self,
        id: &str,
        from: Role,
        to: Role,
        content: impl Into<String>,
        kind: MessageKind,
    ) -> Result<(), CoreError> {
        self.append(id, LedgerEvent::Message(Message::new(from, to, content, kind)))
            .await
    }

    /// 追加一条轨迹
    pub async fn append_trace(
        &self,
        id: &str,
        agent: Role,
        action: impl Into<String>,
        details: impl Into<String>,
    ) -> Result<(), CoreError> {
        self.append(id, LedgerEvent::Trace(Trace::new(agent, action, details)))
            .await
    }

    /// 原子地修改一个任务并以 task_update 事件重新广播完整快照
    ///
    /// apply 返回 Err 时任务保持原样，不发事件。
    pub async fn update_task<F>(
        &self,
        id: &str,
        task_id: &str,
        apply: F,
    ) -> Result<Task, CoreError>
    where
        F: FnOnce(&mut Task) -> Result<(), CoreError>,
    {
        let mut conversations = self.conversations.write().await;
        let conv = conversations
            .get_mut(id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;

        let task = conv
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| CoreError::TaskNotFound(task_id.to_string()))?;

        apply(task)?;
        let snapshot = task.clone();

        let envelope = Envelope::new(LedgerEvent::TaskUpdate(snapshot.clone()));
        self.hub.publish(id, &envelope).await;
        Ok(snapshot)
    }
}
