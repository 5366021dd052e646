//! 任务跟踪：四个角色的任务生命周期管理
//!
//! 合法迁移：pending → in-progress，pending / in-progress → completed | failed
//! （失败路径允许从 pending 短路）。其余迁移一律返回 InvalidTaskTransition。
//! 每次成功的创建 / 迁移都会把完整任务快照追加进账本并广播。

use std::sync::Arc;

use crate::conversation::registry::ConversationRegistry;
use crate::conversation::types::{now_millis, LedgerEvent, Role, Task, TaskStatus};
use crate::core::CoreError;

/// 任务跟踪器
pub struct TaskTracker {
    registry: Arc<ConversationRegistry>,
}

impl TaskTracker {
    pub fn new(registry: Arc<ConversationRegistry>) -> Self {
        Self { registry }
    }

    /// 创建任务（status=pending）并广播 task 事件
    pub async fn create_task(
        &self,
        conversation_id: &str,
        role: Role,
        description: impl Into<String>,
    ) -> Result<Task, CoreError> {
        let task = Task::new(role, description);
        self.registry
            .append(conversation_id, LedgerEvent::Task(task.clone()))
            .await?;
        Ok(task)
    }

    /// 迁移任务状态，可附带执行结果；成功后广播 task_update 事件
    ///
    /// 进入终态时设置 completed_at（终态不可再离开，因此只会设置一次）；
    /// result 只在传入 Some 时覆盖，已有结果不会被清除。
    pub async fn transition(
        &self,
        conversation_id: &str,
        task_id: &str,
        new_status: TaskStatus,
        result: Option<String>,
    ) -> Result<Task, CoreError> {
        self.registry
            .update_task(conversation_id, task_id, |task| {
                if !is_legal_transition(task.status, new_status) {
                    return Err(CoreError::InvalidTaskTransition {
                        from: task.status,
                        to: new_status,
                    });
                }

                task.status = new_status;
                if new_status.is_terminal() && task.completed_at.is_none() {
                    task.completed_at = Some(now_millis());
                }
                if let Some(r) = result {
                    task.result = Some(r);
                }
                Ok(())
            })
            .await
    }
}

/// 任务状态迁移表
fn is_legal_transition(from: TaskStatus, to: TaskStatus) -> bool {
    use TaskStatus::*;
    matches!(
        (from, to),
        (Pending, InProgress)
            | (Pending, Completed)
            | (Pending, Failed)
            | (InProgress, Completed)
            | (InProgress, Failed)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::{BroadcastHub, ObserverScope};

    async fn setup() -> (Arc<BroadcastHub>, Arc<ConversationRegistry>, TaskTracker, String) {
        let hub = Arc::new(BroadcastHub::new());
        let registry = Arc::new(ConversationRegistry::new(Arc::clone(&hub)));
        let id = registry.create("q", "default").await;
        let tracker = TaskTracker::new(Arc::clone(&registry));
        (hub, registry, tracker, id)
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let (_hub, registry, tracker, cid) = setup().await;

        let task = tracker
            .create_task(&cid, Role::Researcher, "Research relevant information")
            .await
            .unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.completed_at.is_none());

        let task = tracker
            .transition(&cid, &task.id, TaskStatus::InProgress, None)
            .await
            .unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert!(task.completed_at.is_none());

        let task = tracker
            .transition(&cid, &task.id, TaskStatus::Completed, Some("findings".into()))
            .await
            .unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.completed_at.is_some());
        assert_eq!(task.result.as_deref(), Some("findings"));

        // 账本里的任务与返回的快照一致
        let snap = registry.snapshot(&cid).await.unwrap();
        assert_eq!(snap.tasks.len(), 1);
        assert_eq!(snap.tasks[0].status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_short_circuit_failure_from_pending() {
        let (_hub, _registry, tracker, cid) = setup().await;
        let task = tracker.create_task(&cid, Role::Planner, "plan").await.unwrap();

        let task = tracker
            .transition(&cid, &task.id, TaskStatus::Failed, None)
            .await
            .unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert!(task.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_illegal_transitions_are_surfaced() {
        let (_hub, _registry, tracker, cid) = setup().await;
        let task = tracker.create_task(&cid, Role::Executor, "run").await.unwrap();

        tracker
            .transition(&cid, &task.id, TaskStatus::Completed, None)
            .await
            .unwrap();

        // 终态不可离开
        for to in [TaskStatus::Pending, TaskStatus::InProgress, TaskStatus::Failed, TaskStatus::Completed] {
            let err = tracker
                .transition(&cid, &task.id, to, None)
                .await
                .unwrap_err();
            assert!(matches!(err, CoreError::InvalidTaskTransition { .. }));
        }
    }

    #[tokio::test]
    async fn test_result_is_not_cleared() {
        let (_hub, _registry, tracker, cid) = setup().await;
        let task = tracker.create_task(&cid, Role::Researcher, "r").await.unwrap();
        tracker
            .transition(&cid, &task.id, TaskStatus::InProgress, Some("partial".into()))
            .await
            .unwrap();
        let task = tracker
            .transition(&cid, &task.id, TaskStatus::Completed, None)
            .await
            .unwrap();
        assert_eq!(task.result.as_deref(), Some("partial"));
    }

    #[tokio::test]
    async fn test_unknown_task() {
        let (_hub, _registry, tracker, cid) = setup().await;
        let err = tracker
            .transition(&cid, "task_missing", TaskStatus::InProgress, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::TaskNotFound(_)));
    }

    #[tokio::test]
    async fn test_events_emitted_on_create_and_transition() {
        let (hub, _registry, tracker, cid) = setup().await;
        let mut sub = hub.subscribe(ObserverScope::Conversation(cid.clone())).await;

        let task = tracker.create_task(&cid, Role::Researcher, "r").await.unwrap();
        tracker
            .transition(&cid, &task.id, TaskStatus::InProgress, None)
            .await
            .unwrap();

        let created: serde_json::Value =
            serde_json::from_str(&sub.rx.try_recv().unwrap()).unwrap();
        assert_eq!(created["type"], "task");
        assert_eq!(created["data"]["status"], "pending");

        let updated: serde_json::Value =
            serde_json::from_str(&sub.rx.try_recv().unwrap()).unwrap();
        assert_eq!(updated["type"], "task_update");
        assert_eq!(updated["data"]["status"], "in-progress");
        assert_eq!(updated["data"]["id"], task.id);
    }
}
