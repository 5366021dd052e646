//! 流水线集成测试：注册表 + 中枢 + 编排器端到端

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use hive::conversation::types::{ConversationStatus, MessageKind, Role, TaskStatus};
    use hive::conversation::ConversationRegistry;
    use hive::hub::{BroadcastHub, ObserverScope};
    use hive::llm::MockReasoningClient;
    use hive::pipeline::PipelineOrchestrator;

    fn setup() -> (Arc<BroadcastHub>, Arc<ConversationRegistry>, PipelineOrchestrator) {
        let hub = Arc::new(BroadcastHub::new());
        let registry = Arc::new(ConversationRegistry::new(Arc::clone(&hub)));
        let orchestrator =
            PipelineOrchestrator::new(Arc::clone(&registry), Arc::new(MockReasoningClient), 30);
        (hub, registry, orchestrator)
    }

    fn drain(sub: &mut hive::hub::Subscription) -> Vec<serde_json::Value> {
        let mut events = Vec::new();
        while let Ok(json) = sub.rx.try_recv() {
            events.push(serde_json::from_str(&json).unwrap());
        }
        events
    }

    #[tokio::test]
    async fn test_observer_sees_complete_ordered_stream() {
        let (hub, registry, orchestrator) = setup();
        let cid = registry.create("plan a launch", "default").await;

        // 会话开始前订阅：必须不重不漏、按追加顺序收到全部事件
        let mut sub = hub.subscribe(ObserverScope::Conversation(cid.clone())).await;

        orchestrator.run(&cid).await;
        let events = drain(&mut sub);
        let snap = registry.snapshot(&cid).await.unwrap();
        assert_eq!(snap.status, ConversationStatus::Completed);

        // Received 3 条 + 每个 LLM 阶段 7 条 * 3 + 交付 3 条
        assert_eq!(events.len(), 27);

        // 时间戳非递减
        let timestamps: Vec<i64> = events
            .iter()
            .map(|e| e["timestamp"].as_i64().unwrap())
            .collect();
        assert!(timestamps.windows(2).all(|w| w[0] <= w[1]));

        // 消息事件的顺序与账本完全一致
        let streamed_message_ids: Vec<&str> = events
            .iter()
            .filter(|e| e["type"] == "message")
            .map(|e| e["data"]["id"].as_str().unwrap())
            .collect();
        let ledger_message_ids: Vec<&str> =
            snap.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(streamed_message_ids, ledger_message_ids);

        // 轨迹事件同样保序
        let streamed_trace_ids: Vec<&str> = events
            .iter()
            .filter(|e| e["type"] == "trace")
            .map(|e| e["data"]["id"].as_str().unwrap())
            .collect();
        let ledger_trace_ids: Vec<&str> = snap.traces.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(streamed_trace_ids, ledger_trace_ids);

        // 每个任务：1 条 task + 2 条 task_update（in-progress → completed）
        assert_eq!(events.iter().filter(|e| e["type"] == "task").count(), 3);
        assert_eq!(
            events.iter().filter(|e| e["type"] == "task_update").count(),
            6
        );
    }

    #[tokio::test]
    async fn test_scenario_plan_a_launch() {
        let (_hub, registry, orchestrator) = setup();
        let cid = registry.create("plan a launch", "default").await;

        orchestrator.run(&cid).await;

        let snap = registry.snapshot(&cid).await.unwrap();
        assert_eq!(snap.status, ConversationStatus::Completed);

        // 每个角色恰好一个任务
        for role in [Role::Researcher, Role::Planner, Role::Executor] {
            assert_eq!(
                snap.tasks.iter().filter(|t| t.assigned_to == role).count(),
                1
            );
        }

        // 恰好一条 response 消息，发给 user
        let responses: Vec<_> = snap
            .messages
            .iter()
            .filter(|m| m.kind == MessageKind::Response)
            .collect();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].to, Role::User);

        let actions: Vec<&str> = snap.traces.iter().map(|t| t.action.as_str()).collect();
        assert!(actions.contains(&"received_request"));
        assert!(actions.contains(&"response_delivered"));
    }

    #[tokio::test]
    async fn test_concurrent_conversations_are_independent() {
        let (hub, registry, orchestrator) = setup();
        let orchestrator = Arc::new(orchestrator);

        let cid_a = registry.create("alpha request", "default").await;
        let cid_b = registry.create("beta request", "default").await;

        let mut sub_a = hub.subscribe(ObserverScope::Conversation(cid_a.clone())).await;
        let mut sub_b = hub.subscribe(ObserverScope::Conversation(cid_b.clone())).await;

        let oa = Arc::clone(&orchestrator);
        let ob = Arc::clone(&orchestrator);
        let a = cid_a.clone();
        let b = cid_b.clone();
        let (ra, rb) = tokio::join!(
            tokio::spawn(async move { oa.run(&a).await }),
            tokio::spawn(async move { ob.run(&b).await }),
        );
        ra.unwrap();
        rb.unwrap();

        let snap_a = registry.snapshot(&cid_a).await.unwrap();
        let snap_b = registry.snapshot(&cid_b).await.unwrap();
        assert_eq!(snap_a.status, ConversationStatus::Completed);
        assert_eq!(snap_b.status, ConversationStatus::Completed);

        // 两份账本内容互不掺杂
        assert!(snap_a.messages.iter().all(|m| !m.content.contains("beta")));
        assert!(snap_b.messages.iter().all(|m| !m.content.contains("alpha")));
        assert_eq!(snap_a.tasks.len(), 3);
        assert_eq!(snap_b.tasks.len(), 3);

        // 会话级观察者只看到自己的事件，且各自保序
        let events_a = drain(&mut sub_a);
        let events_b = drain(&mut sub_b);
        assert_eq!(events_a.len(), 27);
        assert_eq!(events_b.len(), 27);
        for e in &events_a {
            let text = e.to_string();
            assert!(!text.contains("beta"));
        }
        let ids: Vec<&str> = events_a
            .iter()
            .filter(|e| e["type"] == "message")
            .map(|e| e["data"]["id"].as_str().unwrap())
            .collect();
        let ledger_ids: Vec<&str> = snap_a.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ledger_ids);
    }

    #[tokio::test]
    async fn test_repeated_snapshots_identical_after_terminal_state() {
        let (_hub, registry, orchestrator) = setup();
        let cid = registry.create("idempotent query", "default").await;
        orchestrator.run(&cid).await;

        let a = serde_json::to_value(registry.snapshot(&cid).await.unwrap()).unwrap();
        let b = serde_json::to_value(registry.snapshot(&cid).await.unwrap()).unwrap();
        assert_eq!(a, b);
    }
}
