//! Mock 推理客户端（用于测试与本地演示，无需 API Key）
//!
//! 按角色返回固定格式的研究结论 / 计划 / 解决方案，便于本地跑通整条流水线。

use async_trait::async_trait;

use crate::conversation::types::Role;
use crate::llm::{ReasoningClient, ReasoningError};

/// Mock 客户端：按角色产出固定内容
#[derive(Debug, Default)]
pub struct MockReasoningClient;

#[async_trait]
impl ReasoningClient for MockReasoningClient {
    async fn generate(
        &self,
        role: Role,
        _system_prompt: &str,
        input: &str,
    ) -> Result<String, ReasoningError> {
        let preview: String = input.chars().take(60).collect();

        let output = match role {
            Role::Researcher => format!(
                "Research findings for '{}':\n- Found key insight 1\n- Discovered relevant data point 2\n- Identified related concept 3",
                preview
            ),
            Role::Planner => format!(
                "Plan based on '{}':\n1. First step of implementation\n2. Second step with details\n3. Final integration approach",
                preview
            ),
            Role::Executor => format!(
                "Final solution for '{}':\n1. Key insight from research\n2. Recommended approach from plan\n3. Concrete implementation steps",
                preview
            ),
            _ => format!("Acknowledged: {}", preview),
        };

        Ok(output)
    }
}
