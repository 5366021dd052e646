//! 流水线编排器：固定四阶段交接的线性状态机
//!
//! Received → Researching → Planning → Executing → Delivering → Done，
//! 任一非终态都可因推理调用失败 / 超时转入 Failed。拓扑是静态的，因此
//! 用枚举阶段 + 线性推进表达，而不是通用 DAG 调度器；只有每个阶段的
//! *内容* 依赖外部推理能力。
//!
//! 每个会话由一个独立的顺序任务驱动（单写者纪律）：同一会话绝不并发追加
//! 账本；多个会话之间完全独立并发。

pub mod prompts;

use std::sync::Arc;
use std::time::Duration;

use crate::conversation::types::{ConversationStatus, MessageKind, Role, TaskStatus};
use crate::conversation::{ConversationRegistry, TaskTracker};
use crate::core::CoreError;
use crate::llm::{ReasoningClient, ReasoningError};

/// 流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Researching,
    Planning,
    Executing,
    Delivering,
    Done,
    Failed,
}

impl Stage {
    /// 阶段标签（error 轨迹中引用）
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Researching => "research",
            Stage::Planning => "planning",
            Stage::Executing => "execution",
            Stage::Delivering => "delivery",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }
}

/// 一个 LLM 阶段的静态描述：角色、任务文案、轨迹标签、提示词
struct StageProfile {
    role: Role,
    task_description: &'static str,
    started_action: &'static str,
    started_details: &'static str,
    completed_action: &'static str,
    completed_details: &'static str,
    system_prompt: &'static str,
}

impl StageProfile {
    /// 协调者发给该角色的委派消息
    fn ask(&self, input: &str) -> String {
        match self.role {
            Role::Researcher => {
                format!("I need you to research information related to: {}", input)
            }
            Role::Planner => {
                format!("Based on these research findings, create a plan: {}", input)
            }
            _ => format!("Please execute this plan: {}", input),
        }
    }
}

const RESEARCH: StageProfile = StageProfile {
    role: Role::Researcher,
    task_description: "Research relevant information",
    started_action: "research_started",
    started_details: "Beginning information gathering",
    completed_action: "research_completed",
    completed_details: "Completed information gathering",
    system_prompt: prompts::RESEARCHER_PROMPT,
};

const PLANNING: StageProfile = StageProfile {
    role: Role::Planner,
    task_description: "Create execution plan",
    started_action: "planning_started",
    started_details: "Creating execution plan",
    completed_action: "planning_completed",
    completed_details: "Completed execution plan",
    system_prompt: prompts::PLANNER_PROMPT,
};

const EXECUTION: StageProfile = StageProfile {
    role: Role::Executor,
    task_description: "Execute plan and generate solution",
    started_action: "execution_started",
    started_details: "Implementing solution",
    completed_action: "execution_completed",
    completed_details: "Completed implementation",
    system_prompt: prompts::EXECUTOR_PROMPT,
};

/// 流水线失败时发给用户的兜底响应
const APOLOGY: &str =
    "I'm sorry, something went wrong while processing your request. Please try again later.";

/// 流水线编排器
pub struct PipelineOrchestrator {
    registry: Arc<ConversationRegistry>,
    tracker: TaskTracker,
    client: Arc<dyn ReasoningClient>,
    /// 单次推理调用超时（秒）
    timeout_secs: u64,
}

impl PipelineOrchestrator {
    pub fn new(
        registry: Arc<ConversationRegistry>,
        client: Arc<dyn ReasoningClient>,
        timeout_secs: u64,
    ) -> Self {
        let tracker = TaskTracker::new(Arc::clone(&registry));
        Self {
            registry,
            tracker,
            client,
            timeout_secs,
        }
    }

    /// 驱动一个会话跑完整条流水线
    ///
    /// 所有失败都在此吸收：转入 Failed 终态并记录轨迹，绝不上抛、
    /// 绝不影响其他会话。
    pub async fn run(&self, conversation_id: &str) {
        let snapshot = match self.registry.snapshot(conversation_id).await {
            Some(s) => s,
            None => {
                tracing::error!("Pipeline started for unknown conversation {}", conversation_id);
                return;
            }
        };

        match self.drive(conversation_id, &snapshot.request, &snapshot.pipeline_variant).await {
            Ok(()) => tracing::info!("Conversation {} completed", conversation_id),
            Err((stage, err)) => self.fail(conversation_id, stage, err).await,
        }
    }

    /// 线性推进状态机，返回出错阶段与原因
    async fn drive(
        &self,
        cid: &str,
        request: &str,
        variant: &str,
    ) -> Result<(), (Stage, CoreError)> {
        let mut stage = Stage::Received;
        let mut carry = request.to_string();

        loop {
            stage = match stage {
                Stage::Received => {
                    self.enter_received(cid, request, variant)
                        .await
                        .map_err(|e| (Stage::Received, e))?;
                    Stage::Researching
                }
                Stage::Researching => {
                    carry = self
                        .run_stage(cid, &RESEARCH, &carry)
                        .await
                        .map_err(|e| (Stage::Researching, e))?;
                    Stage::Planning
                }
                Stage::Planning => {
                    carry = self
                        .run_stage(cid, &PLANNING, &carry)
                        .await
                        .map_err(|e| (Stage::Planning, e))?;
                    Stage::Executing
                }
                Stage::Executing => {
                    carry = self
                        .run_stage(cid, &EXECUTION, &carry)
                        .await
                        .map_err(|e| (Stage::Executing, e))?;
                    Stage::Delivering
                }
                Stage::Delivering => {
                    self.deliver(cid, &carry)
                        .await
                        .map_err(|e| (Stage::Delivering, e))?;
                    Stage::Done
                }
                Stage::Done | Stage::Failed => return Ok(()),
            };
        }
    }

    /// Received：登记请求消息与接收轨迹
    async fn enter_received(
        &self,
        cid: &str,
        request: &str,
        variant: &str,
    ) -> Result<(), CoreError> {
        self.registry
            .append_message(cid, Role::User, Role::Coordinator, request, MessageKind::Request)
            .await?;
        self.registry
            .append_trace(
                cid,
                Role::Coordinator,
                "received_request",
                format!("Received: {}", request),
            )
            .await?;
        if variant != "default" {
            self.registry
                .append_trace(
                    cid,
                    Role::Coordinator,
                    "variant_selected",
                    format!("Selected pipeline variant: {}", variant),
                )
                .await?;
        }
        self.registry
            .append_trace(cid, Role::Coordinator, "analyzing_request", "Analyzing user request")
            .await?;
        Ok(())
    }

    /// 跑一个 LLM 阶段：建任务 → 委派消息 → 调推理（限时）→ 完成任务与回传消息
    ///
    /// 推理失败 / 超时：任务标记 failed，错误上抛给 fail() 统一收尾。
    async fn run_stage(
        &self,
        cid: &str,
        profile: &StageProfile,
        input: &str,
    ) -> Result<String, CoreError> {
        let task = self
            .tracker
            .create_task(cid, profile.role, profile.task_description)
            .await?;

        self.registry
            .append_message(cid, Role::Coordinator, profile.role, profile.ask(input), MessageKind::Internal)
            .await?;
        self.registry
            .append_trace(cid, profile.role, profile.started_action, profile.started_details)
            .await?;
        self.tracker
            .transition(cid, &task.id, TaskStatus::InProgress, None)
            .await?;

        // 唯一的悬挂点：推理调用可能长时间阻塞，必须限时
        let outcome = match tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            self.client.generate(profile.role, profile.system_prompt, input),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ReasoningError::Timeout(self.timeout_secs)),
        };

        match outcome {
            Ok(text) => {
                self.tracker
                    .transition(cid, &task.id, TaskStatus::Completed, Some(text.clone()))
                    .await?;
                self.registry
                    .append_trace(cid, profile.role, profile.completed_action, profile.completed_details)
                    .await?;
                self.registry
                    .append_message(cid, profile.role, Role::Coordinator, text.clone(), MessageKind::Internal)
                    .await?;
                Ok(text)
            }
            Err(e) => {
                self.tracker
                    .transition(cid, &task.id, TaskStatus::Failed, None)
                    .await?;
                Err(CoreError::Reasoning(e))
            }
        }
    }

    /// Delivering：把最终方案交付给用户并标记会话完成
    async fn deliver(&self, cid: &str, solution: &str) -> Result<(), CoreError> {
        self.registry
            .append_trace(cid, Role::Coordinator, "solution_approved", "Approved final solution")
            .await?;
        self.registry
            .append_message(cid, Role::Coordinator, Role::User, solution, MessageKind::Response)
            .await?;
        self.registry
            .append_trace(
                cid,
                Role::Coordinator,
                "response_delivered",
                "Delivered final response to user",
            )
            .await?;
        self.registry
            .mark_status(cid, ConversationStatus::Completed)
            .await?;
        Ok(())
    }

    /// Failed 终态：error 轨迹（引用出错阶段）+ 致歉响应 + 会话标记失败
    async fn fail(&self, cid: &str, stage: Stage, err: CoreError) {
        tracing::error!(
            "Conversation {} failed at {} stage: {}",
            cid,
            stage.label(),
            err
        );

        if let Err(e) = self
            .registry
            .append_trace(
                cid,
                Role::Coordinator,
                "error",
                format!("{} stage failed: {}", stage.label(), err),
            )
            .await
        {
            tracing::warn!("Failed to record error trace for {}: {}", cid, e);
        }

        let _ = self
            .registry
            .append_message(cid, Role::Coordinator, Role::User, APOLOGY, MessageKind::Response)
            .await;

        if let Err(e) = self.registry.mark_status(cid, ConversationStatus::Failed).await {
            tracing::warn!("Failed to mark conversation {} failed: {}", cid, e);
        }
    }
}
