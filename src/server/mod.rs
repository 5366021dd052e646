//! HTTP / WebSocket 服务
//!
//! 路由：
//! - `POST /api/request` 提交请求，立即返回 conversation_id 并异步跑流水线
//! - `GET /api/conversations/:id` 会话快照
//! - `GET /ws?conversation_id=...` 实时事件流（先快照后订阅）
//! - `GET /status`、`GET /` 服务状态
//!
//! 路由层只做编排核心的薄封装：错误映射为 `{detail}` JSON，广播交给 hub。

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::config::AppConfig;
use crate::conversation::types::{now_millis, Conversation};
use crate::conversation::ConversationRegistry;
use crate::hub::{BroadcastHub, ObserverScope};
use crate::llm::ReasoningClient;
use crate::pipeline::PipelineOrchestrator;

/// 服务共享状态
pub struct AppState {
    pub registry: Arc<ConversationRegistry>,
    pub hub: Arc<BroadcastHub>,
    /// 推理能力未配置时为 None，提交接口据此拒绝请求
    pub orchestrator: Option<Arc<PipelineOrchestrator>>,
}

impl AppState {
    pub fn new(config: &AppConfig, client: Option<Arc<dyn ReasoningClient>>) -> Self {
        let hub = Arc::new(BroadcastHub::new());
        let registry = Arc::new(ConversationRegistry::new(Arc::clone(&hub)));
        let orchestrator = client.map(|c| {
            Arc::new(PipelineOrchestrator::new(
                Arc::clone(&registry),
                c,
                config.llm.request_timeout_secs,
            ))
        });

        Self {
            registry,
            hub,
            orchestrator,
        }
    }
}

/// 构建路由
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/status", get(status))
        .route("/api/request", post(submit_request))
        .route("/api/conversations/:id", get(get_conversation))
        .route("/ws", get(ws_upgrade))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// 错误响应体：`{"detail": "..."}`
#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

fn error_response(status: StatusCode, detail: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            detail: detail.into(),
        }),
    )
        .into_response()
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Hive multi-agent backend API" }))
}

async fn status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "running",
        "reasoning_configured": state.orchestrator.is_some(),
        "active_observers": state.hub.observer_count().await,
        "conversations": state.registry.conversation_count().await,
    }))
}

/// 提交请求体
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub content: String,
    #[serde(default = "default_variant")]
    pub pipeline_variant: String,
}

fn default_variant() -> String {
    "default".to_string()
}

/// 提交响应体
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub conversation_id: String,
    pub status: &'static str,
}

async fn submit_request(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitRequest>,
) -> Response {
    let orchestrator = match &state.orchestrator {
        Some(o) => Arc::clone(o),
        None => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "Reasoning capability is not configured (missing API key)",
            );
        }
    };

    let conversation_id = state
        .registry
        .create(&req.content, &req.pipeline_variant)
        .await;

    // 每个会话一个独立的顺序任务；失败在 run 内部吸收
    let cid = conversation_id.clone();
    tokio::spawn(async move {
        orchestrator.run(&cid).await;
    });

    Json(SubmitResponse {
        conversation_id,
        status: "processing",
    })
    .into_response()
}

async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.registry.snapshot(&id).await {
        Some(conversation) => Json(conversation).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Conversation not found"),
    }
}

#[derive(Debug, Deserialize)]
struct WsParams {
    conversation_id: Option<String>,
}

async fn ws_upgrade(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params.conversation_id))
}

/// 发给迟到订阅者的快照帧
#[derive(Debug, Serialize)]
struct SnapshotFrame<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    data: &'a Conversation,
    timestamp: i64,
}

/// 单个观察者连接
///
/// 先取快照、再订阅：边界处可能出现少量重复或缺口，这是协议明示的行为，
/// 不在服务端静默修补。心跳 ping 回 pong，不触账本。
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, conversation_id: Option<String>) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let scope = match &conversation_id {
        Some(id) => ObserverScope::Conversation(id.clone()),
        None => ObserverScope::Global,
    };

    if let Some(id) = &conversation_id {
        match state.registry.snapshot(id).await {
            Some(conversation) => {
                let frame = SnapshotFrame {
                    kind: "snapshot",
                    data: &conversation,
                    timestamp: now_millis(),
                };
                if let Ok(json) = serde_json::to_string(&frame) {
                    if ws_tx.send(WsMessage::Text(json)).await.is_err() {
                        return;
                    }
                }
            }
            None => {
                let _ = ws_tx
                    .send(WsMessage::Text(
                        serde_json::json!({ "detail": "Conversation not found" }).to_string(),
                    ))
                    .await;
                return;
            }
        }
    }

    let mut subscription = state.hub.subscribe(scope).await;
    let observer_id = subscription.id;
    tracing::info!("Observer {} connected", observer_id);

    // 单写者任务：hub 事件与 pong 都经它落到 socket，保证每观察者 FIFO
    let (out_tx, mut out_rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        loop {
            tokio::select! {
                event = subscription.rx.recv() => match event {
                    Some(json) => {
                        if ws_tx.send(WsMessage::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                reply = out_rx.recv() => match reply {
                    Some(json) => {
                        if ws_tx.send(WsMessage::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
    });

    while let Some(msg) = ws_rx.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!("Observer {} receive error: {}", observer_id, e);
                break;
            }
        };

        match msg {
            WsMessage::Text(text) => match serde_json::from_str::<serde_json::Value>(&text) {
                Ok(value) if value["type"] == "ping" => {
                    // 心跳只确认连接存活，不触账本
                    let _ = out_tx.send(serde_json::json!({ "type": "pong" }).to_string());
                }
                Ok(_) => {}
                Err(e) => tracing::debug!("Observer {} sent invalid JSON: {}", observer_id, e),
            },
            WsMessage::Close(_) => break,
            _ => {}
        }
    }

    state.hub.unsubscribe(observer_id).await;
    writer.abort();
    tracing::info!("Observer {} disconnected", observer_id);
}
