//! Hive - 多智能体协作后端
//!
//! 入口：初始化日志、加载配置、构建推理客户端与共享状态，启动 HTTP/WS 服务。

use std::sync::Arc;

use anyhow::Context;
use hive::server::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 日志：默认 info，可通过 RUST_LOG 覆盖
    hive::observability::init();

    let config = hive::config::load_config(None).context("Failed to load config")?;

    let client = hive::llm::create_reasoning_client(&config.llm);
    if client.is_none() {
        tracing::warn!(
            "No reasoning API key configured (provider: {}); request submission will be rejected",
            config.llm.provider
        );
    }

    let state = Arc::new(AppState::new(&config, client));
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    tracing::info!("Hive listening on http://{}", config.server.bind_addr);

    axum::serve(listener, router).await.context("Server error")?;
    Ok(())
}
