//! Memo A2A 服务
//!
//! 入口：初始化日志、加载配置、构建编排器与路由，收到关闭信号后排空后台任务再退出。
//!
//! 配置: config/default.toml，或通过第一个命令行参数指定额外的 TOML 文件；
//! 环境变量 MEMO__*（如 MEMO__TELEX__API_KEY）及 TELEX_API_KEY / TELEX_API_URL / TELEX_AI_URL / TELEX_AI_MODEL / PORT 覆盖。
//!
//! 启动: cargo run

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use memo::config::load_config;
use memo::core::{SchedulerDrain, ShutdownCoordinator, ShutdownManager, TaskOrchestrator};
use memo::integrations::create_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    memo::observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load configuration")?;
    cfg.validate().context("Invalid configuration")?;
    let cfg = Arc::new(cfg);

    let orchestrator =
        Arc::new(TaskOrchestrator::from_config(cfg.clone()).context("Failed to create orchestrator")?);
    let app = create_router(orchestrator.clone());

    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.install_signal_handlers();

    let addr = cfg.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Memo A2A server listening on http://{}", addr);
    tracing::info!("Agent card: http://{}/.well-known/agent.json", addr);

    let signal = Arc::clone(&shutdown);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { signal.wait_for_shutdown().await })
        .await
        .context("Server error")?;

    let grace = Duration::from_secs(cfg.app.shutdown_grace_secs);
    let mut coordinator = ShutdownCoordinator::new(grace + Duration::from_secs(1));
    coordinator.register(SchedulerDrain::new(orchestrator.scheduler().clone(), grace));
    coordinator.run_cleanup().await;

    tracing::info!("Memo server stopped");
    Ok(())
}
