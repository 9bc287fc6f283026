//! Telex A2A 入站服务
//!
//! Telex 要求 `POST /` 尽快返回确认：本模块只做校验与受理，意图识别与记忆读写在后台执行，
//! 最终结果通过请求中的 pushNotificationConfig 推送。

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Html,
    routing::get,
    Json, Router,
};

use crate::a2a::{agent_card, Envelope};
use crate::core::TaskOrchestrator;

/// 创建 A2A 路由
pub fn create_router(orchestrator: Arc<TaskOrchestrator>) -> Router {
    Router::new()
        .route("/", get(banner).post(message_handler))
        .route("/.well-known/agent.json", get(agent_card_handler))
        .route("/health", get(|| async { "OK" }))
        .with_state(orchestrator)
}

/// POST / - 受理一轮对话，同步返回 submitted 任务或错误
async fn message_handler(
    State(orchestrator): State<Arc<TaskOrchestrator>>,
    body: Bytes,
) -> (StatusCode, Json<Envelope>) {
    let accepted = orchestrator.accept(&body);
    let status = StatusCode::from_u16(accepted.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(accepted.envelope))
}

async fn banner() -> Html<&'static str> {
    Html(r#"<p style="font-size:30px">AI Agent</p>"#)
}

/// GET /.well-known/agent.json
async fn agent_card_handler(headers: HeaderMap) -> Json<serde_json::Value> {
    Json(agent_card(&external_base_url(&headers)))
}

/// 对外可见的 base URL：协议取 X-Forwarded-Proto（默认 http），主机取 Host，再拼上 X-External-Base-Url
fn external_base_url(headers: &HeaderMap) -> String {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    let scheme = header("x-forwarded-proto").unwrap_or("http");
    let host = header("host").unwrap_or("localhost");
    let external = header("x-external-base-url").unwrap_or("");
    format!("{}://{}{}", scheme, host, external)
}
