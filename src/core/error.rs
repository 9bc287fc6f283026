//! Agent 错误类型
//!
//! 同步路径（请求校验）的错误直接写进响应 Envelope 的 error 字段；
//! 后台路径的错误终止当前任务，由编排器转为 failed 状态并记录日志。

use thiserror::Error;

/// JSON-RPC 错误码
pub const JSON_RPC_PARSE_ERROR: i64 = -32700;
pub const JSON_RPC_INVALID_PARAMS: i64 = -32602;
pub const JSON_RPC_INTERNAL_ERROR: i64 = -32603;

/// 流水线各阶段可能出现的错误（校验、集合创建、意图识别、存储、投递、配置）
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid request body: {0}")]
    InvalidRequest(String),

    #[error("Failed to create or access the {collection} collection (status {status})")]
    CollectionProvision { collection: String, status: u16 },

    #[error("Could not understand the AI model's response: {0}")]
    Classification(String),

    /// 存储调用失败；status 为 None 表示请求未拿到 HTTP 响应
    #[error("Store {operation} failed{}: {detail}", status_suffix(.status))]
    StoreOperation {
        operation: &'static str,
        status: Option<u16>,
        detail: String,
    },

    #[error("Webhook delivery failed: {0}")]
    Delivery(String),

    #[error("Config error: {0}")]
    Config(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {})", s)).unwrap_or_default()
}

impl AgentError {
    pub fn store(operation: &'static str, status: Option<u16>, detail: impl Into<String>) -> Self {
        Self::StoreOperation {
            operation,
            status,
            detail: detail.into(),
        }
    }

    /// 存储返回 404（调用方可视为空结果）
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::StoreOperation { status: Some(404), .. })
    }

    /// 对应的 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 422,
            Self::InvalidRequest(_) => 400,
            Self::Delivery(_) => 502,
            Self::CollectionProvision { .. }
            | Self::Classification(_)
            | Self::StoreOperation { .. }
            | Self::Config(_) => 500,
        }
    }

    /// 对应的 JSON-RPC 错误码
    pub fn json_rpc_code(&self) -> i64 {
        match self {
            Self::Validation(_) => JSON_RPC_INVALID_PARAMS,
            Self::InvalidRequest(_) => JSON_RPC_PARSE_ERROR,
            _ => JSON_RPC_INTERNAL_ERROR,
        }
    }
}
