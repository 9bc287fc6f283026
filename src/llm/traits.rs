//! LLM 客户端抽象
//!
//! 推理服务后端（Telex AI / Mock）实现 LlmClient：一次请求、一次完整回复，不流式、不重试。

use async_trait::async_trait;
use thiserror::Error;

use crate::memory::Message;

/// 单次调用的身份信息：API Key 与组织 ID 随请求变化，不放进客户端
#[derive(Debug, Clone, Copy)]
pub struct CallContext<'a> {
    pub api_key: &'a str,
    pub org_id: Option<&'a str>,
}

/// LLM 调用错误
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("API error (status {status}): {body}")]
    ApiError { status: u16, body: String },

    #[error("unexpected response shape: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Transport(e.to_string())
        }
    }
}

/// LLM 客户端 trait：非流式完成，返回模型输出的 content 文本
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, ctx: &CallContext<'_>, messages: &[Message]) -> Result<String, LlmError>;
}
