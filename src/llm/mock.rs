//! Mock LLM 客户端（用于测试与 `app.local_mode` 本地联调，无需 API）
//!
//! 按顺序返回预置回复（最后一条重复使用）；未预置时把最后一条用户输入包装成 chat 意图回显
//!（User 消息，或 system 提示末尾的 `User: …` 行）。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{CallContext, LlmClient, LlmError};
use crate::memory::{Message, Role};

#[derive(Debug, Default)]
pub struct MockLlmClient {
    replies: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置回复（原样作为 content 返回）
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// 已调用次数
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 最近一次收到的 system 提示
    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().ok().and_then(|p| p.clone())
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, _ctx: &CallContext<'_>, messages: &[Message]) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let prompt = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.clone());
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .or_else(|| {
                prompt
                    .as_deref()
                    .and_then(|p| p.lines().last())
                    .and_then(|l| l.strip_prefix("User: "))
                    .map(String::from)
            })
            .unwrap_or_else(|| "(no input)".to_string());

        if let Ok(mut last) = self.last_prompt.lock() {
            *last = prompt;
        }

        if let Ok(mut replies) = self.replies.lock() {
            match replies.len() {
                0 => {}
                1 => return Ok(replies[0].clone()),
                _ => return Ok(replies.pop_front().unwrap_or_default()),
            }
        }

        Ok(serde_json::json!({
            "intent": "chat",
            "data": {"key": "reply", "value": format!("Echo from Mock: {}", last_user)}
        })
        .to_string())
    }
}
