//! A2A 消息协议定义
//!
//! Task / Message / Part / Artifact 与 JSON-RPC 响应 Envelope，
//! 同步确认与 Webhook 推送使用同一套结构。

use serde::{Deserialize, Serialize};

use crate::core::AgentError;

/// 消息角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Agent,
}

/// 消息片段（按 kind 区分；本服务只产出文本）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Part {
    Text { text: String },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
        }
    }
}

/// 单条消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub parts: Vec<Part>,
}

impl Message {
    pub fn agent_text(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Agent,
            parts: vec![Part::text(text)],
        }
    }
}

/// 任务产出
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub parts: Vec<Part>,
}

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// 已接收，后台处理中
    Submitted,
    /// 已完成，带回复 Artifact
    Completed,
    /// 后台处理失败，status.message 为失败原因
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub state: TaskState,
    pub message: Message,
}

/// 从提交到完成的任务单元，对调用方与 Webhook 可见
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Vec<Artifact>>,
}

impl Task {
    /// 新任务：随机 ID，状态 submitted，占位消息 "In progress"
    pub fn submitted() -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            status: TaskStatus {
                state: TaskState::Submitted,
                message: Message::agent_text("In progress"),
            },
            artifacts: None,
        }
    }

    /// 转为 completed，并把回复同时放进状态消息与唯一的 Artifact
    pub fn complete(&mut self, reply: &str) {
        self.status = TaskStatus {
            state: TaskState::Completed,
            message: Message::agent_text(reply),
        };
        self.artifacts = Some(vec![Artifact {
            parts: vec![Part::text(reply)],
        }]);
    }

    /// 转为 failed，状态消息记录原因
    pub fn fail(&mut self, reason: &str) {
        self.status = TaskStatus {
            state: TaskState::Failed,
            message: Message::agent_text(reason),
        };
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.status.state, TaskState::Completed | TaskState::Failed)
    }
}

/// JSON-RPC 错误对象
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl From<&AgentError> for JsonRpcError {
    fn from(err: &AgentError) -> Self {
        let data = match err {
            AgentError::InvalidRequest(detail) => Some(serde_json::Value::String(detail.clone())),
            _ => None,
        };
        let message = match err {
            AgentError::InvalidRequest(_) => "Invalid JSON payload".to_string(),
            other => other.to_string(),
        };
        Self {
            code: err.json_rpc_code(),
            message,
            data,
        }
    }
}

/// JSON-RPC 响应：同步确认与 Webhook 推送共用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub jsonrpc: String,
    /// 调用方提供的关联 ID，原样回显（可能是字符串、数字或 null）
    #[serde(default)]
    pub id: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Task>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl Envelope {
    pub fn result(id: serde_json::Value, task: Task) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(task),
            error: None,
        }
    }

    pub fn error(id: serde_json::Value, err: &AgentError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError::from(err)),
        }
    }
}
