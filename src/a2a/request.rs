//! 入站请求：message/send 风格的 JSON-RPC 请求体
//!
//! 解析尽量宽松（未知字段忽略、字段缺失为 None），校验集中在 [`SendMessageRequest::into_turn`]。

use serde::Deserialize;

use crate::core::AgentError;

#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub id: serde_json::Value,
    #[serde(default)]
    pub params: Option<SendMessageParams>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendMessageParams {
    #[serde(default)]
    pub message: Option<InboundMessage>,
    #[serde(default)]
    pub configuration: Option<Configuration>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub parts: Vec<InboundPart>,
    #[serde(default)]
    pub metadata: Option<MessageMetadata>,
}

/// 入站片段：只关心 text，file / data 等其它 kind 的片段 text 为空
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundPart {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageMetadata {
    #[serde(default)]
    pub telex_user_id: Option<String>,
    #[serde(default)]
    pub org_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Configuration {
    #[serde(default, rename = "pushNotificationConfig")]
    pub push_notification_config: Option<PushNotificationConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushNotificationConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub authentication: Option<Authentication>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Authentication {
    #[serde(default)]
    pub credentials: Option<String>,
}

/// 校验通过的一轮对话：后台流水线的全部输入
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub text: String,
    pub user_id: Option<String>,
    pub org_id: Option<String>,
    pub webhook_url: String,
    /// 本轮调用存储 / AI / Webhook 使用的 Key（请求 credentials 优先，否则用配置）
    pub api_key: String,
}

impl SendMessageRequest {
    /// 解析原始请求体；非 JSON 或类型不符时返回 InvalidRequest
    pub fn parse(body: &[u8]) -> Result<Self, AgentError> {
        serde_json::from_slice(body).map_err(|e| AgentError::InvalidRequest(e.to_string()))
    }

    /// 提取并校验本轮输入：消息文本与 Webhook URL 必填
    pub fn into_turn(self, default_api_key: Option<&str>) -> Result<(serde_json::Value, Turn), AgentError> {
        let params = self.params.unwrap_or_default();
        let message = params.message.unwrap_or_default();

        let text = message
            .parts
            .into_iter()
            .find_map(|p| p.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AgentError::Validation("Message cannot be empty.".to_string()))?;

        let metadata = message.metadata.unwrap_or_default();
        let push = params
            .configuration
            .and_then(|c| c.push_notification_config)
            .unwrap_or_default();

        let webhook_url = push
            .url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| {
                AgentError::Validation("Push notification URL cannot be empty.".to_string())
            })?;

        let api_key = push
            .authentication
            .and_then(|a| a.credentials)
            .filter(|c| !c.is_empty())
            .or_else(|| default_api_key.map(String::from))
            .ok_or_else(|| {
                AgentError::Validation("Push notification credentials are missing.".to_string())
            })?;

        Ok((
            self.id,
            Turn {
                text,
                user_id: metadata.telex_user_id,
                org_id: metadata.org_id,
                webhook_url,
                api_key,
            },
        ))
    }
}
