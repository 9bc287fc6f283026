//! Telex AI 推理服务客户端
//!
//! POST `<ai.url>`，请求头 X-AGENT-API-KEY / X-MODEL，请求体 `{organisation_id, model, messages, stream:false}`；
//! 回复形如 `{"data": {"Messages": {"content": "<模型输出>"}}}`。连接 / 总超时来自 [ai] 配置。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::AiSection;
use crate::core::AgentError;
use crate::llm::{CallContext, LlmClient, LlmError};
use crate::memory::Message;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    organisation_id: Option<&'a str>,
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    data: ChatData,
}

#[derive(Debug, Deserialize)]
struct ChatData {
    #[serde(rename = "Messages")]
    messages: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Telex AI 客户端：持有带超时的 HTTP Client、端点与模型名
pub struct TelexAiClient {
    http: reqwest::Client,
    url: String,
    model: String,
    organisation_id: Option<String>,
}

impl TelexAiClient {
    pub fn from_config(cfg: &AiSection) -> Result<Self, AgentError> {
        let http = reqwest::Client::builder()
            .connect_timeout(cfg.connect_timeout())
            .timeout(cfg.request_timeout())
            .build()
            .map_err(|e| AgentError::Config(format!("failed to build AI HTTP client: {}", e)))?;
        Ok(Self {
            http,
            url: cfg.url.clone(),
            model: cfg.model.clone(),
            organisation_id: cfg.organisation_id.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LlmClient for TelexAiClient {
    async fn complete(&self, ctx: &CallContext<'_>, messages: &[Message]) -> Result<String, LlmError> {
        let request = ChatRequest {
            organisation_id: self.organisation_id.as_deref().or(ctx.org_id),
            model: &self.model,
            messages,
            stream: false,
        };

        let resp = self
            .http
            .post(&self.url)
            .header("X-AGENT-API-KEY", ctx.api_key)
            .header("X-MODEL", &self.model)
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        tracing::debug!("AI response ({}): {}", status, text);

        if !status.is_success() {
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        Ok(parsed.data.messages.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(url: String, organisation_id: Option<&str>) -> TelexAiClient {
        TelexAiClient::from_config(&AiSection {
            url,
            model: "openai/gpt-4.1".to_string(),
            organisation_id: organisation_id.map(String::from),
            connect_timeout_secs: 5,
            request_timeout_secs: 1,
        })
        .unwrap()
    }

    const CTX: CallContext<'static> = CallContext {
        api_key: "agent-key",
        org_id: Some("org-from-request"),
    };

    #[tokio::test]
    async fn test_complete_sends_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(header("X-AGENT-API-KEY", "agent-key"))
            .and(header("X-MODEL", "openai/gpt-4.1"))
            .and(body_json(json!({
                "organisation_id": "org-from-request",
                "model": "openai/gpt-4.1",
                "messages": [{"role": "system", "content": "prompt"}],
                "stream": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": {"Messages": {"role": "assistant", "content": "{\"intent\": \"chat\", \"data\": {}}"}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(format!("{}/chat", server.uri()), None);
        let content = client
            .complete(&CTX, &[Message::system("prompt")])
            .await
            .unwrap();
        assert_eq!(content, r#"{"intent": "chat", "data": {}}"#);
    }

    #[tokio::test]
    async fn test_configured_organisation_wins() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(json!({
                "organisation_id": "org-configured",
                "model": "openai/gpt-4.1",
                "messages": [],
                "stream": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"Messages": {"content": "x"}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(server.uri(), Some("org-configured"));
        assert_eq!(client.complete(&CTX, &[]).await.unwrap(), "x");
    }

    #[tokio::test]
    async fn test_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = client(server.uri(), None).complete(&CTX, &[]).await.unwrap_err();
        assert!(matches!(err, LlmError::ApiError { status: 502, .. }));
    }

    #[tokio::test]
    async fn test_missing_messages_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
            .mount(&server)
            .await;

        let err = client(server.uri(), None).complete(&CTX, &[]).await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(std::time::Duration::from_secs(3))
                    .set_body_json(json!({"data": {"Messages": {"content": "late"}}})),
            )
            .mount(&server)
            .await;

        let err = client(server.uri(), None).complete(&CTX, &[]).await.unwrap_err();
        assert!(matches!(err, LlmError::Timeout));
    }
}
