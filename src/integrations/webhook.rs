//! Webhook 推送：把任务的最终 Envelope POST 到调用方提供的回调地址
//!
//! 单次投递，不重试；失败由编排器记录日志。

use async_trait::async_trait;

use crate::a2a::Envelope;
use crate::core::AgentError;

/// 投递抽象（HTTP 实现与测试替身）
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, url: &str, api_key: &str, envelope: &Envelope) -> Result<(), AgentError>;
}

/// HTTP Webhook 投递，携带 X-TELEX-API-KEY
#[derive(Clone, Default)]
pub struct WebhookNotifier {
    http: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn deliver(&self, url: &str, api_key: &str, envelope: &Envelope) -> Result<(), AgentError> {
        let resp = self
            .http
            .post(url)
            .header("X-TELEX-API-KEY", api_key)
            .json(envelope)
            .send()
            .await
            .map_err(|e| AgentError::Delivery(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(AgentError::Delivery(format!("webhook returned {}: {}", status, text)));
        }
        tracing::info!("Webhook delivered to {} ({})", url, status);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a2a::Task;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completed() -> Envelope {
        let mut task = Task::submitted();
        task.complete("Okay, I'll remember that your name is Mark.");
        Envelope::result(json!("req-1"), task)
    }

    #[tokio::test]
    async fn test_deliver_posts_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header("X-TELEX-API-KEY", "secret"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let envelope = completed();
        WebhookNotifier::new()
            .deliver(&format!("{}/hook", server.uri()), "secret", &envelope)
            .await
            .unwrap();

        let received = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
        assert_eq!(body["jsonrpc"], "2.0");
        assert_eq!(body["id"], "req-1");
        assert_eq!(body["result"]["status"]["state"], "completed");
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn test_non_success_is_delivery_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(1)
            .mount(&server)
            .await;

        let err = WebhookNotifier::new()
            .deliver(&server.uri(), "secret", &completed())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Delivery(ref m) if m.contains("boom")));
    }

    #[tokio::test]
    async fn test_unreachable_is_delivery_error() {
        let err = WebhookNotifier::new()
            .deliver("http://127.0.0.1:9/hook", "secret", &completed())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Delivery(_)));
    }
}
