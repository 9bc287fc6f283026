//! 意图识别：构造 few-shot 提示，调用推理服务，严格解析 JSON 输出
//!
//! 解析失败、字段缺失、调用失败一律返回 Classification 错误，不重试、不缓存。

use std::sync::Arc;

use crate::core::AgentError;
use crate::llm::{CallContext, LlmClient};
use crate::memory::Message;

use super::IntentResult;

const PROMPT_TEMPLATE: &str = r#"Analyze the last user message in the context of the full conversation history provided below to determine the user's intent.

The intent can be one of three types:
1. 'remember': The user is stating a fact to be remembered (e.g., "my dog's name is Sparky").
2. 'recall': The user is asking a question about something they previously stated (e.g., "what is my dog's name?").
3. 'chat': The user is making a general conversational statement that requires a natural reply.

Your response MUST be a single, clean JSON object with the following structure:
- For 'remember' intent: {"intent": "remember", "data": {"key": "<the fact category>", "value": "<the fact value>"}}
- For 'recall' intent: {"intent": "recall", "data": {"key": "<the fact category to recall>"}}
- For 'chat' intent: {"intent": "chat", "data": {"key": "reply", "value": "<a natural, context-aware reply to the user>"}}

---
Examples:

Example 1: Remembering a fact
- Conversation History:
User: my name is Mark
- JSON Output:
{"intent": "remember", "data": {"key": "name", "value": "Mark"}}

Example 2: Recalling a fact
- Conversation History:
User: My favorite color is blue
Assistant: Okay, I'll remember that your favorite color is blue.
User: what's my favourite colour?
- JSON Output:
{"intent": "recall", "data": {"key": "favorite color"}}

Example 3: Contextual Chat
- Conversation History:
User: My favorite color is blue.
Assistant: Okay, I'll remember that your favorite color is blue.
User: That's great, thanks!
- JSON Output:
{"intent": "chat", "data": {"key": "reply", "value": "You're welcome! Is there anything else I can do for you?"}}
---

Now, analyze the following conversation and produce the JSON output for the last user message.

Conversation History:
{history}"#;

/// 把对话历史渲染为 `Role: content` 行并嵌入提示模板
pub fn build_prompt(history: &[Message]) -> String {
    let transcript = history
        .iter()
        .map(|m| format!("{}: {}", m.role.title(), m.content))
        .collect::<Vec<_>>()
        .join("\n");
    PROMPT_TEMPLATE.replace("{history}", &transcript)
}

/// 严格解析模型输出为 IntentResult（仅去掉首尾空白）
pub fn parse_intent(content: &str) -> Result<IntentResult, AgentError> {
    serde_json::from_str(content.trim()).map_err(|e| {
        tracing::warn!("Error parsing AI response: {}; raw content was: {}", e, content);
        AgentError::Classification(e.to_string())
    })
}

/// 意图识别器
pub struct IntentClassifier {
    llm: Arc<dyn LlmClient>,
}

impl IntentClassifier {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// 对整段对话（或仅最新一条消息）做一次意图识别
    pub async fn classify(
        &self,
        ctx: &CallContext<'_>,
        history: &[Message],
    ) -> Result<IntentResult, AgentError> {
        let prompt = build_prompt(history);
        let content = self
            .llm
            .complete(ctx, &[Message::system(prompt)])
            .await
            .map_err(|e| AgentError::Classification(e.to_string()))?;
        let result = parse_intent(&content)?;
        tracing::info!("Classified intent: {:?}", result.intent);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::Intent;
    use crate::llm::MockLlmClient;

    const CTX: CallContext<'static> = CallContext {
        api_key: "k",
        org_id: None,
    };

    #[test]
    fn test_prompt_embeds_transcript() {
        let prompt = build_prompt(&[
            Message::user("My favorite color is blue"),
            Message::assistant("Okay, I'll remember that your favorite color is blue."),
            Message::user("what is it?"),
        ]);
        assert!(prompt.ends_with(
            "Conversation History:\nUser: My favorite color is blue\nAssistant: Okay, I'll remember that your favorite color is blue.\nUser: what is it?"
        ));
        assert!(prompt.contains(r#"{"intent": "recall", "data": {"key": "favorite color"}}"#));
        assert!(!prompt.contains("{history}"));
    }

    #[test]
    fn test_parse_valid() {
        let result =
            parse_intent(r#"  {"intent": "remember", "data": {"key": "name", "value": "Mark"}} "#).unwrap();
        assert_eq!(result.intent, Intent::Remember);
        assert_eq!(result.key().as_deref(), Some("name"));
        assert_eq!(result.value().as_deref(), Some("Mark"));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for content in [
            "Sure! Here is the JSON",
            "",
            r#"{"intent": "chat"}"#,
            r#"{"data": {}}"#,
            r#"{"intent": "chat", "data": "reply"}"#,
            r#"["chat"]"#,
            "```json\n{\"intent\": \"chat\", \"data\": {}}\n```",
        ] {
            assert!(
                matches!(parse_intent(content), Err(AgentError::Classification(_))),
                "accepted: {}",
                content
            );
        }
    }

    #[tokio::test]
    async fn test_classify_uses_llm() {
        let llm = Arc::new(MockLlmClient::with_replies([
            r#"{"intent": "recall", "data": {"key": "favorite color"}}"#,
        ]));
        let classifier = IntentClassifier::new(llm.clone());
        let result = classifier
            .classify(&CTX, &[Message::user("what's my favourite colour?")])
            .await
            .unwrap();
        assert_eq!(result.intent, Intent::Recall);
        assert_eq!(llm.calls(), 1);
        assert!(llm
            .last_prompt()
            .unwrap()
            .ends_with("User: what's my favourite colour?"));
    }

    #[tokio::test]
    async fn test_classify_malformed_reply() {
        let llm = Arc::new(MockLlmClient::with_replies(["not json"]));
        let classifier = IntentClassifier::new(llm);
        let err = classifier
            .classify(&CTX, &[Message::user("hi")])
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 500);
    }
}
