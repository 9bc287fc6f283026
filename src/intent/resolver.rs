//! 意图执行：remember 写入事实、recall 查询事实、chat 直接回复
//!
//! 存储写入 / 查询失败向上传播，由编排器终止当前任务。

use std::sync::Arc;

use serde_json::Value;

use crate::core::AgentError;
use crate::memory::{DocumentFilter, DocumentStore, MemoryDocument, USER_INFORMATION};

use super::{scalar_text, Intent, IntentResult};

pub const REMEMBER_UNCLEAR: &str =
    "I think you want me to remember something, but I couldn't figure out what.";
pub const RECALL_UNCLEAR: &str = "I think you're asking a question, but I'm not sure what about.";
pub const CHAT_FALLBACK: &str = "I'm not sure how to respond to that.";
pub const UNKNOWN_FALLBACK: &str = "I'm not quite sure how to respond to that.";

/// 意图执行器
pub struct IntentResolver {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl IntentResolver {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// 按意图执行记忆动作并返回给用户的回复
    pub async fn resolve(
        &self,
        api_key: &str,
        result: &IntentResult,
        user_id: Option<&str>,
        org_id: Option<&str>,
    ) -> Result<String, AgentError> {
        match result.intent {
            Intent::Remember => {
                let (Some(key), Some(value)) = (result.key(), result.value()) else {
                    return Ok(REMEMBER_UNCLEAR.to_string());
                };
                self.remember(api_key, user_id, org_id, &key, &value).await?;
                Ok(format!("Okay, I'll remember that your {} is {}.", key, value))
            }
            Intent::Recall => {
                let Some(key) = result.key() else {
                    return Ok(RECALL_UNCLEAR.to_string());
                };
                match self.recall(api_key, user_id, org_id, &key).await? {
                    Some(value) => Ok(format!("You told me your {} is {}.", key, value)),
                    None => Ok(format!("I don't think you've told me your {} yet.", key)),
                }
            }
            Intent::Chat => Ok(result.value().unwrap_or_else(|| CHAT_FALLBACK.to_string())),
            Intent::Unknown => Ok(UNKNOWN_FALLBACK.to_string()),
        }
    }

    async fn remember(
        &self,
        api_key: &str,
        user_id: Option<&str>,
        org_id: Option<&str>,
        key: &str,
        value: &str,
    ) -> Result<(), AgentError> {
        let doc = MemoryDocument::new(user_id, org_id, key, value);
        let body = serde_json::to_value(&doc)
            .map_err(|e| AgentError::store("insert", None, e.to_string()))?;
        let id = self
            .store
            .insert_document(api_key, &self.collection, body)
            .await?;
        tracing::info!("Remembered {} for user {:?} (id={:?})", key, user_id, id);
        Ok(())
    }

    /// 查询后在本地按 key 再过滤一遍，取插入顺序的第一条；value 可为字符串、数字或布尔
    async fn recall(
        &self,
        api_key: &str,
        user_id: Option<&str>,
        org_id: Option<&str>,
        key: &str,
    ) -> Result<Option<String>, AgentError> {
        let filter = DocumentFilter::memory(user_id, org_id, key);
        let docs = self
            .store
            .query_documents(api_key, &self.collection, &filter)
            .await?;

        let found = docs
            .iter()
            .filter(|d| {
                d.get("type")
                    .and_then(Value::as_str)
                    .map_or(true, |t| t == USER_INFORMATION)
            })
            .find(|d| d.get("key").and_then(Value::as_str) == Some(key))
            .and_then(|d| d.get("value"))
            .and_then(scalar_text);
        tracing::info!("Recall {} for user {:?}: found={}", key, user_id, found.is_some());
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryDocumentStore;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    fn intent(value: Value) -> IntentResult {
        serde_json::from_value(value).unwrap()
    }

    async fn setup() -> (Arc<InMemoryDocumentStore>, IntentResolver) {
        let store = Arc::new(InMemoryDocumentStore::new());
        store.ensure_collection("k", "user_information").await.unwrap();
        let resolver = IntentResolver::new(store.clone(), "user_information");
        (store, resolver)
    }

    #[tokio::test]
    async fn test_remember_inserts_fact() {
        let (store, resolver) = setup().await;
        let reply = resolver
            .resolve(
                "k",
                &intent(json!({"intent": "remember", "data": {"key": "name", "value": "Mark"}})),
                Some("u-1"),
                None,
            )
            .await
            .unwrap();
        assert_eq!(reply, "Okay, I'll remember that your name is Mark.");

        let docs = store.documents("user_information").await;
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["type"], "user_information");
        assert_eq!(docs[0]["user_id"], "u-1");
        assert_eq!(docs[0]["key"], "name");
        assert_eq!(docs[0]["value"], "Mark");
    }

    #[tokio::test]
    async fn test_remember_missing_value_writes_nothing() {
        let (store, resolver) = setup().await;
        let reply = resolver
            .resolve("k", &intent(json!({"intent": "remember", "data": {"key": "name"}})), Some("u-1"), None)
            .await
            .unwrap();
        assert_eq!(reply, REMEMBER_UNCLEAR);
        assert!(store.documents("user_information").await.is_empty());
    }

    #[tokio::test]
    async fn test_recall_found_and_missing() {
        let (store, resolver) = setup().await;
        store
            .insert_document(
                "k",
                "user_information",
                serde_json::to_value(MemoryDocument::new(Some("u-1"), None, "favorite color", "blue")).unwrap(),
            )
            .await
            .unwrap();

        let recall = intent(json!({"intent": "recall", "data": {"key": "favorite color"}}));
        let reply = resolver.resolve("k", &recall, Some("u-1"), None).await.unwrap();
        assert_eq!(reply, "You told me your favorite color is blue.");

        let reply = resolver.resolve("k", &recall, Some("u-2"), None).await.unwrap();
        assert_eq!(reply, "I don't think you've told me your favorite color yet.");
    }

    #[tokio::test]
    async fn test_recall_first_match_wins() {
        let (store, resolver) = setup().await;
        for value in ["blue", "green"] {
            store
                .insert_document(
                    "k",
                    "user_information",
                    serde_json::to_value(MemoryDocument::new(Some("u-1"), None, "favorite color", value)).unwrap(),
                )
                .await
                .unwrap();
        }
        let reply = resolver
            .resolve("k", &intent(json!({"intent": "recall", "data": {"key": "favorite color"}})), Some("u-1"), None)
            .await
            .unwrap();
        assert_eq!(reply, "You told me your favorite color is blue.");
    }

    #[tokio::test]
    async fn test_recall_missing_key() {
        let (_store, resolver) = setup().await;
        let reply = resolver
            .resolve("k", &intent(json!({"intent": "recall", "data": {}})), Some("u-1"), None)
            .await
            .unwrap();
        assert_eq!(reply, RECALL_UNCLEAR);
    }

    #[tokio::test]
    async fn test_chat_and_unknown() {
        let (store, resolver) = setup().await;
        let reply = resolver
            .resolve("k", &intent(json!({"intent": "chat", "data": {"key": "reply", "value": "Hi there!"}})), None, None)
            .await
            .unwrap();
        assert_eq!(reply, "Hi there!");

        let reply = resolver
            .resolve("k", &intent(json!({"intent": "chat", "data": {}})), None, None)
            .await
            .unwrap();
        assert_eq!(reply, CHAT_FALLBACK);

        let reply = resolver
            .resolve("k", &intent(json!({"intent": "forget", "data": {"key": "name"}})), None, None)
            .await
            .unwrap();
        assert_eq!(reply, UNKNOWN_FALLBACK);
        assert!(store.documents("user_information").await.is_empty());
    }

    /// 存储过滤失效时，本地按 key 再过滤
    struct LooseStore;

    #[async_trait]
    impl DocumentStore for LooseStore {
        async fn ensure_collection(&self, _: &str, _: &str) -> Result<crate::memory::CollectionStatus, AgentError> {
            Ok(crate::memory::CollectionStatus::AlreadyExists)
        }
        async fn insert_document(&self, _: &str, _: &str, _: Value) -> Result<Option<String>, AgentError> {
            Err(AgentError::store("insert", Some(500), "read only"))
        }
        async fn query_documents(&self, _: &str, _: &str, _: &DocumentFilter) -> Result<Vec<Value>, AgentError> {
            Ok(vec![
                json!({"type": "user_history", "user_id": "u-1", "messages": []}),
                json!({"type": "user_information", "user_id": "u-1", "key": "name", "value": "Mark", "created_at": ""}),
                json!({"type": "user_information", "user_id": "u-1", "key": "favorite color", "value": "blue", "created_at": ""}),
                json!({"type": "user_information", "user_id": "u-1", "key": "age", "value": 30, "created_at": ""}),
                json!({"user_id": "u-1", "key": "vegetarian", "value": true}),
            ])
        }
        async fn replace_document(&self, _: &str, _: &str, _: &str, _: Value) -> Result<(), AgentError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_recall_refilters_by_key() {
        let resolver = IntentResolver::new(Arc::new(LooseStore), "user_information");
        let reply = resolver
            .resolve("k", &intent(json!({"intent": "recall", "data": {"key": "favorite color"}})), Some("u-1"), None)
            .await
            .unwrap();
        assert_eq!(reply, "You told me your favorite color is blue.");
    }

    #[tokio::test]
    async fn test_recall_renders_scalar_values() {
        let resolver = IntentResolver::new(Arc::new(LooseStore), "user_information");
        let reply = resolver
            .resolve("k", &intent(json!({"intent": "recall", "data": {"key": "age"}})), Some("u-1"), None)
            .await
            .unwrap();
        assert_eq!(reply, "You told me your age is 30.");

        // 旧数据可能没有 type 字段
        let reply = resolver
            .resolve("k", &intent(json!({"intent": "recall", "data": {"key": "vegetarian"}})), Some("u-1"), None)
            .await
            .unwrap();
        assert_eq!(reply, "You told me your vegetarian is true.");
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let resolver = IntentResolver::new(Arc::new(LooseStore), "user_information");
        let err = resolver
            .resolve("k", &intent(json!({"intent": "remember", "data": {"key": "a", "value": "b"}})), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::StoreOperation { operation: "insert", .. }));
    }
}
