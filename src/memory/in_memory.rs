//! 内存版文档存储（测试与 `app.local_mode` 本地联调用，无需 Telex）
//!
//! 语义与 agent_db 对齐：建集合幂等、插入分配 `_id`、查询按插入顺序返回、替换保留 `_id`。

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::store::{CollectionStatus, DocumentFilter, DocumentStore};
use crate::core::AgentError;

#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    /// collection -> 文档（插入顺序）
    collections: RwLock<HashMap<String, Vec<Value>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 集合内全部文档的快照
    pub async fn documents(&self, collection: &str) -> Vec<Value> {
        self.collections
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    fn missing(operation: &'static str, collection: &str) -> AgentError {
        AgentError::store(operation, Some(404), format!("collection {} not found", collection))
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn ensure_collection(&self, _api_key: &str, name: &str) -> Result<CollectionStatus, AgentError> {
        let mut collections = self.collections.write().await;
        if collections.contains_key(name) {
            return Ok(CollectionStatus::AlreadyExists);
        }
        collections.insert(name.to_string(), Vec::new());
        Ok(CollectionStatus::Created)
    }

    async fn insert_document(
        &self,
        _api_key: &str,
        collection: &str,
        mut document: Value,
    ) -> Result<Option<String>, AgentError> {
        let mut collections = self.collections.write().await;
        let docs = collections
            .get_mut(collection)
            .ok_or_else(|| Self::missing("insert", collection))?;
        let Some(fields) = document.as_object_mut() else {
            return Err(AgentError::store("insert", Some(400), "document must be an object"));
        };
        let id = uuid::Uuid::new_v4().simple().to_string();
        fields.insert("_id".to_string(), Value::String(id.clone()));
        docs.push(document);
        Ok(Some(id))
    }

    async fn query_documents(
        &self,
        _api_key: &str,
        collection: &str,
        filter: &DocumentFilter,
    ) -> Result<Vec<Value>, AgentError> {
        let collections = self.collections.read().await;
        let docs = collections
            .get(collection)
            .ok_or_else(|| Self::missing("query", collection))?;
        Ok(docs.iter().filter(|d| filter.matches(d)).cloned().collect())
    }

    async fn replace_document(
        &self,
        _api_key: &str,
        collection: &str,
        id: &str,
        mut document: Value,
    ) -> Result<(), AgentError> {
        let mut collections = self.collections.write().await;
        let docs = collections
            .get_mut(collection)
            .ok_or_else(|| Self::missing("replace", collection))?;
        let slot = docs
            .iter_mut()
            .find(|d| d.get("_id").and_then(Value::as_str) == Some(id))
            .ok_or_else(|| AgentError::store("replace", Some(404), format!("document {} not found", id)))?;
        if let Some(fields) = document.as_object_mut() {
            fields.insert("_id".to_string(), Value::String(id.to_string()));
        }
        *slot = document;
        Ok(())
    }
}
