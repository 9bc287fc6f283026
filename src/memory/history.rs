//! 会话历史管理：按用户加载 / 保存 user_history 文档
//!
//! 读-改-写没有版本校验：同一用户的并发任务可能互相覆盖，或各自新建一份历史文档。

use std::sync::Arc;

use serde_json::Value;

use super::conversation::{ConversationMemory, Message, Role};
use super::store::{DocumentFilter, DocumentStore, HistoryDocument, USER_HISTORY};
use crate::core::AgentError;

/// 一次加载得到的历史（已追加本轮用户消息）
#[derive(Debug, Clone)]
pub struct LoadedHistory {
    pub transcript: ConversationMemory,
    /// 已存在的历史文档 ID；None 表示保存时新建
    pub id: Option<String>,
    pub created_at: Option<String>,
}

impl LoadedHistory {
    pub fn messages(&self) -> &[Message] {
        self.transcript.messages()
    }

    pub fn push_reply(&mut self, reply: &str) {
        self.transcript.push(Message::assistant(reply));
    }
}

/// 会话历史管理器
pub struct ConversationHistory {
    store: Arc<dyn DocumentStore>,
    collection: String,
    max_turns: usize,
}

impl ConversationHistory {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>, max_turns: usize) -> Self {
        Self {
            store,
            collection: collection.into(),
            max_turns,
        }
    }

    /// 加载用户历史并追加本轮用户消息；存储返回 404 视为无历史
    pub async fn load(
        &self,
        api_key: &str,
        user_id: Option<&str>,
        org_id: Option<&str>,
        incoming: &str,
    ) -> Result<LoadedHistory, AgentError> {
        let filter = DocumentFilter::history(user_id, org_id);
        let docs = match self
            .store
            .query_documents(api_key, &self.collection, &filter)
            .await
        {
            Ok(docs) => docs,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(e),
        };

        let existing = docs.into_iter().find_map(|doc| {
            if doc.get("type").and_then(Value::as_str) != Some(USER_HISTORY) {
                return None;
            }
            match serde_json::from_value::<HistoryDocument>(doc) {
                Ok(history) => Some(history),
                Err(e) => {
                    tracing::warn!("Skipping malformed history document: {}", e);
                    None
                }
            }
        });

        let mut loaded = match existing {
            Some(doc) => LoadedHistory {
                transcript: ConversationMemory::from_messages(doc.messages, self.max_turns),
                id: doc.id,
                created_at: Some(doc.created_at).filter(|c| !c.is_empty()),
            },
            None => LoadedHistory {
                transcript: ConversationMemory::new(self.max_turns),
                id: None,
                created_at: None,
            },
        };
        tracing::debug!(
            "Loaded history for user {:?}: {} messages (id={:?})",
            user_id,
            loaded.transcript.len(),
            loaded.id
        );

        loaded.transcript.push(Message {
            role: Role::User,
            content: incoming.to_string(),
        });
        Ok(loaded)
    }

    /// 保存历史：有 ID 则替换该文档，否则新建；返回文档 ID
    pub async fn save(
        &self,
        api_key: &str,
        user_id: Option<&str>,
        org_id: Option<&str>,
        history: LoadedHistory,
    ) -> Result<Option<String>, AgentError> {
        let document = HistoryDocument {
            id: None,
            doc_type: USER_HISTORY.to_string(),
            user_id: user_id.map(String::from),
            messages: history.transcript.into_messages(),
            created_at: history
                .created_at
                .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
            organisation_id: org_id.map(String::from),
        };
        let body = serde_json::to_value(&document)
            .map_err(|e| AgentError::store("save history", None, e.to_string()))?;

        match history.id {
            Some(id) => {
                self.store
                    .replace_document(api_key, &self.collection, &id, body)
                    .await?;
                Ok(Some(id))
            }
            None => self.store.insert_document(api_key, &self.collection, body).await,
        }
    }
}
