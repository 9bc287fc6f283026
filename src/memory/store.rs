//! 文档存储客户端：Telex agent_db 的类型化封装
//!
//! 四个操作：建集合（幂等）、插入、按条件查询、按 ID 替换。每次调用带上本轮的 API Key（X-AGENT-API-KEY）。
//! 查询把 `{"filter": …}` 放在 GET 请求体里发送，这是 agent_db 接受的查询方式。

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::AgentError;
use crate::memory::Message;

/// 记忆事实文档的 type
pub const USER_INFORMATION: &str = "user_information";
/// 会话历史文档的 type
pub const USER_HISTORY: &str = "user_history";

/// 一条用户事实：(user_id, key) -> value；存储不保证唯一
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryDocument {
    #[serde(rename = "type")]
    pub doc_type: String,
    pub user_id: Option<String>,
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organisation_id: Option<String>,
}

impl MemoryDocument {
    pub fn new(user_id: Option<&str>, org_id: Option<&str>, key: &str, value: &str) -> Self {
        Self {
            doc_type: USER_INFORMATION.to_string(),
            user_id: user_id.map(String::from),
            key: key.to_string(),
            value: value.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            organisation_id: org_id.map(String::from),
        }
    }
}

/// 每个用户一份的会话历史；创建后由存储分配 `_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryDocument {
    #[serde(rename = "_id", default, skip_serializing)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub user_id: Option<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organisation_id: Option<String>,
}

/// 查询条件；user_id / organisation_id 缺省时以 null 发送
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentFilter {
    #[serde(rename = "type")]
    pub doc_type: String,
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub organisation_id: Option<String>,
}

impl DocumentFilter {
    pub fn memory(user_id: Option<&str>, org_id: Option<&str>, key: &str) -> Self {
        Self {
            doc_type: USER_INFORMATION.to_string(),
            user_id: user_id.map(String::from),
            key: Some(key.to_string()),
            organisation_id: org_id.map(String::from),
        }
    }

    pub fn history(user_id: Option<&str>, org_id: Option<&str>) -> Self {
        Self {
            doc_type: USER_HISTORY.to_string(),
            user_id: user_id.map(String::from),
            key: None,
            organisation_id: org_id.map(String::from),
        }
    }

    /// 文档是否满足条件；null 条件匹配字段缺失或为 null 的文档
    pub fn matches(&self, doc: &Value) -> bool {
        fn field_eq(doc: &Value, field: &str, expected: Option<&str>) -> bool {
            match (doc.get(field), expected) {
                (Some(Value::String(actual)), Some(expected)) => actual == expected,
                (None | Some(Value::Null), None) => true,
                _ => false,
            }
        }

        field_eq(doc, "type", Some(&self.doc_type))
            && field_eq(doc, "user_id", self.user_id.as_deref())
            && field_eq(doc, "organisation_id", self.organisation_id.as_deref())
            && self
                .key
                .as_deref()
                .map_or(true, |k| field_eq(doc, "key", Some(k)))
    }
}

/// 建集合的结果：两者都算成功
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionStatus {
    Created,
    AlreadyExists,
}

/// 文档存储抽象：Telex HTTP 实现与内存实现
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 幂等建集合；既非 created 也非 already exists 时返回 CollectionProvision
    async fn ensure_collection(&self, api_key: &str, name: &str) -> Result<CollectionStatus, AgentError>;

    /// 插入文档，返回存储分配的 ID（存储未回显时为 None）
    async fn insert_document(
        &self,
        api_key: &str,
        collection: &str,
        document: Value,
    ) -> Result<Option<String>, AgentError>;

    /// 按条件查询，不分页；返回全部匹配文档（插入顺序）
    async fn query_documents(
        &self,
        api_key: &str,
        collection: &str,
        filter: &DocumentFilter,
    ) -> Result<Vec<Value>, AgentError>;

    /// 按 ID 整体替换文档
    async fn replace_document(
        &self,
        api_key: &str,
        collection: &str,
        id: &str,
        document: Value,
    ) -> Result<(), AgentError>;
}

/// Telex agent_db HTTP 客户端
#[derive(Clone)]
pub struct TelexDocumentStore {
    http: reqwest::Client,
    base_url: String,
}

impl TelexDocumentStore {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn collections_url(&self) -> String {
        format!("{}/agent_db/collections", self.base_url)
    }

    fn documents_url(&self, collection: &str) -> String {
        format!("{}/agent_db/collections/{}/documents", self.base_url, collection)
    }

    /// 非 2xx 时读出响应体作为错误详情
    async fn check(
        operation: &'static str,
        resp: reqwest::Response,
    ) -> Result<reqwest::Response, AgentError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let text = resp.text().await.unwrap_or_default();
        Err(AgentError::store(operation, Some(status.as_u16()), text))
    }
}

/// 从插入响应中取出存储分配的 ID（不同版本字段名不一）
fn stored_id(body: &Value) -> Option<String> {
    let data = body.get("data").unwrap_or(body);
    ["_id", "id", "insertedId"]
        .iter()
        .find_map(|k| data.get(*k))
        .and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

#[async_trait]
impl DocumentStore for TelexDocumentStore {
    async fn ensure_collection(&self, api_key: &str, name: &str) -> Result<CollectionStatus, AgentError> {
        let resp = self
            .http
            .post(self.collections_url())
            .header("X-AGENT-API-KEY", api_key)
            .json(&json!({ "collection": name }))
            .send()
            .await
            .map_err(|e| AgentError::store("create collection", None, e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            tracing::info!("Collection {} created", name);
            Ok(CollectionStatus::Created)
        } else if status == StatusCode::BAD_REQUEST || status == StatusCode::CONFLICT {
            tracing::debug!("Collection {} already exists", name);
            Ok(CollectionStatus::AlreadyExists)
        } else {
            let text = resp.text().await.unwrap_or_default();
            tracing::warn!("Collection {} create returned {}: {}", name, status, text);
            Err(AgentError::CollectionProvision {
                collection: name.to_string(),
                status: status.as_u16(),
            })
        }
    }

    async fn insert_document(
        &self,
        api_key: &str,
        collection: &str,
        document: Value,
    ) -> Result<Option<String>, AgentError> {
        let resp = self
            .http
            .post(self.documents_url(collection))
            .header("X-AGENT-API-KEY", api_key)
            .json(&json!({ "document": document }))
            .send()
            .await
            .map_err(|e| AgentError::store("insert", None, e.to_string()))?;
        let resp = Self::check("insert", resp).await?;

        let body: Value = resp.json().await.unwrap_or(Value::Null);
        tracing::debug!("Store insert response: {}", body);
        Ok(stored_id(&body))
    }

    async fn query_documents(
        &self,
        api_key: &str,
        collection: &str,
        filter: &DocumentFilter,
    ) -> Result<Vec<Value>, AgentError> {
        let resp = self
            .http
            .get(self.documents_url(collection))
            .header("X-AGENT-API-KEY", api_key)
            .json(&json!({ "filter": filter }))
            .send()
            .await
            .map_err(|e| AgentError::store("query", None, e.to_string()))?;
        let resp = Self::check("query", resp).await?;

        let body: Value = resp
            .json()
            .await
            .map_err(|e| AgentError::store("query", None, format!("invalid response body: {}", e)))?;
        tracing::debug!("Store query response: {}", body);

        match body.get("data") {
            Some(Value::Array(docs)) => Ok(docs.clone()),
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(other) => Err(AgentError::store(
                "query",
                None,
                format!("expected data array, got {}", other),
            )),
        }
    }

    async fn replace_document(
        &self,
        api_key: &str,
        collection: &str,
        id: &str,
        document: Value,
    ) -> Result<(), AgentError> {
        let resp = self
            .http
            .put(format!("{}/{}", self.documents_url(collection), id))
            .header("X-AGENT-API-KEY", api_key)
            .json(&json!({ "document": document }))
            .send()
            .await
            .map_err(|e| AgentError::store("replace", None, e.to_string()))?;
        Self::check("replace", resp).await?;
        Ok(())
    }
}
