//! 任务编排器：同步受理 + 后台流水线
//!
//! `accept` 校验请求、创建 submitted 任务并交给调度器，立即返回确认；
//! `run` 在后台按顺序执行：建集合 → 加载历史 → 意图识别 → 执行意图 → 保存历史 → 完成 → Webhook 推送。

use std::sync::Arc;

use tracing::Instrument;

use crate::a2a::{Envelope, SendMessageRequest, Task, Turn};
use crate::config::AppConfig;
use crate::core::{AgentError, TaskScheduler};
use crate::integrations::{Notifier, WebhookNotifier};
use crate::intent::{IntentClassifier, IntentResolver};
use crate::llm::{CallContext, LlmClient, MockLlmClient, TelexAiClient};
use crate::memory::{
    ConversationHistory, DocumentStore, InMemoryDocumentStore, LoadedHistory, Message,
    TelexDocumentStore,
};

/// 同步受理结果：HTTP 状态码 + JSON-RPC 响应
#[derive(Debug, Clone, PartialEq)]
pub struct Accepted {
    pub status: u16,
    pub envelope: Envelope,
}

/// 后台流水线共享的组件
struct Pipeline {
    config: Arc<AppConfig>,
    store: Arc<dyn DocumentStore>,
    classifier: IntentClassifier,
    resolver: IntentResolver,
    history: Option<ConversationHistory>,
    notifier: Arc<dyn Notifier>,
}

/// 任务编排器
#[derive(Clone)]
pub struct TaskOrchestrator {
    pipeline: Arc<Pipeline>,
    scheduler: TaskScheduler,
}

impl TaskOrchestrator {
    pub fn new(
        config: Arc<AppConfig>,
        store: Arc<dyn DocumentStore>,
        llm: Arc<dyn LlmClient>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let collection = config.store.collection.clone();
        let history = config.app.history_enabled.then(|| {
            ConversationHistory::new(store.clone(), collection.clone(), config.history.max_turns)
        });
        let scheduler = TaskScheduler::new(config.app.max_concurrent_tasks);
        Self {
            pipeline: Arc::new(Pipeline {
                classifier: IntentClassifier::new(llm),
                resolver: IntentResolver::new(store.clone(), collection),
                history,
                store,
                notifier,
                config,
            }),
            scheduler,
        }
    }

    /// 用配置构建 Telex 存储 / AI / Webhook 的 HTTP 实现；local_mode 时换成内存存储与 Mock 推理
    pub fn from_config(config: Arc<AppConfig>) -> Result<Self, AgentError> {
        if config.app.local_mode {
            tracing::warn!("Local mode: using in-memory store and Mock LLM");
            return Ok(Self::new(
                config,
                Arc::new(InMemoryDocumentStore::new()),
                Arc::new(MockLlmClient::new()),
                Arc::new(WebhookNotifier::new()),
            ));
        }

        let store = Arc::new(TelexDocumentStore::new(&config.telex.api_url));
        let llm = Arc::new(TelexAiClient::from_config(&config.ai)?);
        tracing::info!(
            "Using Telex AI ({}) and agent_db at {} (history {})",
            llm.model(),
            config.telex.api_url,
            if config.app.history_enabled { "on" } else { "off" }
        );
        Ok(Self::new(config, store, llm, Arc::new(WebhookNotifier::new())))
    }

    pub fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }

    /// 受理一轮对话：校验失败不调度任何后台工作
    pub fn accept(&self, body: &[u8]) -> Accepted {
        let request = match SendMessageRequest::parse(body) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("Rejected request: {}", e);
                return Accepted {
                    status: e.status_code(),
                    envelope: Envelope::error(serde_json::Value::Null, &e),
                };
            }
        };

        let request_id = request.id.clone();
        let default_key = self.pipeline.config.telex.api_key.as_deref();
        let (request_id, turn) = match request.into_turn(default_key) {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!("Rejected request {}: {}", request_id, e);
                return Accepted {
                    status: e.status_code(),
                    envelope: Envelope::error(request_id, &e),
                };
            }
        };

        let task = Task::submitted();
        tracing::info!(
            "Accepted task {} for user {:?} (request id {})",
            task.id,
            turn.user_id,
            request_id
        );

        let span = tracing::info_span!("task", task_id = %task.id);
        let pipeline = Arc::clone(&self.pipeline);
        let background = task.clone();
        let background_id = request_id.clone();
        self.scheduler.spawn(
            async move { pipeline.run(background_id, background, turn).await }.instrument(span),
        );

        Accepted {
            status: 200,
            envelope: Envelope::result(request_id, task),
        }
    }
}

impl Pipeline {
    /// 后台单元：任一步失败则记录、转 failed，并按配置推送一次
    async fn run(&self, request_id: serde_json::Value, mut task: Task, turn: Turn) {
        match self.process(&turn).await {
            Ok(reply) => {
                task.complete(&reply);
                tracing::info!("Task completed: {}", reply);
            }
            Err(e) => {
                tracing::error!("Background processing failed: {}", e);
                task.fail(&e.to_string());
                if !self.config.app.notify_on_failure {
                    return;
                }
            }
        }

        let envelope = Envelope::result(request_id, task);
        if let Err(e) = self
            .notifier
            .deliver(&turn.webhook_url, &turn.api_key, &envelope)
            .await
        {
            tracing::error!("Webhook delivery failed: {}", e);
        }
    }

    async fn process(&self, turn: &Turn) -> Result<String, AgentError> {
        let api_key = turn.api_key.as_str();
        let user_id = turn.user_id.as_deref();
        let org_id = turn.org_id.as_deref();
        let collection = &self.config.store.collection;

        let status = self.store.ensure_collection(api_key, collection).await?;
        tracing::debug!("Collection {}: {:?}", collection, status);

        let mut loaded: Option<LoadedHistory> = match &self.history {
            Some(history) => Some(history.load(api_key, user_id, org_id, &turn.text).await?),
            None => None,
        };
        let latest_only = [Message::user(turn.text.as_str())];
        let context = loaded.as_ref().map_or(&latest_only[..], |h| h.messages());

        let ctx = CallContext { api_key, org_id };
        let intent = self.classifier.classify(&ctx, context).await?;
        let reply = self.resolver.resolve(api_key, &intent, user_id, org_id).await?;

        if let (Some(history), Some(mut transcript)) = (&self.history, loaded.take()) {
            transcript.push_reply(&reply);
            let id = history.save(api_key, user_id, org_id, transcript).await?;
            tracing::debug!("History saved (id={:?})", id);
        }
        Ok(reply)
    }
}
