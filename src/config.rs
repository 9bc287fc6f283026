//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `MEMO__*` 覆盖（双下划线表示嵌套，如 `MEMO__TELEX__API_URL=https://api.telex.im/api/v1`）。
//! 兼容旧部署的变量名：`TELEX_API_KEY`、`TELEX_API_URL`、`TELEX_AI_URL`、`TELEX_AI_MODEL`、`PORT`，优先级最高。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::core::AgentError;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub telex: TelexSection,
    pub ai: AiSection,
    pub store: StoreSection,
    pub history: HistorySection,
}

/// [app] 段：监听地址、流水线开关、后台并发
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub host: String,
    pub port: u16,
    /// 是否加载 / 保存会话历史（关闭时只用最新一条消息做意图识别）
    pub history_enabled: bool,
    /// 后台失败时是否把 failed 状态的 Task 推送给 Webhook
    pub notify_on_failure: bool,
    /// 同时运行的后台任务上限，超出的排队等待
    pub max_concurrent_tasks: usize,
    /// 关闭时等待在途任务的秒数
    pub shutdown_grace_secs: u64,
    /// 本地联调：使用进程内存储与 Mock 推理服务，无需 Telex 地址（Webhook 仍真实投递）
    pub local_mode: bool,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4000,
            history_enabled: true,
            notify_on_failure: true,
            max_concurrent_tasks: 64,
            shutdown_grace_secs: 30,
            local_mode: false,
        }
    }
}

/// [telex] 段：文档存储地址与默认 API Key（请求里的 credentials 优先）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TelexSection {
    pub api_key: Option<String>,
    pub api_url: String,
}

/// [ai] 段：推理服务地址、模型与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiSection {
    pub url: String,
    pub model: String,
    /// 请求体中的 organisation_id；未配置时使用请求元数据里的 org_id
    pub organisation_id: Option<String>,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for AiSection {
    fn default() -> Self {
        Self {
            url: String::new(),
            model: "openai/gpt-4.1".to_string(),
            organisation_id: None,
            connect_timeout_secs: 5,
            request_timeout_secs: 15,
        }
    }
}

impl AiSection {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// [store] 段：记忆与历史共用的集合名
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub collection: String,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            collection: "user_information".to_string(),
        }
    }
}

/// [history] 段：会话历史保留轮数（0 表示不截断）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistorySection {
    pub max_turns: usize,
}

impl Default for HistorySection {
    fn default() -> Self {
        Self { max_turns: 50 }
    }
}

impl AppConfig {
    /// 启动前校验：存储与推理服务地址必须配置
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.app.max_concurrent_tasks == 0 {
            return Err(AgentError::Config(
                "app.max_concurrent_tasks must be at least 1".to_string(),
            ));
        }
        if self.app.local_mode {
            tracing::warn!("app.local_mode is on: using in-memory store and mock AI");
            return Ok(());
        }
        if self.telex.api_url.trim().is_empty() {
            return Err(AgentError::Config(
                "telex.api_url is not set (MEMO__TELEX__API_URL or TELEX_API_URL)".to_string(),
            ));
        }
        if self.ai.url.trim().is_empty() {
            return Err(AgentError::Config(
                "ai.url is not set (MEMO__AI__URL or TELEX_AI_URL)".to_string(),
            ));
        }
        if self.telex.api_key.is_none() {
            tracing::warn!("telex.api_key is not set; requests must carry their own credentials");
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.app.host, self.app.port)
    }
}

/// 旧部署使用的环境变量 -> 配置键
const LEGACY_ENV_KEYS: [(&str, &str); 5] = [
    ("TELEX_API_KEY", "telex.api_key"),
    ("TELEX_API_URL", "telex.api_url"),
    ("TELEX_AI_URL", "ai.url"),
    ("TELEX_AI_MODEL", "ai.model"),
    ("PORT", "app.port"),
];

/// 从 config 目录加载配置，环境变量 MEMO__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 叠加环境变量 MEMO__*（双下划线表示嵌套键）
/// 4. 最后用旧变量名（TELEX_API_KEY 等）覆盖
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("MEMO")
            .separator("__")
            .try_parsing(true),
    );

    for (var, key) in LEGACY_ENV_KEYS {
        let value = std::env::var(var).ok().filter(|v| !v.trim().is_empty());
        builder = builder.set_override_option(key, value)?;
    }

    let c = builder.build()?;
    c.try_deserialize()
}
