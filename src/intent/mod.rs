//! 意图模块
//!
//! 推理服务把最新一条用户消息归为 remember / recall / chat 三类之一，
//! 解析器再把意图落到记忆读写上并生成回复。

pub mod classifier;
pub mod resolver;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use classifier::{build_prompt, parse_intent, IntentClassifier};
pub use resolver::IntentResolver;

/// 识别出的意图类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// 陈述一个需要记住的事实
    Remember,
    /// 询问之前说过的事实
    Recall,
    /// 普通对话，data.value 为回复
    Chat,
    /// 模型给出了约定之外的标签
    #[serde(other)]
    Unknown,
}

/// 推理服务的结构化输出：`{"intent": …, "data": {…}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentResult {
    pub intent: Intent,
    pub data: Map<String, Value>,
}

/// 标量转文本：字符串原样返回，数字 / 布尔转为文本，空串与其它类型视为缺失
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl IntentResult {
    /// 读取 data 中的文本字段（规则同 scalar_text）
    pub fn field(&self, name: &str) -> Option<String> {
        scalar_text(self.data.get(name)?)
    }

    pub fn key(&self) -> Option<String> {
        self.field("key")
    }

    pub fn value(&self) -> Option<String> {
        self.field("value")
    }
}
