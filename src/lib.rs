//! Memo - Rust 会话记忆智能体
//!
//! 模块划分：
//! - **a2a**: A2A JSON-RPC 协议类型（Task / Message / Envelope）、入站请求解析、Agent Card
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、任务编排、后台调度、优雅关闭
//! - **integrations**: Telex 入站路由与 Webhook 推送
//! - **intent**: 意图识别与执行（remember / recall / chat）
//! - **llm**: 推理服务客户端抽象与实现（Telex AI / Mock）
//! - **memory**: 文档存储客户端与会话历史
//! - **observability**: 日志初始化

pub mod a2a;
pub mod config;
pub mod core;
pub mod integrations;
pub mod intent;
pub mod llm;
pub mod memory;
pub mod observability;
