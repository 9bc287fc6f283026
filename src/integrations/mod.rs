//! 外部集成：Telex A2A 入站路由与 Webhook 推送

pub mod telex;
pub mod webhook;

pub use telex::create_router;
pub use webhook::{Notifier, WebhookNotifier};
