//! A2A 协议层：入站请求、Task / Message / Envelope、Agent Card

pub mod card;
pub mod message;
pub mod request;

pub use card::agent_card;
pub use message::{Artifact, Envelope, JsonRpcError, Message, MessageRole, Part, Task, TaskState, TaskStatus};
pub use request::{SendMessageRequest, Turn};
