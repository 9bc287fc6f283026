//! 记忆层：短期对话、文档存储客户端（Telex / 内存）、会话历史

pub mod conversation;
pub mod history;
pub mod in_memory;
pub mod store;

pub use conversation::{ConversationMemory, Message, Role};
pub use history::{ConversationHistory, LoadedHistory};
pub use in_memory::InMemoryDocumentStore;
pub use store::{
    CollectionStatus, DocumentFilter, DocumentStore, HistoryDocument, MemoryDocument,
    TelexDocumentStore, USER_HISTORY, USER_INFORMATION,
};
