//! LLM 层：客户端抽象与实现（Telex AI / Mock）

pub mod mock;
pub mod telex;
pub mod traits;

pub use mock::MockLlmClient;
pub use telex::TelexAiClient;
pub use traits::{CallContext, LlmClient, LlmError};
