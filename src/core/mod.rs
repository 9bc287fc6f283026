//! 核心编排层：错误类型、任务编排、后台调度、优雅关闭

pub mod error;
pub mod orchestrator;
pub mod shutdown;
pub mod task_scheduler;

pub use error::AgentError;
pub use orchestrator::{Accepted, TaskOrchestrator};
pub use shutdown::{SchedulerDrain, ShutdownCleanup, ShutdownCoordinator, ShutdownManager, ShutdownReason};
pub use task_scheduler::TaskScheduler;
