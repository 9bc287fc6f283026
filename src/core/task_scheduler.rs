//! 任务调度：后台单元的跟踪与并发上限
//!
//! 每个被接受的请求对应一个后台单元；Semaphore 限制同时运行的数量，超出上限的单元排队等待许可。
//! TaskTracker 记录全部单元，关闭时 close 后等待其结束。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;

/// 任务调度器
#[derive(Clone)]
pub struct TaskScheduler {
    tracker: TaskTracker,
    permits: Arc<Semaphore>,
}

impl TaskScheduler {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            tracker: TaskTracker::new(),
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// 提交一个后台单元；立即返回，单元拿到许可后才开始执行
    pub fn spawn<F>(&self, unit: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        self.tracker.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                tracing::warn!("Scheduler semaphore closed, dropping background unit");
                return;
            };
            unit.await;
        });
    }

    /// 已提交但未结束的单元数（含排队中的）
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_closed(&self) -> bool {
        self.tracker.is_closed()
    }

    /// 停止接收新单元并等待已有单元结束；超时返回 false
    pub async fn close_and_wait(&self, grace: Duration) -> bool {
        self.tracker.close();
        let pending = self.tracker.len();
        if pending > 0 {
            tracing::info!("Waiting for {} background tasks to finish...", pending);
        }
        match tokio::time::timeout(grace, self.tracker.wait()).await {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(
                    "{} background tasks still running after {}s",
                    self.tracker.len(),
                    grace.as_secs()
                );
                false
            }
        }
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new(64)
    }
}
