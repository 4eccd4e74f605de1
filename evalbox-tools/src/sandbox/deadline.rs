use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

#[derive(Debug, PartialEq, Eq)]
pub enum DeadlineResult<T> {
    Finished(T),
    Expired,
}

/// Bounds one run. Whichever of the work and the timer finishes first wins;
/// on expiry the work future is dropped and the caller is told to force-stop
/// whatever the work was driving.
#[derive(Debug, Clone, Copy)]
pub struct DeadlineController {
    limit: Duration,
}

impl DeadlineController {
    pub fn new(limit: Duration) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    pub async fn race<F: Future>(&self, work: F) -> DeadlineResult<F::Output> {
        match timeout(self.limit, work).await {
            Ok(output) => DeadlineResult::Finished(output),
            Err(_) => DeadlineResult::Expired,
        }
    }
}
