use std::time::Duration;
use tokio::time;

/// Limiter paces submissions by holding the submitter for a fixed
/// interval after each one
pub(crate) struct Limiter {
    interval: Duration,
}

impl Limiter {
    /// create a new Limiter
    pub fn new(interval: Duration) -> Limiter {
        Self { interval }
    }

    /// allow function return means that the next submission can be
    /// performed, otherwise wait here
    pub(crate) async fn allow(&self) {
        if self.interval.is_zero() {
            return;
        }
        time::sleep(self.interval).await;
    }
}
