//! mod statistics collects the outcome of every request of a run

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync as tsync;

/// Result of one attempted request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// the server answered, with any status code
    Success {
        request_id: u64,
        status: u16,
        elapsed: Duration,
    },

    /// no response was received: timeout, connection or dns fault
    Failure { request_id: u64, error: String },
}

impl RequestOutcome {
    pub fn request_id(&self) -> u64 {
        match self {
            RequestOutcome::Success { request_id, .. }
            | RequestOutcome::Failure { request_id, .. } => *request_id,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    elapsed_time: Vec<Duration>,
    status_codes: HashMap<u16, u64>,
    errors: Vec<String>,
}

/// Concurrency safe sink shared by all workers of a run. Each
/// [Statistics::record] is applied as a whole under one lock.
#[derive(Debug, Default)]
pub struct Statistics {
    inner: tsync::Mutex<Inner>,
}

impl Statistics {
    pub fn new() -> Statistics {
        Self::default()
    }

    pub async fn record(&self, outcome: RequestOutcome) {
        let mut inner = self.inner.lock().await;
        match outcome {
            RequestOutcome::Success {
                status, elapsed, ..
            } => {
                inner.elapsed_time.push(elapsed);
                inner
                    .status_codes
                    .entry(status)
                    .and_modify(|count| *count += 1)
                    .or_insert(1);
            },
            RequestOutcome::Failure { error, .. } => {
                inner.errors.push(error);
            },
        }
    }

    /// copy of everything recorded so far, only meaningful once every
    /// worker has finished
    pub async fn snapshot(&self) -> Snapshot {
        let inner = self.inner.lock().await;
        Snapshot {
            elapsed_time: inner.elapsed_time.clone(),
            status_codes: inner.status_codes.clone(),
            errors: inner.errors.clone(),
        }
    }
}

/// Final, read only state of a run's [Statistics]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub elapsed_time: Vec<Duration>,
    pub status_codes: HashMap<u16, u64>,
    pub errors: Vec<String>,
}

impl Snapshot {
    pub fn successes(&self) -> usize {
        self.elapsed_time.len()
    }

    pub fn failures(&self) -> usize {
        self.errors.len()
    }

    /// number of outcomes recorded, successes plus failures
    pub fn recorded(&self) -> usize {
        self.successes() + self.failures()
    }
}
