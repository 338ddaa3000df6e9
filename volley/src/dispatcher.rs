//! dispatcher module hands out request ids and keeps track of how far a
//! run has progressed

use std::sync::atomic::{AtomicU64, Ordering::*};

pub trait Dispatcher: Send + Sync {
    /// query current task process, returning 0 to 1
    fn get_process(&self) -> f64;

    /// apply for the next job, returning its request id, or `None` once
    /// every job has been handed out
    fn try_apply_job(&self) -> Option<u64>;

    /// when worker complete job, it will notify the dispatcher
    fn complete_job(&self);

    /// number of jobs already applied for
    fn applied(&self) -> u64;

    /// the amount of work done
    fn completed(&self) -> u64;
}

/// [CountDispatcher] is a count based task dispatcher
pub struct CountDispatcher {
    /// total requests number will send to server
    total: u64,

    /// number of jobs already applied for
    applied: AtomicU64,

    /// the amount of work done
    completed: AtomicU64,
}

impl CountDispatcher {
    /// give total, return [Dispatcher]
    pub fn new(total: u64) -> Self {
        Self {
            total,
            applied: AtomicU64::new(0),
            completed: AtomicU64::new(0),
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

impl Dispatcher for CountDispatcher {
    fn get_process(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.completed.load(Acquire) as f64 / self.total as f64
    }

    fn try_apply_job(&self) -> Option<u64> {
        // is there any chance of apply a job
        if self.applied.load(Acquire) >= self.total {
            return None;
        }

        let previous = self.applied.fetch_add(1, SeqCst);
        if previous >= self.total {
            self.applied.fetch_sub(1, SeqCst);
            return None;
        }

        Some(previous)
    }

    fn complete_job(&self) {
        self.completed.fetch_add(1, SeqCst);
    }

    fn applied(&self) -> u64 {
        self.applied.load(Acquire)
    }

    fn completed(&self) -> u64 {
        self.completed.load(Acquire)
    }
}

/// progress is redrawn after every 10th submission and after the last one
pub fn should_report_progress(submitted: u64, total: u64) -> bool {
    submitted % 10 == 0 || submitted == total
}
