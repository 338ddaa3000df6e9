//! config module turns the raw [Arg] into a validated [RunConfig]

use crate::Arg;
use std::time::Duration;

/// Per-request timeout, covering connect, send and body receipt
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Immutable settings of one load test run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// target url every request is sent to
    pub url: String,

    /// size of the worker pool, at least 1
    pub threads: usize,

    /// total number of requests to submit
    pub requests: u64,

    /// pause after every submission
    pub interval: Duration,

    /// per-request timeout
    pub timeout: Duration,
}

impl RunConfig {
    pub fn new(
        url: impl Into<String>,
        threads: usize,
        requests: u64,
        interval: Duration,
    ) -> crate::error::Result<Self> {
        if threads == 0 {
            return Err("threads must be at least 1".into());
        }

        Ok(Self {
            url: url.into(),
            threads,
            requests,
            interval,
            timeout: REQUEST_TIMEOUT,
        })
    }
}

impl TryFrom<&Arg> for RunConfig {
    type Error = crate::error::Error;

    fn try_from(arg: &Arg) -> Result<Self, Self::Error> {
        let url = match &arg.url {
            Some(url) => url.clone(),
            None => return Err("a target url is required".into()),
        };

        let interval = Duration::try_from_secs_f64(arg.interval).map_err(
            |e| format!("invalid interval {}: {}", arg.interval, e),
        )?;

        RunConfig::new(url, arg.threads, arg.requests, interval)
    }
}
