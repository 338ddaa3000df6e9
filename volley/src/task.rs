use crate::client::{Fetcher, HttpFetcher};
use crate::dispatcher::{should_report_progress, CountDispatcher, Dispatcher};
use crate::limiter::Limiter;
use crate::report::Report;
use crate::statistics::{RequestOutcome, Statistics};
use crate::RunConfig;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::Instant;

const PROGRESS_TEMPLATE: &str = "Progress: {pos}/{len} requests sent";

/// Task drives one load test: it submits `requests` jobs to a pool of
/// `threads` workers, one every `interval`, then waits for all of them.
pub struct Task {
    config: Arc<RunConfig>,
    fetcher: Arc<dyn Fetcher>,
    progress: ProgressBar,
}

/// State shared between the submitter and the jobs of a single run
#[derive(Clone)]
struct Run {
    dispatcher: Arc<CountDispatcher>,
    statistics: Arc<Statistics>,
}

impl Task {
    /// create a Task that sends real http requests and draws its
    /// progress on stdout
    pub fn new(config: RunConfig) -> crate::error::Result<Self> {
        let fetcher = HttpFetcher::new(config.timeout)?;
        let progress = Self::build_progress(config.requests)?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher)).progress(progress))
    }

    /// create a Task around any [Fetcher], with progress output hidden
    pub fn with_fetcher(config: RunConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            config: Arc::new(config),
            fetcher,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    fn build_progress(total: u64) -> crate::error::Result<ProgressBar> {
        let style = ProgressStyle::with_template(PROGRESS_TEMPLATE)?;
        let progress =
            ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stdout());
        progress.set_style(style);
        Ok(progress)
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// run the whole test and return its report, every transport failure
    /// is folded into the report rather than returned. Each call starts
    /// from empty statistics.
    pub async fn run(&self) -> Report {
        info!(
            "starting load test on {} with {} workers",
            self.config.url, self.config.threads
        );

        let run = Run {
            dispatcher: Arc::new(CountDispatcher::new(self.config.requests)),
            statistics: Arc::new(Statistics::new()),
        };
        let pool = Arc::new(Semaphore::new(self.config.threads));
        let limiter = Limiter::new(self.config.interval);
        let total = run.dispatcher.total();
        // grows with submission, `total` may be far beyond what fits in memory
        let mut handles = Vec::new();

        self.progress.reset();
        let start = Instant::now();
        while let Some(request_id) = run.dispatcher.try_apply_job() {
            let handle = self.submit(request_id, &run, pool.clone());
            handles.push((request_id, handle));
            limiter.allow().await;

            let submitted = run.dispatcher.applied();
            if should_report_progress(submitted, total) {
                self.progress.set_position(submitted);
            }
        }
        if total > 0 {
            self.progress.finish();
        }

        // wait barrier: nothing is read before every job has finished
        for (request_id, handle) in handles {
            if let Err(e) = handle.await {
                warn!("request {} worker was lost: {}", request_id, e);
                run.statistics
                    .record(RequestOutcome::Failure {
                        request_id,
                        error: e.to_string(),
                    })
                    .await;
                run.dispatcher.complete_job();
            }
        }
        let duration = start.elapsed();

        info!(
            "load test finished in {:?}, {} of {} requests completed ({:.0}%)",
            duration,
            run.dispatcher.completed(),
            total,
            run.dispatcher.get_process() * 100.0
        );

        let snapshot = run.statistics.snapshot().await;
        Report::new(self.config.requests, duration, snapshot)
    }

    /// spawn one job, it waits for a free worker before sending
    fn submit(
        &self,
        request_id: u64,
        run: &Run,
        pool: Arc<Semaphore>,
    ) -> JoinHandle<()> {
        let config = self.config.clone();
        let fetcher = self.fetcher.clone();
        let run = run.clone();

        tokio::spawn(async move {
            // the semaphore is never closed
            let _permit = pool.acquire_owned().await.ok();
            let outcome = worker(request_id, &config, fetcher.as_ref()).await;
            run.statistics.record(outcome).await;
            run.dispatcher.complete_job();
        })
    }
}

/// perform one request and classify it, never fails
async fn worker(
    request_id: u64,
    config: &RunConfig,
    fetcher: &dyn Fetcher,
) -> RequestOutcome {
    let outcome = match fetcher.get(&config.url).await {
        Ok(reply) => RequestOutcome::Success {
            request_id,
            status: reply.status,
            elapsed: reply.elapsed,
        },
        Err(e) => RequestOutcome::Failure {
            request_id,
            error: e.to_string(),
        },
    };

    match &outcome {
        RequestOutcome::Success {
            status, elapsed, ..
        } => debug!(
            "request {} answered {} in {:?}",
            outcome.request_id(),
            status,
            elapsed
        ),
        RequestOutcome::Failure { error, .. } => {
            debug!("request {} failed: {}", outcome.request_id(), error)
        },
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Reply;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering::SeqCst};
    use std::time::Duration;

    /// answers 200 after `delay`, fails the `fail_on`th call (1-based)
    struct MockFetcher {
        delay: Duration,
        fail_on: Option<u64>,
        calls: AtomicU64,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl MockFetcher {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                fail_on: None,
                calls: AtomicU64::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }

        fn failing_on(mut self, call: u64) -> Self {
            self.fail_on = Some(call);
            self
        }
    }

    #[async_trait::async_trait]
    impl Fetcher for MockFetcher {
        async fn get(&self, _url: &str) -> crate::error::Result<Reply> {
            let call = self.calls.fetch_add(1, SeqCst) + 1;
            let current = self.in_flight.fetch_add(1, SeqCst) + 1;
            self.max_in_flight.fetch_max(current, SeqCst);

            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, SeqCst);

            if self.fail_on == Some(call) {
                return Err("operation timed out".into());
            }
            Ok(Reply {
                status: 200,
                elapsed: self.delay,
            })
        }
    }

    fn config(threads: usize, requests: u64, interval: Duration) -> RunConfig {
        RunConfig::new("http://mock.local/", threads, requests, interval).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_constant_responses() {
        let delay = Duration::from_millis(100);
        let fetcher = Arc::new(MockFetcher::new(delay));
        let task =
            Task::with_fetcher(config(4, 20, Duration::ZERO), fetcher.clone());

        let report = task.run().await;
        let stats = report.latency().unwrap();
        assert_eq!(stats.min, delay);
        assert_eq!(stats.max, delay);
        assert!((stats.mean - 0.1).abs() < 1e-9);
        assert!((stats.median - 0.1).abs() < 1e-9);
        assert!(stats.std_dev.unwrap().abs() < 1e-12);
        assert_eq!(report.status_distribution(), vec![(200, 20, 100.0)]);
        assert!(report.error_distribution().is_empty());
        assert_eq!(fetcher.calls.load(SeqCst), 20);
    }

    // the mock cannot see request ids, so the failing request is the 8th
    // call to reach it, whichever id that is
    #[tokio::test(start_paused = true)]
    async fn test_eighth_call_failure_is_excluded_from_latency() {
        let delay = Duration::from_millis(40);
        let fetcher = Arc::new(MockFetcher::new(delay).failing_on(8));
        let task = Task::with_fetcher(config(3, 10, Duration::ZERO), fetcher);

        let report = task.run().await;
        assert_eq!(report.successful(), 9);
        assert_eq!(report.failed(), 1);
        assert_eq!(
            report.error_distribution(),
            vec![("operation timed out".to_string(), 1)]
        );
        let stats = report.latency().unwrap();
        assert_eq!(stats.min, delay);
        assert_eq!(stats.max, delay);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_requests() {
        let fetcher = Arc::new(MockFetcher::new(Duration::from_millis(1)));
        let task = Task::with_fetcher(
            config(2, 0, Duration::from_secs(1)),
            fetcher.clone(),
        );

        let report = task.run().await;
        assert_eq!(report.to_string(), "No successful requests were made.\n");
        assert_eq!(fetcher.calls.load(SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wall_clock_throughput() {
        let delay = Duration::from_millis(100);
        let fetcher = Arc::new(MockFetcher::new(delay));
        let task = Task::with_fetcher(config(4, 20, Duration::ZERO), fetcher);

        let report = task.run().await;
        // 20 requests of 100ms over 4 workers take 5 rounds, not 20
        assert!(report.duration() >= Duration::from_millis(500));
        assert!(report.duration() < Duration::from_secs(2));
        let expected = 20.0 / report.duration().as_secs_f64();
        assert!((report.requests_per_second() - expected).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_paces_submission() {
        let fetcher = Arc::new(MockFetcher::new(Duration::from_millis(1)));
        let task = Task::with_fetcher(
            config(5, 5, Duration::from_millis(200)),
            fetcher,
        );

        let report = task.run().await;
        assert_eq!(report.successful(), 5);
        assert!(report.duration() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_bounded_by_threads() {
        let fetcher = Arc::new(MockFetcher::new(Duration::from_millis(50)));
        let task =
            Task::with_fetcher(config(3, 30, Duration::ZERO), fetcher.clone());

        let report = task.run().await;
        assert_eq!(report.successful(), 30);
        assert_eq!(fetcher.max_in_flight.load(SeqCst), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_fifty_workers_record_every_outcome() {
        let fetcher = Arc::new(MockFetcher::new(Duration::from_millis(5)));
        let task =
            Task::with_fetcher(config(50, 50, Duration::ZERO), fetcher.clone());

        let report = task.run().await;
        assert_eq!(report.successful() + report.failed(), 50);
        assert_eq!(report.status_distribution(), vec![(200, 50, 100.0)]);
        assert_eq!(fetcher.calls.load(SeqCst), 50);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_run_starts_from_scratch() {
        let fetcher = Arc::new(MockFetcher::new(Duration::from_millis(10)));
        let task =
            Task::with_fetcher(config(2, 5, Duration::ZERO), fetcher.clone());

        let first = task.run().await;
        let second = task.run().await;
        assert_eq!(first.successful(), 5);
        assert_eq!(second.successful(), 5);
        assert!(second.duration() >= Duration::from_millis(30));
        assert_eq!(fetcher.calls.load(SeqCst), 10);
    }

    /// never answers
    struct StalledFetcher;

    #[async_trait::async_trait]
    impl Fetcher for StalledFetcher {
        async fn get(&self, _url: &str) -> crate::error::Result<Reply> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_request_count_submits_lazily() {
        let task = Task::with_fetcher(
            config(1, u64::MAX, Duration::from_secs(1)),
            Arc::new(StalledFetcher),
        );

        let result =
            tokio::time::timeout(Duration::from_secs(5), task.run()).await;
        assert!(result.is_err());
    }
}
