//! report module derives the end of run figures from a [Snapshot]

use crate::statistics::Snapshot;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Response time figures over the successful requests, in seconds
#[derive(Debug, Clone, PartialEq)]
pub struct Latency {
    pub min: Duration,
    pub max: Duration,
    pub mean: f64,
    pub median: f64,
    /// sample standard deviation, `None` with a single sample
    pub std_dev: Option<f64>,
}

impl Latency {
    /// `None` when there is nothing to describe
    pub fn from_samples(samples: &[Duration]) -> Option<Latency> {
        let mut sorted = samples.to_vec();
        sorted.sort();

        let min = *sorted.first()?;
        let max = *sorted.last()?;
        let count = sorted.len();
        let total: Duration = sorted.iter().sum();
        let mean = total.as_secs_f64() / count as f64;

        let middle = count / 2;
        let median = if count % 2 == 0 {
            (sorted[middle - 1].as_secs_f64() + sorted[middle].as_secs_f64()) / 2.0
        } else {
            sorted[middle].as_secs_f64()
        };

        let std_dev = if count > 1 {
            let squares: f64 = sorted
                .iter()
                .map(|d| (d.as_secs_f64() - mean).powi(2))
                .sum();
            Some((squares / (count - 1) as f64).sqrt())
        } else {
            None
        };

        Some(Latency {
            min,
            max,
            mean,
            median,
            std_dev,
        })
    }
}

/// Report of a finished run. Throughput and status percentages are taken
/// against the configured request count, not against completed requests.
#[derive(Debug, Clone)]
pub struct Report {
    requests: u64,
    duration: Duration,
    snapshot: Snapshot,
}

impl Report {
    pub fn new(requests: u64, duration: Duration, snapshot: Snapshot) -> Self {
        Self {
            requests,
            duration,
            snapshot,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// configured requests over wall clock duration, 0 for an instant run
    pub fn requests_per_second(&self) -> f64 {
        let seconds = self.duration.as_secs_f64();
        if seconds > 0.0 {
            self.requests as f64 / seconds
        } else {
            0.0
        }
    }

    pub fn successful(&self) -> usize {
        self.snapshot.successes()
    }

    pub fn failed(&self) -> usize {
        self.snapshot.failures()
    }

    pub fn latency(&self) -> Option<Latency> {
        Latency::from_samples(&self.snapshot.elapsed_time)
    }

    /// `(status, count, percent of configured requests)` by status
    pub fn status_distribution(&self) -> Vec<(u16, u64, f64)> {
        let mut distribution: Vec<_> = self
            .snapshot
            .status_codes
            .iter()
            .map(|(status, count)| (*status, *count, self.percent(*count)))
            .collect();
        distribution.sort_by_key(|(status, _, _)| *status);
        distribution
    }

    /// `(message, count)` by descending count, equal counts by message
    pub fn error_distribution(&self) -> Vec<(String, u64)> {
        let mut counts: HashMap<&str, u64> = HashMap::new();
        for error in &self.snapshot.errors {
            counts
                .entry(error.as_str())
                .and_modify(|count| *count += 1)
                .or_insert(1);
        }

        let mut distribution: Vec<_> = counts
            .into_iter()
            .map(|(error, count)| (error.to_string(), count))
            .collect();
        distribution.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        distribution
    }

    fn percent(&self, count: u64) -> f64 {
        if self.requests == 0 {
            return 0.0;
        }
        count as f64 / self.requests as f64 * 100.0
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let latency = match self.latency() {
            Some(latency) => latency,
            None => return writeln!(f, "No successful requests were made."),
        };

        writeln!(f, "\nLoad Test Results:")?;
        writeln!(
            f,
            "  Test Duration: {:.2} seconds",
            self.duration.as_secs_f64()
        )?;
        writeln!(f, "  Requests Per Second: {:.2}", self.requests_per_second())?;
        writeln!(f, "  Total Requests: {}", self.requests)?;
        writeln!(f, "  Successful Requests: {}", self.successful())?;
        writeln!(f, "  Failed Requests: {}", self.failed())?;

        writeln!(f, "\nResponse Time Statistics (seconds):")?;
        writeln!(f, "  Min: {:.4}", latency.min.as_secs_f64())?;
        writeln!(f, "  Max: {:.4}", latency.max.as_secs_f64())?;
        writeln!(f, "  Mean: {:.4}", latency.mean)?;
        writeln!(f, "  Median: {:.4}", latency.median)?;
        if let Some(std_dev) = latency.std_dev {
            writeln!(f, "  Std Dev: {:.4}", std_dev)?;
        }

        writeln!(f, "\nStatus Code Distribution:")?;
        for (status, count, percent) in self.status_distribution() {
            writeln!(f, "  {}: {} ({:.1}%)", status, count, percent)?;
        }

        let errors = self.error_distribution();
        if !errors.is_empty() {
            writeln!(f, "\nError Types ({} total):", self.failed())?;
            for (error, count) in errors {
                writeln!(f, "  {}: {}", error, count)?;
            }
        }

        Ok(())
    }
}
