//! arg module define the application entry arguments [Arg]

use clap::{crate_authors, Parser, ValueHint};
use clap_complete::Shell;
use std::io::{self, BufRead, Write};

/// Worker counts above this ask the operator for confirmation first
pub const HIGH_CONCURRENCY_THRESHOLD: usize = 50;

#[derive(Debug, Parser)]
#[command(author(crate_authors!("\n")), version, about)]
pub struct Arg {
    /// Target Url
    #[arg(
        long,
        required_unless_present("completions"),
        value_hint = ValueHint::Url,
        help = "Target URL to test"
    )]
    pub url: Option<String>,

    /// Number of concurrent workers
    #[arg(long, default_value_t = 5, help = "Number of concurrent threads")]
    pub threads: usize,

    /// Number of requests
    #[arg(
        long,
        default_value_t = 100,
        help = "Total number of requests to send"
    )]
    pub requests: u64,

    /// Pause between two submissions, in seconds
    #[arg(
        long,
        default_value_t = 0.1,
        help = "Interval between requests in seconds"
    )]
    pub interval: f64,

    #[arg(long, value_enum, help = "Print a shell completion script and exit")]
    pub completions: Option<Shell>,
}

impl Arg {
    /// whether the run is large enough to require [confirm] first
    pub fn needs_confirmation(&self) -> bool {
        self.threads > HIGH_CONCURRENCY_THRESHOLD
    }
}

/// Warn about a high worker count and ask the operator to continue.
///
/// Returns `Ok(true)` only for an answer of exactly `y` or `Y`, the line
/// ending aside. End of input counts as a refusal.
pub fn confirm<R, W>(mut input: R, mut output: W) -> io::Result<bool>
where
    R: BufRead,
    W: Write,
{
    writeln!(
        output,
        "WARNING: Using a high number of threads may cause excessive load."
    )?;
    write!(output, "Do you want to continue? (y/n): ")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    let answer = answer.trim_end_matches(['\r', '\n']);
    Ok(answer.eq_ignore_ascii_case("y"))
}
