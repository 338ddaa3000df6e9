//! volley is a paced http load generator.

pub mod arg;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod limiter;
pub mod report;
pub mod statistics;
pub mod task;

pub use self::arg::Arg;
pub use self::config::RunConfig;
pub use self::report::Report;
pub use self::task::Task;
