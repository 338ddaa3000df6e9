use anyhow::anyhow;
use clap::{CommandFactory, Parser};
use log::{error, warn};
use std::io;
use volley::arg::confirm;
use volley::{Arg, RunConfig, Task};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn"),
    )
    .init();

    let arg = Arg::parse();

    if let Some(shell) = arg.completions {
        let mut command = Arg::command();
        let name = command.get_name().to_string();
        clap_complete::generate(shell, &mut command, name, &mut io::stdout());
        return Ok(());
    }

    let config = RunConfig::try_from(&arg).map_err(|e| {
        error!("invalid arguments: {}", e);
        anyhow!(e)
    })?;

    if arg.needs_confirmation() && !confirm(io::stdin().lock(), io::stdout())? {
        warn!("operator declined a run with {} threads", config.threads);
        println!("Load test aborted.");
        return Ok(());
    }

    let task = Task::new(config).map_err(|e| anyhow!(e))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .enable_all()
        .build()?;

    let config = task.config();
    println!("\nStarting load test on {}", config.url);
    println!(
        "Threads: {}, Requests: {}, Interval: {}s",
        config.threads,
        config.requests,
        config.interval.as_secs_f64()
    );
    println!("{}", "=".repeat(80));

    let report = runtime.block_on(task.run());

    println!("\n{}", "=".repeat(80));
    print!("{}", report);

    Ok(())
}
