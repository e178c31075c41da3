//! Command-line entry point.

use anyhow::Context;
use clap::Parser;
use nccat::config::{Cli, Command, NccatConfig};
use nccat::driver;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).try_init();

    match cli.command {
        Command::Run { config: config_path } => {
            let mut config =
                NccatConfig::load(&config_path).with_context(|| format!("loading config file {}", config_path.display()))?;
            if cli.jobs.is_some() {
                config.jobs = cli.jobs;
            }

            driver::run(&config).context("running the witness generation pipeline")?;
        }
    }

    Ok(())
}
