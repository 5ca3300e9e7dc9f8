use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use parlia_gas_estimator::{cli::Cli, estimator};

fn main() {
    if let Err(err) = run() {
        eprintln!("{} {err:?}", "error:".red().bold());
        std::process::exit(1);
    }
}

fn run() -> eyre::Result<()> {
    // Logs go to stderr so stdout only carries the report
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let report = estimator::run(&cli.estimator_config())?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}
