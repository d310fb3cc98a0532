use anyhow::Context;
use clap::Parser;
use deadweight::config::DeadweightConfig;
use deadweight::utils::logging;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "deadweight", version)]
#[command(about = "Report declarations that nothing outside tests and mocks references")]
struct Cli {
    /// Files to analyse, relative to the root. Discovered when omitted.
    files: Vec<String>,
    /// Root directory of the workspace
    #[arg(short, long, default_value = ".")]
    root: PathBuf,
    /// Configuration file (defaults to <root>/.deadweight.json)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Language server executable, overriding the configuration
    #[arg(long)]
    server: Option<String>,
    /// Print the report as JSON on stdout
    #[arg(long)]
    json: bool,
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Exit with status 1 when unused symbols are found
    #[arg(long)]
    fail_on_unused: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match logging::init_logging(cli.debug, cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Warning: Failed to initialize logging: {}", e);
            None
        },
    };

    match execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        },
    }
}

async fn execute(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = DeadweightConfig::load(&cli.root, cli.config.as_deref())?;
    if let Some(server) = cli.server {
        config.server.command = server;
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted");
            on_interrupt.cancel();
        }
    });

    let Some(report) = deadweight::run(&cli.root, &config, cli.files, &cancel).await? else {
        return Ok(ExitCode::from(130));
    };

    report.emit();
    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", json);
    }

    if cli.fail_on_unused && !report.is_empty() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
