mod config;
mod cmd;
mod error;

use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tokio_util::sync::CancellationToken;

use config::{Cli, Commands};
use cmd::Context;
use error::CliError;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, closing stream");
            on_signal.cancel();
        }
    });

    let subcommand = cli.command.name();
    match run(cli, cancel).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "{subcommand} failed");
            if e.wants_usage() {
                print_usage(subcommand);
            }
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli, cancel: CancellationToken) -> Result<(), CliError> {
    let ctx = Context::load(cli.config.as_deref(), cli.verbose, cancel)?;
    match cli.command {
        Commands::Stream(args) => cmd::stream::run(&ctx, args).await,
        Commands::Firehose(args) => cmd::firehose::run(&ctx, args).await,
        Commands::CreateJob(args) => cmd::create_job::run(&ctx, args).await,
    }
}

/// Logs go to stderr; stdout carries sink output only.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "info,be_engine=debug,be_cli=debug,sink_printer=debug,sink_toml=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .init();
}

fn print_usage(subcommand: &str) {
    let mut command = Cli::command();
    if let Some(sub) = command.find_subcommand_mut(subcommand) {
        eprintln!("{}", sub.render_help());
    }
}
