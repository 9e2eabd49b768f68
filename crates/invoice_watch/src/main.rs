mod app;
mod cli;
mod commands;
mod config;
mod effects;
mod logging;
mod render;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use invoice_engine::InvoiceClient;
use invoice_logging::{invoice_error, invoice_info};

use crate::cli::{Cli, Commands, WatchArgs};
use crate::config::AppConfig;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match AppConfig::resolve(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err:#}");
            return ExitCode::FAILURE;
        }
    };
    logging::initialize(config.log_destination, cli.verbose);
    invoice_info!(
        "invoice-watch starting api_base_url={} poll_interval_ms={}",
        config.api_base_url,
        config.poll_interval_ms
    );

    match run(cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            invoice_error!("{:#}", err);
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, config: &AppConfig) -> Result<()> {
    let client = InvoiceClient::new(&config.api_settings()).context("creating the API client")?;
    match cli.command {
        Commands::Watch(args) => app::watch(config, client, &args),
        Commands::Upload(args) => {
            let receipt = commands::upload(&client, &args.file)?;
            if !args.watch {
                return Ok(());
            }
            let watch_args = WatchArgs {
                invoice_ids: vec![receipt.invoice_id],
                once_per_status: false,
                save_dir: args.save_dir,
            };
            app::watch(config, client, &watch_args)
        }
        Commands::List => commands::list(&client),
        Commands::Show { invoice_id } => commands::show(&client, &invoice_id, config.log_entries),
        Commands::Delete { invoice_id } => commands::delete(&client, &invoice_id),
        Commands::Feedback { kind, payload } => commands::feedback(&client, kind, &payload),
    }
}
