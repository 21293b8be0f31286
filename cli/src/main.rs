use clap::Parser;
use tracing::error;
use waybill::{parse_log_level, setup_logger, LevelFilter};

use crate::{
    cli_interface::{Commands, CLI},
    commands::{
        handle_apply_command, handle_dispatch_summary_command, handle_documents_command,
        handle_query_command, handle_scheduled_command,
    },
    console::{print_error_message, print_warn_message},
    waybill_yaml::load_manifest,
};

mod cli_interface;
mod commands;
mod console;
mod waybill_yaml;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CLI::parse();

    let log_level = parse_log_level(&cli.log_level).unwrap_or_else(|| {
        print_warn_message(&format!("Unknown log level `{}`, using info", cli.log_level));
        LevelFilter::INFO
    });
    setup_logger(log_level);

    let manifest = load_manifest(cli.config.as_deref()).map_err(|e| {
        print_error_message(&format!("Could not read the manifest: {}", e));
        e
    })?;

    let result = match &cli.command {
        Commands::Apply { file, timeout_secs } => {
            handle_apply_command(&manifest, file, *timeout_secs).await
        }
        Commands::Query { filters, base } => handle_query_command(&manifest, filters, base).await,
        Commands::Documents { from, to } => handle_documents_command(&manifest, *from, *to).await,
        Commands::DispatchSummary { from, to } => {
            handle_dispatch_summary_command(&manifest, *from, *to).await
        }
        Commands::Scheduled { date, filters } => {
            handle_scheduled_command(&manifest, *date, filters.as_deref()).await
        }
    };

    if let Err(e) = &result {
        error!("waybill exited with an error: {}", e);
    }

    result
}
