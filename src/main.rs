// ============================================================================
// csvlog - CSV Log Merger
// Main Entry Point
//
// Merges the CSV exports found in a directory into a single file, keeping
// only the files whose first row matches the expected header, then moves the
// merged files into an archive folder that mirrors the input layout.
// ============================================================================

use clap::Parser; // Command-line argument parsing with derive macros
use log::{info, LevelFilter}; // Structured logging
use std::process::ExitCode;

use csvlog::cli::{Cli, Commands}; // CLI structure and command enumeration
use csvlog::commands::CommandHandler; // Command processing and orchestration
use csvlog::logging::Logger;

// ============================================================================
// APPLICATION ENTRY POINT
// ============================================================================

/// Parses the command line, sets up logging and dispatches to a command handler.
/// Any failure is printed once and turned into a non-zero exit status.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // The configured level is not known yet; merge refines it once the config is loaded
    let initial = match cli.log_level(None) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // The logger itself lets everything through; log::set_max_level does the filtering
    let logger = match &cli.log_file {
        Some(path) => Logger::init(Some(path.clone()), LevelFilter::Trace),
        None => {
            env_logger::builder().filter_level(LevelFilter::Trace).init();
            Ok(())
        }
    };
    if let Err(e) = logger {
        eprintln!("Error: failed to open log file: {}", e);
        return ExitCode::FAILURE;
    }
    log::set_max_level(initial);

    info!("csvlog starting up");

    // ========================================================================
    // COMMAND DISPATCH PHASE
    // ========================================================================

    let result = match &cli.command {
        Commands::Merge(args) => CommandHandler::handle_merge(&cli, args.clone())
            .await
            .map(|_| ())
            .map_err(anyhow::Error::from),
        Commands::GenerateConfig(args) => {
            CommandHandler::handle_generate_config(args.clone()).await
        }
        Commands::GuidedSetup(args) => CommandHandler::handle_guided_setup(args.clone()).await,
    };

    match result {
        Ok(()) => {
            info!("csvlog operation completed");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
