// Import required dependencies
use anyhow::{bail, Result}; // For error handling
use chrono::Local; // For the run timestamp
use log::{info, LevelFilter}; // For logging

// Import local modules
use crate::{
    cli::{Cli, GenerateConfigArgs, GuidedSetupArgs, MergeArgs}, // CLI arguments
    config::{default_config_path, Config},                      // Configuration handling
    engine::{merge_log_files, MergeReport},                      // Merge run
    errors::MergeResult,
    progress::ProgressTracker,
    settings,
    signal_handler::{ShutdownFlag, SignalHandler},
};

/// Timestamp format shared by generated output and archive names
const STAMP_FORMAT: &str = "%y%m%d%H%M%S";

// Command handler for processing CLI commands
pub struct CommandHandler;

impl CommandHandler {
    // Handle the merge command - combine CSV files and archive them
    pub async fn handle_merge(cli: &Cli, args: MergeArgs) -> MergeResult<MergeReport> {
        info!("Starting merge operation");

        // Load the given config, or the default one, creating it if missing
        let config = match &args.config {
            Some(path) => Config::load_or_create(path).await?,
            None => Config::load_or_create_default().await?,
        };
        config.validate()?;

        // Now that the configured level is known, apply it
        let level = cli.log_level(Some(&config.log_level))?;
        Self::apply_level(level);

        let stamp = Local::now().format(STAMP_FORMAT).to_string();
        let cwd = std::env::current_dir()?;
        let params = settings::resolve(&args.overrides(), &config, &stamp, &cwd)?;

        // Set up signal handler
        let shutdown = ShutdownFlag::new();
        SignalHandler::new(shutdown.clone()).setup_handlers()?;

        // The csv crate is synchronous, so the run goes to the blocking pool
        let tracker = ProgressTracker::new();
        let report = tokio::task::spawn_blocking(move || {
            merge_log_files(&params, &shutdown, tracker)
        })
        .await??;

        println!(
            "Merged {} files ({} rows) into {}",
            report.merged.len(),
            report.metrics.rows_written(),
            report.output_file.display()
        );
        if !report.archived.is_empty() {
            println!("Archived {} files", report.archived.len());
        }

        info!("Merge operation completed");
        Ok(report)
    }

    // Handle configuration file generation
    pub async fn handle_generate_config(args: GenerateConfigArgs) -> Result<()> {
        info!("Generating configuration file");

        if args.output.exists() && !args.force {
            bail!(
                "{} already exists, pass --force to overwrite it",
                args.output.display()
            );
        }

        Config::template().save(&args.output).await?;

        println!("Configuration file generated at: {}", args.output.display());
        Ok(())
    }

    // Handle interactive setup process
    pub async fn handle_guided_setup(args: GuidedSetupArgs) -> Result<()> {
        info!("Starting guided setup");

        let output = match args.output {
            Some(path) => path,
            None => default_config_path()?,
        };

        // Run interactive configuration
        let config = Config::guided_setup().await?;
        config.save(&output).await?;

        println!("Configuration saved to: {}", output.display());
        Ok(())
    }

    fn apply_level(level: LevelFilter) {
        log::set_max_level(level);
    }
}
