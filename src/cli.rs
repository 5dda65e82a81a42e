// ============================================================================
// CLI Module - Command-Line Interface Definitions
//
// Defines the csvlog command line with clap derive macros. Global flags
// control logging; the merge subcommand carries the per-run overrides that
// the settings module combines with the configuration file.
// ============================================================================

use crate::errors::ConfigError;
use crate::logging::{adjust_level, parse_log_level};
use crate::settings::{ArchiveOverride, HeaderOverride, MergeOverrides};
use clap::{ArgAction, Parser, Subcommand}; // Command-line parsing with derive macros
use log::LevelFilter; // Logging level configuration
use std::path::PathBuf; // Cross-platform file path handling

// ============================================================================
// MAIN CLI STRUCTURE
// ============================================================================

/// csvlog - merge exported CSV logs into one file and archive the originals
///
/// Examples:
///   csvlog merge
///   csvlog merge -i exports -o merged.csv -A
///   csvlog merge -r -t "A,B,,C" -a /srv/archive
///   csvlog generate-config logmerge.json
#[derive(Parser, Debug)]
#[command(
    name = "csvlog",
    about = "Merge CSV log exports that share a header row into one file",
    long_about = "csvlog scans a directory for .csv files, keeps the ones whose first row matches \
                  the expected header, appends their rows to a single output file and then moves \
                  them into an archive folder that mirrors the input layout.",
    version,
    after_help = "Examples:\n  \
                  csvlog merge\n  \
                  csvlog merge -i exports -o merged.csv -A\n  \
                  csvlog merge -r -t \"A,B,,C\" -a /srv/archive\n  \
                  csvlog generate-config logmerge.json"
)]
pub struct Cli {
    /// Raise the log level one step per occurrence
    #[arg(
        global = true,
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        conflicts_with = "silent",
        help = "Increase verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    verbose: u8,

    /// Lower the log level one step per occurrence
    #[arg(
        global = true,
        short = 's',
        long = "silent",
        action = ArgAction::Count,
        help = "Decrease verbosity (-s: errors only, -ss: nothing)"
    )]
    silent: u8,

    /// Base log level before -v/-s are applied; overrides the configuration
    #[arg(
        global = true,
        long = "log-level",
        value_name = "LEVEL",
        help = "Set log level explicitly [off|error|warn|info|debug|trace]"
    )]
    log_level: Option<String>,

    /// Also append log lines to this file
    #[arg(global = true, long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// The operation to perform
    #[command(subcommand)]
    pub command: Commands,
}

// ============================================================================
// SUBCOMMAND DEFINITIONS
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Merge matching CSV files and archive them
    #[command(
        about = "Merge CSV files from a directory into one output file",
        long_about = "Merge every .csv file in the input directory whose first row matches the \
                      expected header. The header is written once at the top of the output and \
                      the remaining rows of each file follow in directory order. Merged files \
                      are then moved into the archive folder unless archiving is disabled.\n\n\
                      An existing output file is never overwritten. When the output or archive \
                      location is an existing directory a timestamped name is used inside it."
    )]
    Merge(MergeArgs),

    /// Write the default configuration to a file
    #[command(about = "Generate a JSON configuration file with default settings")]
    GenerateConfig(GenerateConfigArgs),

    /// Create a configuration file interactively
    #[command(about = "Run interactive guided setup for configuration")]
    GuidedSetup(GuidedSetupArgs),
}

// Arguments for the merge command
#[derive(Parser, Debug, Clone, Default)]
pub struct MergeArgs {
    // Directory to search for CSV files
    #[arg(
        short = 'i',
        long = "input-directory",
        help = "Directory to search for CSV files [default: current directory]",
        value_name = "DIR"
    )]
    pub input_directory: Option<PathBuf>,

    // Output file, or a directory to place a timestamped file in
    #[arg(
        short = 'o',
        long = "output-location",
        help = "Output file or directory [default: configured output folder]",
        value_name = "PATH"
    )]
    pub output_location: Option<PathBuf>,

    // -a alone forces archiving, -a DIR also picks the folder
    #[arg(
        short = 'a',
        long = "archive",
        num_args = 0..=1,
        value_name = "DIR",
        conflicts_with = "no_archive",
        help = "Archive merged files, optionally into DIR"
    )]
    pub archive: Option<Option<PathBuf>>,

    #[arg(short = 'A', long = "no-archive", help = "Leave merged files in place")]
    pub no_archive: bool,

    #[arg(
        short = 'r',
        long = "recursive",
        conflicts_with = "no_recursive",
        help = "Search subdirectories"
    )]
    pub recursive: bool,

    #[arg(short = 'R', long = "no-recursive", help = "Only search the top directory")]
    pub no_recursive: bool,

    // -t alone forces the configured header, -t FIELDS gives one as a CSV line
    #[arg(
        short = 't',
        long = "header",
        num_args = 0..=1,
        value_name = "FIELDS",
        conflicts_with = "no_header",
        help = "Only merge files starting with this header (one CSV line)"
    )]
    pub header: Option<Option<String>>,

    #[arg(short = 'T', long = "no-header", help = "Merge every file without checking its first row")]
    pub no_header: bool,

    // Configuration file path
    #[arg(
        short = 'c',
        long = "config",
        help = "JSON configuration file [default: ~/Documents/csvmerge/logmerge.json]",
        value_name = "FILE"
    )]
    pub config: Option<PathBuf>,
}

// Arguments for the generate-config command
#[derive(Parser, Debug, Clone)]
pub struct GenerateConfigArgs {
    // Output path for the configuration file
    #[arg(help = "Destination path for configuration file", value_name = "FILE")]
    pub output: PathBuf,

    #[arg(short = 'f', long = "force", help = "Overwrite an existing file")]
    pub force: bool,
}

// Arguments for the guided-setup command
#[derive(Parser, Debug, Clone)]
pub struct GuidedSetupArgs {
    // Output path for the generated configuration
    #[arg(
        help = "Destination path for the configuration [default: ~/Documents/csvmerge/logmerge.json]",
        value_name = "FILE"
    )]
    pub output: Option<PathBuf>,
}

impl Cli {
    // --log-level wins over the configured level; -v/-s then shift the result
    pub fn log_level(&self, config_level: Option<&str>) -> Result<LevelFilter, ConfigError> {
        let base = match self.log_level.as_deref().or(config_level) {
            Some(name) => parse_log_level(name)?,
            None => LevelFilter::Warn,
        };
        Ok(adjust_level(base, self.verbose, self.silent))
    }
}

impl MergeArgs {
    pub fn overrides(&self) -> MergeOverrides {
        MergeOverrides {
            input_directory: self.input_directory.clone(),
            output_location: self.output_location.clone(),
            archive: self.archive_override(),
            recursive: self.recursive_override(),
            header: self.header_override(),
        }
    }

    fn archive_override(&self) -> ArchiveOverride {
        match (&self.archive, self.no_archive) {
            (_, true) => ArchiveOverride::Disable,
            (Some(Some(dir)), _) => ArchiveOverride::EnableAt(dir.clone()),
            (Some(None), _) => ArchiveOverride::Enable,
            (None, false) => ArchiveOverride::Default,
        }
    }

    fn recursive_override(&self) -> Option<bool> {
        match (self.recursive, self.no_recursive) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }

    fn header_override(&self) -> HeaderOverride {
        match (&self.header, self.no_header) {
            (_, true) => HeaderOverride::Disable,
            (Some(Some(line)), _) => HeaderOverride::Given(line.clone()),
            (Some(None), _) => HeaderOverride::ForceConfigured,
            (None, false) => HeaderOverride::Default,
        }
    }
}
