use crate::errors::ConfigError;
use anyhow::Result; // Importing Result type from anyhow for error handling
use chrono::Local; // Importing Local from chrono to get the current date and time
use crossterm::style::Stylize; // Importing Stylize from crossterm to style log levels
use log::{Level, LevelFilter, Metadata, Record}; // Importing logging types from the log crate
use std::{
    fs::{File, OpenOptions}, // Importing File and OpenOptions for file operations
    io::Write,               // Importing Write trait for writing to files
    path::PathBuf,           // Importing PathBuf to handle file paths
    sync::Mutex,             // Importing Mutex for thread-safe access to files
};

/// Levels from quietest to most verbose; `-v` and `-s` step through this list
pub const LOG_LEVELS: [LevelFilter; 6] = [
    LevelFilter::Off,
    LevelFilter::Error,
    LevelFilter::Warn,
    LevelFilter::Info,
    LevelFilter::Debug,
    LevelFilter::Trace,
];

/// Parse a level name, case-insensitively
pub fn parse_log_level(name: &str) -> Result<LevelFilter, ConfigError> {
    match name.trim().to_ascii_lowercase().as_str() {
        "off" | "critical" => Ok(LevelFilter::Off),
        "error" => Ok(LevelFilter::Error),
        "warn" | "warning" => Ok(LevelFilter::Warn),
        "info" => Ok(LevelFilter::Info),
        "debug" => Ok(LevelFilter::Debug),
        "trace" => Ok(LevelFilter::Trace),
        _ => Err(ConfigError::InvalidLogLevel(name.to_string())),
    }
}

/// Shift `base` by the verbose and silent counts, staying within LOG_LEVELS
pub fn adjust_level(base: LevelFilter, verbose: u8, silent: u8) -> LevelFilter {
    let start = LOG_LEVELS.iter().position(|l| *l == base).unwrap_or(2) as i64;
    let index = (start + i64::from(verbose) - i64::from(silent)).clamp(0, LOG_LEVELS.len() as i64 - 1);
    LOG_LEVELS[index as usize]
}

// Define a struct for the Logger
pub struct Logger {
    log_file: Option<Mutex<File>>, // Optional log file wrapped in a Mutex for thread-safe access
    level: LevelFilter,            // Log level filter to control which log messages are recorded
}

impl Logger {
    // Initialize the logger with an optional log file path and a log level
    pub fn init(log_path: Option<PathBuf>, level: LevelFilter) -> Result<()> {
        // Open the log file for appending if a path is provided
        let log_file = log_path
            .map(|path| OpenOptions::new().create(true).append(true).open(path))
            .transpose()?
            .map(Mutex::new);

        let logger = Logger { log_file, level };

        // Set the global logger to the newly created logger
        log::set_boxed_logger(Box::new(logger))?;
        // Set the maximum log level
        log::set_max_level(level);

        Ok(())
    }

    // Format a log record into a line, coloured for the terminal or plain for the file
    fn format_log(record: &Record, coloured: bool) -> String {
        let level = record.level().to_string();
        let level_str = if coloured {
            match record.level() {
                Level::Error => level.red().to_string(),
                Level::Warn => level.yellow().to_string(),
                Level::Info => level.green().to_string(),
                Level::Debug => level.blue().to_string(),
                Level::Trace => level.magenta().to_string(),
            }
        } else {
            level
        };

        format!(
            "[{}] {} - {}: {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            level_str,
            record.target(),
            record.args()
        )
    }
}

// Implement the Log trait for the Logger struct
impl log::Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        // stdout is left for the run summary
        eprint!("{}", Self::format_log(record, true));

        if let Some(log_file) = &self.log_file {
            if let Ok(mut file) = log_file.lock() {
                let _ = file.write_all(Self::format_log(record, false).as_bytes());
            }
        }
    }

    fn flush(&self) {
        if let Some(log_file) = &self.log_file {
            if let Ok(mut file) = log_file.lock() {
                let _ = file.flush();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level_accepts_aliases() {
        assert_eq!(parse_log_level("WARNING").unwrap(), LevelFilter::Warn);
        assert_eq!(parse_log_level("Debug").unwrap(), LevelFilter::Debug);
        assert_eq!(parse_log_level("critical").unwrap(), LevelFilter::Off);
        assert!(matches!(
            parse_log_level("loud"),
            Err(ConfigError::InvalidLogLevel(_))
        ));
    }

    #[test]
    fn test_adjust_level_steps_and_clamps() {
        assert_eq!(adjust_level(LevelFilter::Warn, 0, 0), LevelFilter::Warn);
        assert_eq!(adjust_level(LevelFilter::Warn, 1, 0), LevelFilter::Info);
        assert_eq!(adjust_level(LevelFilter::Warn, 2, 0), LevelFilter::Debug);
        assert_eq!(adjust_level(LevelFilter::Warn, 9, 0), LevelFilter::Trace);
        assert_eq!(adjust_level(LevelFilter::Warn, 0, 1), LevelFilter::Error);
        assert_eq!(adjust_level(LevelFilter::Warn, 0, 5), LevelFilter::Off);
    }

    #[test]
    fn test_file_lines_are_plain() {
        let line = Logger::format_log(
            &Record::builder()
                .level(Level::Warn)
                .target("csvlog::combiner")
                .args(format_args!("Skipping names.csv"))
                .build(),
            false,
        );
        assert!(line.contains("WARN - csvlog::combiner: Skipping names.csv"));
        assert!(line.ends_with('\n'));
    }
}
