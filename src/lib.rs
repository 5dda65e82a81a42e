// Declare the errors module, which contains custom error types
pub mod errors;

// Declare the file_utils module, which provides file identity and move helpers
pub mod file_utils;

// Declare the scanner module, which discovers candidate CSV files
pub mod scanner;

// Declare the combiner module, which gates files on their header and writes the merged output
pub mod combiner;

// Declare the archiver module, which moves merged files under the archive root
pub mod archiver;

// Declare the engine module, which runs one scan, combine and archive pass
pub mod engine;

// Declare the progress module, which tracks and displays progress information
pub mod progress;

// Declare the signal_handler module, which turns Ctrl+C into a shutdown request
pub mod signal_handler;

// Declare the config module, which handles configuration management
pub mod config;

// Declare the settings module, which combines configuration and command line overrides
pub mod settings;

// Declare the logging module, which handles logging of messages and errors
pub mod logging;

// Declare the cli module, which defines the command line
pub mod cli;

// Declare the commands module, which runs each subcommand
pub mod commands;
