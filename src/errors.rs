use std::path::PathBuf;
use thiserror::Error;
use tokio::task::JoinError;

/// Type alias for Result with MergeError as the error type
pub type MergeResult<T> = Result<T, MergeError>;

/// Errors raised by the merge engine and the layers that drive it
#[derive(Error, Debug)]
pub enum MergeError {
    /// The search directory does not exist
    #[error("Search directory not found: {0}")]
    NotFound(PathBuf),

    /// The search directory exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Directory traversal failed below the search root
    #[error("Failed to scan {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// The output file could not be created or written
    #[error("Output file {path} is unavailable: {source}")]
    OutputUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A candidate file could not be opened or read
    #[error("Input file {path} is unreadable: {source}")]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A merged file does not live under the search root
    #[error("{path} is not under the search root {root}")]
    PathNotUnderRoot { path: PathBuf, root: PathBuf },

    /// The archive destination is already occupied
    #[error("Archive destination already exists: {0}")]
    ArchiveCollision(PathBuf),

    /// Moving a file into the archive failed
    #[error("Failed to archive {from} to {to}: {source}")]
    ArchiveFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The run was stopped by a shutdown request before the next candidate
    #[error("Merge interrupted before all candidates were processed")]
    Interrupted,

    /// Standard IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error handling via anyhow
    #[error("Internal error: {0}")]
    Anyhow(#[from] anyhow::Error),

    /// Configuration related errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Command processing errors
    #[error("Processing error: {0}")]
    Processing(String),
}

/// Specific errors related to configuration and argument resolution
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Input directory not found: {0}")]
    InputDirectoryNotFound(PathBuf),

    #[error("Input location is not a directory: {0}")]
    InputNotADirectory(PathBuf),

    #[error("The file {0} already exists and will not be overwritten")]
    OutputExists(PathBuf),

    #[error("Output directory is not writable: {0}")]
    OutputDirectoryNotWritable(PathBuf),

    #[error("Archive location {0} is an existing file, not a directory")]
    ArchiveIsFile(PathBuf),

    #[error("Invalid header row: {0}")]
    InvalidHeader(String),

    #[error("Invalid log level: {0}. Expected one of off, error, warn, info, debug, trace")]
    InvalidLogLevel(String),

    #[error("Could not determine the user's home directory")]
    HomeDirectoryUnavailable,

    #[error("Invalid configuration format: {0}")]
    InvalidFormat(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<dialoguer::Error> for MergeError {
    fn from(err: dialoguer::Error) -> Self {
        MergeError::Processing(err.to_string())
    }
}

impl From<JoinError> for MergeError {
    fn from(err: JoinError) -> Self {
        MergeError::Processing(format!("Task join error: {}", err))
    }
}

impl From<serde_json::Error> for MergeError {
    fn from(err: serde_json::Error) -> Self {
        MergeError::Config(ConfigError::InvalidFormat(err.to_string()))
    }
}

impl From<ctrlc::Error> for MergeError {
    fn from(err: ctrlc::Error) -> Self {
        MergeError::Processing(format!("Ctrl+C handler error: {}", err))
    }
}
