// Import required dependencies
use crate::combiner::HeaderRow;
use crate::errors::{ConfigError, MergeError, MergeResult};
use crate::file_utils::FileUtils;
use crate::logging::{parse_log_level, LOG_LEVELS};
use dialoguer::{Confirm, Input, Select}; // For interactive CLI prompts
use log::{debug, info, warn};
use serde::{Deserialize, Serialize}; // For JSON serialization/deserialization
use std::path::{Path, PathBuf}; // For file path handling
use tokio::fs; // For async file operations

/// Directory under the user's home that holds the configuration and default folders
const CONFIG_DIR: [&str; 2] = ["Documents", "csvmerge"];
const CONFIG_FILE_NAME: &str = "logmerge.json";
const ARCHIVE_DIR_NAME: &str = "archive";

/// First row of the external system's CSV exports
const DEFAULT_HEADER: [&str; 10] = [
    "Record Type",
    "Material Order",
    "Job number",
    "Description",
    "",
    "",
    "",
    "Record key",
    "",
    "",
];

pub fn default_header() -> HeaderRow {
    HeaderRow::new(DEFAULT_HEADER)
}

/// `<home>/Documents/csvmerge`, if a home directory is known
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| CONFIG_DIR.iter().fold(home, |dir, part| dir.join(part)))
}

pub fn default_config_path() -> MergeResult<PathBuf> {
    default_config_dir()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .ok_or(MergeError::Config(ConfigError::HomeDirectoryUnavailable))
}

// Configuration structure that can be serialized to/from JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub header: Option<HeaderRow>, // Expected first row; null disables header checking
    pub recursive: bool,           // Scan subdirectories of the input directory
    pub archive_folder: PathBuf,   // Where merged files are moved
    pub auto_archive: bool,        // Archive without being asked on the command line
    pub output_folder: PathBuf,    // Where merged output goes when no location is given
    pub log_level: String,         // off, error, warn, info, debug or trace
}

impl Default for Config {
    fn default() -> Self {
        Self::with_base_dir(&default_config_dir().unwrap_or_else(|| PathBuf::from(".")))
    }
}

impl Config {
    // Defaults with the output and archive folders placed under `base`
    pub fn with_base_dir(base: &Path) -> Self {
        Self {
            header: Some(default_header()),
            recursive: false,
            archive_folder: base.join(ARCHIVE_DIR_NAME),
            auto_archive: true,
            output_folder: base.to_path_buf(),
            log_level: "warn".to_string(),
        }
    }

    // Create a default configuration template
    pub fn template() -> Self {
        Self::default()
    }

    // Load configuration from a JSON file
    pub async fn load(path: &Path) -> MergeResult<Self> {
        debug!("Loading configuration file at {}", path.display());
        let content = fs::read_to_string(path).await.map_err(MergeError::Io)?;
        serde_json::from_str(&content)
            .map_err(|e| MergeError::Config(ConfigError::InvalidFormat(e.to_string())))
    }

    // Save configuration to a JSON file
    pub async fn save(&self, path: &Path) -> MergeResult<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| MergeError::Config(ConfigError::SerializationError(e.to_string())))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            FileUtils::ensure_dir(parent).await?;
        }
        FileUtils::atomic_write(path, content.as_bytes()).await?;
        Ok(())
    }

    // Load the file at `path`, writing the default configuration there first if it is missing
    pub async fn load_or_create(path: &Path) -> MergeResult<Self> {
        if !fs::try_exists(path).await? {
            info!("Creating default config file at {}", path.display());
            Self::template().save(path).await?;
        }
        Self::load(path).await
    }

    // Same as load_or_create for the default location, also making the default folders
    pub async fn load_or_create_default() -> MergeResult<Self> {
        let path = default_config_path()?;
        Self::verify_default_directories(&path).await?;
        Self::load_or_create(&path).await
    }

    async fn verify_default_directories(config_path: &Path) -> MergeResult<()> {
        if let Some(documents) = dirs::home_dir().map(|home| home.join(CONFIG_DIR[0])) {
            if !documents.exists() {
                warn!(
                    "Cannot find user documents directory at {}",
                    documents.display()
                );
            }
        }
        if let Some(config_dir) = config_path.parent() {
            FileUtils::ensure_dir(config_dir).await?;
            FileUtils::ensure_dir(&config_dir.join(ARCHIVE_DIR_NAME)).await?;
        }
        Ok(())
    }

    // Check values that serde cannot check on its own.
    // The archive folder is only checked by settings::resolve, when archiving is enabled.
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_log_level(&self.log_level)?;
        Ok(())
    }

    // Interactive configuration setup using command-line prompts
    pub async fn guided_setup() -> MergeResult<Self> {
        let defaults = Self::default();

        // Confirm whether files should be filtered by their first row
        let check_header = Confirm::new()
            .with_prompt("Only merge files whose first row matches a header?")
            .default(true)
            .interact()?;

        let header = if check_header {
            let default_line = default_header().to_line()?;
            let line: String = Input::new()
                .with_prompt("Enter the expected header row (one CSV line)")
                .default(default_line)
                .interact_text()?;
            Some(HeaderRow::parse_line(&line)?)
        } else {
            None
        };

        let recursive = Confirm::new()
            .with_prompt("Scan subdirectories by default?")
            .default(defaults.recursive)
            .interact()?;

        let auto_archive = Confirm::new()
            .with_prompt("Move merged files to the archive folder by default?")
            .default(defaults.auto_archive)
            .interact()?;

        let archive_folder: String = Input::new()
            .with_prompt("Enter the archive folder")
            .default(defaults.archive_folder.display().to_string())
            .interact_text()?;

        let output_folder: String = Input::new()
            .with_prompt("Enter the folder for merged output")
            .default(defaults.output_folder.display().to_string())
            .interact_text()?;

        let level_names: Vec<String> = LOG_LEVELS
            .iter()
            .map(|l| l.as_str().to_ascii_lowercase())
            .collect();
        let level_index = Select::new()
            .with_prompt("Select the default log level")
            .items(&level_names)
            .default(2)
            .interact()?;

        let config = Self {
            header,
            recursive,
            archive_folder: PathBuf::from(archive_folder),
            auto_archive,
            output_folder: PathBuf::from(output_folder),
            log_level: level_names[level_index].clone(),
        };
        config.validate()?;
        Ok(config)
    }
}
