// ============================================================================
// Settings Module - Command Line + Configuration Resolution
//
// Combines the loaded configuration with the merge subcommand's overrides into
// the MergeParams handed to the engine. All filesystem checks that must happen
// before any file is written live here, so a bad invocation fails without
// touching the output or archive locations.
// ============================================================================

use crate::combiner::HeaderRow;
use crate::config::{default_header, Config};
use crate::engine::MergeParams;
use crate::errors::{ConfigError, MergeResult};
use log::debug;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Archive behaviour requested on the command line
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ArchiveOverride {
    /// Follow the configuration's `auto_archive`
    #[default]
    Default,
    /// `-a`: archive into the configured folder
    Enable,
    /// `-a DIR`: archive into DIR
    EnableAt(PathBuf),
    /// `-A`
    Disable,
}

/// Header behaviour requested on the command line
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HeaderOverride {
    /// Follow the configuration's `header`
    #[default]
    Default,
    /// `-t`: check against the configured header, or the built-in one if none is configured
    ForceConfigured,
    /// `-t FIELDS`: one CSV line
    Given(String),
    /// `-T`
    Disable,
}

/// Command line values for one merge run, before they are combined with the configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOverrides {
    pub input_directory: Option<PathBuf>,
    pub output_location: Option<PathBuf>,
    pub archive: ArchiveOverride,
    pub recursive: Option<bool>,
    pub header: HeaderOverride,
}

/// Resolve the parameters of one run.
///
/// `stamp` names the output file and the archive subdirectory when their
/// locations are existing directories. Relative paths are taken from `cwd`.
pub fn resolve(
    overrides: &MergeOverrides,
    config: &Config,
    stamp: &str,
    cwd: &Path,
) -> MergeResult<MergeParams> {
    let search_directory = resolve_input_directory(overrides.input_directory.as_deref(), cwd)?;

    let output_location = overrides
        .output_location
        .clone()
        .unwrap_or_else(|| config.output_folder.clone());
    let output_file = resolve_output_file(&cwd.join(output_location), stamp)?;

    let archive_directory = match &overrides.archive {
        ArchiveOverride::Disable => None,
        ArchiveOverride::Default if !config.auto_archive => None,
        ArchiveOverride::Default | ArchiveOverride::Enable => {
            Some(resolve_archive_directory(&cwd.join(&config.archive_folder), stamp)?)
        }
        ArchiveOverride::EnableAt(dir) => Some(resolve_archive_directory(&cwd.join(dir), stamp)?),
    };

    let header = resolve_header(&overrides.header, config)?;
    let recursive = overrides.recursive.unwrap_or(config.recursive);

    let params = MergeParams {
        search_directory,
        output_file,
        recursive,
        header,
        archive_directory,
    };
    debug!("Resolved merge parameters: {:?}", params);
    Ok(params)
}

fn resolve_input_directory(input: Option<&Path>, cwd: &Path) -> Result<PathBuf, ConfigError> {
    let directory = match input {
        Some(dir) => cwd.join(dir),
        None => cwd.to_path_buf(),
    };
    if !directory.exists() {
        return Err(ConfigError::InputDirectoryNotFound(directory));
    }
    if !directory.is_dir() {
        return Err(ConfigError::InputNotADirectory(directory));
    }
    Ok(directory)
}

// A directory gets a timestamped file inside it; an existing file is never overwritten
fn resolve_output_file(location: &Path, stamp: &str) -> Result<PathBuf, ConfigError> {
    let output_file = if location.is_dir() {
        location.join(format!("{}.csv", stamp))
    } else {
        location.to_path_buf()
    };

    if output_file.exists() {
        return Err(ConfigError::OutputExists(output_file));
    }

    let parent = match output_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    probe_writable(&parent)?;
    Ok(output_file)
}

// Create and drop a temporary file to prove the directory accepts new files
fn probe_writable(directory: &Path) -> Result<(), ConfigError> {
    tempfile::Builder::new()
        .prefix(".csvlog-probe-")
        .tempfile_in(directory)
        .map(drop)
        .map_err(|e| {
            debug!("Write probe in {} failed: {}", directory.display(), e);
            ConfigError::OutputDirectoryNotWritable(directory.to_path_buf())
        })
}

// Existing folders get a fresh timestamped subdirectory; missing ones are used as given
fn resolve_archive_directory(folder: &Path, stamp: &str) -> Result<PathBuf, ConfigError> {
    match std::fs::metadata(folder) {
        Ok(meta) if meta.is_dir() => Ok(folder.join(stamp)),
        Ok(_) => Err(ConfigError::ArchiveIsFile(folder.to_path_buf())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(folder.to_path_buf()),
        Err(e) => {
            debug!("Cannot inspect archive folder {}: {}", folder.display(), e);
            Ok(folder.to_path_buf())
        }
    }
}

fn resolve_header(
    header: &HeaderOverride,
    config: &Config,
) -> Result<Option<HeaderRow>, ConfigError> {
    let header = match header {
        HeaderOverride::Default => config.header.clone(),
        HeaderOverride::ForceConfigured => {
            Some(config.header.clone().unwrap_or_else(default_header))
        }
        HeaderOverride::Given(line) => Some(HeaderRow::parse_line(line)?),
        HeaderOverride::Disable => None,
    };
    Ok(header.filter(|h| !h.is_empty()))
}
