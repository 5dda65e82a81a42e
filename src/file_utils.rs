use anyhow::Result; // Import the Result type from the anyhow crate for error handling
use log::{debug, warn};
use std::{
    fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf}, // Import Path and PathBuf for handling file paths
};

// Define a struct for file utility functions
pub struct FileUtils;

impl FileUtils {
    // Ensure a directory exists, creating it if necessary
    pub async fn ensure_dir(path: &Path) -> Result<()> {
        // Check if the directory does not exist
        if !path.exists() {
            // Create the directory and all its parent directories
            tokio::fs::create_dir_all(path).await?;
        }
        Ok(())
    }

    // Atomically write content to a file
    pub async fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
        // Create a temporary file path with a ".tmp" extension
        let temp_path = path.with_extension("tmp");
        // Write the content to the temporary file
        tokio::fs::write(&temp_path, content).await?;
        // Rename the temporary file to the target file path
        tokio::fs::rename(temp_path, path).await?;
        Ok(())
    }

    // Resolve a path to the identity of the file it names.
    //
    // Existing paths are canonicalized, which resolves symlinks, `..` and relative
    // components. A path that does not exist yet resolves through its parent so the
    // result still compares equal once the file is created.
    pub fn resolve_identity(path: &Path) -> io::Result<PathBuf> {
        match fs::canonicalize(path) {
            Ok(resolved) => Ok(resolved),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let file_name = path.file_name().ok_or(e)?;
                let parent = match path.parent() {
                    Some(parent) if !parent.as_os_str().is_empty() => parent,
                    _ => Path::new("."),
                };
                Ok(fs::canonicalize(parent)?.join(file_name))
            }
            Err(e) => Err(e),
        }
    }

    // Check whether a path refers to the already resolved identity
    pub fn is_same_file(path: &Path, identity: &Path) -> bool {
        match fs::canonicalize(path) {
            Ok(resolved) => resolved == identity,
            Err(e) => {
                debug!("Could not resolve {}: {}", path.display(), e);
                false
            }
        }
    }

    // Move a file, falling back to copy and delete when rename cannot cross devices
    pub fn move_file(from: &Path, to: &Path) -> io::Result<()> {
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(rename_err) if rename_err.kind() == ErrorKind::CrossesDevices => {
                debug!(
                    "Rename across devices failed for {}, copying instead",
                    from.display()
                );
                if let Err(copy_err) = fs::copy(from, to) {
                    // Leave no half-written archive entry behind
                    if let Err(e) = fs::remove_file(to) {
                        if e.kind() != ErrorKind::NotFound {
                            warn!("Failed to remove partial copy {}: {}", to.display(), e);
                        }
                    }
                    return Err(copy_err);
                }
                fs::remove_file(from)
            }
            Err(rename_err) => Err(rename_err),
        }
    }
}
