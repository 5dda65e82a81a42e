// ============================================================================
// Archiver Module - Post-merge Relocation
//
// Moves merged files under the archive root, keeping each file's position
// relative to the search root. An occupied destination is never overwritten.
// ============================================================================

use crate::errors::{MergeError, MergeResult};
use crate::file_utils::FileUtils;
use log::{debug, info};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Relocates merged files from the search tree into the archive tree
#[derive(Debug, Clone)]
pub struct Archiver {
    search_root: PathBuf,
    archive_root: PathBuf,
}

impl Archiver {
    pub fn new(search_root: impl Into<PathBuf>, archive_root: impl Into<PathBuf>) -> Self {
        Self {
            search_root: search_root.into(),
            archive_root: archive_root.into(),
        }
    }

    pub fn archive_root(&self) -> &Path {
        &self.archive_root
    }

    /// Path of `file` relative to the search root
    pub fn relative_path(&self, file: &Path) -> MergeResult<PathBuf> {
        let not_under_root = || MergeError::PathNotUnderRoot {
            path: file.to_path_buf(),
            root: self.search_root.clone(),
        };

        let relative = match file.strip_prefix(&self.search_root) {
            Ok(relative) => relative.to_path_buf(),
            // Differently spelled paths: compare resolved directories, but keep
            // the file's own name so a symlinked file is archived where it sits
            Err(_) => {
                let file_name = file.file_name().ok_or_else(not_under_root)?;
                let parent = match file.parent() {
                    Some(parent) if !parent.as_os_str().is_empty() => parent,
                    _ => Path::new("."),
                };
                let root = fs::canonicalize(&self.search_root).map_err(|_| not_under_root())?;
                let parent = fs::canonicalize(parent).map_err(|_| not_under_root())?;
                parent
                    .join(file_name)
                    .strip_prefix(&root)
                    .map_err(|_| not_under_root())?
                    .to_path_buf()
            }
        };

        let escapes_root = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if relative.as_os_str().is_empty() || escapes_root {
            return Err(not_under_root());
        }
        Ok(relative)
    }

    /// Move `file` to the mirrored location under the archive root.
    ///
    /// Missing directories under the archive root are created. If the
    /// destination already exists the move is refused and the source stays.
    pub fn archive(&self, file: &Path) -> MergeResult<PathBuf> {
        let relative = self.relative_path(file)?;
        let destination = self.archive_root.join(&relative);

        if fs::symlink_metadata(&destination).is_ok() {
            return Err(MergeError::ArchiveCollision(destination));
        }

        let failed = |source: std::io::Error| MergeError::ArchiveFailed {
            from: file.to_path_buf(),
            to: destination.clone(),
            source,
        };
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(failed)?;
            debug!("Ensured archive directory {}", parent.display());
        }
        FileUtils::move_file(file, &destination).map_err(failed)?;

        info!("Archived {} to {}", file.display(), destination.display());
        Ok(destination)
    }
}

/// Archive a single merged file; see [`Archiver::archive`]
pub fn archive(search_root: &Path, archive_root: &Path, file: &Path) -> MergeResult<PathBuf> {
    Archiver::new(search_root, archive_root).archive(file)
}
