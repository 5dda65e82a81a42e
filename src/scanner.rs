// ============================================================================
// Scanner Module - Candidate Discovery
//
// Walks the search directory and yields every `.csv` file beneath it, either
// only the direct children or the whole tree. The designated output file is
// never yielded, whatever textual path it was given under.
// ============================================================================

use crate::errors::{MergeError, MergeResult};
use crate::file_utils::FileUtils;
use log::debug;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// File name suffix that marks a candidate (case-sensitive)
const CSV_SUFFIX: &str = ".csv";

/// Lazy, single-pass sequence of candidate paths produced by [`scan`]
///
/// Entries are visited in file-name order within each directory, so two scans
/// of an unmodified tree yield the same sequence.
pub struct CandidatePaths {
    root: PathBuf,
    exclude: Option<PathBuf>,
    walker: walkdir::IntoIter,
}

/// Start scanning `directory` for candidate files.
///
/// `exclude` names a file that must never be yielded; it is compared by file
/// identity, so symlinks and relative spellings of the same file are excluded
/// too. The file does not need to exist yet.
pub fn scan(directory: &Path, exclude: Option<&Path>, recursive: bool) -> MergeResult<CandidatePaths> {
    match fs::metadata(directory) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Err(MergeError::NotADirectory(directory.to_path_buf())),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(MergeError::NotFound(directory.to_path_buf()))
        }
        Err(e) => return Err(MergeError::Io(e)),
    }

    let exclude = match exclude {
        Some(path) => match FileUtils::resolve_identity(path) {
            Ok(identity) => Some(identity),
            Err(e) => {
                // An unresolvable location cannot be inside the search tree
                debug!("Not excluding {}: {}", path.display(), e);
                None
            }
        },
        None => None,
    };

    let max_depth = if recursive { usize::MAX } else { 1 };
    let walker = WalkDir::new(directory)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter();

    debug!(
        "Scanning {} ({})",
        directory.display(),
        if recursive { "recursive" } else { "flat" }
    );

    Ok(CandidatePaths {
        root: directory.to_path_buf(),
        exclude,
        walker,
    })
}

impl CandidatePaths {
    // The output file may be created after the scan starts, so identity is
    // checked per entry rather than once up front.
    fn is_excluded(&self, path: &Path) -> bool {
        self.exclude
            .as_deref()
            .is_some_and(|identity| FileUtils::is_same_file(path, identity))
    }
}

impl Iterator for CandidatePaths {
    type Item = MergeResult<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(source) => {
                    let path = source
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.root.clone());
                    return Some(Err(MergeError::Scan { path, source }));
                }
            };

            if !is_candidate(&entry) {
                continue;
            }

            let path = entry.into_path();
            if self.is_excluded(&path) {
                debug!("Skipping output file {}", path.display());
                continue;
            }
            return Some(Ok(path));
        }
    }
}

// Regular files (or symlinks to them) whose name ends in `.csv`
fn is_candidate(entry: &DirEntry) -> bool {
    let named_csv = entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.ends_with(CSV_SUFFIX));
    if !named_csv {
        return false;
    }
    let file_type = entry.file_type();
    file_type.is_file() || (file_type.is_symlink() && entry.path().is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tempfile::{tempdir, TempDir};

    // one, two, three and ignore at the top; four and five inside a directory
    // that is itself named like a candidate
    fn scan_fixture() -> TempDir {
        let dir = tempdir().unwrap();
        for name in ["one.csv", "two.csv", "three.csv", "ignore.csv", "notes.txt", "upper.CSV"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        let nested = dir.path().join("directory.csv");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("four.csv"), "").unwrap();
        fs::write(nested.join("five.csv"), "").unwrap();
        fs::write(nested.join("readme.md"), "").unwrap();
        dir
    }

    fn stems(paths: CandidatePaths) -> BTreeSet<String> {
        paths
            .map(|p| {
                p.unwrap()
                    .file_stem()
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect()
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_flat_scan_returns_top_level_csv_files_only() {
        let dir = scan_fixture();
        let found = stems(scan(dir.path(), None, false).unwrap());
        assert_eq!(found, set(&["one", "two", "three", "ignore"]));
    }

    #[test]
    fn test_recursive_scan_descends_into_subdirectories() {
        let dir = scan_fixture();
        let found = stems(scan(dir.path(), None, true).unwrap());
        assert_eq!(found, set(&["one", "two", "three", "four", "five", "ignore"]));
    }

    #[test]
    fn test_excluded_file_is_never_returned() {
        let dir = scan_fixture();
        let ignore = dir.path().join("ignore.csv");

        let flat = stems(scan(dir.path(), Some(&ignore), false).unwrap());
        assert_eq!(flat, set(&["one", "two", "three"]));

        let deep = stems(scan(dir.path(), Some(&ignore), true).unwrap());
        assert_eq!(deep, set(&["one", "two", "three", "four", "five"]));
    }

    #[test]
    fn test_exclusion_matches_other_spellings_of_the_same_file() {
        let dir = scan_fixture();
        let dotted = dir.path().join("directory.csv").join("..").join("ignore.csv");
        let found = stems(scan(dir.path(), Some(&dotted), false).unwrap());
        assert!(!found.contains("ignore"));
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn test_output_created_after_scan_start_is_still_excluded() {
        let dir = scan_fixture();
        let output = dir.path().join("output.csv");
        let candidates = scan(dir.path(), Some(&output), false).unwrap();

        fs::write(&output, "late\n").unwrap();
        let found = stems(candidates);
        assert!(!found.contains("output"));
    }

    #[test]
    fn test_repeated_scans_yield_the_same_paths() {
        let dir = scan_fixture();
        let first: Vec<PathBuf> = scan(dir.path(), None, true)
            .unwrap()
            .collect::<MergeResult<_>>()
            .unwrap();
        let second: Vec<PathBuf> = scan(dir.path(), None, true)
            .unwrap()
            .collect::<MergeResult<_>>()
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_directory_is_not_found() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nowhere");
        assert!(matches!(
            scan(&missing, None, false),
            Err(MergeError::NotFound(path)) if path == missing
        ));
    }

    #[test]
    fn test_file_as_directory_is_rejected() {
        let dir = scan_fixture();
        let file = dir.path().join("one.csv");
        assert!(matches!(
            scan(&file, None, false),
            Err(MergeError::NotADirectory(_))
        ));
    }
}
