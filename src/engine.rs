// ============================================================================
// Engine Module - Scan, Combine, Archive
//
// Runs one merge: candidates are discovered with the output file excluded,
// the combiner is driven to completion so the output is closed, and only then
// are the merged files moved into the archive. Failures stop the run where
// they happen; nothing already written or moved is rolled back.
// ============================================================================

use crate::archiver::Archiver;
use crate::combiner::{HeaderRow, LogCombiner};
use crate::errors::MergeResult;
use crate::progress::{MergeMetrics, ProgressTracker};
use crate::scanner;
use crate::signal_handler::ShutdownFlag;
use log::info;
use std::path::PathBuf;

/// Fully resolved parameters for one merge run
#[derive(Debug, Clone, PartialEq)]
pub struct MergeParams {
    pub search_directory: PathBuf,
    pub output_file: PathBuf,
    pub recursive: bool,
    pub header: Option<HeaderRow>,
    /// `None` disables archiving
    pub archive_directory: Option<PathBuf>,
}

/// What a completed run did
#[derive(Debug, Clone)]
pub struct MergeReport {
    pub output_file: PathBuf,
    /// Files whose rows were written, in processing order
    pub merged: Vec<PathBuf>,
    /// Files turned away by the header check, in processing order
    pub rejected: Vec<PathBuf>,
    /// Archive destinations, in the same order as `merged`
    pub archived: Vec<PathBuf>,
    pub metrics: MergeMetrics,
}

/// Merge every matching CSV file under the search directory into one output file
pub fn merge_log_files(
    params: &MergeParams,
    shutdown: &ShutdownFlag,
    tracker: ProgressTracker,
) -> MergeResult<MergeReport> {
    info!(
        "Merging CSV files from {} into {}",
        params.search_directory.display(),
        params.output_file.display()
    );

    // Validates the search directory before the output file is touched
    let candidates = scanner::scan(
        &params.search_directory,
        Some(&params.output_file),
        params.recursive,
    )?;

    let combiner = LogCombiner::create(&params.output_file, params.header.clone())?
        .with_shutdown(shutdown.clone())
        .with_tracker(tracker);

    let mut merged_files = combiner.merge(candidates);
    let merged = merged_files.by_ref().collect::<MergeResult<Vec<_>>>();
    let rejected = merged_files.rejected().to_vec();
    let mut tracker = merged_files.into_tracker();
    let merged = match merged {
        Ok(merged) => merged,
        Err(e) => {
            tracker.abandon();
            return Err(e);
        }
    };
    info!(
        "Merged {} of {} candidate files",
        merged.len(),
        tracker.metrics().files_seen()
    );

    let mut archived = Vec::with_capacity(merged.len());
    if let Some(archive_directory) = &params.archive_directory {
        let archiver = Archiver::new(&params.search_directory, archive_directory);
        for path in &merged {
            match archiver.archive(path) {
                Ok(destination) => {
                    tracker.file_archived(&destination);
                    archived.push(destination);
                }
                Err(e) => {
                    tracker.abandon();
                    return Err(e);
                }
            }
        }
        info!(
            "Archived {} files under {}",
            archived.len(),
            archiver.archive_root().display()
        );
    }

    tracker.finish();
    Ok(MergeReport {
        output_file: params.output_file.clone(),
        merged,
        rejected,
        archived,
        metrics: tracker.metrics().clone(),
    })
}
