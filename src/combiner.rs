// ============================================================================
// Combiner Module - Header Gate and Streaming Merge
//
// Owns the output file for the length of one merge run. Every candidate is
// checked against the expected header row and either contributes all of its
// body rows or none of them. Accepted files are handed downstream; rejected
// files are dropped silently apart from a log line.
//
// Output state after any prefix of candidates is exactly the header (if any)
// followed by the rows of the accepted files in processing order.
// ============================================================================

use crate::errors::{ConfigError, MergeError, MergeResult};
use crate::progress::ProgressTracker;
use crate::signal_handler::ShutdownFlag;
use csv::{ByteRecord, QuoteStyle, ReaderBuilder, Terminator, WriterBuilder};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Expected first row of a valid input file
///
/// Compared field by field, in order, against a candidate's first row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeaderRow(Vec<String>);

impl HeaderRow {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(fields.into_iter().map(Into::into).collect())
    }

    /// Parse a header given as a single CSV line, e.g. `A,B,,"D,E"`
    pub fn parse_line(line: &str) -> Result<Self, ConfigError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(line.as_bytes());
        let mut records = reader.records();

        let first = records
            .next()
            .ok_or_else(|| ConfigError::InvalidHeader("header is empty".to_string()))?
            .map_err(|e| ConfigError::InvalidHeader(e.to_string()))?;
        if records.next().is_some() {
            return Err(ConfigError::InvalidHeader(
                "header must be a single CSV line".to_string(),
            ));
        }
        Ok(Self(first.iter().map(str::to_string).collect()))
    }

    /// Render as a single CSV line without the terminator
    pub fn to_line(&self) -> Result<String, ConfigError> {
        let mut writer = csv_writer(Vec::new());
        writer
            .write_record(&self.0)
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;
        let bytes = writer
            .into_inner()
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;
        let line = String::from_utf8(bytes)
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;
        Ok(line.trim_end_matches('\n').to_string())
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Exact ordered equality with a row read from a candidate file
    pub fn matches(&self, record: &ByteRecord) -> bool {
        record.len() == self.0.len()
            && record
                .iter()
                .zip(&self.0)
                .all(|(found, expected)| found == expected.as_bytes())
    }
}

/// Why a file contributed no rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// First row differs from the expected header
    HeaderMismatch,
    /// The file has no rows at all, so there is no header to check
    Empty,
}

/// Outcome of the per-file header decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileVerdict {
    Accepted { rows: usize },
    Rejected(RejectReason),
}

impl FileVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, FileVerdict::Accepted { .. })
    }
}

/// Failure inside [`evaluate_file`], split by which side of the copy failed
#[derive(Debug)]
pub enum EvaluateError {
    Read(io::Error),
    Write(io::Error),
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Reader for one candidate file in the merge dialect
pub fn csv_reader<R: Read>(input: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input)
}

/// Writer for the consolidated output in the merge dialect
pub fn csv_writer<W: Write>(output: W) -> csv::Writer<W> {
    WriterBuilder::new()
        .flexible(true)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(output)
}

// The csv reader skips empty lines without reporting them. Blank rows are
// recovered from the raw bytes between the end of one record and the start
// of the next.
struct BlankLines<'a> {
    bytes: &'a [u8],
    // End of the previous record's content, before its terminator
    cursor: usize,
    seen_record: bool,
}

impl<'a> BlankLines<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        // The reader drops a leading BOM, so it is not part of any line
        let cursor = if bytes.starts_with(UTF8_BOM) {
            UTF8_BOM.len()
        } else {
            0
        };
        Self {
            bytes,
            cursor,
            seen_record: false,
        }
    }

    /// Blank lines in front of the record read from `start..end`
    fn before_record(&mut self, start: usize, end: usize) -> usize {
        let start = start.max(self.cursor).min(end);
        let content_start = start
            + self.bytes[start..end]
                .iter()
                .take_while(|b| is_line_break(**b))
                .count();
        let blanks = self.blanks_up_to(content_start);

        // Record content never ends in a bare line break, only its terminator does
        let trailing = self.bytes[content_start..end]
            .iter()
            .rev()
            .take_while(|b| is_line_break(**b))
            .count();
        self.cursor = end - trailing;
        self.seen_record = true;
        blanks
    }

    /// Blank lines after the last record
    fn trailing(&mut self) -> usize {
        self.blanks_up_to(self.bytes.len())
    }

    fn blanks_up_to(&self, until: usize) -> usize {
        let breaks = count_line_breaks(&self.bytes[self.cursor.min(until)..until]);
        // The first break after a record is its own terminator
        if self.seen_record {
            breaks.saturating_sub(1)
        } else {
            breaks
        }
    }
}

fn is_line_break(byte: u8) -> bool {
    byte == b'\n' || byte == b'\r'
}

// `\r\n`, `\r` and `\n` each end one line
fn count_line_breaks(run: &[u8]) -> usize {
    let mut count = 0;
    let mut i = 0;
    while i < run.len() {
        if run[i] == b'\r' && run.get(i + 1) == Some(&b'\n') {
            i += 2;
        } else {
            i += 1;
        }
        count += 1;
    }
    count
}

/// Decide whether one file belongs in the output and copy its rows if so.
///
/// Without a header every row is copied, blank lines included. With a header,
/// the first row must equal it exactly; on a match the remaining rows are
/// copied, otherwise nothing is written. The whole file is read before
/// anything reaches `output`, so a read failure leaves it untouched.
pub fn evaluate_file<R: Read, W: Write>(
    mut input: R,
    output: &mut W,
    header: Option<&HeaderRow>,
) -> Result<FileVerdict, EvaluateError> {
    let mut bytes = Vec::new();
    input
        .read_to_end(&mut bytes)
        .map_err(EvaluateError::Read)?;

    let mut reader = csv_reader(bytes.as_slice());
    let mut staged = csv_writer(Vec::new());
    let mut blank_lines = BlankLines::new(&bytes);
    let mut record = ByteRecord::new();
    let mut expecting_header = header.is_some();
    let mut rows = 0;

    loop {
        let start = reader.position().byte() as usize;
        let more = reader
            .read_byte_record(&mut record)
            .map_err(|e| EvaluateError::Read(e.into()))?;
        if !more {
            break;
        }
        let blanks = blank_lines.before_record(start, reader.position().byte() as usize);

        if expecting_header {
            expecting_header = false;
            let matched = blanks == 0 && header.is_some_and(|h| h.matches(&record));
            if !matched {
                return Ok(FileVerdict::Rejected(RejectReason::HeaderMismatch));
            }
            continue;
        }

        write_blank_lines(&mut staged, blanks)?;
        staged
            .write_byte_record(&record)
            .map_err(|e| EvaluateError::Write(e.into()))?;
        rows += blanks + 1;
    }

    let trailing = blank_lines.trailing();
    if expecting_header {
        // No record at all: either nothing, or only blank lines where the header belongs
        let reason = if trailing == 0 {
            RejectReason::Empty
        } else {
            RejectReason::HeaderMismatch
        };
        return Ok(FileVerdict::Rejected(reason));
    }
    write_blank_lines(&mut staged, trailing)?;
    rows += trailing;

    let staged = staged
        .into_inner()
        .map_err(|e| EvaluateError::Write(e.into_error()))?;
    output.write_all(&staged).map_err(EvaluateError::Write)?;
    Ok(FileVerdict::Accepted { rows })
}

// An empty record would be written as `""`, so blank rows bypass the csv writer
fn write_blank_lines(staged: &mut csv::Writer<Vec<u8>>, count: usize) -> Result<(), EvaluateError> {
    if count == 0 {
        return Ok(());
    }
    staged
        .flush()
        .map_err(EvaluateError::Write)?;
    let mut buffer = std::mem::replace(staged, csv_writer(Vec::new()))
        .into_inner()
        .map_err(|e| EvaluateError::Write(e.into_error()))?;
    buffer.extend(std::iter::repeat(b'\n').take(count));
    *staged = csv_writer(buffer);
    Ok(())
}

/// Exclusive owner of the output file for one merge run
pub struct LogCombiner {
    output_path: PathBuf,
    header: Option<HeaderRow>,
    output: Option<File>,
    // Output length after the header and the last accepted file
    committed: u64,
    rejected: Vec<PathBuf>,
    shutdown: Option<ShutdownFlag>,
    tracker: ProgressTracker,
}

impl LogCombiner {
    /// Create or truncate the output file and write the header row, if any.
    ///
    /// An empty header is treated the same as no header.
    pub fn create(output_path: &Path, header: Option<HeaderRow>) -> MergeResult<Self> {
        let header = header.filter(|h| !h.is_empty());
        let unavailable = |source: io::Error| MergeError::OutputUnavailable {
            path: output_path.to_path_buf(),
            source,
        };

        let mut output = File::create(output_path).map_err(unavailable)?;
        let mut committed = 0;
        if let Some(header) = &header {
            let mut writer = csv_writer(Vec::new());
            writer
                .write_record(header.fields())
                .map_err(|e| unavailable(e.into()))?;
            let line = writer
                .into_inner()
                .map_err(|e| unavailable(e.into_error()))?;
            output.write_all(&line).map_err(unavailable)?;
            committed = line.len() as u64;
        }

        info!(
            "Writing merged output to {} ({})",
            output_path.display(),
            if header.is_some() {
                "header checking enabled"
            } else {
                "no header checking"
            }
        );

        Ok(Self {
            output_path: output_path.to_path_buf(),
            header,
            output: Some(output),
            committed,
            rejected: Vec::new(),
            shutdown: None,
            tracker: ProgressTracker::hidden(),
        })
    }

    pub fn with_shutdown(mut self, shutdown: ShutdownFlag) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn with_tracker(mut self, tracker: ProgressTracker) -> Self {
        self.tracker = tracker;
        self
    }

    /// Merge one candidate file into the output.
    ///
    /// A file either lands in the output whole or not at all. If writing it
    /// fails, the output is cut back to the last accepted file.
    pub fn merge_file(&mut self, path: &Path) -> MergeResult<FileVerdict> {
        let output = self.output.as_mut().ok_or_else(|| {
            MergeError::Processing(format!(
                "output {} is already closed",
                self.output_path.display()
            ))
        })?;
        self.tracker.start_file(path);

        let file = File::open(path).map_err(|source| MergeError::InputUnreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let verdict = match evaluate_file(file, output, self.header.as_ref()) {
            Ok(verdict) => verdict,
            Err(EvaluateError::Read(source)) => {
                return Err(MergeError::InputUnreadable {
                    path: path.to_path_buf(),
                    source,
                })
            }
            Err(EvaluateError::Write(source)) => {
                truncate_to(output, self.committed, &self.output_path);
                return Err(MergeError::OutputUnavailable {
                    path: self.output_path.clone(),
                    source,
                });
            }
        };

        match verdict {
            FileVerdict::Accepted { rows } => {
                self.committed =
                    output
                        .stream_position()
                        .map_err(|source| MergeError::OutputUnavailable {
                            path: self.output_path.clone(),
                            source,
                        })?;
                debug!("Merged {} rows from {}", rows, path.display());
                self.tracker.file_merged(rows);
            }
            FileVerdict::Rejected(reason) => {
                match reason {
                    RejectReason::HeaderMismatch => {
                        warn!("Skipping {}: header does not match", path.display())
                    }
                    RejectReason::Empty => warn!("Skipping {}: file is empty", path.display()),
                }
                self.rejected.push(path.to_path_buf());
                self.tracker.file_rejected();
            }
        }
        Ok(verdict)
    }

    /// Sync and close the output file. Later merges fail.
    pub fn close(&mut self) -> MergeResult<()> {
        let Some(output) = self.output.take() else {
            return Ok(());
        };
        output
            .sync_all()
            .map_err(|source| MergeError::OutputUnavailable {
                path: self.output_path.clone(),
                source,
            })?;
        debug!("Closed {}", self.output_path.display());
        Ok(())
    }

    /// Drive `candidates` through the header gate, yielding the merged subset.
    ///
    /// The first error ends the sequence. The output is closed once the
    /// candidates run out.
    pub fn merge<I>(self, candidates: I) -> MergedFiles<I::IntoIter>
    where
        I: IntoIterator<Item = MergeResult<PathBuf>>,
    {
        MergedFiles {
            combiner: self,
            candidates: candidates.into_iter(),
            done: false,
        }
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.as_ref().is_some_and(ShutdownFlag::is_requested)
    }
}

// Drop a partially written file so the output ends after the last accepted one
fn truncate_to(output: &mut File, length: u64, path: &Path) {
    let result = output
        .set_len(length)
        .and_then(|()| output.seek(SeekFrom::Start(length)).map(drop));
    if let Err(e) = result {
        warn!("Failed to truncate {} after a write error: {}", path.display(), e);
    }
}

/// Lazy sequence of the candidates that were merged into the output
pub struct MergedFiles<I> {
    combiner: LogCombiner,
    candidates: I,
    done: bool,
}

impl<I> MergedFiles<I> {
    /// Candidates turned away so far, in processing order
    pub fn rejected(&self) -> &[PathBuf] {
        &self.combiner.rejected
    }

    pub fn into_tracker(self) -> ProgressTracker {
        self.combiner.tracker
    }
}

impl<I> Iterator for MergedFiles<I>
where
    I: Iterator<Item = MergeResult<PathBuf>>,
{
    type Item = MergeResult<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let path = match self.candidates.next() {
                Some(Ok(path)) => path,
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    return self.combiner.close().err().map(Err);
                }
            };

            // Never stop partway through a file
            if self.combiner.shutdown_requested() {
                self.done = true;
                return Some(Err(MergeError::Interrupted));
            }

            match self.combiner.merge_file(&path) {
                Ok(verdict) if verdict.is_accepted() => return Some(Ok(path)),
                Ok(_) => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn header() -> HeaderRow {
        HeaderRow::new(["ALPHA", "BRAVO", "CHARLIE", "DELTA", "ECHO"])
    }

    const NAMES: &str = "Alice,Betty,Christine,Diana,Erica\n\
                         Adam,Bob,Christopher,Daniel,Eugene\n\
                         Adams,Bowers,Cooper,Davies,Erickson\n";
    const PLACES: &str = "Alabama,Alaska,Arizona,Arkansas,California\n\
                          Atlanta,Boston,Chicago,Davenport,Evanston\n";
    const GOOD_HEADER: &str = "ALPHA,BRAVO,CHARLIE,DELTA,ECHO\n";
    const BAD_HEADER: &str = "ALPHA,BETA,GAMMA,DELTA,EPSILON\n";

    // Run evaluate_file over in-memory inputs and return verdicts plus output text
    fn run(inputs: &[String], header: Option<&HeaderRow>) -> (Vec<FileVerdict>, String) {
        let mut output = Vec::new();
        let verdicts = inputs
            .iter()
            .map(|text| evaluate_file(Cursor::new(text.as_bytes()), &mut output, header).unwrap())
            .collect();
        (verdicts, String::from_utf8(output).unwrap())
    }

    // Yields its data, then fails like a disk that went away mid-read
    struct FailingReader {
        data: Cursor<Vec<u8>>,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.data.read(buf)? {
                0 => Err(io::Error::new(io::ErrorKind::Other, "disk gone")),
                n => Ok(n),
            }
        }
    }

    #[test]
    fn test_no_header_copies_every_row() {
        let (verdicts, out) = run(&[NAMES.to_string(), PLACES.to_string()], None);
        assert_eq!(
            verdicts,
            vec![
                FileVerdict::Accepted { rows: 3 },
                FileVerdict::Accepted { rows: 2 }
            ]
        );
        assert_eq!(out, format!("{}{}", NAMES, PLACES));
    }

    #[test]
    fn test_matching_headers_copy_body_rows() {
        let inputs = [
            format!("{}{}", GOOD_HEADER, NAMES),
            format!("{}{}", GOOD_HEADER, PLACES),
        ];
        let (verdicts, out) = run(&inputs, Some(&header()));
        assert!(verdicts.iter().all(FileVerdict::is_accepted));
        assert_eq!(out, format!("{}{}", NAMES, PLACES));
    }

    #[test]
    fn test_mismatched_header_contributes_nothing() {
        let inputs = [
            format!("{}{}", GOOD_HEADER, NAMES),
            format!("{}{}", BAD_HEADER, PLACES),
        ];
        let (verdicts, out) = run(&inputs, Some(&header()));
        assert_eq!(
            verdicts,
            vec![
                FileVerdict::Accepted { rows: 3 },
                FileVerdict::Rejected(RejectReason::HeaderMismatch)
            ]
        );
        assert_eq!(out, NAMES);
    }

    #[test]
    fn test_all_headers_wrong_writes_nothing() {
        let inputs = [
            format!("{}{}", BAD_HEADER, NAMES),
            format!("{}{}", BAD_HEADER, PLACES),
        ];
        let (verdicts, out) = run(&inputs, Some(&header()));
        assert!(verdicts.iter().all(|v| !v.is_accepted()));
        assert!(out.is_empty());
    }

    #[test]
    fn test_header_prefix_is_not_a_match() {
        let inputs = ["ALPHA,BRAVO,CHARLIE,DELTA\n1,2,3,4\n".to_string()];
        let (verdicts, out) = run(&inputs, Some(&header()));
        assert_eq!(
            verdicts,
            vec![FileVerdict::Rejected(RejectReason::HeaderMismatch)]
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_empty_file_under_header_is_rejected() {
        let (verdicts, out) = run(&[String::new()], Some(&header()));
        assert_eq!(verdicts, vec![FileVerdict::Rejected(RejectReason::Empty)]);
        assert!(out.is_empty());

        // Without a header there is nothing to check
        let (verdicts, _) = run(&[String::new()], None);
        assert_eq!(verdicts, vec![FileVerdict::Accepted { rows: 0 }]);
    }

    #[test]
    fn test_read_failure_writes_nothing() {
        let mut output = b"kept\n".to_vec();
        let input = FailingReader {
            data: Cursor::new(b"A,B\n1,2\n3,4\n".to_vec()),
        };

        let result = evaluate_file(input, &mut output, Some(&HeaderRow::new(["A", "B"])));
        assert!(matches!(result, Err(EvaluateError::Read(_))));
        assert_eq!(output, b"kept\n");
    }

    #[test]
    fn test_blank_lines_are_kept_without_header() {
        let (verdicts, out) = run(&["p,q\n\nr,s\n".to_string()], None);
        assert_eq!(verdicts, vec![FileVerdict::Accepted { rows: 3 }]);
        assert_eq!(out, "p,q\n\nr,s\n");

        let (verdicts, out) = run(&["\n\np,q\n\n".to_string()], None);
        assert_eq!(verdicts, vec![FileVerdict::Accepted { rows: 4 }]);
        assert_eq!(out, "\n\np,q\n\n");

        let (verdicts, out) = run(&["\n\n".to_string()], None);
        assert_eq!(verdicts, vec![FileVerdict::Accepted { rows: 2 }]);
        assert_eq!(out, "\n\n");
    }

    #[test]
    fn test_crlf_line_ends_count_once() {
        let (verdicts, out) = run(&["p,q\r\nr,s\r\n\r\nt,u\r\n".to_string()], None);
        assert_eq!(verdicts, vec![FileVerdict::Accepted { rows: 4 }]);
        assert_eq!(out, "p,q\nr,s\n\nt,u\n");

        let inputs = ["A,B\r\n1,2\r\n".to_string()];
        let (verdicts, out) = run(&inputs, Some(&HeaderRow::new(["A", "B"])));
        assert_eq!(verdicts, vec![FileVerdict::Accepted { rows: 1 }]);
        assert_eq!(out, "1,2\n");
    }

    #[test]
    fn test_blank_first_line_does_not_match_header() {
        let ab = HeaderRow::new(["A", "B"]);
        let (verdicts, out) = run(&["\nA,B\n1,2\n".to_string()], Some(&ab));
        assert_eq!(
            verdicts,
            vec![FileVerdict::Rejected(RejectReason::HeaderMismatch)]
        );
        assert!(out.is_empty());

        let (verdicts, _) = run(&["\n\n".to_string()], Some(&ab));
        assert_eq!(
            verdicts,
            vec![FileVerdict::Rejected(RejectReason::HeaderMismatch)]
        );

        // Blank lines in the body are rows like any other
        let (verdicts, out) = run(&["A,B\n1,2\n\n3,4\n".to_string()], Some(&ab));
        assert_eq!(verdicts, vec![FileVerdict::Accepted { rows: 3 }]);
        assert_eq!(out, "1,2\n\n3,4\n");
    }

    #[test]
    fn test_leading_bom_is_dropped() {
        let ab = HeaderRow::new(["A", "B"]);
        let (verdicts, out) = run(&["\u{feff}A,B\n1,2\n".to_string()], Some(&ab));
        assert_eq!(verdicts, vec![FileVerdict::Accepted { rows: 1 }]);
        assert_eq!(out, "1,2\n");

        let (_, out) = run(&["\u{feff}p,q\n".to_string()], None);
        assert_eq!(out, "p,q\n");

        let (_, out) = run(&["\u{feff}\np,q\n".to_string()], None);
        assert_eq!(out, "\np,q\n");
    }

    #[test]
    fn test_fields_survive_quoting_round_trip() {
        let input = "plain,\"with, comma\",\"say \"\"hi\"\"\",\"two\nlines\",\n \x20padded ,,\n";
        let (_, out) = run(&[input.to_string()], None);

        let mut reader = csv_reader(out.as_bytes());
        let rows: Vec<Vec<String>> = reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect();
        assert_eq!(
            rows,
            vec![
                vec!["plain", "with, comma", "say \"hi\"", "two\nlines", ""],
                vec!["  padded ", "", ""],
            ]
        );
    }

    #[test]
    fn test_parse_header_line() {
        let parsed = HeaderRow::parse_line("Record Type,,\"a,b\"").unwrap();
        assert_eq!(parsed.fields(), ["Record Type", "", "a,b"]);
        assert_eq!(parsed.to_line().unwrap(), "Record Type,,\"a,b\"");
        assert!(HeaderRow::parse_line("").is_err());
        assert!(HeaderRow::parse_line("a,b\nc,d").is_err());
    }

    #[test]
    fn test_combiner_writes_header_then_accepted_rows() {
        let dir = tempdir().unwrap();
        let names = dir.path().join("names.csv");
        let animals = dir.path().join("animals.csv");
        fs::write(&names, format!("{}{}", GOOD_HEADER, NAMES)).unwrap();
        fs::write(&animals, format!("{}p,q\n", BAD_HEADER)).unwrap();
        let output = dir.path().join("out.csv");

        let combiner = LogCombiner::create(&output, Some(header())).unwrap();
        let mut merged = combiner.merge(vec![Ok(names.clone()), Ok(animals.clone())]);
        let paths: Vec<PathBuf> = merged.by_ref().collect::<MergeResult<_>>().unwrap();

        assert_eq!(paths, vec![names]);
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            format!("{}{}", GOOD_HEADER, NAMES)
        );
        let metrics = merged.into_tracker();
        assert_eq!(metrics.metrics().files_merged(), 1);
        assert_eq!(metrics.metrics().files_rejected(), 1);
        assert_eq!(metrics.metrics().rows_written(), 3);
    }

    #[test]
    fn test_empty_header_is_not_written() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("a.csv");
        fs::write(&input, "x,y\n").unwrap();
        let output = dir.path().join("out.csv");

        let combiner = LogCombiner::create(&output, Some(HeaderRow::new(Vec::<String>::new()))).unwrap();
        let merged: Vec<PathBuf> = combiner
            .merge(vec![Ok(input)])
            .collect::<MergeResult<_>>()
            .unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(fs::read_to_string(&output).unwrap(), "x,y\n");
    }

    #[test]
    fn test_output_in_missing_directory_is_unavailable() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("missing").join("out.csv");
        assert!(matches!(
            LogCombiner::create(&output, None),
            Err(MergeError::OutputUnavailable { path, .. }) if path == output
        ));
    }

    #[test]
    fn test_unreadable_input_fails_run_and_keeps_prefix() {
        let dir = tempdir().unwrap();
        let names = dir.path().join("names.csv");
        fs::write(&names, NAMES).unwrap();
        let missing = dir.path().join("gone.csv");
        let after = dir.path().join("after.csv");
        fs::write(&after, PLACES).unwrap();
        let output = dir.path().join("out.csv");

        let combiner = LogCombiner::create(&output, None).unwrap();
        let results: Vec<MergeResult<PathBuf>> = combiner
            .merge(vec![Ok(names.clone()), Ok(missing.clone()), Ok(after)])
            .collect();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap(), &names);
        assert!(matches!(
            &results[1],
            Err(MergeError::InputUnreadable { path, .. }) if path == &missing
        ));
        assert_eq!(fs::read_to_string(&output).unwrap(), NAMES);
    }

    #[test]
    fn test_shutdown_stops_before_next_file() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("first.csv");
        let second = dir.path().join("second.csv");
        fs::write(&first, "1,2\n").unwrap();
        fs::write(&second, "3,4\n").unwrap();
        let output = dir.path().join("out.csv");

        let shutdown = ShutdownFlag::new();
        let mut merged = LogCombiner::create(&output, None)
            .unwrap()
            .with_shutdown(shutdown.clone())
            .merge(vec![Ok(first.clone()), Ok(second)]);

        assert_eq!(merged.next().unwrap().unwrap(), first);
        shutdown.request();
        assert!(matches!(merged.next(), Some(Err(MergeError::Interrupted))));
        assert!(merged.next().is_none());
        assert_eq!(fs::read_to_string(&output).unwrap(), "1,2\n");
    }

    #[test]
    fn test_closed_combiner_refuses_more_files() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("a.csv");
        fs::write(&input, "1\n").unwrap();
        let mut combiner = LogCombiner::create(&dir.path().join("out.csv"), None).unwrap();
        combiner.close().unwrap();
        assert!(matches!(
            combiner.merge_file(&input),
            Err(MergeError::Processing(_))
        ));
    }
}
