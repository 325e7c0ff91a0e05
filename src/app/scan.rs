// KioskLog - app/scan.rs
//
// Scan pipeline: discovery -> per-archive member selection -> classification.
//
// Single-threaded and synchronous. Archives are visited in sorted traversal
// order and members in (date, name) order, so the sequencer sees lines in one
// reproducible total order.
//
// Per-archive and per-member failures are non-fatal: they are recorded as
// unprocessed inputs and the scan moves on. Only an unusable root aborts.

use crate::core::classifier::Sequencer;
use crate::core::discovery::{self, DiscoveryConfig};
use crate::core::filter::DateRange;
use crate::core::model::{
    EventRecord, LogSource, MachineArchive, SessionScope, UnprocessedInput,
};
use crate::core::parser;
use crate::core::patterns::PatternTable;
use crate::platform::archive::{ArchiveMember, LogArchive};
use crate::platform::config::AppConfig;
use crate::platform::fs;
use crate::util::error::ArchiveError;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::time::{Duration, Instant};

// =============================================================================
// Options and report
// =============================================================================

/// Everything a scan needs besides the pattern table.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Directory tree holding the machine archives.
    pub root: PathBuf,

    pub discovery: DiscoveryConfig,

    /// Directory inside each archive that holds the logs.
    pub log_dir_name: String,

    /// Compiled file-name globs; a member is selected if any matches.
    pub log_file_patterns: Vec<glob::Pattern>,

    pub date_range: DateRange,

    pub session_scope: SessionScope,
}

impl ScanOptions {
    /// Build options from the validated config, scanning `root`.
    ///
    /// Globs were validated when the config was loaded; any that still fail
    /// to compile are dropped with a warning.
    pub fn from_config(config: &AppConfig, root: PathBuf) -> Self {
        let log_file_patterns = config
            .log_file_patterns
            .iter()
            .filter_map(|p| match glob::Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    tracing::warn!(pattern = %p, error = %e, "Ignoring invalid log file glob");
                    None
                }
            })
            .collect();

        Self {
            root,
            discovery: DiscoveryConfig {
                max_depth: config.max_depth,
            },
            log_dir_name: config.log_dir_name.clone(),
            log_file_patterns,
            date_range: config.date_range,
            session_scope: config.session_scope,
        }
    }

    fn selects(&self, file_name: &str) -> bool {
        self.log_file_patterns.iter().any(|p| p.matches(file_name))
    }
}

/// Counters collected over a whole scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub archives: usize,
    pub files: usize,
    pub lines: usize,
    pub records: usize,
    pub malformed_timestamps: usize,
    /// Log files skipped because their date is outside the range.
    pub filtered_out_files: usize,
    pub duration: Duration,
}

/// Result of a completed scan.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Event records in processing order.
    pub records: Vec<EventRecord>,

    /// Archives and members that could not be read.
    pub unprocessed: Vec<UnprocessedInput>,

    /// Non-fatal discovery warnings.
    pub warnings: Vec<String>,

    pub stats: ScanStats,
}

// =============================================================================
// Pipeline
// =============================================================================

/// Run a full scan of `options.root` against `patterns`.
///
/// Fails only when the root cannot be scanned at all.
pub fn run_scan(options: &ScanOptions, patterns: &PatternTable) -> Result<ScanReport, ArchiveError> {
    let scan_start = Instant::now();

    tracing::info!(
        root = %options.root.display(),
        patterns = patterns.len(),
        scope = %options.session_scope,
        range = %options.date_range,
        "Scan started"
    );

    // -------------------------------------------------------------------------
    // Phase 1: Discovery
    // -------------------------------------------------------------------------
    let (archives, warnings) = discovery::discover_archives(&options.root, &options.discovery)?;

    let mut report = ScanReport {
        warnings,
        ..ScanReport::default()
    };

    // -------------------------------------------------------------------------
    // Phase 2: Per-archive classification
    // -------------------------------------------------------------------------
    let mut sequencer = Sequencer::new(patterns, options.session_scope);

    for machine in &archives {
        sequencer.begin_archive();
        report.stats.archives += 1;

        if let Err(e) = scan_archive(machine, options, &mut sequencer, &mut report) {
            tracing::warn!(archive = %machine.path.display(), error = %e, "Archive not processed");
            report.unprocessed.push(UnprocessedInput {
                path: machine.path.clone(),
                reason: e.to_string(),
            });
        }
    }

    report.stats.records = report.records.len();
    report.stats.duration = scan_start.elapsed();

    tracing::info!(
        archives = report.stats.archives,
        files = report.stats.files,
        lines = report.stats.lines,
        records = report.stats.records,
        malformed = report.stats.malformed_timestamps,
        filtered_out = report.stats.filtered_out_files,
        unprocessed = report.unprocessed.len(),
        duration_ms = report.stats.duration.as_millis() as u64,
        "Scan completed"
    );

    Ok(report)
}

/// Classify every selected member of one archive.
///
/// Returns an error only for archive-level failures (cannot open, no log
/// directory); unreadable members are recorded and skipped.
fn scan_archive(
    machine: &MachineArchive,
    options: &ScanOptions,
    sequencer: &mut Sequencer<'_>,
    report: &mut ScanReport,
) -> Result<(), ArchiveError> {
    let mut archive = LogArchive::open(&machine.path)?;
    let members = select_members(archive.log_members(&options.log_dir_name)?, options, report);

    tracing::debug!(
        archive = %machine.path.display(),
        library = %machine.library,
        members = members.len(),
        "Archive opened"
    );

    for (date, member) in members {
        let bytes = match archive.read_member(&member) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(member = %member.name, error = %e, "Member not processed");
                report.unprocessed.push(UnprocessedInput {
                    path: archive.path().join(&member.name),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let content = fs::decode_lossy(&bytes);
        let source = LogSource {
            library: machine.library.clone(),
            machine: machine.machine.clone(),
            date,
        };
        let outcome = sequencer.process_content(&source, &content);

        report.stats.files += 1;
        report.stats.lines += outcome.lines;
        report.stats.malformed_timestamps += outcome.malformed_timestamps;
        report.records.extend(outcome.records);
    }

    Ok(())
}

/// Keep members whose name matches a glob, carries a date, and falls in the
/// date range; order them by (date, name).
fn select_members(
    members: Vec<ArchiveMember>,
    options: &ScanOptions,
    report: &mut ScanReport,
) -> Vec<(NaiveDate, ArchiveMember)> {
    let mut selected: Vec<(NaiveDate, ArchiveMember)> = members
        .into_iter()
        .filter(|m| options.selects(&m.file_name))
        .filter_map(|m| match parser::extract_file_date(&m.file_name) {
            Some(date) => Some((date, m)),
            None => {
                tracing::debug!(member = %m.name, "No date in log file name, skipping");
                None
            }
        })
        .filter(|(date, m)| {
            let keep = options.date_range.contains(*date);
            if !keep {
                tracing::trace!(member = %m.name, %date, "Outside date range");
                report.stats.filtered_out_files += 1;
            }
            keep
        })
        .collect();

    selected.sort_by(|(da, a), (db, b)| da.cmp(db).then_with(|| a.name.cmp(&b.name)));
    selected
}
