// KioskLog - app/dump.rs
//
// Dump one machine archive into per-kind tables: every parseable line of the
// main, local and command logs, unclassified.
//
// Unreadable members are recorded and skipped, as in a scan.

use crate::core::dump::{self, DumpTables, LogKind};
use crate::core::export;
use crate::core::model::UnprocessedInput;
use crate::core::parser;
use crate::platform::archive::{ArchiveMember, LogArchive};
use crate::platform::fs;
use crate::util::error::{ArchiveError, ExportError};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// Result of dumping one archive.
#[derive(Debug, Clone, Default)]
pub struct DumpReport {
    pub tables: DumpTables,
    pub files: usize,
    pub lines: usize,
    pub unprocessed: Vec<UnprocessedInput>,
}

/// Read every dated log member under `log_dir_name` and parse it by kind.
///
/// Fails when the archive cannot be opened or has no log directory.
pub fn dump_archive(path: &Path, log_dir_name: &str) -> Result<DumpReport, ArchiveError> {
    let mut archive = LogArchive::open(path)?;
    let members = select_members(archive.log_members(log_dir_name)?);
    let mut report = DumpReport::default();

    tracing::info!(archive = %path.display(), members = members.len(), "Dump started");

    for (kind, date, member) in members {
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
        let rows = dump::parse_dump_content(kind, date, &content);

        tracing::debug!(member = %member.name, %kind, rows = rows.len(), "Member dumped");
        report.files += 1;
        report.lines += content.lines().count();
        report.tables.extend(kind, rows);
    }

    tracing::info!(
        archive = %path.display(),
        files = report.files,
        rows = report.tables.total(),
        unprocessed = report.unprocessed.len(),
        "Dump completed"
    );
    Ok(report)
}

/// Keep `.log` members that carry a date, ordered by (date, name).
fn select_members(members: Vec<ArchiveMember>) -> Vec<(LogKind, NaiveDate, ArchiveMember)> {
    let mut selected: Vec<_> = members
        .into_iter()
        .filter_map(|m| {
            let date = parser::extract_file_date(&m.file_name)?;
            let kind = LogKind::from_file_name(&m.file_name)?;
            Some((kind, date, m))
        })
        .collect();
    selected.sort_by(|(_, da, a), (_, db, b)| da.cmp(db).then_with(|| a.name.cmp(&b.name)));
    selected
}

/// Write one `<table>.csv` per non-empty kind into `out_dir`.
///
/// Returns the files written with their row counts.
pub fn write_tables(
    tables: &DumpTables,
    out_dir: &Path,
) -> Result<Vec<(LogKind, PathBuf, usize)>, ExportError> {
    let mut written = Vec::new();

    for kind in LogKind::ALL {
        let rows = tables.rows(kind);
        if rows.is_empty() {
            continue;
        }
        let path = out_dir.join(format!("{}.csv", kind.table_name()));
        let io_err = |source: std::io::Error| ExportError::Io {
            path: path.clone(),
            source,
        };
        fs::ensure_parent_dir(&path).map_err(io_err)?;
        let file = std::fs::File::create(&path).map_err(io_err)?;
        let count = export::export_dump_csv(kind, rows, std::io::BufWriter::new(file), &path)?;

        tracing::info!(path = %path.display(), %kind, rows = count, "Dump table written");
        written.push((kind, path, count));
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, members: &[(&str, &str)]) {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, content) in members {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    fn sample_archive(dir: &Path) -> PathBuf {
        let path = dir.join("POR-01C-PDC7.zip");
        write_zip(
            &path,
            &[
                ("Log/2025-02-11_local.log", "08:00:00 001 [Main]second day\n"),
                (
                    "Log/2025-02-10_local.log",
                    "09:24:12 645 [Svc]服务器状态：False\nnot a log line\n",
                ),
                ("Log/2025-02-10.log", "10:20:28.389 [Info]启动MQTT重连定时器\n"),
                (
                    "Log/2025-02-10_command.log",
                    "09:23:12.395  HttpHelper Send   https://example.invalid/x\n",
                ),
                ("Log/readme.txt", "ignored"),
                ("Log/undated.log", "10:20:28.389 [Info]no date\n"),
            ],
        );
        path
    }

    #[test]
    fn test_dump_groups_rows_by_kind_in_date_order() {
        let dir = tempfile::tempdir().unwrap();
        let report = dump_archive(&sample_archive(dir.path()), "Log").unwrap();

        assert_eq!(report.files, 4);
        assert!(report.unprocessed.is_empty());

        let local = report.tables.rows(LogKind::Local);
        assert_eq!(local.len(), 2);
        assert_eq!(local[0].timestamp, "09:24:12");
        assert_eq!(local[1].date, NaiveDate::from_ymd_opt(2025, 2, 11).unwrap());
        assert_eq!(report.tables.rows(LogKind::Main).len(), 1);
        assert_eq!(report.tables.rows(LogKind::Command).len(), 1);
    }

    #[test]
    fn test_dump_without_log_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("X-1.zip");
        write_zip(&path, &[("Other/2025-02-10_local.log", "x")]);
        assert!(matches!(
            dump_archive(&path, "Log"),
            Err(ArchiveError::MissingLogDir { .. })
        ));
    }

    #[test]
    fn test_write_tables_skips_empty_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("YT-1.zip");
        write_zip(&archive, &[("Log/2025-02-10_local.log", "09:00:00 1 [X]a\n")]);
        let report = dump_archive(&archive, "Log").unwrap();

        let out = dir.path().join("out");
        let written = write_tables(&report.tables, &out).unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].0, LogKind::Local);
        assert!(out.join("Local_Logs.csv").exists());
        assert!(!out.join("Main_Logs.csv").exists());

        let content = std::fs::read_to_string(out.join("Local_Logs.csv")).unwrap();
        assert_eq!(
            content,
            "Date,Timestamp,Sequence,Component,Message\n2025-02-10,09:00:00,1,X,a\n"
        );
    }
}
