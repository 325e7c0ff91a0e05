// KioskLog - core/export.rs
//
// CSV and JSON export of event records, the per-type summary table, and
// the per-kind dump tables.
// Core layer: writes to any Write trait object.

use crate::core::dump::{DumpRow, LogKind};
use crate::core::model::EventRecord;
use crate::util::constants::REPORT_COLUMNS;
use crate::util::error::ExportError;
use std::io::Write;
use std::path::Path;
use unicode_width::UnicodeWidthStr;

/// Export records to CSV.
///
/// Writes: Library, Machine, Date, Time, Error Type
pub fn export_csv<W: Write>(
    records: &[EventRecord],
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    let csv_err = |e: csv::Error| ExportError::Csv {
        path: export_path.to_path_buf(),
        source: e,
    };
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record(REPORT_COLUMNS).map_err(csv_err)?;

    let mut count = 0;
    for record in records {
        let date = record.date.format("%Y-%m-%d").to_string();
        let time = record.time.format("%H:%M:%S").to_string();
        csv_writer
            .write_record([
                record.library.as_str(),
                record.machine.as_str(),
                date.as_str(),
                time.as_str(),
                record.error_type.label(),
            ])
            .map_err(csv_err)?;
        count += 1;
    }

    csv_writer.flush().map_err(|e| ExportError::Io {
        path: export_path.to_path_buf(),
        source: e,
    })?;

    Ok(count)
}

/// Export records to JSON (array of objects keyed by report column).
pub fn export_json<W: Write>(
    records: &[EventRecord],
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    serde_json::to_writer_pretty(writer, records).map_err(|e| ExportError::Json {
        path: export_path.to_path_buf(),
        source: e,
    })?;
    Ok(records.len())
}

/// Export one dump table to CSV, with the columns of `kind`.
pub fn export_dump_csv<W: Write>(
    kind: LogKind,
    rows: &[DumpRow],
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    let csv_err = |e: csv::Error| ExportError::Csv {
        path: export_path.to_path_buf(),
        source: e,
    };
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record(kind.columns()).map_err(csv_err)?;
    for row in rows {
        csv_writer.write_record(row.cells()).map_err(csv_err)?;
    }

    csv_writer.flush().map_err(|e| ExportError::Io {
        path: export_path.to_path_buf(),
        source: e,
    })?;

    Ok(rows.len())
}

/// Count records per error type, in order of first appearance.
pub fn summarize(records: &[EventRecord]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for record in records {
        let label = record.error_type.label();
        match counts.iter_mut().find(|(l, _)| l == label) {
            Some((_, n)) => *n += 1,
            None => counts.push((label.to_string(), 1)),
        }
    }
    counts
}

/// Pad `text` with spaces to `width` terminal columns. Wide (CJK)
/// characters count as two columns.
pub fn pad_to_width(text: &str, width: usize) -> String {
    let pad = width.saturating_sub(text.width());
    format!("{text}{}", " ".repeat(pad))
}

/// Render the summary as a two-column text table.
pub fn write_summary<W: Write>(counts: &[(String, usize)], mut out: W) -> std::io::Result<()> {
    let width = counts
        .iter()
        .map(|(l, _)| l.width())
        .chain(std::iter::once(REPORT_COLUMNS[4].width()))
        .max()
        .unwrap_or(0);
    writeln!(out, "{}  Count", pad_to_width(REPORT_COLUMNS[4], width))?;
    for (label, n) in counts {
        writeln!(out, "{}  {n}", pad_to_width(label, width))?;
    }
    let total: usize = counts.iter().map(|(_, n)| n).sum();
    writeln!(out, "{}  {total}", pad_to_width("Total", width))
}
