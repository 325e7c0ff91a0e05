// KioskLog - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no platform
// dependencies. These types are the shared vocabulary across all layers.

use crate::util::constants;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

// =============================================================================
// Parsed line (output of the line parser)
// =============================================================================

/// One log line split into its time-of-day and message parts.
///
/// `time` holds the captured `HH:MM:SS` text as written. The grammar only
/// guarantees six digits, so conversion to a real time of day happens on
/// demand via [`ParsedLine::time_of_day`] and can fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub time: String,
    pub message: String,
}

impl ParsedLine {
    /// Convert the captured time text to a validated time of day.
    pub fn time_of_day(&self) -> Result<NaiveTime, crate::util::error::ClassifyError> {
        NaiveTime::parse_from_str(&self.time, "%H:%M:%S").map_err(|source| {
            crate::util::error::ClassifyError::MalformedTimestamp {
                raw: self.time.clone(),
                source,
            }
        })
    }
}

// =============================================================================
// Log source (where a line came from)
// =============================================================================

/// Identity of one log file inside a machine archive.
///
/// The traversal layer builds one of these per file and hands every line of
/// that file to the sequencer together with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSource {
    /// Site grouping, taken from the archive name prefix.
    pub library: String,

    /// Machine identifier, the archive file stem.
    pub machine: String,

    /// Calendar date taken from the log file name.
    pub date: NaiveDate,
}

/// A per-machine zip bundle found during discovery, before it is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineArchive {
    pub path: PathBuf,
    pub library: String,
    pub machine: String,
}

// =============================================================================
// Error type (classification result)
// =============================================================================

/// Outcome of a boot-marker match, resolved against the session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BootKind {
    /// No session boundary seen yet in this session.
    First,
    /// Boot at most the threshold after the last boundary's time of day,
    /// including a clock reading earlier than the boundary.
    Normal,
    /// Boot more than the threshold after the last boundary's time of day.
    Abnormal,
}

impl BootKind {
    /// Report label.
    pub fn label(&self) -> &'static str {
        match self {
            BootKind::First => constants::FIRST_BOOT_LABEL,
            BootKind::Normal => constants::NORMAL_BOOT_LABEL,
            BootKind::Abnormal => constants::ABNORMAL_BOOT_LABEL,
        }
    }
}

/// The error type column of a report row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// A plain pattern matched; carries the pattern key verbatim.
    Pattern(String),
    /// The boot marker matched and was resolved to a boot kind.
    Boot(BootKind),
}

impl ErrorType {
    /// Report label.
    pub fn label(&self) -> &str {
        match self {
            ErrorType::Pattern(key) => key,
            ErrorType::Boot(kind) => kind.label(),
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for ErrorType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

// =============================================================================
// Event record (one report row)
// =============================================================================

/// A single classified event, ready for the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    #[serde(rename = "Library")]
    pub library: String,

    #[serde(rename = "Machine")]
    pub machine: String,

    #[serde(rename = "Date")]
    pub date: NaiveDate,

    #[serde(rename = "Time")]
    pub time: NaiveTime,

    #[serde(rename = "Error Type")]
    pub error_type: ErrorType,
}

impl EventRecord {
    /// Combined date and time of the event.
    pub fn datetime(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }
}

// =============================================================================
// Session scope
// =============================================================================

/// How long a boundary checkpoint stays visible to later boot lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionScope {
    /// Fresh session state for every machine archive.
    #[default]
    Machine,
    /// One session state for the whole traversal, carried across machines.
    Run,
}

impl SessionScope {
    pub fn label(&self) -> &'static str {
        match self {
            SessionScope::Machine => "machine",
            SessionScope::Run => "run",
        }
    }
}

impl FromStr for SessionScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "machine" => Ok(SessionScope::Machine),
            "run" => Ok(SessionScope::Run),
            other => Err(format!(
                "unknown session scope '{other}' (expected 'machine' or 'run')"
            )),
        }
    }
}

impl fmt::Display for SessionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Report format
// =============================================================================

/// Output format of the event report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Csv,
    Json,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ReportFormat::Csv),
            "json" => Ok(ReportFormat::Json),
            other => Err(format!(
                "unknown report format '{other}' (expected 'csv' or 'json')"
            )),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Csv => f.write_str("csv"),
            ReportFormat::Json => f.write_str("json"),
        }
    }
}

// =============================================================================
// Unprocessed input
// =============================================================================

/// An archive or archive member that could not be processed.
///
/// Collected during a scan and listed at the end for manual follow-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnprocessedInput {
    pub path: PathBuf,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_of_day_valid() {
        let line = ParsedLine {
            time: "09:24:12".to_string(),
            message: "x".to_string(),
        };
        assert_eq!(
            line.time_of_day().unwrap(),
            NaiveTime::from_hms_opt(9, 24, 12).unwrap()
        );
    }

    #[test]
    fn test_time_of_day_out_of_range() {
        let line = ParsedLine {
            time: "25:61:00".to_string(),
            message: "x".to_string(),
        };
        assert!(line.time_of_day().is_err());
    }

    #[test]
    fn test_error_type_labels() {
        assert_eq!(ErrorType::Pattern("B2".to_string()).label(), "B2");
        assert_eq!(ErrorType::Boot(BootKind::First).label(), "First boot");
        assert_eq!(ErrorType::Boot(BootKind::Normal).label(), "Normal boot");
        assert_eq!(ErrorType::Boot(BootKind::Abnormal).label(), "Abnormal boot");
    }

    #[test]
    fn test_session_scope_from_str() {
        assert_eq!("Machine".parse::<SessionScope>(), Ok(SessionScope::Machine));
        assert_eq!("run".parse::<SessionScope>(), Ok(SessionScope::Run));
        assert!("library".parse::<SessionScope>().is_err());
    }

    #[test]
    fn test_record_serialises_with_report_column_names() {
        let record = EventRecord {
            library: "YT".to_string(),
            machine: "YT-GFK-PAK1".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 2, 10).unwrap(),
            time: NaiveTime::from_hms_opt(10, 16, 0).unwrap(),
            error_type: ErrorType::Boot(BootKind::Normal),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains(r#""Library":"YT""#));
        assert!(json.contains(r#""Date":"2025-02-10""#));
        assert!(json.contains(r#""Time":"10:16:00""#));
        assert!(json.contains(r#""Error Type":"Normal boot""#));
    }
}
