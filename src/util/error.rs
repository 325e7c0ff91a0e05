// KioskLog - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// No string-based error propagation; every error keeps its cause available
// through `source()` for diagnostic logging.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all KioskLog operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum KioskLogError {
    /// Pattern table editing, loading, or saving failed.
    Pattern(PatternError),

    /// Archive discovery or reading failed.
    Archive(ArchiveError),

    /// A log line could not be classified.
    Classify(ClassifyError),

    /// Report export failed.
    Export(ExportError),

    /// Configuration loading or validation failed.
    Config(ConfigError),

    /// I/O error with path context.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },
}

impl fmt::Display for KioskLogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern(e) => write!(f, "Pattern error: {e}"),
            Self::Archive(e) => write!(f, "Archive error: {e}"),
            Self::Classify(e) => write!(f, "Classification error: {e}"),
            Self::Export(e) => write!(f, "Export error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for KioskLogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Pattern(e) => Some(e),
            Self::Archive(e) => Some(e),
            Self::Classify(e) => Some(e),
            Self::Export(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Io { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Pattern errors
// ---------------------------------------------------------------------------

/// Errors related to the pattern table and its persisted form.
#[derive(Debug)]
pub enum PatternError {
    /// `add` was called with a key that is already present.
    DuplicateKey { key: String },

    /// `remove` was called with a key that is not present.
    UnknownKey { key: String },

    /// Keys must contain at least one non-whitespace character.
    EmptyKey,

    /// The pattern is not a valid regular expression.
    InvalidRegex {
        key: String,
        pattern: String,
        source: regex::Error,
    },

    /// The pattern exceeds the maximum allowed length.
    RegexTooLong {
        key: String,
        length: usize,
        max_length: usize,
    },

    /// The table already holds the maximum number of entries.
    TooManyPatterns { max: usize },

    /// The persisted pattern file could not be parsed.
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The persisted pattern file exceeds the maximum allowed size.
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    /// I/O error reading or writing the pattern file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateKey { key } => {
                write!(f, "Pattern key '{key}' already exists")
            }
            Self::UnknownKey { key } => write!(f, "Pattern key '{key}' does not exist"),
            Self::EmptyKey => write!(f, "Pattern key must not be empty"),
            Self::InvalidRegex {
                key,
                pattern,
                source,
            } => write!(f, "Pattern '{key}': invalid regex '{pattern}': {source}"),
            Self::RegexTooLong {
                key,
                length,
                max_length,
            } => write!(
                f,
                "Pattern '{key}': regex is {length} chars, exceeds maximum of {max_length}"
            ),
            Self::TooManyPatterns { max } => {
                write!(f, "Pattern table is full (maximum {max} entries)")
            }
            Self::Malformed { path, source } => write!(
                f,
                "Pattern file '{}' is malformed: {source}",
                path.display()
            ),
            Self::FileTooLarge {
                path,
                size,
                max_size,
            } => write!(
                f,
                "Pattern file '{}' is {size} bytes, exceeds maximum of {max_size} bytes",
                path.display()
            ),
            Self::Io { path, source } => {
                write!(f, "Pattern file I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for PatternError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidRegex { source, .. } => Some(source),
            Self::Malformed { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<PatternError> for KioskLogError {
    fn from(e: PatternError) -> Self {
        Self::Pattern(e)
    }
}

// ---------------------------------------------------------------------------
// Archive errors
// ---------------------------------------------------------------------------

/// Errors related to archive discovery and member reading.
#[derive(Debug)]
pub enum ArchiveError {
    /// The root scan path does not exist or is not accessible.
    RootNotFound { path: PathBuf },

    /// The root path is not a directory.
    NotADirectory { path: PathBuf },

    /// Walkdir traversal error (wraps individual file/dir access failures).
    Traversal {
        path: PathBuf,
        source: walkdir::Error,
    },

    /// The archive is not a readable zip file.
    Zip {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    /// The archive has no log directory.
    MissingLogDir { path: PathBuf, dir: String },

    /// An archive member exceeds the maximum readable size.
    MemberTooLarge {
        path: PathBuf,
        member: String,
        size: u64,
        max_size: u64,
    },

    /// I/O error while reading an archive or one of its members.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RootNotFound { path } => {
                write!(f, "Scan path '{}' does not exist", path.display())
            }
            Self::NotADirectory { path } => {
                write!(f, "Scan path '{}' is not a directory", path.display())
            }
            Self::Traversal { path, source } => {
                write!(f, "Error traversing '{}': {source}", path.display())
            }
            Self::Zip { path, source } => {
                write!(f, "Invalid zip file '{}': {source}", path.display())
            }
            Self::MissingLogDir { path, dir } => write!(
                f,
                "Log directory '{dir}' not found in zip file '{}'",
                path.display()
            ),
            Self::MemberTooLarge {
                path,
                member,
                size,
                max_size,
            } => write!(
                f,
                "'{}': member '{member}' is {size} bytes, exceeds maximum of {max_size} bytes",
                path.display()
            ),
            Self::Io { path, source } => {
                write!(f, "'{}': I/O error: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ArchiveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Traversal { source, .. } => Some(source),
            Self::Zip { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ArchiveError> for KioskLogError {
    fn from(e: ArchiveError) -> Self {
        Self::Archive(e)
    }
}

// ---------------------------------------------------------------------------
// Classification errors
// ---------------------------------------------------------------------------

/// Errors raised while classifying a single parsed line.
///
/// Always local to one line: the caller logs it and moves on.
#[derive(Debug)]
pub enum ClassifyError {
    /// The captured `HH:MM:SS` text is not a valid time of day.
    MalformedTimestamp {
        raw: String,
        source: chrono::ParseError,
    },
}

impl fmt::Display for ClassifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedTimestamp { raw, source } => {
                write!(f, "cannot parse time of day '{raw}': {source}")
            }
        }
    }
}

impl std::error::Error for ClassifyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::MalformedTimestamp { source, .. } => Some(source),
        }
    }
}

impl From<ClassifyError> for KioskLogError {
    fn from(e: ClassifyError) -> Self {
        Self::Classify(e)
    }
}

// ---------------------------------------------------------------------------
// Report errors
// ---------------------------------------------------------------------------

/// Errors raised while writing the event report.
#[derive(Debug)]
pub enum ExportError {
    /// The report file could not be created, written, or flushed.
    Io { path: PathBuf, source: io::Error },

    /// A CSV row could not be written.
    Csv { path: PathBuf, source: csv::Error },

    /// The JSON report could not be serialised.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Cannot write report '{}': {source}", path.display())
            }
            Self::Csv { path, source } => {
                write!(f, "Cannot write CSV row to '{}': {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "Cannot serialise JSON report to '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Csv { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
        }
    }
}

impl From<ExportError> for KioskLogError {
    fn from(e: ExportError) -> Self {
        Self::Export(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Problems found in config.toml. Loading never fails on these; they are
/// turned into warnings and the affected values fall back to defaults.
#[derive(Debug)]
pub enum ConfigError {
    /// The file is not valid TOML.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A value parsed but is not acceptable for its field.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// The file exists but could not be read.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "'{}' is not valid TOML: {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(f, "{field} = '{value}' is not accepted (expected {expected})"),
            Self::Io { path, source } => {
                write!(f, "cannot read '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            Self::ValueOutOfRange { .. } => None,
        }
    }
}

impl From<ConfigError> for KioskLogError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Convenience type alias for KioskLog results.
pub type Result<T> = std::result::Result<T, KioskLogError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_pattern_error_wraps_into_top_level() {
        let err: KioskLogError = PatternError::DuplicateKey {
            key: "C1".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Pattern error: Pattern key 'C1' already exists"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn test_malformed_timestamp_keeps_cause() {
        let source = chrono::NaiveTime::parse_from_str("25:00:00", "%H:%M:%S").unwrap_err();
        let err = ClassifyError::MalformedTimestamp {
            raw: "25:00:00".to_string(),
            source,
        };
        assert!(err.to_string().contains("25:00:00"));
        assert!(err.source().is_some());
    }
}
