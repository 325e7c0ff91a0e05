// KioskLog - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "KioskLog";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "KioskLog";

/// Current application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Classification policy
// =============================================================================

/// A boot logged more than this many seconds after the most recent session
/// boundary (language change or logout) is classified as abnormal.
pub const ABNORMAL_BOOT_THRESHOLD_SECS: i64 = 180;

/// Label for a boot with no preceding session boundary in the session.
pub const FIRST_BOOT_LABEL: &str = "First boot";

/// Label for a boot shortly after a session boundary (planned restart).
pub const NORMAL_BOOT_LABEL: &str = "Normal boot";

/// Label for a boot long after the last session boundary (crash or power loss).
pub const ABNORMAL_BOOT_LABEL: &str = "Abnormal boot";

/// Default key carrying the boot-marker role.
pub const DEFAULT_BOOT_MARKER_KEY: &str = "boot";

/// Default keys carrying the session-boundary role.
pub const DEFAULT_SESSION_BOUNDARY_KEYS: &[&str] =
    &["language change", "logout(countdown)", "logout(user)"];

// =============================================================================
// Pattern table limits
// =============================================================================

/// Maximum regex pattern length to prevent ReDoS.
pub const MAX_REGEX_PATTERN_LENGTH: usize = 4_096;

/// Maximum number of entries in the pattern table.
pub const MAX_PATTERNS: usize = 256;

/// Maximum size of the persisted pattern file in bytes.
pub const MAX_PATTERN_FILE_SIZE: u64 = 256 * 1024; // 256 KB

// =============================================================================
// Discovery limits
// =============================================================================

/// Default maximum directory recursion depth when looking for archives.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Hard upper bound on max depth (prevents runaway traversal).
pub const ABSOLUTE_MAX_DEPTH: usize = 50;

/// Directory inside each machine archive that holds the log files.
pub const DEFAULT_LOG_DIR_NAME: &str = "Log";

/// Default glob patterns selecting log files inside the log directory.
pub const DEFAULT_LOG_FILE_PATTERNS: &[&str] = &["*_local.log"];

/// File extension of per-machine archives.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Maximum uncompressed size of a single archive member that will be read.
pub const MAX_MEMBER_SIZE: u64 = 512 * 1024 * 1024; // 512 MB

// =============================================================================
// Output
// =============================================================================

/// Default report path, relative to the working directory.
pub const DEFAULT_OUTPUT_FILE: &str = "report/error_logs.csv";

/// Default directory scanned when neither CLI nor config names one.
pub const DEFAULT_LOGS_DIR: &str = "logs";

/// Report column headers, in fixed order.
pub const REPORT_COLUMNS: [&str; 5] = ["Library", "Machine", "Date", "Time", "Error Type"];

/// Default output directory for `dump`.
pub const DEFAULT_DUMP_DIR: &str = "dump";

/// Dump table columns per log kind.
pub const MAIN_DUMP_COLUMNS: [&str; 4] = ["Date", "Timestamp", "LogLevel", "Message"];
pub const LOCAL_DUMP_COLUMNS: [&str; 5] = ["Date", "Timestamp", "Sequence", "Component", "Message"];
pub const COMMAND_DUMP_COLUMNS: [&str; 5] = ["Date", "Timestamp", "Component", "Action", "Details"];

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Maximum length of a log line included in debug output.
pub const DEBUG_MAX_LINE_PREVIEW: usize = 200;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Persisted pattern table file name (stored in the platform config directory).
pub const PATTERNS_FILE_NAME: &str = "patterns.json";
