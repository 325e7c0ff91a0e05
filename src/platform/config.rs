// KioskLog - platform/config.rs
//
// Platform-specific configuration directory resolution and config.toml
// loading with startup validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::core::filter::{self, DateRange};
use crate::core::model::{ReportFormat, SessionScope};
use crate::core::patterns::RoleAssignment;
use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Resolved platform paths for KioskLog configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/kiosklog/ or %APPDATA%\KioskLog\config\)
    pub config_dir: PathBuf,

    /// Default location of config.toml.
    pub config_file: PathBuf,

    /// Default location of the persisted pattern table.
    pub patterns_file: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to the current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        let config_dir = match ProjectDirs::from("", "", constants::APP_ID) {
            Some(proj_dirs) => proj_dirs.config_dir().to_path_buf(),
            None => {
                tracing::warn!("Could not determine platform directories, using current directory");
                PathBuf::from(".")
            }
        };
        let paths = Self::in_dir(config_dir);
        tracing::debug!(
            config = %paths.config_file.display(),
            patterns = %paths.patterns_file.display(),
            "Platform paths resolved"
        );
        paths
    }

    /// Paths rooted at an explicit configuration directory.
    pub fn in_dir(config_dir: PathBuf) -> Self {
        Self {
            config_file: config_dir.join(constants::CONFIG_FILE_NAME),
            patterns_file: config_dir.join(constants::PATTERNS_FILE_NAME),
            config_dir,
        }
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw (de)serialisable shape of config.toml.
///
/// Unknown keys are silently ignored for forward compatibility.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[scan]` section.
    pub scan: ScanSection,
    /// `[filter]` section.
    pub filter: FilterSection,
    /// `[classification]` section.
    pub classification: ClassificationSection,
    /// `[patterns]` section.
    pub patterns: PatternsSection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// `[scan]` config section.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ScanSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
    /// "csv" or "json".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,
    /// Directory inside each archive holding the logs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir_name: Option<String>,
    /// Glob patterns selecting log files by name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file_patterns: Option<Vec<String>>,
    /// "machine" or "run".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
}

/// `[filter]` config section.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterSection {
    /// Earliest log date to include, `YYYY-MM-DD`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<String>,
    /// Latest log date to include, `YYYY-MM-DD`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<String>,
}

/// `[classification]` config section.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ClassificationSection {
    /// Pattern key that marks a client boot. Empty string disables it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boot_marker: Option<String>,
    /// Pattern keys that mark the end of a user session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_boundaries: Option<Vec<String>>,
}

/// `[patterns]` config section.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PatternsSection {
    /// Pattern table location (default: next to config.toml).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

/// `[logging]` config section.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

/// Validated application configuration.
///
/// Invalid values produce actionable warnings and fall back to defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    // -- Scan --
    pub logs_dir: PathBuf,
    pub output_file: PathBuf,
    pub output_format: ReportFormat,
    pub log_dir_name: String,
    pub log_file_patterns: Vec<String>,
    pub session_scope: SessionScope,
    pub max_depth: usize,

    // -- Filter --
    pub date_range: DateRange,

    // -- Classification --
    pub roles: RoleAssignment,

    // -- Patterns --
    /// Explicit pattern table path; `None` uses the platform default.
    pub patterns_file: Option<PathBuf>,

    // -- Logging --
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            logs_dir: PathBuf::from(constants::DEFAULT_LOGS_DIR),
            output_file: PathBuf::from(constants::DEFAULT_OUTPUT_FILE),
            output_format: ReportFormat::default(),
            log_dir_name: constants::DEFAULT_LOG_DIR_NAME.to_string(),
            log_file_patterns: constants::DEFAULT_LOG_FILE_PATTERNS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            session_scope: SessionScope::default(),
            max_depth: constants::DEFAULT_MAX_DEPTH,
            date_range: DateRange::default(),
            roles: RoleAssignment::default(),
            patterns_file: None,
            log_level: None,
        }
    }
}

impl AppConfig {
    /// Convert back to the on-disk shape (used by `kiosklog config`).
    pub fn to_raw(&self) -> RawConfig {
        RawConfig {
            scan: ScanSection {
                logs_dir: Some(self.logs_dir.display().to_string()),
                output_file: Some(self.output_file.display().to_string()),
                output_format: Some(self.output_format.to_string()),
                log_dir_name: Some(self.log_dir_name.clone()),
                log_file_patterns: Some(self.log_file_patterns.clone()),
                session_scope: Some(self.session_scope.to_string()),
                max_depth: Some(self.max_depth),
            },
            filter: FilterSection {
                date_from: self.date_range.from.map(|d| d.to_string()),
                date_to: self.date_range.to.map(|d| d.to_string()),
            },
            classification: ClassificationSection {
                boot_marker: Some(self.roles.boot_marker.clone().unwrap_or_default()),
                session_boundaries: Some(self.roles.session_boundaries.clone()),
            },
            patterns: PatternsSection {
                file: self.patterns_file.as_ref().map(|p| p.display().to_string()),
            },
            logging: LoggingSection {
                level: self.log_level.clone(),
            },
        }
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(&self.to_raw()).unwrap_or_default()
    }
}

/// Load and validate config.toml from `config_path`.
///
/// Returns `AppConfig` with validated values and a list of non-fatal warnings.
/// If the file does not exist, returns defaults with no warnings (first run).
/// If the file is unreadable or unparseable, returns defaults with a warning;
/// the run still proceeds.
pub fn load_config(config_path: &Path) -> (AppConfig, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
        return (AppConfig::default(), warnings);
    }

    let content = match std::fs::read_to_string(config_path) {
        Ok(c) => c,
        Err(e) => {
            let err = ConfigError::Io {
                path: config_path.to_path_buf(),
                source: e,
            };
            warnings.push(format!("{err}. Using defaults."));
            return (AppConfig::default(), warnings);
        }
    };

    let raw: RawConfig = match toml::from_str(&content) {
        Ok(r) => r,
        Err(e) => {
            let err = ConfigError::TomlParse {
                path: config_path.to_path_buf(),
                source: e,
            };
            warnings.push(format!("{err}. Using defaults."));
            return (AppConfig::default(), warnings);
        }
    };

    tracing::debug!(path = %config_path.display(), "Loaded config.toml");

    let (config, mut validation) = validate(raw);
    warnings.append(&mut validation);
    (config, warnings)
}

/// Validate each field of `raw`, accumulating all problems.
pub fn validate(raw: RawConfig) -> (AppConfig, Vec<String>) {
    let mut config = AppConfig::default();
    let mut warnings = Vec::new();
    let mut out_of_range = |field: &str, value: String, expected: String| {
        let err = ConfigError::ValueOutOfRange {
            field: field.to_string(),
            value,
            expected,
        };
        warnings.push(format!("{err}. Using default."));
    };

    // -- Scan --
    if let Some(dir) = raw.scan.logs_dir.filter(|d| !d.trim().is_empty()) {
        config.logs_dir = PathBuf::from(dir);
    }
    if let Some(file) = raw.scan.output_file.filter(|f| !f.trim().is_empty()) {
        config.output_file = PathBuf::from(file);
    }
    if let Some(format) = raw.scan.output_format {
        match format.parse() {
            Ok(f) => config.output_format = f,
            Err(_) => out_of_range("scan.output_format", format, "\"csv\" or \"json\"".into()),
        }
    }
    if let Some(name) = raw.scan.log_dir_name {
        let trimmed = name.trim_matches('/').trim();
        if trimmed.is_empty() {
            out_of_range("scan.log_dir_name", name, "a non-empty directory name".into());
        } else {
            config.log_dir_name = trimmed.to_string();
        }
    }
    if let Some(patterns) = raw.scan.log_file_patterns {
        let valid: Vec<String> = patterns
            .into_iter()
            .filter(|p| match glob::Pattern::new(p) {
                Ok(_) => true,
                Err(e) => {
                    out_of_range("scan.log_file_patterns", p.clone(), format!("a glob ({e})"));
                    false
                }
            })
            .collect();
        if !valid.is_empty() {
            config.log_file_patterns = valid;
        }
    }
    if let Some(scope) = raw.scan.session_scope {
        match scope.parse() {
            Ok(s) => config.session_scope = s,
            Err(_) => out_of_range("scan.session_scope", scope, "\"machine\" or \"run\"".into()),
        }
    }
    if let Some(depth) = raw.scan.max_depth {
        if (1..=constants::ABSOLUTE_MAX_DEPTH).contains(&depth) {
            config.max_depth = depth;
        } else {
            out_of_range(
                "scan.max_depth",
                depth.to_string(),
                format!("1-{}", constants::ABSOLUTE_MAX_DEPTH),
            );
        }
    }

    // -- Filter --
    for (field, value, slot) in [
        ("filter.date_from", raw.filter.date_from, &mut config.date_range.from),
        ("filter.date_to", raw.filter.date_to, &mut config.date_range.to),
    ] {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            match filter::parse_date(&value) {
                Ok(date) => *slot = Some(date),
                Err(_) => out_of_range(field, value, "YYYY-MM-DD".into()),
            }
        }
    }
    if config.date_range.is_empty() {
        out_of_range(
            "filter.date_from",
            config.date_range.to_string(),
            "date_from on or before date_to".into(),
        );
        config.date_range = DateRange::default();
    }

    // -- Classification --
    if let Some(boot) = raw.classification.boot_marker {
        let boot = boot.trim().to_string();
        config.roles.boot_marker = (!boot.is_empty()).then_some(boot);
    }
    if let Some(boundaries) = raw.classification.session_boundaries {
        config.roles.session_boundaries = boundaries
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
    }

    // -- Patterns --
    if let Some(file) = raw.patterns.file.filter(|f| !f.trim().is_empty()) {
        config.patterns_file = Some(PathBuf::from(file));
    }

    // -- Logging --
    if let Some(level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.to_lowercase());
        } else {
            out_of_range(
                "logging.level",
                level,
                "error, warn, info, debug, trace".into(),
            );
        }
    }

    (config, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn load_str(toml: &str) -> (AppConfig, Vec<String>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, toml).unwrap();
        load_config(&path)
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (config, warnings) = load_config(&dir.path().join("config.toml"));
        assert_eq!(config, AppConfig::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_unparseable_file_gives_defaults_with_warning() {
        let (config, warnings) = load_str("this is = = not toml");
        assert_eq!(config, AppConfig::default());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Using defaults"));
    }

    #[test]
    fn test_valid_values_are_applied() {
        let (config, warnings) = load_str(
            r#"
[scan]
logs_dir = "D:/kiosk/logs"
output_format = "JSON"
log_file_patterns = ["*_local.log", "*.log"]
session_scope = "run"
max_depth = 4

[filter]
date_from = "2025-02-01"
date_to = "2025-02-28"

[classification]
boot_marker = "startup"
session_boundaries = ["bye", " "]

[logging]
level = "DEBUG"
"#,
        );
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(config.logs_dir, PathBuf::from("D:/kiosk/logs"));
        assert_eq!(config.output_format, ReportFormat::Json);
        assert_eq!(config.log_file_patterns.len(), 2);
        assert_eq!(config.session_scope, SessionScope::Run);
        assert_eq!(config.max_depth, 4);
        assert_eq!(config.date_range.from, NaiveDate::from_ymd_opt(2025, 2, 1));
        assert_eq!(config.roles.boot_marker.as_deref(), Some("startup"));
        assert_eq!(config.roles.session_boundaries, vec!["bye".to_string()]);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_invalid_values_fall_back_with_warnings() {
        let (config, warnings) = load_str(
            r#"
[scan]
output_format = "xlsx"
session_scope = "library"
max_depth = 0
log_file_patterns = ["[unclosed"]

[filter]
date_from = "yesterday"

[logging]
level = "loud"
"#,
        );
        assert_eq!(warnings.len(), 6, "{warnings:?}");
        assert_eq!(config.output_format, ReportFormat::Csv);
        assert_eq!(config.session_scope, SessionScope::Machine);
        assert_eq!(config.max_depth, constants::DEFAULT_MAX_DEPTH);
        assert_eq!(config.log_file_patterns, vec!["*_local.log".to_string()]);
        assert!(config.date_range.is_unbounded());
        assert_eq!(config.log_level, None);
    }

    #[test]
    fn test_inverted_date_range_is_dropped() {
        let (config, warnings) = load_str(
            r#"
[filter]
date_from = "2025-03-01"
date_to = "2025-02-01"
"#,
        );
        assert_eq!(warnings.len(), 1);
        assert!(config.date_range.is_unbounded());
    }

    #[test]
    fn test_empty_boot_marker_disables_role() {
        let (config, _) = load_str("[classification]\nboot_marker = \"\"\n");
        assert_eq!(config.roles.boot_marker, None);
    }

    #[test]
    fn test_rendered_toml_reloads_identically() {
        let mut config = AppConfig::default();
        config.session_scope = SessionScope::Run;
        config.date_range.to = NaiveDate::from_ymd_opt(2025, 2, 28);
        let (reloaded, warnings) = load_str(&config.to_toml());
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_platform_paths_in_dir() {
        let paths = PlatformPaths::in_dir(PathBuf::from("/cfg"));
        assert_eq!(paths.config_file, PathBuf::from("/cfg/config.toml"));
        assert_eq!(paths.patterns_file, PathBuf::from("/cfg/patterns.json"));
    }
}
