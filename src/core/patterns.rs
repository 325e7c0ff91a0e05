// KioskLog - core/patterns.rs
//
// The user-editable pattern table: ordered, role-tagged, compiled entries.
// Core layer: accepts JSON strings and returns JSON strings, never touches
// the filesystem. I/O is handled by app::pattern_mgr which feeds content here.

use crate::util::constants;
use crate::util::error::PatternError;
use regex::Regex;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;

// =============================================================================
// Roles
// =============================================================================

/// What a matching entry means to the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PatternRole {
    /// Reported verbatim under its key.
    #[default]
    Plain,
    /// Language change or logout: records a checkpoint, never reported.
    SessionBoundary,
    /// Client start: reported as first/normal/abnormal boot.
    BootMarker,
}

impl PatternRole {
    pub fn label(&self) -> &'static str {
        match self {
            PatternRole::Plain => "plain",
            PatternRole::SessionBoundary => "session boundary",
            PatternRole::BootMarker => "boot marker",
        }
    }
}

/// Which keys carry the special roles.
///
/// The persisted table is a flat key -> pattern mapping, so roles are
/// attached by key name when entries are built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    pub boot_marker: Option<String>,
    pub session_boundaries: Vec<String>,
}

impl Default for RoleAssignment {
    fn default() -> Self {
        Self {
            boot_marker: Some(constants::DEFAULT_BOOT_MARKER_KEY.to_string()),
            session_boundaries: constants::DEFAULT_SESSION_BOUNDARY_KEYS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

impl RoleAssignment {
    /// Role for `key`. The boot marker wins if a key is listed as both.
    pub fn role_for(&self, key: &str) -> PatternRole {
        if self.boot_marker.as_deref() == Some(key) {
            PatternRole::BootMarker
        } else if self.session_boundaries.iter().any(|k| k == key) {
            PatternRole::SessionBoundary
        } else {
            PatternRole::Plain
        }
    }
}

// =============================================================================
// Entries and table
// =============================================================================

/// One compiled pattern with its key and role.
#[derive(Debug, Clone)]
pub struct PatternEntry {
    key: String,
    pattern: String,
    regex: Regex,
    role: PatternRole,
}

impl PatternEntry {
    /// Validate and compile a pattern.
    pub fn new(key: &str, pattern: &str, role: PatternRole) -> Result<Self, PatternError> {
        if key.trim().is_empty() {
            return Err(PatternError::EmptyKey);
        }
        if pattern.len() > constants::MAX_REGEX_PATTERN_LENGTH {
            return Err(PatternError::RegexTooLong {
                key: key.to_string(),
                length: pattern.len(),
                max_length: constants::MAX_REGEX_PATTERN_LENGTH,
            });
        }
        let regex = Regex::new(pattern).map_err(|e| PatternError::InvalidRegex {
            key: key.to_string(),
            pattern: pattern.to_string(),
            source: e,
        })?;
        Ok(Self {
            key: key.to_string(),
            pattern: pattern.to_string(),
            regex,
            role,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn role(&self) -> PatternRole {
        self.role
    }

    /// Unanchored search of the pattern within `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Ordered pattern table. The first matching entry wins.
#[derive(Debug, Clone, Default)]
pub struct PatternTable {
    entries: Vec<PatternEntry>,
}

/// Built-in table, in match order.
const DEFAULT_PATTERNS: &[(&str, &str)] = &[
    ("A1", "检测服务器状态：False"),
    ("A2", "程序启动时，网络异常，将进入离线模式"),
    ("B1", "获取工作站状态失败，服务不可访问"),
    ("B2", "登录页，已到最大重试次数，进入离线模式"),
    ("boot", "获取到当前的系统默认的代理参数"),
    ("language change", "切换语言"),
    ("logout(countdown)", "倒计时结束，自动退出登录"),
    ("logout(user)", "确认了退出操作"),
];

impl PatternTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in table with roles attached from `roles`.
    pub fn defaults(roles: &RoleAssignment) -> Self {
        let (table, errors) = Self::from_document(PatternDocument::defaults(), roles);
        // Built-in failures are bugs, but still degrade gracefully.
        for e in &errors {
            tracing::error!(error = %e, "Failed to load built-in pattern");
        }
        table
    }

    /// Build a table from a persisted document.
    ///
    /// Entries that fail validation (bad regex, duplicate or empty key) are
    /// skipped and returned as errors; the rest of the table still loads.
    pub fn from_document(
        doc: PatternDocument,
        roles: &RoleAssignment,
    ) -> (Self, Vec<PatternError>) {
        let mut table = Self::new();
        let mut errors = Vec::new();
        for (key, pattern) in doc.entries {
            if let Err(e) = table.add(&key, &pattern, roles) {
                errors.push(e);
            }
        }
        (table, errors)
    }

    /// Persisted form of the table, in match order.
    pub fn to_document(&self) -> PatternDocument {
        PatternDocument {
            entries: self
                .entries
                .iter()
                .map(|e| (e.key.clone(), e.pattern.clone()))
                .collect(),
        }
    }

    /// Append a new entry. Fails without mutating the table when the key
    /// already exists or the pattern is invalid.
    pub fn add(
        &mut self,
        key: &str,
        pattern: &str,
        roles: &RoleAssignment,
    ) -> Result<(), PatternError> {
        if self.contains_key(key) {
            return Err(PatternError::DuplicateKey {
                key: key.to_string(),
            });
        }
        if self.entries.len() >= constants::MAX_PATTERNS {
            return Err(PatternError::TooManyPatterns {
                max: constants::MAX_PATTERNS,
            });
        }
        let entry = PatternEntry::new(key, pattern, roles.role_for(key))?;
        tracing::debug!(key, pattern, role = entry.role.label(), "Pattern added");
        self.entries.push(entry);
        Ok(())
    }

    /// Remove the entry for `key`, returning it. Fails without mutating the
    /// table when the key is absent.
    pub fn remove(&mut self, key: &str) -> Result<PatternEntry, PatternError> {
        let pos = self
            .entries
            .iter()
            .position(|e| e.key == key)
            .ok_or_else(|| PatternError::UnknownKey {
                key: key.to_string(),
            })?;
        tracing::debug!(key, "Pattern removed");
        Ok(self.entries.remove(pos))
    }

    pub fn get(&self, key: &str) -> Option<&PatternEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// First entry, in table order, whose pattern is found in `message`.
    pub fn first_match(&self, message: &str) -> Option<&PatternEntry> {
        self.entries.iter().find(|e| e.is_match(message))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PatternEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Persisted form
// =============================================================================

/// The on-disk shape of the pattern table: a JSON object mapping key to
/// pattern. Key order is preserved in both directions because it decides
/// which entry wins when several match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternDocument {
    pub entries: Vec<(String, String)>,
}

impl PatternDocument {
    pub fn defaults() -> Self {
        Self {
            entries: DEFAULT_PATTERNS
                .iter()
                .map(|(k, p)| ((*k).to_string(), (*p).to_string()))
                .collect(),
        }
    }
}

impl Serialize for PatternDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, pattern) in &self.entries {
            map.serialize_entry(key, pattern)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PatternDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DocumentVisitor;

        impl<'de> Visitor<'de> for DocumentVisitor {
            type Value = PatternDocument;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping pattern keys to regex strings")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, pattern)) = access.next_entry::<String, String>()? {
                    entries.push((key, pattern));
                }
                Ok(PatternDocument { entries })
            }
        }

        deserializer.deserialize_map(DocumentVisitor)
    }
}

/// Parse the persisted JSON form.
///
/// `source_path` is used for error messages only (not for I/O).
pub fn parse_document(json: &str, source_path: &Path) -> Result<PatternDocument, PatternError> {
    serde_json::from_str(json).map_err(|e| PatternError::Malformed {
        path: source_path.to_path_buf(),
        source: e,
    })
}

/// Render the persisted JSON form (pretty-printed, trailing newline).
pub fn render_document(doc: &PatternDocument) -> String {
    // Serialising a list of string pairs into a map cannot fail.
    let mut out = serde_json::to_string_pretty(doc).unwrap_or_else(|_| "{}".to_string());
    out.push('\n');
    out
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn roles() -> RoleAssignment {
        RoleAssignment::default()
    }

    #[test]
    fn test_defaults_load_completely_with_roles() {
        let table = PatternTable::defaults(&roles());
        assert_eq!(table.len(), DEFAULT_PATTERNS.len());
        assert_eq!(table.get("A1").unwrap().role(), PatternRole::Plain);
        assert_eq!(table.get("boot").unwrap().role(), PatternRole::BootMarker);
        for key in constants::DEFAULT_SESSION_BOUNDARY_KEYS {
            assert_eq!(
                table.get(key).unwrap().role(),
                PatternRole::SessionBoundary,
                "{key} should be a boundary"
            );
        }
    }

    #[test]
    fn test_add_duplicate_key_fails_without_mutation() {
        let mut table = PatternTable::new();
        table.add("C1", "foo", &roles()).unwrap();
        let err = table.add("C1", "bar", &roles()).unwrap_err();
        assert!(matches!(err, PatternError::DuplicateKey { ref key } if key == "C1"));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("C1").unwrap().pattern(), "foo");
    }

    #[test]
    fn test_remove_unknown_key_fails_without_mutation() {
        let mut table = PatternTable::defaults(&roles());
        let before = table.len();
        let err = table.remove("nope").unwrap_err();
        assert!(matches!(err, PatternError::UnknownKey { .. }));
        assert_eq!(table.len(), before);
    }

    #[test]
    fn test_remove_existing_key() {
        let mut table = PatternTable::defaults(&roles());
        let removed = table.remove("B1").unwrap();
        assert_eq!(removed.key(), "B1");
        assert!(!table.contains_key("B1"));
    }

    #[test]
    fn test_add_invalid_regex_fails_without_mutation() {
        let mut table = PatternTable::new();
        let err = table.add("bad", "[unclosed", &roles()).unwrap_err();
        assert!(matches!(err, PatternError::InvalidRegex { .. }));
        assert!(table.is_empty());
    }

    #[test]
    fn test_add_rejects_empty_key_and_long_regex() {
        let mut table = PatternTable::new();
        assert!(matches!(
            table.add("  ", "x", &roles()),
            Err(PatternError::EmptyKey)
        ));
        let long = "a".repeat(constants::MAX_REGEX_PATTERN_LENGTH + 1);
        assert!(matches!(
            table.add("long", &long, &roles()),
            Err(PatternError::RegexTooLong { .. })
        ));
        assert!(table.is_empty());
    }

    #[test]
    fn test_first_match_uses_table_order() {
        let mut table = PatternTable::new();
        table.add("generic", "离线模式", &roles()).unwrap();
        table.add("specific", "最大重试次数", &roles()).unwrap();
        let hit = table
            .first_match("登录页，已到最大重试次数，进入离线模式")
            .unwrap();
        assert_eq!(hit.key(), "generic");
    }

    #[test]
    fn test_first_match_is_unanchored_search() {
        let mut table = PatternTable::new();
        table.add("A1", r"状态：False", &roles()).unwrap();
        assert!(table.first_match("检测服务器状态：False (retry 1)").is_some());
        assert!(table.first_match("服务器状态：True").is_none());
    }

    #[test]
    fn test_empty_table_never_matches() {
        let table = PatternTable::new();
        assert!(table.first_match("anything").is_none());
    }

    #[test]
    fn test_custom_roles() {
        let roles = RoleAssignment {
            boot_marker: Some("startup".to_string()),
            session_boundaries: vec!["bye".to_string()],
        };
        let mut table = PatternTable::new();
        table.add("startup", "x", &roles).unwrap();
        table.add("bye", "y", &roles).unwrap();
        table.add("boot", "z", &roles).unwrap();
        assert_eq!(table.get("startup").unwrap().role(), PatternRole::BootMarker);
        assert_eq!(table.get("bye").unwrap().role(), PatternRole::SessionBoundary);
        assert_eq!(table.get("boot").unwrap().role(), PatternRole::Plain);
    }

    #[test]
    fn test_document_round_trip_preserves_order() {
        let mut table = PatternTable::new();
        for (k, p) in [("zeta", "z"), ("alpha", "a"), ("mid", "m")] {
            table.add(k, p, &roles()).unwrap();
        }
        let json = render_document(&table.to_document());
        let doc = parse_document(&json, &PathBuf::from("patterns.json")).unwrap();
        assert_eq!(doc, table.to_document());
        let keys: Vec<_> = doc.entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_parse_document_malformed() {
        let path = PathBuf::from("patterns.json");
        for bad in ["not json", "[\"a\", \"b\"]", "{\"A1\": 5}"] {
            assert!(
                matches!(
                    parse_document(bad, &path),
                    Err(PatternError::Malformed { .. })
                ),
                "{bad} should be malformed"
            );
        }
    }

    #[test]
    fn test_from_document_skips_invalid_entries() {
        let doc = PatternDocument {
            entries: vec![
                ("A1".to_string(), "ok".to_string()),
                ("A2".to_string(), "(broken".to_string()),
                ("A1".to_string(), "dup".to_string()),
            ],
        };
        let (table, errors) = PatternTable::from_document(doc, &roles());
        assert_eq!(table.len(), 1);
        assert_eq!(errors.len(), 2);
        assert_eq!(table.get("A1").unwrap().pattern(), "ok");
    }
}
