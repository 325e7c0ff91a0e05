// KioskLog - app/pattern_mgr.rs
//
// Loads, self-heals, and saves the persisted pattern table.
//
// - A missing file is created with the built-in table on first use.
// - An unparseable file is replaced by the built-in table.
// - Entries that fail validation are skipped; the rest of the file loads.
// - Edits apply to the file's entries as written, so skipped entries survive.
//   A file that is too large or unreadable is never edited.
// - Saves are atomic (write temp, rename) via platform::fs.

use crate::core::patterns::{self, PatternDocument, PatternTable, RoleAssignment};
use crate::platform::fs;
use crate::util::constants;
use crate::util::error::PatternError;
use std::path::Path;

/// What was found at the pattern file path.
enum StoredDocument {
    Missing,
    Malformed(PatternError),
    Loaded(PatternDocument),
}

/// Read and parse the pattern file.
///
/// Fails only when the file exists but must not be touched: it is over the
/// size bound, or it cannot be read.
fn read_document(path: &Path) -> Result<StoredDocument, PatternError> {
    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(StoredDocument::Missing),
        Err(e) => {
            return Err(PatternError::Io {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    // An oversized file may be a user's file in the wrong place.
    if metadata.len() > constants::MAX_PATTERN_FILE_SIZE {
        return Err(PatternError::FileTooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            max_size: constants::MAX_PATTERN_FILE_SIZE,
        });
    }

    let content = fs::read_file_lossy(path).map_err(|e| PatternError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(match patterns::parse_document(&content, path) {
        Ok(doc) => StoredDocument::Loaded(doc),
        Err(e) => StoredDocument::Malformed(e),
    })
}

/// Load the pattern table from `path`, creating or repairing the file as
/// needed.
///
/// Never fails: problems are returned as non-fatal errors alongside a usable
/// table.
pub fn load_or_init(path: &Path, roles: &RoleAssignment) -> (PatternTable, Vec<PatternError>) {
    let mut errors = Vec::new();

    let doc = match read_document(path) {
        Ok(StoredDocument::Loaded(doc)) => doc,
        Ok(StoredDocument::Missing) => {
            tracing::info!(path = %path.display(), "No pattern file found; writing built-in table");
            let table = PatternTable::defaults(roles);
            if let Err(e) = save(&table, path) {
                errors.push(e);
            }
            return (table, errors);
        }
        Ok(StoredDocument::Malformed(e)) => {
            tracing::warn!(error = %e, "Pattern file is malformed; restoring built-in table");
            errors.push(e);
            let table = PatternTable::defaults(roles);
            if let Err(e) = save(&table, path) {
                errors.push(e);
            }
            return (table, errors);
        }
        // Too large or unreadable: use defaults, leave the file alone.
        Err(e) => {
            errors.push(e);
            return (PatternTable::defaults(roles), errors);
        }
    };

    let (table, entry_errors) = PatternTable::from_document(doc, roles);
    for e in &entry_errors {
        tracing::warn!(error = %e, "Skipping invalid pattern entry");
    }
    errors.extend(entry_errors);

    tracing::info!(
        path = %path.display(),
        patterns = table.len(),
        skipped = errors.len(),
        "Pattern table loaded"
    );
    (table, errors)
}

/// The persisted document an edit applies to.
///
/// A missing or malformed file starts from the built-in table, as
/// `load_or_init` would; a file that cannot be read is an error.
fn document_for_edit(path: &Path) -> Result<PatternDocument, PatternError> {
    match read_document(path)? {
        StoredDocument::Loaded(doc) => Ok(doc),
        StoredDocument::Missing => Ok(PatternDocument::defaults()),
        StoredDocument::Malformed(e) => {
            tracing::warn!(error = %e, "Pattern file is malformed; editing built-in table");
            Ok(PatternDocument::defaults())
        }
    }
}

fn write_document(doc: &PatternDocument, path: &Path) -> Result<(), PatternError> {
    let json = patterns::render_document(doc);
    fs::write_atomic(path, json.as_bytes()).map_err(|e| PatternError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    tracing::debug!(path = %path.display(), entries = doc.entries.len(), "Pattern file saved");
    Ok(())
}

/// Persist `table` to `path` atomically.
pub fn save(table: &PatternTable, path: &Path) -> Result<(), PatternError> {
    write_document(&table.to_document(), path)
}

/// Add `key -> pattern` to the persisted table and save it.
///
/// The edit is applied to the file's entries as written, so entries that
/// were skipped on load are kept. On failure the file is left untouched.
pub fn add_pattern(
    path: &Path,
    roles: &RoleAssignment,
    key: &str,
    pattern: &str,
) -> Result<PatternTable, PatternError> {
    let mut doc = document_for_edit(path)?;
    if doc.entries.iter().any(|(k, _)| k == key) {
        return Err(PatternError::DuplicateKey {
            key: key.to_string(),
        });
    }

    let (mut table, _) = PatternTable::from_document(doc.clone(), roles);
    table.add(key, pattern, roles)?;

    doc.entries.push((key.to_string(), pattern.to_string()));
    write_document(&doc, path)?;
    tracing::info!(key, "Pattern added");
    Ok(table)
}

/// Remove `key` from the persisted table and save it, returning the new
/// table and the removed pattern text.
///
/// Entries that fail validation can be removed too. On failure the file is
/// left untouched.
pub fn remove_pattern(
    path: &Path,
    roles: &RoleAssignment,
    key: &str,
) -> Result<(PatternTable, String), PatternError> {
    let mut doc = document_for_edit(path)?;
    let pos = doc
        .entries
        .iter()
        .position(|(k, _)| k == key)
        .ok_or_else(|| PatternError::UnknownKey {
            key: key.to_string(),
        })?;
    let (_, removed) = doc.entries.remove(pos);

    write_document(&doc, path)?;
    let (table, _) = PatternTable::from_document(doc, roles);
    tracing::info!(key, "Pattern removed");
    Ok((table, removed))
}

/// Overwrite the persisted table with the built-in one.
pub fn reset_patterns(path: &Path, roles: &RoleAssignment) -> Result<PatternTable, PatternError> {
    let table = PatternTable::defaults(roles);
    save(&table, path)?;
    tracing::info!(path = %path.display(), "Pattern table reset to built-in defaults");
    Ok(table)
}
