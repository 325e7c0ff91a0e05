// KioskLog - core/discovery.rs
//
// Recursive directory traversal that finds per-machine zip bundles.
//
// Uses `walkdir` purely as an OS abstraction; reads directory metadata only,
// never archive contents (that boundary belongs to platform::archive).
//
// Per-entry I/O errors are non-fatal and collected as warnings. Only a
// missing or non-directory root fails the whole discovery.

use crate::core::model::MachineArchive;
use crate::util::constants;
use crate::util::error::ArchiveError;
use std::path::Path;

/// Configuration for a discovery operation.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Maximum directory recursion depth.
    pub max_depth: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_depth: constants::DEFAULT_MAX_DEPTH,
        }
    }
}

/// Derive (library, machine) from an archive file stem.
///
/// `YT-GFK-PAK1` belongs to library `YT`; a stem without `-` is its own
/// library.
pub fn machine_identity(stem: &str) -> (String, String) {
    let library = stem.split_once('-').map_or(stem, |(lib, _)| lib);
    (library.to_string(), stem.to_string())
}

/// Find all `.zip` bundles under `root`, sorted by path within each
/// directory so that processing order is reproducible.
///
/// Returns the archives and a list of non-fatal traversal warnings.
pub fn discover_archives(
    root: &Path,
    config: &DiscoveryConfig,
) -> Result<(Vec<MachineArchive>, Vec<String>), ArchiveError> {
    match std::fs::metadata(root) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(ArchiveError::NotADirectory {
                path: root.to_path_buf(),
            })
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ArchiveError::RootNotFound {
                path: root.to_path_buf(),
            })
        }
        Err(e) => {
            return Err(ArchiveError::Io {
                path: root.to_path_buf(),
                source: e,
            })
        }
    }

    let max_depth = config.max_depth.clamp(1, constants::ABSOLUTE_MAX_DEPTH);
    tracing::debug!(root = %root.display(), max_depth, "Archive discovery starting");

    let mut archives = Vec::new();
    let mut warnings = Vec::new();

    let walker = walkdir::WalkDir::new(root)
        .max_depth(max_depth)
        .follow_links(false)
        .sort_by_file_name();

    for entry_result in walker {
        let entry = match entry_result {
            Ok(e) => e,
            Err(e) => {
                let path = e.path().unwrap_or(root).to_path_buf();
                let err = ArchiveError::Traversal { path, source: e };
                tracing::warn!(error = %err, "Skipping unreadable directory entry");
                warnings.push(err.to_string());
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let is_zip = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(constants::ARCHIVE_EXTENSION));
        if !is_zip {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            warnings.push(format!(
                "'{}': archive name is not valid UTF-8, skipped",
                path.display()
            ));
            continue;
        };

        let (library, machine) = machine_identity(stem);
        tracing::trace!(archive = %path.display(), %library, %machine, "Archive discovered");
        archives.push(MachineArchive {
            path: path.to_path_buf(),
            library,
            machine,
        });
    }

    tracing::info!(
        root = %root.display(),
        archives = archives.len(),
        warnings = warnings.len(),
        "Archive discovery complete"
    );

    Ok((archives, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_machine_identity() {
        assert_eq!(
            machine_identity("YT-GFK-PAK1"),
            ("YT".to_string(), "YT-GFK-PAK1".to_string())
        );
        assert_eq!(
            machine_identity("POR"),
            ("POR".to_string(), "POR".to_string())
        );
    }

    #[test]
    fn test_discover_archives_recursive_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("YT")).unwrap();
        fs::create_dir(root.join("POR")).unwrap();
        fs::write(root.join("YT").join("YT-B.zip"), b"").unwrap();
        fs::write(root.join("YT").join("YT-A.ZIP"), b"").unwrap();
        fs::write(root.join("POR").join("POR-01C-PDC7.zip"), b"").unwrap();
        fs::write(root.join("YT").join("notes.txt"), b"").unwrap();
        fs::create_dir(root.join("YT").join("dir.zip")).unwrap();

        let (archives, warnings) = discover_archives(root, &DiscoveryConfig::default()).unwrap();
        assert!(warnings.is_empty());
        let machines: Vec<_> = archives.iter().map(|a| a.machine.as_str()).collect();
        assert_eq!(machines, vec!["POR-01C-PDC7", "YT-A", "YT-B"]);
        assert_eq!(archives[0].library, "POR");
    }

    #[test]
    fn test_discover_respects_max_depth() {
        let dir = tempfile::tempdir().unwrap();
        let deep = dir.path().join("a").join("b");
        fs::create_dir_all(&deep).unwrap();
        fs::write(deep.join("X-1.zip"), b"").unwrap();

        let config = DiscoveryConfig { max_depth: 2 };
        let (archives, _) = discover_archives(dir.path(), &config).unwrap();
        assert!(archives.is_empty());

        let config = DiscoveryConfig { max_depth: 3 };
        let (archives, _) = discover_archives(dir.path(), &config).unwrap();
        assert_eq!(archives.len(), 1);
    }

    #[test]
    fn test_root_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            discover_archives(&missing, &DiscoveryConfig::default()),
            Err(ArchiveError::RootNotFound { .. })
        ));

        let file = dir.path().join("file.zip");
        fs::write(&file, b"").unwrap();
        assert!(matches!(
            discover_archives(&file, &DiscoveryConfig::default()),
            Err(ArchiveError::NotADirectory { .. })
        ));
    }
}
