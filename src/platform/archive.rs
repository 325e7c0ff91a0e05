// KioskLog - platform/archive.rs
//
// Read access to per-machine zip bundles. Lists the members under the
// bundle's log directory and reads them into memory one at a time; nothing
// is extracted to disk.

use crate::util::constants;
use crate::util::error::ArchiveError;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// A file inside the archive's log directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveMember {
    /// Full member name as stored in the zip (used to read it back).
    pub name: String,

    /// Final path component, e.g. `2025-02-10_local.log`.
    pub file_name: String,
}

/// An opened machine bundle.
pub struct LogArchive {
    path: PathBuf,
    zip: ZipArchive<File>,
}

impl std::fmt::Debug for LogArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogArchive")
            .field("path", &self.path)
            .field("members", &self.zip.len())
            .finish()
    }
}

impl LogArchive {
    /// Open `path` as a zip archive.
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        let file = File::open(path).map_err(|e| ArchiveError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let zip = ZipArchive::new(file).map_err(|e| ArchiveError::Zip {
            path: path.to_path_buf(),
            source: e,
        })?;
        tracing::trace!(archive = %path.display(), members = zip.len(), "Archive opened");
        Ok(Self {
            path: path.to_path_buf(),
            zip,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All files below the top-level `log_dir` directory, at any depth.
    ///
    /// Member names written on Windows may use `\` separators; both forms are
    /// accepted. Returns `MissingLogDir` when no member lives under `log_dir`.
    pub fn log_members(&self, log_dir: &str) -> Result<Vec<ArchiveMember>, ArchiveError> {
        let prefix = format!("{}/", log_dir.trim_matches('/'));
        let mut saw_log_dir = false;
        let mut members = Vec::new();

        for name in self.zip.file_names() {
            let normalised = name.replace('\\', "/");
            let Some(rest) = normalised.strip_prefix(&prefix) else {
                continue;
            };
            saw_log_dir = true;
            if rest.is_empty() || rest.ends_with('/') {
                continue; // directory entry
            }
            let file_name = rest.rsplit('/').next().unwrap_or(rest).to_string();
            members.push(ArchiveMember {
                name: name.to_string(),
                file_name,
            });
        }

        if !saw_log_dir {
            return Err(ArchiveError::MissingLogDir {
                path: self.path.clone(),
                dir: log_dir.to_string(),
            });
        }
        Ok(members)
    }

    /// Read one member fully into memory.
    pub fn read_member(&mut self, member: &ArchiveMember) -> Result<Vec<u8>, ArchiveError> {
        let mut entry = self
            .zip
            .by_name(&member.name)
            .map_err(|e| ArchiveError::Zip {
                path: self.path.clone(),
                source: e,
            })?;

        let size = entry.size();
        if size > constants::MAX_MEMBER_SIZE {
            return Err(ArchiveError::MemberTooLarge {
                path: self.path.clone(),
                member: member.name.clone(),
                size,
                max_size: constants::MAX_MEMBER_SIZE,
            });
        }

        let mut bytes = Vec::with_capacity(usize::try_from(size).unwrap_or(0));
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| ArchiveError::Io {
                path: self.path.join(&member.name),
                source: e,
            })?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, members: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for (name, content) in members {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_log_members_lists_nested_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("YT-GFK-PAK1.zip");
        write_zip(
            &path,
            &[
                ("Log/2025-02-10_local.log", "a"),
                ("Log/sub/2025-02-11_local.log", "b"),
                ("Config/settings.ini", "c"),
                ("LogBackup/2025-02-09_local.log", "d"),
            ],
        );

        let archive = LogArchive::open(&path).unwrap();
        let mut names: Vec<_> = archive
            .log_members("Log")
            .unwrap()
            .into_iter()
            .map(|m| m.file_name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["2025-02-10_local.log", "2025-02-11_local.log"]);
    }

    #[test]
    fn test_backslash_member_names_are_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("M.zip");
        write_zip(&path, &[("Log\\2025-02-10_local.log", "x")]);

        let mut archive = LogArchive::open(&path).unwrap();
        let members = archive.log_members("Log").unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].file_name, "2025-02-10_local.log");
        assert_eq!(archive.read_member(&members[0]).unwrap(), b"x");
    }

    #[test]
    fn test_missing_log_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("M.zip");
        write_zip(&path, &[("Other/readme.txt", "x")]);

        let archive = LogArchive::open(&path).unwrap();
        assert!(matches!(
            archive.log_members("Log"),
            Err(ArchiveError::MissingLogDir { .. })
        ));
    }

    #[test]
    fn test_open_rejects_non_zip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.zip");
        std::fs::write(&path, b"definitely not a zip").unwrap();
        assert!(matches!(
            LogArchive::open(&path),
            Err(ArchiveError::Zip { .. })
        ));
    }

    #[test]
    fn test_read_member_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("M.zip");
        let content = "10:15:00 001 [X]确认了退出操作\n";
        write_zip(&path, &[("Log/2025-02-10_local.log", content)]);

        let mut archive = LogArchive::open(&path).unwrap();
        let members = archive.log_members("Log").unwrap();
        let bytes = archive.read_member(&members[0]).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), content);
    }
}
