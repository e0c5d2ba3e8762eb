// src/packages/archive.rs

//! Package archive extraction
//!
//! Packages are gzip-compressed tarballs unpacked straight into their
//! store directory. Only directories and regular files are materialized;
//! every regular file is made executable.

use crate::error::{Error, Result};
use flate2::read::MultiGzDecoder;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};
use tar::{Archive, EntryType};
use tracing::{debug, warn};

/// Mode applied to extracted directories and files
pub const EXTRACT_MODE: u32 = 0o755;

/// What happened to a single archive entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    /// Written below the destination; path is relative to it
    Extracted(PathBuf),

    /// Left out of the extraction
    Skipped { path: PathBuf, reason: SkipReason },
}

/// Why an entry was not extracted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Symlinks, hard links, device nodes, fifos, ...
    UnsupportedType(EntryType),

    /// Absolute path or `..` component; would land outside the destination
    UnsafePath,
}

impl EntryOutcome {
    /// Whether the entry was written to disk
    pub fn is_extracted(&self) -> bool {
        matches!(self, EntryOutcome::Extracted(_))
    }
}

/// Extract a tar.gz archive to a destination directory
pub fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> Result<Vec<EntryOutcome>> {
    debug!("Extracting {} into {}", archive_path.display(), dest_dir.display());

    let file = File::open(archive_path).map_err(|e| {
        Error::IoError(format!("Failed to open archive {}: {}", archive_path.display(), e))
    })?;

    // Concatenated gzip members form one stream
    extract_tar(MultiGzDecoder::new(BufReader::new(file)), dest_dir)
}

/// Extract an uncompressed tar stream to a destination directory
pub fn extract_tar<R: Read>(reader: R, dest_dir: &Path) -> Result<Vec<EntryOutcome>> {
    let mut archive = Archive::new(reader);
    let mut outcomes = Vec::new();

    let entries = archive
        .entries()
        .map_err(|e| Error::IoError(format!("Failed to read archive entries: {}", e)))?;

    for entry in entries {
        let mut entry =
            entry.map_err(|e| Error::IoError(format!("Failed to read archive entry: {}", e)))?;

        let relative = entry
            .path()
            .map_err(|e| Error::IoError(format!("Invalid path in archive: {}", e)))?
            .into_owned();
        let entry_type = entry.header().entry_type();

        if !is_contained(&relative) {
            warn!("Skipping archive entry outside destination: {}", relative.display());
            outcomes.push(EntryOutcome::Skipped {
                path: relative,
                reason: SkipReason::UnsafePath,
            });
            continue;
        }

        let target = dest_dir.join(&relative);

        if entry_type.is_dir() {
            fs::create_dir_all(&target).map_err(|e| {
                Error::IoError(format!("Failed to create directory {}: {}", target.display(), e))
            })?;
            set_mode(&target, EXTRACT_MODE)?;
        } else if entry_type.is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| {
                    Error::IoError(format!("Failed to create directory {}: {}", parent.display(), e))
                })?;
            }

            let mut out = File::create(&target).map_err(|e| {
                Error::IoError(format!("Failed to create file {}: {}", target.display(), e))
            })?;
            io::copy(&mut entry, &mut out).map_err(|e| {
                Error::IoError(format!("Failed to write {}: {}", target.display(), e))
            })?;
            set_mode(&target, EXTRACT_MODE)?;
        } else {
            debug!(
                "Skipping unsupported entry {} ({:?})",
                relative.display(),
                entry_type
            );
            outcomes.push(EntryOutcome::Skipped {
                path: relative,
                reason: SkipReason::UnsupportedType(entry_type),
            });
            continue;
        }

        outcomes.push(EntryOutcome::Extracted(relative));
    }

    Ok(outcomes)
}

/// Relative path made only of normal and `.` components
fn is_contained(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| {
        Error::IoError(format!("Failed to set permissions on {}: {}", path.display(), e))
    })
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

/// Build a small gzip tarball: `bin/` directory, `bin/tool` file (mode 0644),
/// a `bin/link` symlink and a `bin/after` file following it
#[cfg(test)]
pub(crate) fn sample_tar_gz() -> Vec<u8> {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tar::{Builder, Header};

    let mut builder = Builder::new(GzEncoder::new(Vec::new(), Compression::default()));

    let mut dir = Header::new_gnu();
    dir.set_entry_type(EntryType::Directory);
    dir.set_mode(0o700);
    dir.set_size(0);
    builder.append_data(&mut dir, "bin", io::empty()).unwrap();

    let content = b"#!/bin/sh\necho hello\n";
    let mut file = Header::new_gnu();
    file.set_entry_type(EntryType::Regular);
    file.set_mode(0o644);
    file.set_size(content.len() as u64);
    builder.append_data(&mut file, "bin/tool", &content[..]).unwrap();

    let mut link = Header::new_gnu();
    link.set_entry_type(EntryType::Symlink);
    link.set_mode(0o777);
    link.set_size(0);
    link.set_link_name("tool").unwrap();
    builder.append_data(&mut link, "bin/link", io::empty()).unwrap();

    let mut after = Header::new_gnu();
    after.set_entry_type(EntryType::Regular);
    after.set_mode(0o644);
    after.set_size(5);
    builder.append_data(&mut after, "bin/after", &b"after"[..]).unwrap();

    builder.into_inner().unwrap().finish().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tar::{Builder, Header};

    #[test]
    fn test_extract_dir_file_and_skip_symlink() {
        let temp_dir = tempfile::tempdir().unwrap();
        let archive_path = temp_dir.path().join("pkg.tar.gz");
        fs::write(&archive_path, sample_tar_gz()).unwrap();
        let dest = temp_dir.path().join("pkg");
        fs::create_dir(&dest).unwrap();

        let outcomes = extract_tar_gz(&archive_path, &dest).unwrap();

        assert_eq!(
            outcomes,
            vec![
                EntryOutcome::Extracted(PathBuf::from("bin")),
                EntryOutcome::Extracted(PathBuf::from("bin/tool")),
                EntryOutcome::Skipped {
                    path: PathBuf::from("bin/link"),
                    reason: SkipReason::UnsupportedType(EntryType::Symlink),
                },
                EntryOutcome::Extracted(PathBuf::from("bin/after")),
            ]
        );

        assert!(dest.join("bin").is_dir());
        assert_eq!(
            fs::read_to_string(dest.join("bin/tool")).unwrap(),
            "#!/bin/sh\necho hello\n"
        );
        assert!(fs::symlink_metadata(dest.join("bin/link")).is_err());
        assert_eq!(fs::read_to_string(dest.join("bin/after")).unwrap(), "after");
    }

    #[test]
    fn test_extract_multi_member_gzip() {
        // One tar stream split across two gzip members
        let mut builder = Builder::new(Vec::new());
        let mut first = Header::new_gnu();
        first.set_entry_type(EntryType::Regular);
        first.set_mode(0o644);
        first.set_size(1);
        builder.append_data(&mut first, "a.txt", &b"a"[..]).unwrap();
        // Header block plus one padded data block
        let split = 1024;

        let mut second = Header::new_gnu();
        second.set_entry_type(EntryType::Regular);
        second.set_mode(0o644);
        second.set_size(1);
        builder.append_data(&mut second, "b.txt", &b"b"[..]).unwrap();
        let tar_bytes = builder.into_inner().unwrap();

        let mut gz = Vec::new();
        for part in [&tar_bytes[..split], &tar_bytes[split..]] {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            std::io::Write::write_all(&mut encoder, part).unwrap();
            gz.extend(encoder.finish().unwrap());
        }

        let temp_dir = tempfile::tempdir().unwrap();
        let archive_path = temp_dir.path().join("pkg.tar.gz");
        fs::write(&archive_path, gz).unwrap();
        let dest = temp_dir.path().join("pkg");

        let outcomes = extract_tar_gz(&archive_path, &dest).unwrap();

        assert_eq!(
            outcomes,
            vec![
                EntryOutcome::Extracted(PathBuf::from("a.txt")),
                EntryOutcome::Extracted(PathBuf::from("b.txt")),
            ]
        );
        assert_eq!(fs::read_to_string(dest.join("b.txt")).unwrap(), "b");
    }

    #[cfg(unix)]
    #[test]
    fn test_extracted_modes() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().unwrap();
        let archive_path = temp_dir.path().join("pkg.tar.gz");
        fs::write(&archive_path, sample_tar_gz()).unwrap();
        let dest = temp_dir.path().join("pkg");

        extract_tar_gz(&archive_path, &dest).unwrap();

        let dir_mode = fs::metadata(dest.join("bin")).unwrap().permissions().mode();
        let file_mode = fs::metadata(dest.join("bin/tool")).unwrap().permissions().mode();
        assert_eq!(dir_mode & 0o777, 0o755);
        assert_eq!(file_mode & 0o777, 0o755);
    }

    #[test]
    fn test_unsafe_paths_are_skipped() {
        let mut builder = Builder::new(GzEncoder::new(Vec::new(), Compression::default()));

        // Header::set_path refuses "..", so write the raw name field
        let content = b"escaped";
        let mut evil = Header::new_gnu();
        evil.as_old_mut().name[..7].copy_from_slice(b"../evil");
        evil.set_entry_type(EntryType::Regular);
        evil.set_mode(0o644);
        evil.set_size(content.len() as u64);
        evil.set_cksum();
        builder.append(&evil, &content[..]).unwrap();

        let mut ok = Header::new_gnu();
        ok.set_entry_type(EntryType::Regular);
        ok.set_mode(0o644);
        ok.set_size(2);
        builder.append_data(&mut ok, "ok.txt", &b"ok"[..]).unwrap();

        let bytes = builder.into_inner().unwrap().finish().unwrap();

        let temp_dir = tempfile::tempdir().unwrap();
        let dest = temp_dir.path().join("pkg");
        fs::create_dir(&dest).unwrap();

        let outcomes = extract_tar(GzDecoder::new(&bytes[..]), &dest).unwrap();

        assert_eq!(
            outcomes[0],
            EntryOutcome::Skipped {
                path: PathBuf::from("../evil"),
                reason: SkipReason::UnsafePath,
            }
        );
        assert!(outcomes[1].is_extracted());
        assert!(!temp_dir.path().join("evil").exists());
        assert_eq!(fs::read_to_string(dest.join("ok.txt")).unwrap(), "ok");
    }

    #[test]
    fn test_reextract_overwrites_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let archive_path = temp_dir.path().join("pkg.tar.gz");
        fs::write(&archive_path, sample_tar_gz()).unwrap();
        let dest = temp_dir.path().join("pkg");

        extract_tar_gz(&archive_path, &dest).unwrap();
        fs::write(dest.join("bin/tool"), "modified").unwrap();
        extract_tar_gz(&archive_path, &dest).unwrap();

        assert_eq!(
            fs::read_to_string(dest.join("bin/tool")).unwrap(),
            "#!/bin/sh\necho hello\n"
        );
    }

    #[test]
    fn test_corrupt_archive() {
        let temp_dir = tempfile::tempdir().unwrap();
        let archive_path = temp_dir.path().join("pkg.tar.gz");
        fs::write(&archive_path, b"<html>not a tarball</html>").unwrap();

        let result = extract_tar_gz(&archive_path, temp_dir.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_archive() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = extract_tar_gz(&temp_dir.path().join("nope.tar.gz"), temp_dir.path());
        assert!(matches!(result, Err(Error::IoError(_))));
    }
}
