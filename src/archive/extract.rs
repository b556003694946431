// src/archive/extract.rs

//! Blob verification and extraction
//!
//! Extraction runs in two phases. [`verify_blob`] checks the whole payload
//! against the manifest; nothing touches the destination tree until that
//! succeeds. [`extract`] then plans and confines every destination path,
//! stages the verified entries beside their targets, and renames them into
//! place, undoing its changes if any step fails.

use super::blob;
use super::container::ContainerEntry;
use super::manifest::Manifest;
use super::payload;
use crate::error::{Error, Result};
use crate::filesystem::path::{ensure_ancestor_within, ensure_within, safe_join};
use crate::hash::{self, digests_equal};
use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::{NamedTempFile, TempPath};
use tracing::{debug, info, warn};

/// Pseudo-path used in errors about the payload as a whole
const PAYLOAD: &str = "<payload>";

/// Mode given to extracted files
#[cfg(unix)]
const FILE_MODE: u32 = 0o644;

/// Extraction settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnpackOptions {
    /// Replace files that already exist at a destination path
    pub overwrite: bool,
}

impl Default for UnpackOptions {
    fn default() -> Self {
        Self { overwrite: true }
    }
}

/// A blob whose payload matched its manifest
#[derive(Debug, Clone)]
pub struct VerifiedBlob {
    pub manifest: Manifest,
    pub entries: Vec<ContainerEntry>,
}

/// What an extraction wrote
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    /// Files written, in payload order
    pub files: Vec<PathBuf>,
    /// Total bytes written
    pub bytes: u64,
}

/// Split a blob and check every payload entry against the manifest
///
/// Fails with `Format`/`Parse` if the framing or manifest is malformed and
/// with `IntegrityViolation` if the payload disagrees with the manifest in
/// any way: whole-container digest, an entry digest, an entry without a
/// record, or a record without an entry.
pub fn verify_blob(blob_bytes: &[u8]) -> Result<VerifiedBlob> {
    let (manifest_bytes, payload_bytes) = blob::split(blob_bytes)?;
    let manifest = Manifest::from_container(manifest_bytes)?;

    let expected = manifest.payload_hash()?;
    let actual = hash::hash_bytes(manifest.algorithm, payload_bytes);
    if !digests_equal(&expected, &actual) {
        return Err(Error::integrity(
            PAYLOAD,
            format!("container digest mismatch: expected {}, got {}", expected, actual),
        ));
    }

    let entries = payload::read_payload(payload_bytes)?;
    check_entries(&manifest, &entries)?;

    debug!(
        "Verified {} payload entries ({} digest)",
        entries.len(),
        manifest.algorithm
    );
    Ok(VerifiedBlob { manifest, entries })
}

fn check_entries(manifest: &Manifest, entries: &[ContainerEntry]) -> Result<()> {
    let mut seen = HashSet::with_capacity(entries.len());

    for entry in entries {
        let expected = manifest
            .file_hash(&entry.name)
            .ok_or_else(|| Error::integrity(&entry.name, "entry has no manifest record"))??;
        let actual = hash::hash_bytes(manifest.algorithm, &entry.data);

        if !digests_equal(&expected, &actual) {
            return Err(Error::integrity(
                &entry.name,
                format!("digest mismatch: expected {}, got {}", expected, actual),
            ));
        }
        seen.insert(entry.name.as_str());
    }

    if let Some(missing) = manifest.files.keys().find(|k| !seen.contains(k.as_str())) {
        return Err(Error::integrity(missing, "listed in manifest but missing from payload"));
    }

    Ok(())
}

/// Write verified entries under `dest`
///
/// Every destination is planned before anything is created: a name that
/// escapes `dest`, lexically or through a symlinked directory already in
/// the tree, is a `PathEscape` error, and with `overwrite` disabled an
/// existing file is an I/O error. All entries are then staged as temporary
/// files beside their targets and renamed into place together. If any step
/// fails, created files and directories are removed and replaced files are
/// restored.
pub fn extract(
    verified: &VerifiedBlob,
    dest: &Path,
    options: &UnpackOptions,
) -> Result<ExtractionReport> {
    fs::create_dir_all(dest).map_err(Error::at(dest))?;
    let root = dest.canonicalize().map_err(Error::at(dest))?;

    let plan = plan_destinations(&root, &verified.entries, options)?;

    let mut journal = Journal::default();
    match install(&root, &plan, options, &mut journal) {
        Ok(report) => {
            journal.commit();
            info!(
                "Extracted {} files ({} bytes) to {}",
                report.files.len(),
                report.bytes,
                root.display()
            );
            Ok(report)
        }
        Err(e) => {
            warn!("Extraction into {} failed, rolling back: {}", root.display(), e);
            journal.rollback();
            Err(e)
        }
    }
}

/// One entry with its checked destination
struct Planned<'a> {
    target: PathBuf,
    modified: SystemTime,
    entry: &'a ContainerEntry,
}

fn plan_destinations<'a>(
    root: &Path,
    entries: &'a [ContainerEntry],
    options: &UnpackOptions,
) -> Result<Vec<Planned<'a>>> {
    let mut targets = HashSet::with_capacity(entries.len());
    let mut plan = Vec::with_capacity(entries.len());

    for entry in entries {
        let target = safe_join(root, &entry.name)?;
        let parent = target.parent().ok_or_else(|| {
            Error::PathEscape(format!("{} has no parent directory", target.display()))
        })?;
        ensure_ancestor_within(root, parent)?;

        if !targets.insert(target.clone()) {
            return Err(Error::integrity(
                &entry.name,
                format!("resolves to {} which another entry also writes", target.display()),
            ));
        }

        if !options.overwrite && target.symlink_metadata().is_ok() {
            return Err(Error::FileIo {
                path: target,
                source: io::Error::new(io::ErrorKind::AlreadyExists, "refusing to overwrite"),
            });
        }

        let modified = SystemTime::UNIX_EPOCH
            .checked_add(Duration::from_secs(entry.mtime))
            .ok_or_else(|| {
                Error::integrity(
                    &entry.name,
                    format!("modification time {} is out of range", entry.mtime),
                )
            })?;

        plan.push(Planned {
            target,
            modified,
            entry,
        });
    }

    Ok(plan)
}

/// Stage every entry, then move all of them into place
fn install(
    root: &Path,
    plan: &[Planned<'_>],
    options: &UnpackOptions,
    journal: &mut Journal,
) -> Result<ExtractionReport> {
    let staged = plan
        .iter()
        .map(|planned| stage_entry(root, planned, journal))
        .collect::<Result<Vec<_>>>()?;

    let mut report = ExtractionReport::default();
    for (planned, tmp) in plan.iter().zip(staged) {
        commit_entry(&planned.target, tmp, options, journal)?;
        debug!(
            "Extracted {} ({} bytes)",
            planned.entry.name,
            planned.entry.data.len()
        );
        report.bytes += planned.entry.data.len() as u64;
        report.files.push(planned.target.clone());
    }
    Ok(report)
}

/// Write an entry's bytes to a temporary file in its target directory
fn stage_entry(root: &Path, planned: &Planned<'_>, journal: &mut Journal) -> Result<NamedTempFile> {
    let target = &planned.target;
    let parent = target.parent().ok_or_else(|| {
        Error::PathEscape(format!("{} has no parent directory", target.display()))
    })?;

    journal.create_dirs(root, parent)?;
    ensure_within(root, parent)?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(Error::at(parent))?;
    tmp.write_all(&planned.entry.data).map_err(Error::at(target))?;
    tmp.as_file()
        .set_modified(planned.modified)
        .map_err(Error::at(target))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp.path(), fs::Permissions::from_mode(FILE_MODE))
            .map_err(Error::at(target))?;
    }

    Ok(tmp)
}

/// Rename a staged file onto its target, setting any existing file aside
fn commit_entry(
    target: &Path,
    tmp: NamedTempFile,
    options: &UnpackOptions,
    journal: &mut Journal,
) -> Result<()> {
    // Rename into place so a symlink sitting at `target` is replaced, not followed
    let persisted = if options.overwrite {
        if target.symlink_metadata().is_ok() {
            journal.set_aside(target)?;
        }
        tmp.persist(target)
    } else {
        tmp.persist_noclobber(target)
    };
    persisted.map_err(|e| Error::FileIo {
        path: target.to_path_buf(),
        source: e.error,
    })?;

    journal.files.push(target.to_path_buf());
    Ok(())
}

/// Changes made during one extraction, for rollback
#[derive(Debug, Default)]
struct Journal {
    files: Vec<PathBuf>,
    dirs: Vec<PathBuf>,
    /// Original target -> where its previous contents were moved
    backups: Vec<(PathBuf, TempPath)>,
}

impl Journal {
    /// Create `dir` and its missing ancestors below `root`, recording each
    fn create_dirs(&mut self, root: &Path, dir: &Path) -> Result<()> {
        let missing: Vec<PathBuf> = dir
            .ancestors()
            .take_while(|p| *p != root && p.symlink_metadata().is_err())
            .map(Path::to_path_buf)
            .collect();

        for path in missing.into_iter().rev() {
            fs::create_dir(&path).map_err(Error::at(&path))?;
            self.dirs.push(path);
        }
        Ok(())
    }

    /// Move an existing `target` to a temporary name in the same directory
    fn set_aside(&mut self, target: &Path) -> Result<()> {
        let parent = target.parent().ok_or_else(|| {
            Error::PathEscape(format!("{} has no parent directory", target.display()))
        })?;
        let backup = NamedTempFile::new_in(parent)
            .map_err(Error::at(parent))?
            .into_temp_path();
        fs::rename(target, &backup).map_err(Error::at(target))?;
        self.backups.push((target.to_path_buf(), backup));
        Ok(())
    }

    /// Drop the set-aside originals once every entry is in place
    fn commit(self) {
        for (target, backup) in self.backups {
            if let Err(e) = backup.close() {
                warn!("Could not remove previous copy of {}: {}", target.display(), e);
            }
        }
    }

    /// Remove recorded files, restore set-aside originals, then remove
    /// recorded directories deepest first
    ///
    /// Best effort: failures are logged and the rest still runs.
    fn rollback(self) {
        for file in self.files.iter().rev() {
            if let Err(e) = fs::remove_file(file) {
                warn!("Rollback could not remove {}: {}", file.display(), e);
            }
        }
        for (target, backup) in self.backups.iter().rev() {
            if let Err(e) = fs::rename(backup, target) {
                warn!("Rollback could not restore {}: {}", target.display(), e);
            }
        }
        for dir in self.dirs.iter().rev() {
            if let Err(e) = fs::remove_dir(dir) {
                warn!("Rollback could not remove {}: {}", dir.display(), e);
            }
        }
    }
}
