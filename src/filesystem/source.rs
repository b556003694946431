// src/filesystem/source.rs

//! Source file selection for packing
//!
//! A [`SourceSet`] is the ordered list of files that go into one archive,
//! together with the root their archive keys are relative to.

use super::path::archive_key;
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Files selected for packing, keyed by their root-relative archive path
#[derive(Debug, Clone)]
pub struct SourceSet {
    root: PathBuf,
    /// archive key -> host path, sorted by key
    files: BTreeMap<String, PathBuf>,
}

impl SourceSet {
    /// Build a source set from an explicit list of files under `root`
    ///
    /// Relative entries in `files` are resolved against `root`.
    pub fn new(root: impl Into<PathBuf>, files: impl IntoIterator<Item = PathBuf>) -> Result<Self> {
        let root = root.into();
        let mut set = BTreeMap::new();

        for file in files {
            let host_path = if file.is_relative() {
                root.join(&file)
            } else {
                file
            };
            let key = archive_key(&root, &host_path)?;
            if let Some(previous) = set.insert(key.clone(), host_path) {
                return Err(Error::InvalidPath(format!(
                    "{} listed twice (also as {})",
                    key,
                    previous.display()
                )));
            }
        }

        if set.is_empty() {
            return Err(Error::EmptySource(root));
        }

        Ok(Self { root, files: set })
    }

    /// Walk `root` recursively and collect every regular file
    ///
    /// Symlinks are neither followed nor packaged. Any error while walking
    /// aborts the scan.
    pub fn from_dir(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let mut files = Vec::new();

        for entry in WalkDir::new(&root).follow_links(false) {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                match e.into_io_error() {
                    Some(source) => Error::FileIo { path, source },
                    None => Error::InvalidPath(format!("filesystem loop at {}", path.display())),
                }
            })?;

            let file_type = entry.file_type();
            if file_type.is_file() {
                files.push(entry.into_path());
            } else if file_type.is_symlink() {
                warn!("Skipping symlink {}", entry.path().display());
            }
        }

        debug!("Scanned {} files under {}", files.len(), root.display());
        Self::new(root, files)
    }

    /// The directory archive keys are relative to
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Always false for a constructed set; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate `(archive key, host path)` pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.files.iter().map(|(k, v)| (k.as_str(), v.as_path()))
    }
}
