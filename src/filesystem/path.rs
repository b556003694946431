// src/filesystem/path.rs

//! Path sanitization utilities for security
//!
//! Archive entry names come from untrusted input. Every name is normalized
//! here before it touches the filesystem, and every destination is checked
//! to stay inside the extraction root.

use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// Sanitize an archive entry name
///
/// This function:
/// 1. Rejects names containing `..` (parent directory) components
/// 2. Skips `.` (current directory) components
/// 3. Strips leading slashes to make the name relative
/// 4. Returns an error for empty names
///
/// # Examples
///
/// ```
/// use sealpack::filesystem::path::sanitize_path;
/// use std::path::PathBuf;
///
/// assert_eq!(sanitize_path("sub/b.txt").unwrap(), PathBuf::from("sub/b.txt"));
/// assert_eq!(sanitize_path("/sub/b.txt").unwrap(), PathBuf::from("sub/b.txt"));
/// assert!(sanitize_path("../etc/passwd").is_err());
/// assert!(sanitize_path("sub/../../etc/passwd").is_err());
/// ```
pub fn sanitize_path(name: &str) -> Result<PathBuf> {
    let relative = name.trim_start_matches('/');

    let mut normalized = PathBuf::new();

    for component in Path::new(relative).components() {
        match component {
            Component::Normal(c) => normalized.push(c),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(Error::PathEscape(name.to_string()));
            }
            Component::Prefix(_) | Component::RootDir => {
                return Err(Error::PathEscape(name.to_string()));
            }
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(Error::PathEscape(format!("empty entry name {name:?}")));
    }

    Ok(normalized)
}

/// Turn a host path relative to a source root into an archive key
///
/// Keys are `/`-separated, carry no leading separator, and never contain
/// `.` or `..` segments.
pub fn archive_key(root: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(root).map_err(|_| {
        Error::InvalidPath(format!(
            "{} is not under source root {}",
            path.display(),
            root.display()
        ))
    })?;

    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(c) => {
                let segment = c.to_str().ok_or_else(|| {
                    Error::InvalidPath(format!("{} is not valid UTF-8", path.display()))
                })?;
                segments.push(segment);
            }
            Component::CurDir => {}
            Component::ParentDir | Component::Prefix(_) | Component::RootDir => {
                return Err(Error::InvalidPath(format!(
                    "{} cannot be stored as a root-relative key",
                    path.display()
                )));
            }
        }
    }

    if segments.is_empty() {
        return Err(Error::InvalidPath(format!(
            "{} names the source root itself",
            path.display()
        )));
    }

    Ok(segments.join("/"))
}

/// Safely join a root path with an untrusted entry name
///
/// The name is sanitized first. The result is guaranteed to lie lexically
/// under `root`; [`ensure_within`] covers symlinks that already exist on disk.
pub fn safe_join(root: &Path, name: &str) -> Result<PathBuf> {
    let sanitized = sanitize_path(name)?;
    let joined = root.join(&sanitized);

    if !joined.starts_with(root) {
        return Err(Error::PathEscape(format!(
            "{} escapes {}",
            joined.display(),
            root.display()
        )));
    }

    Ok(joined)
}

/// Check that an existing directory resolves inside `canonical_root`
///
/// `canonical_root` must already be canonicalized. Catches a destination
/// tree containing a symlink that points elsewhere.
pub fn ensure_within(canonical_root: &Path, dir: &Path) -> Result<()> {
    let canonical_dir = dir.canonicalize().map_err(Error::at(dir))?;
    check_resolved(canonical_root, dir, &canonical_dir)
}

/// Check that the deepest existing ancestor of `path` resolves inside
/// `canonical_root`
///
/// `path` itself need not exist yet. Lets a symlinked directory be caught
/// before anything below it is created. A dangling symlink on the way is a
/// `PathEscape` error.
pub fn ensure_ancestor_within(canonical_root: &Path, path: &Path) -> Result<()> {
    let existing = path
        .ancestors()
        .find(|p| p.symlink_metadata().is_ok())
        .unwrap_or(canonical_root);

    let resolved = existing.canonicalize().map_err(|e| {
        Error::PathEscape(format!("{} cannot be resolved: {}", existing.display(), e))
    })?;
    check_resolved(canonical_root, existing, &resolved)
}

fn check_resolved(canonical_root: &Path, path: &Path, resolved: &Path) -> Result<()> {
    if !resolved.starts_with(canonical_root) {
        return Err(Error::PathEscape(format!(
            "{} resolves to {}, outside {}",
            path.display(),
            resolved.display(),
            canonical_root.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_path_normal() {
        assert_eq!(sanitize_path("a.txt").unwrap(), PathBuf::from("a.txt"));
        assert_eq!(
            sanitize_path("sub/deeper/b.txt").unwrap(),
            PathBuf::from("sub/deeper/b.txt")
        );
    }

    #[test]
    fn test_sanitize_path_leading_slash_and_dot() {
        assert_eq!(sanitize_path("///a.txt").unwrap(), PathBuf::from("a.txt"));
        assert_eq!(sanitize_path("./sub/./b.txt").unwrap(), PathBuf::from("sub/b.txt"));
    }

    #[test]
    fn test_sanitize_path_traversal_rejected() {
        for name in ["..", "../x", "sub/../../x", "sub/..", "/../x"] {
            let err = sanitize_path(name).unwrap_err();
            assert!(matches!(err, Error::PathEscape(_)), "{name} should be rejected");
        }
    }

    #[test]
    fn test_sanitize_path_empty_rejected() {
        assert!(sanitize_path("").is_err());
        assert!(sanitize_path("/").is_err());
        assert!(sanitize_path("./").is_err());
    }

    #[test]
    fn test_archive_key() {
        let root = Path::new("/data/src");
        assert_eq!(archive_key(root, Path::new("/data/src/a.txt")).unwrap(), "a.txt");
        assert_eq!(
            archive_key(root, Path::new("/data/src/sub/b.txt")).unwrap(),
            "sub/b.txt"
        );
        assert!(archive_key(root, Path::new("/data/other/a.txt")).is_err());
        assert!(archive_key(root, Path::new("/data/src")).is_err());
    }

    #[test]
    fn test_safe_join() {
        let root = Path::new("/tmp/dest");
        assert_eq!(
            safe_join(root, "sub/b.txt").unwrap(),
            PathBuf::from("/tmp/dest/sub/b.txt")
        );
        assert!(safe_join(root, "../etc/passwd").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_ensure_within_rejects_symlinked_dir() {
        let dest = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), dest.path().join("link")).unwrap();

        let root = dest.path().canonicalize().unwrap();
        assert!(ensure_within(&root, dest.path()).is_ok());
        let err = ensure_within(&root, &dest.path().join("link")).unwrap_err();
        assert!(matches!(err, Error::PathEscape(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_ensure_ancestor_within_checks_missing_paths() {
        let dest = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), dest.path().join("link")).unwrap();
        std::os::unix::fs::symlink("nowhere", dest.path().join("dangling")).unwrap();

        let root = dest.path().canonicalize().unwrap();
        assert!(ensure_ancestor_within(&root, &root.join("new/deeper")).is_ok());

        let err = ensure_ancestor_within(&root, &root.join("link/sub/deeper")).unwrap_err();
        assert!(matches!(err, Error::PathEscape(_)));
        assert!(!outside.path().join("sub").exists());

        let err = ensure_ancestor_within(&root, &root.join("dangling/sub")).unwrap_err();
        assert!(matches!(err, Error::PathEscape(_)));
    }
}
