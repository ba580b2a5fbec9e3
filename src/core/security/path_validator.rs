use std::io;
use std::path::{Path, PathBuf};

/// Errors that can occur during bundle path validation
#[derive(Debug, thiserror::Error)]
pub enum PathSecurityError {
    #[error("Path '{path}' is outside the plugin storage directory '{root}'")]
    OutsideRootDirectory { path: PathBuf, root: PathBuf },

    #[error("Symlink '{path}' is not allowed")]
    SymlinkNotAllowed { path: PathBuf },

    #[error("Symlink '{path}' points outside the plugin storage directory")]
    SymlinkOutsideRoot { path: PathBuf },

    #[error("Cannot canonicalize path '{path}': {error}")]
    CannotCanonicalize { path: PathBuf, error: io::Error },

    #[error("Path does not exist: '{path}'")]
    PathNotFound { path: PathBuf },

    #[error("Path is not a regular file: '{path}'")]
    NotAFile { path: PathBuf },

    #[error("IO error for path '{path}': {error}")]
    IoError { path: PathBuf, error: io::Error },
}

/// Validates a bundle path before it is read.
///
/// This function performs the following checks:
/// 1. The path exists and resolves to a regular file
/// 2. Symlinks are rejected unless `allow_symlinks` is set
/// 3. If a storage root is given, the canonical path (and any symlink
///    target) must lie within it, which also defeats `..` traversal
///
/// # Returns
///
/// * `Ok(PathBuf)` - The canonicalized, validated path
/// * `Err(PathSecurityError)` - If validation fails
///
/// # Examples
///
/// ```rust,ignore
/// let bundle = validate_bundle_path(Path::new("./data/plugins/greeter.wasm"),
///     Some(Path::new("./data/plugins")), false)?;
/// ```
pub fn validate_bundle_path(
    path: &Path,
    storage_root: Option<&Path>,
    allow_symlinks: bool,
) -> Result<PathBuf, PathSecurityError> {
    let metadata = path.symlink_metadata().map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            PathSecurityError::PathNotFound {
                path: path.to_path_buf(),
            }
        } else {
            PathSecurityError::IoError {
                path: path.to_path_buf(),
                error: e,
            }
        }
    })?;

    if metadata.file_type().is_symlink() && !allow_symlinks {
        return Err(PathSecurityError::SymlinkNotAllowed {
            path: path.to_path_buf(),
        });
    }

    let canonical_path = canonicalize_path(path)?;
    if !canonical_path.is_file() {
        return Err(PathSecurityError::NotAFile {
            path: canonical_path,
        });
    }

    // No storage root - only basic checks
    let Some(root) = storage_root else {
        return Ok(canonical_path);
    };

    let canonical_root = root.canonicalize().map_err(|e| PathSecurityError::IoError {
        path: root.to_path_buf(),
        error: e,
    })?;

    if !is_within_root(&canonical_path, &canonical_root) {
        // A symlink inside the root that escapes it gets its own error
        if metadata.file_type().is_symlink() {
            return Err(PathSecurityError::SymlinkOutsideRoot {
                path: path.to_path_buf(),
            });
        }
        return Err(PathSecurityError::OutsideRootDirectory {
            path: canonical_path,
            root: canonical_root,
        });
    }

    Ok(canonical_path)
}

/// Checks if a path is within (or equal to) a root directory
fn is_within_root(path: &Path, root: &Path) -> bool {
    path.starts_with(root)
}

fn canonicalize_path(path: &Path) -> Result<PathBuf, PathSecurityError> {
    path.canonicalize().map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            PathSecurityError::PathNotFound {
                path: path.to_path_buf(),
            }
        } else {
            PathSecurityError::CannotCanonicalize {
                path: path.to_path_buf(),
                error: e,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_no_root_allows_existing_files() {
        let temp_dir = TempDir::new().unwrap();
        let bundle = temp_dir.path().join("a.wasm");
        fs::write(&bundle, b"\0asm").unwrap();

        assert!(validate_bundle_path(&bundle, None, false).is_ok());
    }

    #[test]
    fn test_path_within_root() {
        let temp_dir = TempDir::new().unwrap();
        let bundle = temp_dir.path().join("a.wasm");
        fs::write(&bundle, b"\0asm").unwrap();

        let result = validate_bundle_path(&bundle, Some(temp_dir.path()), false);
        assert_eq!(result.unwrap(), bundle.canonicalize().unwrap());
    }

    #[test]
    fn test_path_outside_root() {
        let root_dir = TempDir::new().unwrap();
        let outside_dir = TempDir::new().unwrap();
        let outside = outside_dir.path().join("outside.wasm");
        fs::write(&outside, b"\0asm").unwrap();

        let result = validate_bundle_path(&outside, Some(root_dir.path()), false);
        assert!(matches!(
            result,
            Err(PathSecurityError::OutsideRootDirectory { .. })
        ));
    }

    #[test]
    fn test_path_traversal_blocked() {
        let temp_dir = TempDir::new().unwrap();
        let subdir = temp_dir.path().join("plugins");
        fs::create_dir(&subdir).unwrap();
        fs::write(temp_dir.path().join("escape.wasm"), b"\0asm").unwrap();

        // Resolves to temp_dir/escape.wasm, outside the plugins root
        let traversal = subdir.join("../escape.wasm");
        let result = validate_bundle_path(&traversal, Some(&subdir), false);
        assert!(matches!(
            result,
            Err(PathSecurityError::OutsideRootDirectory { .. })
        ));
    }

    #[test]
    fn test_nonexistent_path() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.wasm");

        let result = validate_bundle_path(&missing, Some(temp_dir.path()), false);
        assert!(matches!(result, Err(PathSecurityError::PathNotFound { .. })));
    }

    #[test]
    fn test_directory_is_not_a_bundle() {
        let temp_dir = TempDir::new().unwrap();
        let result = validate_bundle_path(temp_dir.path(), None, false);
        assert!(matches!(result, Err(PathSecurityError::NotAFile { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_disallowed_by_default() {
        use std::os::unix::fs::symlink;

        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("target.wasm");
        let link = temp_dir.path().join("link.wasm");
        fs::write(&target, b"\0asm").unwrap();
        symlink(&target, &link).unwrap();

        let result = validate_bundle_path(&link, Some(temp_dir.path()), false);
        assert!(matches!(
            result,
            Err(PathSecurityError::SymlinkNotAllowed { .. })
        ));
        assert!(validate_bundle_path(&link, Some(temp_dir.path()), true).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_outside_root_blocked() {
        use std::os::unix::fs::symlink;

        let root_dir = TempDir::new().unwrap();
        let outside_dir = TempDir::new().unwrap();
        let target = outside_dir.path().join("target.wasm");
        let link = root_dir.path().join("link.wasm");
        fs::write(&target, b"\0asm").unwrap();
        symlink(&target, &link).unwrap();

        let result = validate_bundle_path(&link, Some(root_dir.path()), true);
        assert!(matches!(
            result,
            Err(PathSecurityError::SymlinkOutsideRoot { .. })
        ));
    }
}
