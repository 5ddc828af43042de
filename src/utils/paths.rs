//! Workspace path resolution.
//!
//! Every file the gateway reads (to diff against) or writes (when applying
//! an approved mutation) is addressed by a path relative to the workspace
//! root. Resolution canonicalizes and verifies the result stays inside the
//! workspace, so a request for `../../etc/passwd` never leaves it.

use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Why a workspace-relative path could not be resolved.
#[derive(Debug, Error)]
pub enum PathResolveError {
    #[error("path escapes workspace root: {0}")]
    Escapes(String),

    #[error("workspace root not found: {0}")]
    MissingRoot(String),
}

/// Resolve a workspace-relative path to an absolute path, verifying it
/// stays within the workspace root.
///
/// Existing targets are canonicalized before the containment check, so
/// symlinks pointing outside the workspace are rejected too. Targets that
/// don't exist yet (new files) are normalized lexically against the
/// canonical root.
pub fn resolve_in_workspace(
    workspace_root: &Path,
    relative_path: &str,
) -> Result<PathBuf, PathResolveError> {
    let canonical_root = workspace_root
        .canonicalize()
        .map_err(|_| PathResolveError::MissingRoot(workspace_root.display().to_string()))?;

    let target = canonical_root.join(relative_path);

    let resolved = if target.exists() {
        target
            .canonicalize()
            .map_err(|_| PathResolveError::Escapes(relative_path.to_string()))?
    } else {
        // New file: normalize `.` and `..` components lexically.
        let mut normalized = canonical_root.clone();
        for component in Path::new(relative_path).components() {
            match component {
                Component::Normal(part) => normalized.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    normalized.pop();
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(PathResolveError::Escapes(relative_path.to_string()));
                }
            }
        }
        normalized
    };

    if !resolved.starts_with(&canonical_root) {
        return Err(PathResolveError::Escapes(relative_path.to_string()));
    }

    Ok(resolved)
}
