// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher.

use std::path::Path;

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// - Relative paths are taken as already relative to `root`.
/// - Otherwise we try a direct `strip_prefix(root)`.
/// - If that fails (e.g. due to symlinks or different absolute prefixes),
///   we canonicalize both paths and try again.
///
/// Returns `None` if the path cannot be reasonably related to `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if path.is_relative() {
        return Some(to_slash(path));
    }

    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_slash(rel));
    }

    // Different absolute prefixes may name the same directory (macOS
    // /private/var, symlinked checkouts).
    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize()) {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return Some(to_slash(rel));
        }
    }

    // Deleted files cannot be canonicalized; try their parent directory.
    let parent = path.parent()?.canonicalize().ok()?;
    let root_canon = root.canonicalize().ok()?;
    let rel_parent = parent.strip_prefix(&root_canon).ok()?;
    Some(to_slash(&rel_parent.join(path.file_name()?)))
}

fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_pass_through() {
        assert_eq!(
            relative_str(Path::new("/project"), Path::new("src/app.ts")).as_deref(),
            Some("src/app.ts")
        );
    }

    #[test]
    fn absolute_paths_are_stripped() {
        assert_eq!(
            relative_str(Path::new("/project"), Path::new("/project/src/app.ts")).as_deref(),
            Some("src/app.ts")
        );
        assert_eq!(
            relative_str(Path::new("/project"), Path::new("/elsewhere/app.ts")),
            None
        );
    }
}
