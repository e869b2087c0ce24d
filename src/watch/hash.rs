// src/watch/hash.rs

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

/// Compute the hash of a single file.
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file =
        File::open(path).with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Last seen content hash per file, kept in memory by one watch listener.
#[derive(Debug, Default)]
pub struct ContentHashes {
    seen: HashMap<PathBuf, String>,
}

impl ContentHashes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current hash of `path` and report whether it differs from
    /// the previous one.
    ///
    /// A file seen for the first time counts as changed. A file that cannot
    /// be read (typically deleted) also counts as changed and is forgotten.
    pub fn changed(&mut self, path: &Path) -> bool {
        match compute_file_hash(path) {
            Ok(hash) => {
                let previous = self.seen.insert(path.to_path_buf(), hash.clone());
                let changed = previous.as_deref() != Some(hash.as_str());
                debug!(?path, %hash, changed, "checked content hash");
                changed
            }
            Err(err) => {
                debug!(?path, error = %err, "file not hashable; treating as changed");
                self.seen.remove(path);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unchanged_content_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("main.ts");
        std::fs::write(&file, "let a = 1;\n").unwrap();

        let mut hashes = ContentHashes::new();
        assert!(hashes.changed(&file));
        assert!(!hashes.changed(&file));

        std::fs::write(&file, "let a = 2;\n").unwrap();
        assert!(hashes.changed(&file));
    }

    #[test]
    fn missing_file_counts_as_changed() {
        let dir = tempfile::tempdir().unwrap();
        let mut hashes = ContentHashes::new();
        assert!(hashes.changed(&dir.path().join("gone.ts")));
    }
}
