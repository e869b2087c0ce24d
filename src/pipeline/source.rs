// src/pipeline/source.rs

//! Reading pipeline sources from glob patterns.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use globset::Glob;
use tracing::debug;

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::pipeline::FileRecord;

const GLOB_META: &[char] = &['*', '?', '[', ']', '{', '}'];

/// Split a pattern into its literal directory prefix and whether the rest
/// contains glob syntax.
///
/// - `src/**/*.ts` → (`src`, true)
/// - `typings/tsd.d.ts` → (`typings`, false)
pub fn glob_base(pattern: &str) -> (PathBuf, bool) {
    let pattern = pattern.strip_prefix("./").unwrap_or(pattern);
    let mut base = PathBuf::new();
    let components: Vec<&str> = pattern.split('/').collect();

    for (i, component) in components.iter().enumerate() {
        if component.contains(GLOB_META) {
            return (base, true);
        }
        if i + 1 < components.len() {
            base.push(component);
        }
    }
    (base, false)
}

/// Read every file matched by `patterns`, relative to `root`.
///
/// Files keep pattern order; within one pattern they are sorted by path. A
/// file matched by several patterns is read once. A pattern whose base
/// directory does not exist matches nothing.
pub fn read_sources(
    fs: &dyn FileSystem,
    root: &Path,
    patterns: &[String],
) -> Result<Vec<FileRecord>> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut records = Vec::new();

    for pattern in patterns {
        let normalized = pattern.strip_prefix("./").unwrap_or(pattern);
        let (base_rel, is_glob) = glob_base(normalized);
        let base = root.join(&base_rel);

        let mut matched: Vec<PathBuf> = if is_glob {
            let matcher = Glob::new(normalized)?.compile_matcher();
            walk_files(fs, &base)?
                .into_iter()
                .filter(|path| {
                    path.strip_prefix(root)
                        .map(|rel| matcher.is_match(rel.to_string_lossy().replace('\\', "/")))
                        .unwrap_or(false)
                })
                .collect()
        } else {
            let path = root.join(normalized);
            if fs.is_file(&path) { vec![path] } else { Vec::new() }
        };
        matched.sort();

        debug!(pattern = %pattern, files = matched.len(), "resolved source pattern");

        for path in matched {
            if !seen.insert(path.clone()) {
                continue;
            }
            let rel = path.strip_prefix(&base).unwrap_or(&path).to_path_buf();
            let contents = fs.read(&path)?;
            records.push(FileRecord::new(base.clone(), rel, contents));
        }
    }

    Ok(records)
}

fn walk_files(fs: &dyn FileSystem, dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !fs.is_dir(dir) {
        return Ok(files);
    }

    let mut stack = vec![dir.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                files.push(path);
            }
        }
    }
    Ok(files)
}
