// src/fs/mock.rs

use super::FileSystem;
use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir(Vec<String>), // List of child names
}

/// In-memory filesystem keyed by full path.
///
/// Parent directories are created implicitly whenever a file is added.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut files = HashMap::new();
        files.insert(PathBuf::from("."), MockEntry::Dir(Vec::new()));

        Self {
            files: Arc::new(Mutex::new(files)),
        }
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        let mut files = self.files.lock().unwrap();
        files.insert(path.clone(), MockEntry::File(content.into()));

        if let Some(parent) = non_empty_parent(&path) {
            ensure_dir_entry(&mut files, &parent);
            link_child(&mut files, &parent, &path);
        }
    }

    /// Contents of a file as UTF-8, for assertions.
    pub fn read_string(&self, path: impl AsRef<Path>) -> Option<String> {
        let files = self.files.lock().unwrap();
        match files.get(path.as_ref()) {
            Some(MockEntry::File(content)) => String::from_utf8(content.clone()).ok(),
            _ => None,
        }
    }

    /// All file paths currently stored, sorted.
    pub fn file_paths(&self) -> Vec<PathBuf> {
        let files = self.files.lock().unwrap();
        let mut paths: Vec<PathBuf> = files
            .iter()
            .filter(|(_, entry)| matches!(entry, MockEntry::File(_)))
            .map(|(path, _)| path.clone())
            .collect();
        paths.sort();
        paths
    }
}

fn non_empty_parent(path: &Path) -> Option<PathBuf> {
    let parent = path.parent()?;
    if parent.as_os_str().is_empty() {
        Some(PathBuf::from("."))
    } else {
        Some(parent.to_path_buf())
    }
}

fn unlink_child(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    if let Some(parent) = non_empty_parent(path) {
        if let (Some(MockEntry::Dir(children)), Some(name)) =
            (files.get_mut(&parent), path.file_name().and_then(|n| n.to_str()))
        {
            children.retain(|child| child != name);
        }
    }
}

fn link_child(files: &mut HashMap<PathBuf, MockEntry>, parent: &Path, child: &Path) {
    if let (Some(MockEntry::Dir(children)), Some(name)) =
        (files.get_mut(parent), child.file_name().and_then(|n| n.to_str()))
    {
        if !children.iter().any(|c| c == name) {
            children.push(name.to_string());
        }
    }
}

fn ensure_dir_entry(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    if files.contains_key(path) {
        return;
    }
    files.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));

    if let Some(parent) = non_empty_parent(path) {
        if parent != path {
            ensure_dir_entry(files, &parent);
            link_child(files, &parent, path);
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let files = self.files.lock().unwrap();
        match files.get(path) {
            Some(MockEntry::File(content)) => Ok(content.clone()),
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        files.contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        matches!(files.get(path), Some(MockEntry::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        matches!(files.get(path), Some(MockEntry::Dir(_)))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let files = self.files.lock().unwrap();
        match files.get(path) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        let mut files = self.files.lock().unwrap();
        if !matches!(files.get(path), Some(MockEntry::File(_))) {
            return Err(anyhow!("File not found: {:?}", path));
        }
        files.remove(path);
        unlink_child(&mut files, path);
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        let mut files = self.files.lock().unwrap();
        if !matches!(files.get(path), Some(MockEntry::Dir(_))) {
            return Err(anyhow!("Not a directory or not found: {:?}", path));
        }
        files.retain(|p, _| !p.starts_with(path));
        unlink_child(&mut files, path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_file_creates_parent_dirs() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/a/b.ts", "let x = 1;");

        assert!(fs.is_dir(Path::new("/p/src/a")));
        assert!(fs.is_dir(Path::new("/p/src")));
        assert_eq!(
            fs.read_dir(Path::new("/p/src")).unwrap(),
            vec![PathBuf::from("/p/src/a")]
        );
    }

    #[test]
    fn remove_dir_all_drops_nested_entries() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/dist/app.js", "a");
        fs.add_file("/p/dist/img/logo.png", "b");

        fs.remove_dir_all(Path::new("/p/dist/img")).unwrap();

        assert!(!fs.exists(Path::new("/p/dist/img/logo.png")));
        assert_eq!(
            fs.read_dir(Path::new("/p/dist")).unwrap(),
            vec![PathBuf::from("/p/dist/app.js")]
        );
    }
}
