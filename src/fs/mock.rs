// src/fs/mock.rs

use super::{FileMeta, FileSystem};
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File { contents: Vec<u8>, modified: SystemTime },
    Dir(Vec<String>), // List of child names
}

/// In-memory filesystem for tests.
///
/// Paths are stored without `.` components, so `./src/a.js` and `src/a.js`
/// refer to the same entry. Every write advances a fake clock by one second,
/// giving later writes strictly newer mtimes.
#[derive(Debug, Clone)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
    clock: Arc<Mutex<SystemTime>>,
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

fn key(path: &Path) -> PathBuf {
    let cleaned: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    if cleaned.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        cleaned
    }
}

fn parent_key(path: &Path) -> Option<PathBuf> {
    if path == Path::new(".") {
        return None;
    }
    Some(match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    })
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut files = HashMap::new();
        // Ensure root exists
        files.insert(PathBuf::from("."), MockEntry::Dir(Vec::new()));

        Self {
            files: Arc::new(Mutex::new(files)),
            clock: Arc::new(Mutex::new(SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000))),
        }
    }

    fn tick(&self) -> SystemTime {
        let mut clock = self.clock.lock().unwrap();
        *clock += Duration::from_secs(1);
        *clock
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let modified = self.tick();
        self.add_file_with_mtime(path, content, modified);
    }

    pub fn add_file_with_mtime(
        &self,
        path: impl AsRef<Path>,
        content: impl Into<Vec<u8>>,
        modified: SystemTime,
    ) {
        let path = key(path.as_ref());
        let mut files = self.files.lock().unwrap();
        files.insert(
            path.clone(),
            MockEntry::File {
                contents: content.into(),
                modified,
            },
        );
        Self::link_into_parent(&mut files, &path);
    }

    /// Contents of a file, if present.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let files = self.files.lock().unwrap();
        match files.get(&key(path.as_ref())) {
            Some(MockEntry::File { contents, .. }) => Some(contents.clone()),
            _ => None,
        }
    }

    /// All file paths currently stored, sorted.
    pub fn file_paths(&self) -> Vec<PathBuf> {
        let files = self.files.lock().unwrap();
        let mut paths: Vec<PathBuf> = files
            .iter()
            .filter(|(_, e)| matches!(e, MockEntry::File { .. }))
            .map(|(p, _)| p.clone())
            .collect();
        paths.sort();
        paths
    }

    fn link_into_parent(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        let Some(parent) = parent_key(path) else {
            return;
        };

        if !files.contains_key(&parent) {
            files.insert(parent.clone(), MockEntry::Dir(Vec::new()));
            Self::link_into_parent(files, &parent);
        }

        if let Some(MockEntry::Dir(children)) = files.get_mut(&parent) {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if !children.iter().any(|c| c == name) {
                    children.push(name.to_string());
                }
            }
        }
    }

    fn unlink_from_parent(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        if let Some(parent) = parent_key(path) {
            if let Some(MockEntry::Dir(children)) = files.get_mut(&parent) {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    children.retain(|c| c != name);
                }
            }
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let files = self.files.lock().unwrap();
        match files.get(&key(path)) {
            Some(MockEntry::File { contents, .. }) => Ok(contents.clone()),
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        files.contains_key(&key(path))
    }

    fn is_file(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        matches!(files.get(&key(path)), Some(MockEntry::File { .. }))
    }

    fn is_dir(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        matches!(files.get(&key(path)), Some(MockEntry::Dir(_)))
    }

    fn metadata(&self, path: &Path) -> Result<FileMeta> {
        let files = self.files.lock().unwrap();
        match files.get(&key(path)) {
            Some(MockEntry::File { contents, modified }) => Ok(FileMeta {
                len: contents.len() as u64,
                modified: *modified,
            }),
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        let path = key(path);
        let mut files = self.files.lock().unwrap();
        match files.get(&path) {
            Some(MockEntry::File { .. }) => {
                files.remove(&path);
                Self::unlink_from_parent(&mut files, &path);
                Ok(())
            }
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn remove_dir(&self, path: &Path) -> Result<()> {
        let path = key(path);
        let mut files = self.files.lock().unwrap();
        match files.get(&path) {
            Some(MockEntry::Dir(children)) if children.is_empty() => {
                files.remove(&path);
                Self::unlink_from_parent(&mut files, &path);
                Ok(())
            }
            Some(MockEntry::Dir(_)) => Err(anyhow!("Directory not empty: {:?}", path)),
            Some(MockEntry::File { .. }) => Err(anyhow!("Not a directory: {:?}", path)),
            None => Err(anyhow!("Directory not found: {:?}", path)),
        }
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let files = self.files.lock().unwrap();
        match files.get(&key(path)) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_prefixed_and_plain_paths_are_the_same_entry() {
        let fs = MockFileSystem::new();
        fs.add_file("./src/a.js", "a");
        assert!(fs.is_file(Path::new("src/a.js")));
        assert_eq!(fs.read_dir(Path::new(".")).unwrap(), vec![PathBuf::from("./src")]);
    }

    #[test]
    fn remove_dir_refuses_non_empty_directories() {
        let fs = MockFileSystem::new();
        fs.add_file("dist/a/b.txt", "b");
        assert!(fs.remove_dir(Path::new("dist/a")).is_err());
        fs.remove_file(Path::new("dist/a/b.txt")).unwrap();
        fs.remove_dir(Path::new("dist/a")).unwrap();
        assert!(!fs.exists(Path::new("dist/a")));
        assert!(fs.read_dir(Path::new("dist")).unwrap().is_empty());
    }

    #[test]
    fn writes_get_increasing_mtimes() {
        let fs = MockFileSystem::new();
        fs.add_file("a", "1");
        fs.add_file("b", "2");
        let a = fs.metadata(Path::new("a")).unwrap();
        let b = fs.metadata(Path::new("b")).unwrap();
        assert!(b.modified > a.modified);
        assert_eq!(a.len, 1);
    }
}
