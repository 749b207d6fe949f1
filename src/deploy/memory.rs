// src/deploy/memory.rs

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use crate::deploy::remote::{RemoteConnector, RemoteStat, RemoteStore};
use crate::errors::TransferError;

#[derive(Debug, Clone)]
struct MemoryFile {
    contents: Vec<u8>,
    modified: SystemTime,
}

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeMap<String, MemoryFile>,
    puts: Vec<String>,
    failing: HashSet<String>,
    refuse_connections: bool,
}

/// In-memory deploy target. Clones share the same state, so one instance
/// can serve as the connector and be inspected after a deploy.
///
/// Uploaded files get a modification time of "now", like a real server.
#[derive(Debug, Clone, Default)]
pub struct MemoryRemote {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a remote file.
    pub fn insert(&self, path: &str, contents: impl Into<Vec<u8>>, modified: SystemTime) {
        let mut state = self.state.lock().expect("memory remote poisoned");
        state.files.insert(
            path.to_string(),
            MemoryFile {
                contents: contents.into(),
                modified,
            },
        );
    }

    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        let state = self.state.lock().expect("memory remote poisoned");
        state.files.get(path).map(|f| f.contents.clone())
    }

    /// Every uploaded path, in upload order, across all connections.
    pub fn puts(&self) -> Vec<String> {
        self.state.lock().expect("memory remote poisoned").puts.clone()
    }

    pub fn clear_puts(&self) {
        self.state.lock().expect("memory remote poisoned").puts.clear();
    }

    /// Make uploads of `path` fail.
    pub fn fail_on(&self, path: &str) {
        let mut state = self.state.lock().expect("memory remote poisoned");
        state.failing.insert(path.to_string());
    }

    pub fn refuse_connections(&self) {
        self.state.lock().expect("memory remote poisoned").refuse_connections = true;
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, TransferError> {
        self.state
            .lock()
            .map_err(|_| TransferError::new("memory remote poisoned"))
    }
}

impl RemoteConnector for MemoryRemote {
    fn connect(&self) -> Result<Box<dyn RemoteStore>, TransferError> {
        if self.lock()?.refuse_connections {
            return Err(TransferError::new("connection refused"));
        }
        Ok(Box::new(self.clone()))
    }
}

impl RemoteStore for MemoryRemote {
    fn stat(&mut self, path: &str) -> Result<Option<RemoteStat>, TransferError> {
        Ok(self.lock()?.files.get(path).map(|f| RemoteStat {
            size: f.contents.len() as u64,
            modified: Some(f.modified),
        }))
    }

    fn put(&mut self, path: &str, contents: &[u8]) -> Result<(), TransferError> {
        let mut state = self.lock()?;
        if state.failing.contains(path) {
            return Err(TransferError::new(format!("STOR {path}: 553 not allowed")));
        }
        let modified = SystemTime::now();
        state.files.insert(
            path.to_string(),
            MemoryFile {
                contents: contents.to_vec(),
                modified,
            },
        );
        state.puts.push(path.to_string());
        Ok(())
    }
}
