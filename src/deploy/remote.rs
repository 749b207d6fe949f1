// src/deploy/remote.rs

use std::fmt::Debug;
use std::time::SystemTime;

use crate::errors::TransferError;

/// What the remote side knows about a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteStat {
    pub size: u64,
    /// `None` when the server cannot report modification times.
    pub modified: Option<SystemTime>,
}

/// One open connection to a deploy target. Paths are forward-slash,
/// absolute or relative to the login directory.
pub trait RemoteStore: Send {
    /// `Ok(None)` when the file does not exist remotely.
    fn stat(&mut self, path: &str) -> Result<Option<RemoteStat>, TransferError>;

    /// Upload `contents` to `path`, creating parent directories.
    fn put(&mut self, path: &str, contents: &[u8]) -> Result<(), TransferError>;

    fn close(&mut self) -> Result<(), TransferError> {
        Ok(())
    }
}

/// Opens independent connections, one per transfer stream.
pub trait RemoteConnector: Send + Sync + Debug {
    fn connect(&self) -> Result<Box<dyn RemoteStore>, TransferError>;
}
