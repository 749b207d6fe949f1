// src/deploy/ftp.rs

use std::collections::HashSet;
use std::io::Cursor;
use std::time::SystemTime;

use chrono::{DateTime, NaiveDateTime, Utc};
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream};
use tracing::{debug, info};

use crate::config::DeploySection;
use crate::deploy::remote::{RemoteConnector, RemoteStat, RemoteStore};
use crate::errors::TransferError;

/// FTP credentials and endpoint.
#[derive(Clone)]
pub struct FtpConnector {
    host: String,
    port: u16,
    user: String,
    password: String,
}

impl std::fmt::Debug for FtpConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FtpConnector")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

impl FtpConnector {
    pub fn from_config(cfg: &DeploySection) -> Self {
        Self {
            host: cfg.host.clone(),
            port: cfg.port,
            user: cfg.user.clone(),
            password: cfg.effective_password(),
        }
    }
}

impl RemoteConnector for FtpConnector {
    fn connect(&self) -> Result<Box<dyn RemoteStore>, TransferError> {
        if self.host.is_empty() {
            return Err(TransferError::new("no deploy host configured"));
        }
        if self.user.is_empty() {
            return Err(TransferError::new("no deploy user configured"));
        }

        let mut stream = FtpStream::connect((self.host.as_str(), self.port))
            .map_err(|e| ftp_error(&format!("connecting to {}:{}", self.host, self.port), e))?;
        stream
            .login(&self.user, &self.password)
            .map_err(|e| ftp_error(&format!("logging in as {}", self.user), e))?;
        stream
            .transfer_type(FileType::Binary)
            .map_err(|e| ftp_error("switching to binary mode", e))?;

        info!(host = %self.host, port = self.port, "ftp connection established");
        Ok(Box::new(FtpStore {
            stream,
            created_dirs: HashSet::new(),
        }))
    }
}

struct FtpStore {
    stream: FtpStream,
    created_dirs: HashSet<String>,
}

impl FtpStore {
    fn ensure_parent_dirs(&mut self, path: &str) {
        let Some((parent, _)) = path.rsplit_once('/') else {
            return;
        };

        let mut current = String::new();
        for segment in parent.split('/') {
            if segment.is_empty() {
                if current.is_empty() {
                    current.push('/');
                }
                continue;
            }
            if !current.is_empty() && !current.ends_with('/') {
                current.push('/');
            }
            current.push_str(segment);

            if self.created_dirs.insert(current.clone()) {
                // Fails when the directory already exists.
                if let Err(e) = self.stream.mkdir(&current) {
                    debug!(dir = %current, error = %e, "mkdir skipped");
                }
            }
        }
    }
}

/// MDTM replies are UTC without an offset.
fn mdtm_to_system_time(time: NaiveDateTime) -> SystemTime {
    DateTime::<Utc>::from_naive_utc_and_offset(time, Utc).into()
}

impl RemoteStore for FtpStore {
    fn stat(&mut self, path: &str) -> Result<Option<RemoteStat>, TransferError> {
        let size = match self.stream.size(path) {
            Ok(size) => size as u64,
            // 550 and friends: no such file.
            Err(FtpError::UnexpectedResponse(_)) => return Ok(None),
            Err(e) => return Err(ftp_error(&format!("SIZE {path}"), e)),
        };

        let modified = self.stream.mdtm(path).ok().map(mdtm_to_system_time);

        Ok(Some(RemoteStat { size, modified }))
    }

    fn put(&mut self, path: &str, contents: &[u8]) -> Result<(), TransferError> {
        self.ensure_parent_dirs(path);
        let mut reader = Cursor::new(contents);
        self.stream
            .put_file(path, &mut reader)
            .map_err(|e| ftp_error(&format!("STOR {path}"), e))?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransferError> {
        self.stream.quit().map_err(|e| ftp_error("QUIT", e))
    }
}

fn ftp_error(action: &str, err: FtpError) -> TransferError {
    TransferError::new(format!("{action}: {err}"))
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn mdtm_timestamps_are_read_as_utc() {
        let time = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 30, 5)
            .unwrap();
        assert_eq!(
            mdtm_to_system_time(time),
            UNIX_EPOCH + Duration::from_secs(1_709_296_205)
        );
    }

    #[test]
    fn missing_host_fails_at_connect() {
        let connector = FtpConnector {
            host: String::new(),
            port: 21,
            user: "deploy".into(),
            password: String::new(),
        };
        match connector.connect() {
            Err(err) => assert_eq!(err.message, "no deploy host configured"),
            Ok(_) => panic!("connected without a host"),
        }
    }
}
