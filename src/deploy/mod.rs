// src/deploy/mod.rs

//! Differential deployment of the build output.
//!
//! Local files selected by `[deploy].input` are compared with the remote
//! copy and sent only when the remote one is missing, has a different size,
//! or is older. Work is split over `parallel` independent connections.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::ConfigFile;
use crate::errors::TransferError;
use crate::fs::FileSystem;
use crate::pipeline::globs::{build_globset, slash_path, split_negations};
use crate::pipeline::inputs::walk_files;

pub mod ftp;
pub mod memory;
pub mod remote;

pub use ftp::FtpConnector;
pub use memory::MemoryRemote;
pub use remote::{RemoteConnector, RemoteStat, RemoteStore};

#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Directory (relative to the project root) whose layout is mirrored
    /// remotely.
    pub base: PathBuf,
    /// Globs relative to the project root; `!` entries exclude.
    pub input: Vec<String>,
    pub remote_dir: String,
    pub parallel: usize,
    /// Plan only; nothing is uploaded.
    pub dry_run: bool,
}

impl DeployOptions {
    pub fn from_config(cfg: &ConfigFile, dry_run: bool) -> Self {
        let deploy = cfg.deploy();
        Self {
            base: cfg.deploy_base(),
            input: cfg.deploy_input(),
            remote_dir: deploy.remote_dir.clone(),
            parallel: deploy.parallel.max(1),
            dry_run,
        }
    }
}

/// A local file eligible for deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    /// Forward-slash path relative to the deploy base.
    pub rel: String,
    /// Path relative to the project root.
    pub path: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployReport {
    /// Remote paths uploaded (or, for a dry run, that would be).
    pub transferred: Vec<String>,
    /// Files already up to date remotely.
    pub skipped: usize,
    /// `(remote path, error)` for every file that could not be sent.
    pub failed: Vec<(String, String)>,
}

impl DeployReport {
    fn merge(&mut self, other: DeployReport) {
        self.transferred.extend(other.transferred);
        self.skipped += other.skipped;
        self.failed.extend(other.failed);
    }
}

/// Local files under `root` matching the deploy globs, sorted by path.
pub fn collect_local(fs: &dyn FileSystem, root: &Path, opts: &DeployOptions) -> Result<Vec<LocalFile>> {
    let (positive, negative) = split_negations(&opts.input);
    let include = build_globset(&positive)?;
    let exclude = build_globset(&negative)?;

    let mut files = Vec::new();
    for path in walk_files(fs, root, &opts.base)? {
        let path_str = slash_path(&path);
        if !include.is_match(&path_str) || exclude.is_match(&path_str) {
            continue;
        }
        let meta = fs
            .metadata(&root.join(&path))
            .with_context(|| format!("reading metadata of {path_str}"))?;
        let rel = path.strip_prefix(&opts.base).unwrap_or(&path);
        files.push(LocalFile {
            rel: slash_path(rel),
            path,
            size: meta.len,
            modified: meta.modified,
        });
    }

    files.sort_by(|a, b| a.rel.cmp(&b.rel));
    Ok(files)
}

/// Remote path for a local file.
pub fn remote_path(remote_dir: &str, rel: &str) -> String {
    let dir = remote_dir.trim_end_matches('/');
    if dir.is_empty() {
        rel.to_string()
    } else {
        format!("{dir}/{rel}")
    }
}

/// Whether a file must be sent: missing remotely, different size, or
/// remote copy older than the local one. Times compare at whole seconds,
/// the resolution FTP reports.
pub fn needs_transfer(local: &LocalFile, remote: Option<&RemoteStat>) -> bool {
    let Some(remote) = remote else {
        return true;
    };
    if remote.size != local.size {
        return true;
    }
    match remote.modified {
        Some(remote_time) => remote_time < truncate_to_secs(local.modified),
        None => false,
    }
}

fn truncate_to_secs(time: SystemTime) -> SystemTime {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => UNIX_EPOCH + Duration::from_secs(d.as_secs()),
        Err(_) => time,
    }
}

/// Ask the remote about every file and keep the ones that need sending.
pub fn plan_transfers(
    local: &[LocalFile],
    remote: &mut dyn RemoteStore,
    remote_dir: &str,
) -> Result<Vec<LocalFile>, TransferError> {
    let mut plan = Vec::new();
    for file in local {
        let stat = remote.stat(&remote_path(remote_dir, &file.rel))?;
        if needs_transfer(file, stat.as_ref()) {
            plan.push(file.clone());
        }
    }
    Ok(plan)
}

/// Deploy the build output. Errors of individual files are collected in the
/// report; only local failures (unreadable tree, bad globs) are returned
/// as `Err`.
pub async fn run(
    fs: Arc<dyn FileSystem>,
    root: &Path,
    opts: &DeployOptions,
    connector: Arc<dyn RemoteConnector>,
) -> Result<DeployReport> {
    let local = collect_local(fs.as_ref(), root, opts)?;
    info!(
        files = local.len(),
        parallel = opts.parallel,
        remote_dir = %opts.remote_dir,
        dry_run = opts.dry_run,
        "starting deploy"
    );

    let workers_wanted = opts.parallel.max(1);
    let mut chunks: Vec<Vec<LocalFile>> = vec![Vec::new(); workers_wanted];
    for (idx, file) in local.into_iter().enumerate() {
        chunks[idx % workers_wanted].push(file);
    }

    let mut workers = JoinSet::new();
    for (worker, chunk) in chunks.into_iter().enumerate() {
        if chunk.is_empty() {
            continue;
        }
        let fs = fs.clone();
        let connector = connector.clone();
        let root = root.to_path_buf();
        let opts = opts.clone();
        workers.spawn_blocking(move || deploy_chunk(worker, fs.as_ref(), &root, &opts, connector.as_ref(), chunk));
    }

    let mut report = DeployReport::default();
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(chunk_report) => report.merge(chunk_report),
            Err(e) => error!("deploy worker panicked: {e}"),
        }
    }

    report.transferred.sort();
    info!(
        transferred = report.transferred.len(),
        skipped = report.skipped,
        failed = report.failed.len(),
        "deploy finished"
    );
    Ok(report)
}

fn deploy_chunk(
    worker: usize,
    fs: &dyn FileSystem,
    root: &Path,
    opts: &DeployOptions,
    connector: &dyn RemoteConnector,
    chunk: Vec<LocalFile>,
) -> DeployReport {
    let mut report = DeployReport::default();

    let fail_all = |report: &mut DeployReport, files: &[LocalFile], err: &TransferError| {
        for file in files {
            report
                .failed
                .push((remote_path(&opts.remote_dir, &file.rel), err.to_string()));
        }
    };

    let mut remote = match connector.connect() {
        Ok(remote) => remote,
        Err(err) => {
            error!(worker, error = %err, "deploy connection failed");
            fail_all(&mut report, &chunk, &err);
            return report;
        }
    };

    let plan = match plan_transfers(&chunk, remote.as_mut(), &opts.remote_dir) {
        Ok(plan) => plan,
        Err(err) => {
            error!(worker, error = %err, "querying remote files failed");
            fail_all(&mut report, &chunk, &err);
            return report;
        }
    };
    report.skipped = chunk.len() - plan.len();

    for file in plan {
        let target = remote_path(&opts.remote_dir, &file.rel);
        if opts.dry_run {
            info!(worker, path = %target, "would transfer");
            report.transferred.push(target);
            continue;
        }

        let result = fs
            .read(&root.join(&file.path))
            .map_err(|e| TransferError::new(format!("reading {}: {e:#}", file.path.display())))
            .and_then(|contents| remote.put(&target, &contents));
        match result {
            Ok(()) => {
                debug!(worker, path = %target, bytes = file.size, "transferred");
                report.transferred.push(target);
            }
            Err(err) => {
                warn!(worker, path = %target, error = %err, "transfer failed");
                report.failed.push((target, err.to_string()));
            }
        }
    }

    if let Err(err) = remote.close() {
        debug!(worker, error = %err, "closing remote connection");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn local(size: u64, secs: u64) -> LocalFile {
        LocalFile {
            rel: "a.css".into(),
            path: "dist/a.css".into(),
            size,
            modified: UNIX_EPOCH + Duration::from_millis(secs * 1000 + 400),
        }
    }

    fn stat(size: u64, secs: Option<u64>) -> RemoteStat {
        RemoteStat {
            size,
            modified: secs.map(|s| UNIX_EPOCH + Duration::from_secs(s)),
        }
    }

    #[test]
    fn transfer_decision() {
        let file = local(10, 100);
        assert!(needs_transfer(&file, None));
        assert!(needs_transfer(&file, Some(&stat(11, Some(200)))));
        assert!(needs_transfer(&file, Some(&stat(10, Some(99)))));
        // Same second, sub-second local precision ignored.
        assert!(!needs_transfer(&file, Some(&stat(10, Some(100)))));
        assert!(!needs_transfer(&file, Some(&stat(10, Some(150)))));
        assert!(!needs_transfer(&file, Some(&stat(10, None))));
    }

    #[test]
    fn remote_paths_join_cleanly() {
        assert_eq!(remote_path("/www/", "css/a.css"), "/www/css/a.css");
        assert_eq!(remote_path("", "index.html"), "index.html");
    }

    fn site() -> Arc<MockFileSystem> {
        let fs = MockFileSystem::new();
        fs.add_file("dist/index.html", "<p>hi</p>");
        fs.add_file("dist/css/site.css", "a{}");
        fs.add_file("dist/js/app.js", "f();");
        fs.add_file("dist/js/app.js.map", "{}");
        fs.add_file("src/main.scss", "a{}");
        Arc::new(fs)
    }

    fn options(parallel: usize, dry_run: bool) -> DeployOptions {
        DeployOptions {
            base: PathBuf::from("dist"),
            input: vec!["dist/**/*".into(), "!**/*.map".into()],
            remote_dir: "/www".into(),
            parallel,
            dry_run,
        }
    }

    #[test]
    fn collects_relative_to_base_and_honours_negations() {
        let fs = site();
        let files = collect_local(fs.as_ref(), Path::new("."), &options(1, false)).unwrap();
        let rels: Vec<&str> = files.iter().map(|f| f.rel.as_str()).collect();
        assert_eq!(rels, vec!["css/site.css", "index.html", "js/app.js"]);
    }

    #[tokio::test]
    async fn second_deploy_transfers_nothing() {
        let fs = site();
        let remote = MemoryRemote::new();
        let connector: Arc<dyn RemoteConnector> = Arc::new(remote.clone());

        let first = run(fs.clone(), Path::new("."), &options(2, false), connector.clone())
            .await
            .unwrap();
        assert_eq!(
            first.transferred,
            vec!["/www/css/site.css", "/www/index.html", "/www/js/app.js"]
        );
        assert_eq!(remote.contents("/www/index.html").unwrap(), b"<p>hi</p>".to_vec());

        remote.clear_puts();
        let second = run(fs, Path::new("."), &options(2, false), connector).await.unwrap();
        assert!(second.transferred.is_empty());
        assert_eq!(second.skipped, 3);
        assert!(remote.puts().is_empty());
    }

    #[tokio::test]
    async fn dry_run_plans_without_uploading() {
        let remote = MemoryRemote::new();
        let report = run(site(), Path::new("."), &options(3, true), Arc::new(remote.clone()))
            .await
            .unwrap();
        assert_eq!(report.transferred.len(), 3);
        assert!(remote.puts().is_empty());
        assert!(remote.contents("/www/index.html").is_none());
    }

    #[tokio::test]
    async fn failures_are_reported_per_file() {
        let remote = MemoryRemote::new();
        remote.fail_on("/www/js/app.js");
        let report = run(site(), Path::new("."), &options(1, false), Arc::new(remote.clone()))
            .await
            .unwrap();
        assert_eq!(report.transferred, vec!["/www/css/site.css", "/www/index.html"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "/www/js/app.js");
    }

    #[tokio::test]
    async fn refused_connection_fails_every_file() {
        let remote = MemoryRemote::new();
        remote.refuse_connections();
        let report = run(site(), Path::new("."), &options(2, false), Arc::new(remote))
            .await
            .unwrap();
        assert!(report.transferred.is_empty());
        assert_eq!(report.failed.len(), 3);
    }

    #[tokio::test]
    async fn files_spread_round_robin_over_more_workers_than_files() {
        let remote = MemoryRemote::new();
        let report = run(site(), Path::new("."), &options(5, false), Arc::new(remote.clone()))
            .await
            .unwrap();
        assert_eq!(report.transferred.len(), 3);
        assert!(report.failed.is_empty());
        assert_eq!(remote.puts().len(), 3);
    }
}
