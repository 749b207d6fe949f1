// src/watch/watcher.rs

use std::path::PathBuf;

use anyhow::Result;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::engine::RuntimeEvent;
use crate::watch::event_handler::process_file_change;
use crate::watch::patterns::WatchRuleSet;

/// Keeps the underlying `RecommendedWatcher` alive. Dropping this handle
/// stops file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch `root` recursively and send `RuntimeEvent::TasksTriggered` for the
/// watch rules a change matches.
///
/// `root` is the project root all watch globs are relative to.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    rules: WatchRuleSet,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or_else(|_| root.clone());

    // notify calls back on its own thread; hop into async via an unbounded channel.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    eprintln!("sitepipe: failed to forward notify event: {err}");
                }
            }
            Err(err) => eprintln!("sitepipe: file watch error: {err}"),
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;

    info!(rules = rules.rules().len(), "file watcher started on {:?}", root);

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            debug!(?event, "received notify event");
            if !process_file_change(&root, event, &rules, &runtime_tx).await {
                break;
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}
