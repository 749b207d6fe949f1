// src/lib.rs

pub mod clean;
pub mod cli;
pub mod config;
pub mod dag;
pub mod deploy;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod serve;
pub mod transform;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::cli::{CliArgs, Command};
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::dag::{DagGraph, Scheduler};
use crate::deploy::{DeployOptions, FtpConnector};
use crate::engine::{
    CoreRuntime, RunSummary, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason,
};
use crate::errors::SitepipeError;
use crate::exec::{ExecContext, RealExecutorBackend};
use crate::fs::RealFileSystem;
use crate::pipeline::TaskRegistry;
use crate::serve::{LiveReload, ServerOptions};
use crate::types::FailurePolicy;
use crate::watch::WatchRuleSet;

/// How a command ended, mapped onto the process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    /// Some task or transfer failed (exit 1).
    Failed,
}

impl From<CommandStatus> for ExitCode {
    fn from(status: CommandStatus) -> Self {
        match status {
            CommandStatus::Success => ExitCode::SUCCESS,
            CommandStatus::Failed => ExitCode::FAILURE,
        }
    }
}

/// High-level entry point used by `main.rs`.
///
/// Loads and validates the config once, then dispatches the subcommand.
/// Configuration errors surface as `Err` before any task starts.
pub async fn run(args: CliArgs) -> Result<CommandStatus> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;
    let root = config_root_dir(&config_path);
    debug!(root = ?root, "project root");

    match args.command() {
        Command::Build { tasks } => {
            let targets = build_targets(&cfg, tasks)?;
            if args.dry_run {
                print_dry_run(&cfg, &targets);
                return Ok(CommandStatus::Success);
            }
            let summary = run_pipeline(&cfg, &root, targets, None).await?;
            Ok(build_status(&summary, cfg.config_section().on_task_failure))
        }
        Command::Watch { port, no_serve } => {
            let targets = cfg.default_tasks();
            if args.dry_run {
                print_dry_run(&cfg, &targets);
                return Ok(CommandStatus::Success);
            }
            let serve = ServeSetup {
                port: port.unwrap_or(cfg.server().port),
                enabled: !no_serve,
            };
            run_pipeline(&cfg, &root, targets, Some(serve)).await?;
            Ok(CommandStatus::Success)
        }
        Command::Deploy => {
            let opts = DeployOptions::from_config(&cfg, args.dry_run);
            let connector = Arc::new(FtpConnector::from_config(cfg.deploy()));
            let report = deploy::run(Arc::new(RealFileSystem), &root, &opts, connector).await?;
            for (path, err) in report.failed.iter() {
                error!(path = %path, error = %err, "deploy failed for file");
            }
            if report.failed.is_empty() {
                Ok(CommandStatus::Success)
            } else {
                Ok(CommandStatus::Failed)
            }
        }
        Command::Clean => {
            let report = clean::clean(
                &RealFileSystem,
                &root,
                &cfg.clean_include(),
                cfg.clean_exclude(),
                args.dry_run,
            )?;
            if args.dry_run {
                for path in report.removed_files.iter().chain(report.removed_dirs.iter()) {
                    println!("would remove {}", path.display());
                }
            }
            Ok(CommandStatus::Success)
        }
    }
}

/// Dev server settings for watch mode.
#[derive(Debug, Clone, Copy)]
struct ServeSetup {
    port: u16,
    enabled: bool,
}

/// Named tasks, or the default set when none are given.
fn build_targets(cfg: &ConfigFile, requested: Vec<String>) -> Result<Vec<String>, SitepipeError> {
    if requested.is_empty() {
        return Ok(cfg.default_tasks());
    }
    for name in requested.iter() {
        if cfg.task(name).is_none() {
            return Err(SitepipeError::TaskNotFound(name.clone()));
        }
    }
    Ok(requested)
}

/// Wire scheduler, executor and (for watch mode) watcher plus dev server,
/// seed the targets and drive the runtime until it exits.
///
/// Without `serve` this is a one-shot build that returns once every target
/// has finished. With it, the runtime keeps going until Ctrl-C.
async fn run_pipeline(
    cfg: &ConfigFile,
    root: &Path,
    targets: Vec<String>,
    serve: Option<ServeSetup>,
) -> Result<RunSummary> {
    let watching = serve.is_some();
    let scheduler = Scheduler::from_config(cfg);
    let section = cfg.config_section();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let reload = match serve {
        Some(setup) if setup.enabled => {
            let reload = LiveReload::new();
            let options = ServerOptions {
                base_dir: root.join(cfg.server_base_dir()),
                live_reload: cfg.server().live_reload,
            };
            let addr = serve::spawn_server(setup.port, options, reload.clone()).await?;
            info!("serving build output at http://{addr}/");
            Some(reload)
        }
        _ => None,
    };

    let ctx = ExecContext {
        registry: TaskRegistry::from_config(cfg, root)?,
        fs: Arc::new(RealFileSystem),
        root: root.to_path_buf(),
        reload,
    };
    let executor = RealExecutorBackend::new(ctx, rt_tx.clone());

    let _watcher_handle = if watching {
        let rules = WatchRuleSet::from_config(cfg)?;
        if rules.is_empty() {
            warn!("no [[watch]] rules configured; nothing will be rebuilt on change");
        }
        Some(watch::spawn_watcher(root.to_path_buf(), rules, rt_tx.clone())?)
    } else {
        None
    };

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    info!(?targets, watching, "starting build");
    rt_tx
        .send(RuntimeEvent::TasksTriggered {
            tasks: targets,
            reason: TriggerReason::Manual,
        })
        .await?;

    let options = RuntimeOptions {
        exit_when_idle: !watching,
    };
    let core = CoreRuntime::new(
        scheduler,
        section.triggered_while_running_behaviour,
        section.queue_length,
        options,
    );

    let runtime = Runtime::new(core, rt_rx, executor);
    let summary = runtime.run().await?;

    info!(
        succeeded = summary.succeeded.len(),
        failed = summary.failed.len(),
        blocked = summary.blocked.len(),
        "build finished"
    );
    Ok(summary)
}

/// Status of a one-shot build under the configured failure policy.
pub fn build_status(summary: &RunSummary, policy: FailurePolicy) -> CommandStatus {
    for (task, err) in summary.failed.iter() {
        error!(task = %task, "task failed: {err}");
    }
    match policy {
        FailurePolicy::Fail if summary.has_failures() => CommandStatus::Failed,
        _ => CommandStatus::Success,
    }
}

/// Figure out the project root.
///
/// - If the config path has a non-empty parent (e.g. "site/Sitepipe.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Sitepipe.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Dry-run output: the tasks that would run, in dependency order.
fn print_dry_run(cfg: &ConfigFile, targets: &[String]) {
    let section = cfg.config_section();
    println!("sitepipe dry-run");
    println!("  config.build_root = {}", section.build_root);
    println!("  config.on_task_failure = {:?}", section.on_task_failure);
    println!(
        "  config.triggered_while_running_behaviour = {:?}",
        section.triggered_while_running_behaviour
    );
    println!("  config.queue_length = {}", section.queue_length);
    println!("  targets = {:?}", targets);
    println!();

    let graph = DagGraph::from_config(cfg);
    let order = graph.topological_order();
    println!("tasks ({}):", order.len());
    for name in order.iter() {
        let Some(task) = cfg.task(name) else {
            continue;
        };
        println!("  - {name}");
        println!("      input: {:?}", task.input);
        println!("      output: {}", task.output);
        if !task.after.is_empty() {
            println!("      after: {:?}", task.after);
        }
        let kinds: Vec<&str> = task.transform.iter().map(|t| t.kind()).collect();
        println!("      transform: {}", kinds.join(" -> "));
    }

    if !cfg.watch_rules().is_empty() {
        println!();
        println!("watch rules ({}):", cfg.watch_rules().len());
        for rule in cfg.watch_rules() {
            println!("  - {:?} -> {:?}", rule.paths, rule.tasks);
            if !rule.exclude.is_empty() {
                println!("      exclude: {:?}", rule.exclude);
            }
        }
    }

    debug!("dry-run complete (no execution)");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_policy_decides_the_exit_code() {
        let summary = RunSummary {
            succeeded: vec!["styles".into()],
            failed: vec![("scripts".into(), "minify_js: bad".into())],
            blocked: Vec::new(),
        };
        assert_eq!(build_status(&summary, FailurePolicy::Fail), CommandStatus::Failed);
        assert_eq!(build_status(&summary, FailurePolicy::Continue), CommandStatus::Success);
        assert_eq!(
            build_status(&RunSummary::default(), FailurePolicy::Fail),
            CommandStatus::Success
        );
    }

    #[test]
    fn config_next_to_a_bare_filename_uses_cwd() {
        assert_eq!(
            config_root_dir(Path::new("site/Sitepipe.toml")),
            PathBuf::from("site")
        );
        assert!(config_root_dir(Path::new("Sitepipe.toml")).is_absolute());
    }
}
