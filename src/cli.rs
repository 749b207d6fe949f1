// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `sitepipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sitepipe",
    version,
    about = "Build, watch, serve and deploy a static site from a declarative task graph.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Task globs and outputs are relative to the directory containing it.
    #[arg(long, global = true, value_name = "PATH", default_value = "Sitepipe.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SITEPIPE_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate and show what would happen, without writing, deleting or
    /// uploading anything.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// What to do. Defaults to `build` of the default task set.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run tasks once (the default set when none are named) and exit.
    Build {
        /// Tasks to build; their never-built dependencies are included.
        #[arg(value_name = "TASK")]
        tasks: Vec<String>,
    },
    /// Build the default set, then serve the output and rebuild on change.
    Watch {
        /// Dev server port (overrides `[server].port`).
        #[arg(long)]
        port: Option<u16>,

        /// Do not start the dev server.
        #[arg(long)]
        no_serve: bool,
    },
    /// Upload changed build output to the configured FTP server.
    Deploy,
    /// Delete generated output, keeping paths matched by `[clean].exclude`.
    Clean,
}

impl CliArgs {
    /// The subcommand to run, with `build` of the default set as fallback.
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or(Command::Build { tasks: Vec::new() })
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_invocation_builds_the_default_set() {
        let args = CliArgs::try_parse_from(["sitepipe"]).unwrap();
        assert_eq!(args.config, "Sitepipe.toml");
        assert!(matches!(args.command(), Command::Build { tasks } if tasks.is_empty()));
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let args =
            CliArgs::try_parse_from(["sitepipe", "build", "styles", "pages", "--dry-run"]).unwrap();
        assert!(args.dry_run);
        match args.command() {
            Command::Build { tasks } => assert_eq!(tasks, vec!["styles", "pages"]),
            other => panic!("unexpected command {other:?}"),
        }

        let args = CliArgs::try_parse_from(["sitepipe", "--config", "site/S.toml", "watch", "--port", "8080"])
            .unwrap();
        assert_eq!(args.config, "site/S.toml");
        assert!(matches!(args.command(), Command::Watch { port: Some(8080), no_serve: false }));
    }
}
