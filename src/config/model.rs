// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::{FailurePolicy, TriggerWhileRunningBehaviour};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// build_root = "dist"
/// default = ["pages", "styles", "scripts"]
///
/// [task.styles]
/// input = ["src/scss/**/*.scss"]
/// output = "dist/assets/styles"
///
/// [[task.styles.transform]]
/// kind = "sass"
///
/// [[watch]]
/// paths = ["src/scss/**/*.scss"]
/// tasks = ["styles"]
/// ```
///
/// This is the unvalidated shape; the rest of the crate works with
/// [`ConfigFile`], obtained through `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    /// Global behaviour config from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,

    /// Watch rules from `[[watch]]`, in declaration order.
    #[serde(default)]
    pub watch: Vec<WatchRuleConfig>,

    /// Dev server settings from `[server]`.
    #[serde(default)]
    pub server: ServerSection,

    /// Output cleanup patterns from `[clean]`.
    #[serde(default)]
    pub clean: CleanSection,

    /// FTP deployment settings from `[deploy]`.
    #[serde(default)]
    pub deploy: DeploySection,
}

/// Validated, immutable configuration.
///
/// Built once at startup and shared by reference (or `Arc`) with every
/// component. There is no way to mutate it after construction.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    config: ConfigSection,
    task: BTreeMap<String, TaskConfig>,
    watch: Vec<WatchRuleConfig>,
    server: ServerSection,
    clean: CleanSection,
    deploy: DeploySection,
}

impl ConfigFile {
    /// Wrap already-validated sections. Only `validate.rs` should call this.
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            config: raw.config,
            task: raw.task,
            watch: raw.watch,
            server: raw.server,
            clean: raw.clean,
            deploy: raw.deploy,
        }
    }

    pub fn config_section(&self) -> &ConfigSection {
        &self.config
    }

    pub fn tasks(&self) -> &BTreeMap<String, TaskConfig> {
        &self.task
    }

    pub fn task(&self, name: &str) -> Option<&TaskConfig> {
        self.task.get(name)
    }

    pub fn watch_rules(&self) -> &[WatchRuleConfig] {
        &self.watch
    }

    pub fn server(&self) -> &ServerSection {
        &self.server
    }

    pub fn deploy(&self) -> &DeploySection {
        &self.deploy
    }

    pub fn build_root(&self) -> &Path {
        Path::new(&self.config.build_root)
    }

    /// The composite default set: `[config].default`, or every task when
    /// that list is empty.
    pub fn default_tasks(&self) -> Vec<String> {
        if self.config.default.is_empty() {
            self.task.keys().cloned().collect()
        } else {
            self.config.default.clone()
        }
    }

    /// Effective `[clean].include` (defaults to everything under the build root).
    pub fn clean_include(&self) -> Vec<String> {
        if self.clean.include.is_empty() {
            vec![format!("{}/**", self.config.build_root.trim_end_matches('/'))]
        } else {
            self.clean.include.clone()
        }
    }

    pub fn clean_exclude(&self) -> &[String] {
        &self.clean.exclude
    }

    /// Effective `[deploy].input` globs.
    pub fn deploy_input(&self) -> Vec<String> {
        if self.deploy.input.is_empty() {
            vec![format!("{}/**/*", self.config.build_root.trim_end_matches('/'))]
        } else {
            self.deploy.input.clone()
        }
    }

    /// Local directory that maps onto `[deploy].remote_dir`.
    pub fn deploy_base(&self) -> PathBuf {
        match &self.deploy.base {
            Some(base) => PathBuf::from(base),
            None => PathBuf::from(&self.config.build_root),
        }
    }

    /// Directory served by the dev server.
    pub fn server_base_dir(&self) -> PathBuf {
        match &self.server.base_dir {
            Some(dir) => PathBuf::from(dir),
            None => PathBuf::from(&self.config.build_root),
        }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Every task output directory must live under this path.
    #[serde(default = "default_build_root")]
    pub build_root: String,

    /// Tasks run by `sitepipe build` (no arguments) and at the start of
    /// `sitepipe watch`.
    #[serde(default)]
    pub default: Vec<String>,

    /// Exit-status policy for one-shot builds.
    #[serde(default)]
    pub on_task_failure: FailurePolicy,

    /// `"queue"` or `"cancel"`; see [`TriggerWhileRunningBehaviour`].
    #[serde(default)]
    pub triggered_while_running_behaviour: TriggerWhileRunningBehaviour,

    /// Maximum number of queued runs to remember.
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,
}

fn default_build_root() -> String {
    "dist".to_string()
}

fn default_queue_length() -> usize {
    1
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            build_root: default_build_root(),
            default: Vec::new(),
            on_task_failure: FailurePolicy::default(),
            triggered_while_running_behaviour: TriggerWhileRunningBehaviour::default(),
            queue_length: default_queue_length(),
        }
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Input globs, read in declared order. Entries prefixed with `!`
    /// remove matches of earlier entries.
    #[serde(default)]
    pub input: Vec<String>,

    /// Output directory (under `[config].build_root`).
    pub output: String,

    /// Tasks that must finish successfully before this one starts.
    #[serde(default)]
    pub after: Vec<String>,

    /// Ordered transform chain.
    #[serde(default)]
    pub transform: Vec<TransformConfig>,
}

/// One `[[task.<name>.transform]]` entry, selected by `kind`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformConfig {
    /// Render files as minijinja templates.
    Template {
        #[serde(default)]
        pretty: bool,
        /// Directory templates may `{% include %}` / `{% extends %}` from.
        #[serde(default)]
        partials: Option<String>,
        /// Extension given to rendered files.
        #[serde(default = "default_template_extension")]
        extension: String,
        /// Extra variables exposed to every template.
        #[serde(default)]
        context: BTreeMap<String, toml::Value>,
    },
    /// Rewrite template extensions in `href` / `src` attributes.
    RewriteLinks {
        #[serde(default = "default_link_sources")]
        from: Vec<String>,
        #[serde(default = "default_link_target")]
        to: String,
        #[serde(default)]
        pretty: bool,
    },
    /// Compile Sass/SCSS to CSS.
    Sass {
        #[serde(default)]
        style: CssStyle,
        #[serde(default)]
        load_paths: Vec<String>,
    },
    /// Add vendor-prefixed declarations.
    Autoprefix,
    MinifyCss,
    MinifyJs,
    /// Reorder files by a fixed precedence list of globs.
    Order { precedence: Vec<String> },
    /// Concatenate every file into one.
    Concat { file: String },
    /// Give every file a new name.
    Rename { to: String },
}

impl TransformConfig {
    /// The `kind` tag this entry was declared with.
    pub fn kind(&self) -> &'static str {
        match self {
            TransformConfig::Template { .. } => "template",
            TransformConfig::RewriteLinks { .. } => "rewrite_links",
            TransformConfig::Sass { .. } => "sass",
            TransformConfig::Autoprefix => "autoprefix",
            TransformConfig::MinifyCss => "minify_css",
            TransformConfig::MinifyJs => "minify_js",
            TransformConfig::Order { .. } => "order",
            TransformConfig::Concat { .. } => "concat",
            TransformConfig::Rename { .. } => "rename",
        }
    }
}

fn default_template_extension() -> String {
    "html".to_string()
}

fn default_link_sources() -> Vec<String> {
    vec![".j2".to_string(), ".jinja".to_string(), ".pug".to_string()]
}

fn default_link_target() -> String {
    ".html".to_string()
}

/// Output style for the Sass compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CssStyle {
    #[default]
    Expanded,
    Compressed,
}

/// `[[watch]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchRuleConfig {
    /// Globs (relative to the project root) that trigger this rule.
    pub paths: Vec<String>,

    /// Globs that suppress a match even when `paths` matches.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Tasks to re-run, in order.
    pub tasks: Vec<String>,
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_server_port")]
    pub port: u16,

    /// Inject the reload client into served HTML and signal it after every
    /// successful task.
    #[serde(default = "default_true")]
    pub live_reload: bool,

    /// Directory to serve; defaults to `[config].build_root`.
    #[serde(default)]
    pub base_dir: Option<String>,
}

fn default_server_port() -> u16 {
    3000
}

fn default_true() -> bool {
    true
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: default_server_port(),
            live_reload: true,
            base_dir: None,
        }
    }
}

/// `[clean]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CleanSection {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// `[deploy]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DeploySection {
    #[serde(default)]
    pub input: Vec<String>,
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    /// Environment variable to read the password from when `password` is empty.
    #[serde(default)]
    pub password_env: Option<String>,
    #[serde(default)]
    pub remote_dir: String,
    #[serde(default = "default_ftp_port")]
    pub port: u16,
    /// Number of parallel transfer connections.
    #[serde(default = "default_parallel")]
    pub parallel: usize,
}

fn default_ftp_port() -> u16 {
    21
}

fn default_parallel() -> usize {
    3
}

impl Default for DeploySection {
    fn default() -> Self {
        Self {
            input: Vec::new(),
            base: None,
            host: String::new(),
            user: String::new(),
            password: String::new(),
            password_env: None,
            remote_dir: String::new(),
            port: default_ftp_port(),
            parallel: default_parallel(),
        }
    }
}

impl DeploySection {
    /// Password from the config, falling back to `password_env`.
    pub fn effective_password(&self) -> String {
        if !self.password.is_empty() {
            return self.password.clone();
        }
        self.password_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .unwrap_or_default()
    }
}
