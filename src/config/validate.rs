// src/config/validate.rs

use std::path::{Component, Path};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile, TransformConfig};
use crate::errors::{Result, SitepipeError};
use crate::pipeline::globs::{build_matcher, normalize_pattern};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = SitepipeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_tasks(cfg)?;
    validate_task_dependencies(cfg)?;
    validate_dag(cfg)?;
    validate_watch_rules(cfg)?;
    validate_clean_and_deploy(cfg)?;
    Ok(())
}

fn config_error(msg: impl Into<String>) -> SitepipeError {
    SitepipeError::ConfigError(msg.into())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(config_error(
            "config must contain at least one [task.<name>] section",
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.queue_length == 0 {
        return Err(config_error("[config].queue_length must be >= 1 (got 0)"));
    }

    if cfg.config.build_root.trim().is_empty() {
        return Err(config_error("[config].build_root must not be empty"));
    }

    for name in cfg.config.default.iter() {
        if !cfg.task.contains_key(name) {
            return Err(config_error(format!(
                "[config].default references unknown task '{name}'"
            )));
        }
    }

    Ok(())
}

fn validate_tasks(cfg: &RawConfigFile) -> Result<()> {
    let build_root = clean_relative(&cfg.config.build_root);

    for (name, task) in cfg.task.iter() {
        if task.transform.is_empty() {
            return Err(config_error(format!(
                "task '{name}' must declare at least one [[task.{name}.transform]]"
            )));
        }

        let output = clean_relative(&task.output);
        if has_parent_component(&output) || !Path::new(&output).starts_with(&build_root) {
            return Err(config_error(format!(
                "task '{name}' writes to '{}', which is outside build_root '{}'",
                task.output, cfg.config.build_root
            )));
        }

        check_globs(&format!("task '{name}' input"), &task.input)?;

        for transform in task.transform.iter() {
            if let TransformConfig::Order { precedence } = transform {
                check_globs(&format!("task '{name}' order precedence"), precedence)?;
            }
            if let TransformConfig::Concat { file } = transform {
                if file.trim().is_empty() {
                    return Err(config_error(format!(
                        "task '{name}' has a concat transform with an empty file name"
                    )));
                }
            }
        }
    }

    Ok(())
}

fn validate_task_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            if !cfg.task.contains_key(dep) {
                return Err(config_error(format!(
                    "task '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
            if dep == name {
                return Err(config_error(format!(
                    "task '{}' cannot depend on itself in `after`",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: dep -> task. For `after = ["A"]` on B we add A -> B.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(SitepipeError::DagCycle(format!(
                "cycle detected in task DAG involving task '{}'",
                node
            )))
        }
    }
}

fn validate_watch_rules(cfg: &RawConfigFile) -> Result<()> {
    for (idx, rule) in cfg.watch.iter().enumerate() {
        if rule.paths.is_empty() {
            return Err(config_error(format!("[[watch]] #{idx} has no paths")));
        }
        if rule.tasks.is_empty() {
            return Err(config_error(format!("[[watch]] #{idx} triggers no tasks")));
        }
        for task in rule.tasks.iter() {
            if !cfg.task.contains_key(task) {
                return Err(config_error(format!(
                    "[[watch]] #{idx} triggers unknown task '{task}'"
                )));
            }
        }
        check_globs(&format!("[[watch]] #{idx} paths"), &rule.paths)?;
        check_globs(&format!("[[watch]] #{idx} exclude"), &rule.exclude)?;
    }
    Ok(())
}

fn validate_clean_and_deploy(cfg: &RawConfigFile) -> Result<()> {
    check_globs("[clean].include", &cfg.clean.include)?;
    check_globs("[clean].exclude", &cfg.clean.exclude)?;
    check_globs("[deploy].input", &cfg.deploy.input)?;

    if cfg.deploy.parallel == 0 {
        return Err(config_error("[deploy].parallel must be >= 1 (got 0)"));
    }
    Ok(())
}

fn check_globs(what: &str, patterns: &[String]) -> Result<()> {
    for pat in patterns {
        if let Err(err) = build_matcher(pat.strip_prefix('!').unwrap_or(pat)) {
            return Err(config_error(format!("{what}: {err:#}")));
        }
    }
    Ok(())
}

/// Strip `./` prefixes and trailing slashes so `./dist/` and `dist` compare equal.
fn clean_relative(path: &str) -> String {
    normalize_pattern(path).trim_end_matches('/').to_string()
}

fn has_parent_component(path: &str) -> bool {
    Path::new(path)
        .components()
        .any(|c| matches!(c, Component::ParentDir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::parse_str;

    fn validate(toml: &str) -> Result<ConfigFile> {
        ConfigFile::try_from(parse_str(toml)?)
    }

    #[test]
    fn rejects_output_outside_build_root() {
        let err = validate(
            r#"
[task.styles]
input = ["src/**/*.scss"]
output = "public/css"
[[task.styles.transform]]
kind = "sass"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, SitepipeError::ConfigError(msg) if msg.contains("outside build_root")));
    }

    #[test]
    fn accepts_dotted_output_under_build_root() {
        let cfg = validate(
            r#"
[config]
build_root = "./dist/"

[task.styles]
input = ["./src/**/*.scss"]
output = "./dist/assets/styles/"
[[task.styles.transform]]
kind = "sass"
"#,
        )
        .unwrap();
        assert_eq!(cfg.default_tasks(), vec!["styles".to_string()]);
    }

    #[test]
    fn rejects_parent_escape_in_output() {
        let err = validate(
            r#"
[task.a]
output = "dist/../elsewhere"
[[task.a.transform]]
kind = "minify_js"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, SitepipeError::ConfigError(_)));
    }

    #[test]
    fn rejects_empty_transform_chain() {
        let err = validate(
            r#"
[task.a]
output = "dist"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, SitepipeError::ConfigError(msg) if msg.contains("at least one")));
    }

    #[test]
    fn rejects_watch_rule_with_unknown_task() {
        let err = validate(
            r#"
[task.a]
output = "dist"
[[task.a.transform]]
kind = "minify_js"

[[watch]]
paths = ["src/**"]
tasks = ["a", "b"]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, SitepipeError::ConfigError(msg) if msg.contains("'b'")));
    }

    #[test]
    fn rejects_invalid_glob() {
        let err = validate(
            r#"
[task.a]
input = ["src/[abc"]
output = "dist"
[[task.a.transform]]
kind = "minify_js"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, SitepipeError::ConfigError(msg) if msg.contains("invalid glob")));
    }

    #[test]
    fn rejects_unknown_default_task() {
        let err = validate(
            r#"
[config]
default = ["missing"]

[task.a]
output = "dist"
[[task.a.transform]]
kind = "minify_js"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, SitepipeError::ConfigError(msg) if msg.contains("missing")));
    }
}
