// tests/config_errors.rs

use std::io::Write;

use sitepipe::config::load_and_validate;
use sitepipe::errors::SitepipeError;
use sitepipe_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};
use sitepipe::config::ConfigFile;
use tempfile::NamedTempFile;

fn load(toml: &str) -> Result<ConfigFile, SitepipeError> {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{toml}").unwrap();
    load_and_validate(file.path())
}

#[test]
fn dag_cycle_returns_structured_error() {
    let result = load(
        r#"
[task.a]
output = "dist/a"
after = ["b"]
[[task.a.transform]]
kind = "minify_css"

[task.b]
output = "dist/b"
after = ["a"]
[[task.b.transform]]
kind = "minify_css"
"#,
    );

    match result {
        Err(SitepipeError::DagCycle(msg)) => {
            assert!(msg.contains("cycle detected"));
            assert!(msg.contains('a') || msg.contains('b'));
        }
        Err(e) => panic!("Expected DagCycle error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn unknown_dependency_returns_config_error() {
    let result = load(
        r#"
[task.pages]
output = "dist"
after = ["styles"]
[[task.pages.transform]]
kind = "template"
"#,
    );

    match result {
        Err(SitepipeError::ConfigError(msg)) => {
            assert!(msg.contains("unknown dependency"));
            assert!(msg.contains("styles"));
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn unknown_transform_kind_is_a_toml_error() {
    let result = load(
        r#"
[task.pages]
output = "dist"
[[task.pages.transform]]
kind = "critical_css"
"#,
    );
    assert!(matches!(result, Err(SitepipeError::TomlError(_))));
}

#[test]
fn missing_file_is_an_io_error() {
    let result = load_and_validate("/nonexistent/Sitepipe.toml");
    assert!(matches!(result, Err(SitepipeError::IoError(_))));
}

#[test]
fn zero_parallel_deploy_is_rejected() {
    let result = load(
        r#"
[task.pages]
output = "dist"
[[task.pages.transform]]
kind = "template"

[deploy]
host = "ftp.example.com"
parallel = 0
"#,
    );
    assert!(matches!(result, Err(SitepipeError::ConfigError(msg)) if msg.contains("parallel")));
}

#[test]
fn builder_configs_validate_through_the_same_path() {
    let raw = ConfigFileBuilder::new()
        .with_task("styles", TaskConfigBuilder::new("dist/css").build())
        .with_watch(&["src/**/*.scss"], &["scripts"])
        .raw();

    let err = ConfigFile::try_from(raw).unwrap_err();
    assert!(matches!(err, SitepipeError::ConfigError(msg) if msg.contains("'scripts'")));

    let raw = ConfigFileBuilder::new()
        .with_task("styles", TaskConfigBuilder::new("dist/css").no_transforms().build())
        .raw();
    assert!(ConfigFile::try_from(raw).is_err());
}

#[test]
fn defaults_are_applied() {
    let cfg = load(
        r#"
[task.pages]
output = "dist"
[[task.pages.transform]]
kind = "rewrite_links"
"#,
    )
    .unwrap();

    assert_eq!(cfg.build_root().to_str(), Some("dist"));
    assert_eq!(cfg.default_tasks(), vec!["pages"]);
    assert_eq!(cfg.server().port, 3000);
    assert!(cfg.server().live_reload);
    assert_eq!(cfg.deploy().port, 21);
    assert_eq!(cfg.deploy().parallel, 3);
    assert_eq!(cfg.clean_include(), vec!["dist/**"]);
    assert_eq!(cfg.deploy_input(), vec!["dist/**/*"]);
}
