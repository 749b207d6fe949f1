// tests/build_site.rs

use std::fs;
use std::path::Path;

use clap::Parser;
use sitepipe::cli::CliArgs;
use sitepipe::{CommandStatus, run};
use sitepipe_test_utils::{init_tracing, with_timeout};
use tempfile::TempDir;

const CONFIG: &str = r#"
[config]
build_root = "dist"
default = ["styles", "scripts", "pages"]

[task.pages]
input = ["content/**/*.j2"]
output = "dist"

[[task.pages.transform]]
kind = "template"
pretty = false

[[task.pages.transform]]
kind = "rewrite_links"

[task.styles]
input = ["src/scss/**/*.scss"]
output = "dist/css"

[[task.styles.transform]]
kind = "sass"
style = "compressed"

[[task.styles.transform]]
kind = "autoprefix"

[[task.styles.transform]]
kind = "minify_css"

[task.scripts]
input = ["src/js/**/*.js"]
output = "dist/js"

[[task.scripts.transform]]
kind = "order"
precedence = ["src/js/vendor/**", "src/js/util/**"]

[[task.scripts.transform]]
kind = "concat"
file = "app.js"

[[task.scripts.transform]]
kind = "minify_js"
"#;

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn site() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "Sitepipe.toml", CONFIG);
    write(
        root,
        "content/index.j2",
        "<html>\n  <body>\n    {% include \"_nav.j2\" %}\n    <a href=\"about.j2\">About</a>\n  </body>\n</html>\n",
    );
    write(
        root,
        "content/about.j2",
        "<html>\n  <body>\n    <a href=\"index.j2#top\">Home</a>\n  </body>\n</html>\n",
    );
    write(root, "content/_nav.j2", "<nav>\n  <a href=\"/index.j2\">{{ page }}</a>\n</nav>");
    write(root, "src/scss/_vars.scss", "$accent: #c00;");
    write(
        root,
        "src/scss/site.scss",
        "@import 'vars';\n.menu {\n  a { color: $accent; user-select: none; }\n}\n",
    );
    write(root, "src/js/app.js", "// app\nstart();\n");
    write(root, "src/js/util/dom.js", "function $(s) { return document.querySelector(s); }\n");
    write(root, "src/js/vendor/lib.js", "/* vendor */\nvar lib = {};\n");
    dir
}

fn args(root: &Path, extra: &[&str]) -> CliArgs {
    let config = root.join("Sitepipe.toml");
    let mut argv = vec!["sitepipe", "--config", config.to_str().unwrap()];
    argv.extend_from_slice(extra);
    CliArgs::try_parse_from(argv).unwrap()
}

fn read(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).unwrap()
}

#[tokio::test]
async fn default_build_produces_minified_pages_with_rewritten_links() {
    init_tracing();
    let dir = site();
    let root = dir.path();

    let status = with_timeout(run(args(root, &["build"]))).await.unwrap();
    assert_eq!(status, CommandStatus::Success);

    let index = read(root, "dist/index.html");
    let about = read(root, "dist/about.html");
    assert_eq!(
        index,
        "<html><body><nav><a href=\"/index.html\">index.html</a></nav><a href=\"about.html\">About</a></body></html>"
    );
    assert_eq!(about, "<html><body><a href=\"index.html#top\">Home</a></body></html>");
    for page in [&index, &about] {
        assert!(!page.contains(".j2"));
        assert!(!page.contains('\n'));
    }
    assert!(!root.join("dist/_nav.html").exists());

    let css = read(root, "dist/css/site.css");
    assert!(css.contains(".menu a{"));
    assert!(css.contains("-webkit-user-select:none"));
    assert!(!root.join("dist/css/_vars.css").exists());

    let js = read(root, "dist/js/app.js");
    let vendor = js.find("var lib").unwrap();
    let util = js.find("function $").unwrap();
    let app = js.find("start();").unwrap();
    assert!(vendor < util && util < app, "unexpected order:\n{js}");
    assert!(!js.contains("vendor */"));
}

#[tokio::test]
async fn rebuilding_without_changes_is_byte_identical_and_leaves_mtimes() {
    init_tracing();
    let dir = site();
    let root = dir.path();
    let outputs = ["dist/index.html", "dist/about.html", "dist/css/site.css", "dist/js/app.js"];

    with_timeout(run(args(root, &[]))).await.unwrap();
    let first: Vec<(Vec<u8>, std::time::SystemTime)> = outputs
        .iter()
        .map(|rel| {
            let path = root.join(rel);
            (fs::read(&path).unwrap(), fs::metadata(&path).unwrap().modified().unwrap())
        })
        .collect();

    with_timeout(run(args(root, &[]))).await.unwrap();
    for (rel, (bytes, mtime)) in outputs.iter().zip(first) {
        let path = root.join(rel);
        assert_eq!(fs::read(&path).unwrap(), bytes, "{rel} changed");
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), mtime, "{rel} rewritten");
    }
}

#[tokio::test]
async fn a_tool_error_fails_the_build_but_not_other_tasks() {
    init_tracing();
    let dir = site();
    let root = dir.path();
    write(root, "src/scss/site.scss", ".menu { a { color: ");

    let status = with_timeout(run(args(root, &["build"]))).await.unwrap();
    assert_eq!(status, CommandStatus::Failed);
    assert!(!root.join("dist/css/site.css").exists());
    assert!(root.join("dist/index.html").exists());
    assert!(root.join("dist/js/app.js").exists());
}

#[tokio::test]
async fn continue_policy_exits_successfully_after_failures() {
    init_tracing();
    let dir = site();
    let root = dir.path();
    write(
        root,
        "Sitepipe.toml",
        &CONFIG.replace("build_root = \"dist\"", "build_root = \"dist\"\non_task_failure = \"continue\""),
    );
    write(root, "src/scss/site.scss", ".menu { a { color: ");

    let status = with_timeout(run(args(root, &[]))).await.unwrap();
    assert_eq!(status, CommandStatus::Success);
}

#[tokio::test]
async fn naming_a_task_builds_only_that_task() {
    init_tracing();
    let dir = site();
    let root = dir.path();

    let status = with_timeout(run(args(root, &["build", "scripts"]))).await.unwrap();
    assert_eq!(status, CommandStatus::Success);
    assert!(root.join("dist/js/app.js").exists());
    assert!(!root.join("dist/index.html").exists());

    let err = with_timeout(run(args(root, &["build", "fonts"]))).await.unwrap_err();
    assert!(err.to_string().contains("fonts"));
}

#[tokio::test]
async fn dry_run_writes_nothing() {
    let dir = site();
    let root = dir.path();

    let status = with_timeout(run(args(root, &["--dry-run", "build"]))).await.unwrap();
    assert_eq!(status, CommandStatus::Success);
    assert!(!root.join("dist").exists());
}
