// src/transform/template.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::LazyLock;

use minijinja::Environment;
use regex::Regex;

use crate::errors::ToolError;
use crate::pipeline::globs::slash_path;
use crate::pipeline::record::FileRecord;
use crate::transform::Transform;

static BETWEEN_TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">\s+<").expect("valid regex"));

/// Renders every file in the set as a minijinja template.
///
/// All files of the set are registered under their relative path so pages
/// can `{% include %}` or `{% extends %}` each other; a `partials` directory
/// is consulted for anything else. `_`-prefixed files are partials and are
/// not emitted.
///
/// Each template sees the configured `context` plus `page`, its output path.
#[derive(Debug)]
pub struct TemplateRender {
    pretty: bool,
    partials: Option<PathBuf>,
    extension: String,
    context: BTreeMap<String, toml::Value>,
}

impl TemplateRender {
    pub fn new(
        pretty: bool,
        partials: Option<PathBuf>,
        extension: String,
        context: BTreeMap<String, toml::Value>,
    ) -> Self {
        Self {
            pretty,
            partials,
            extension,
            context,
        }
    }

    fn environment(&self, files: &[FileRecord]) -> Result<Environment<'static>, ToolError> {
        let mut env = Environment::new();
        if let Some(dir) = &self.partials {
            env.set_loader(minijinja::path_loader(dir));
        }
        for file in files {
            let source = file.text(self.name())?.to_string();
            env.add_template_owned(slash_path(&file.path), source)
                .map_err(|e| self.error(file, e))?;
        }
        Ok(env)
    }

    fn error(&self, file: &FileRecord, err: minijinja::Error) -> ToolError {
        ToolError::new(self.name(), format!("{}: {err:#}", file.source.display()))
    }
}

impl Transform for TemplateRender {
    fn name(&self) -> &str {
        "template"
    }

    fn apply(&self, files: Vec<FileRecord>) -> Result<Vec<FileRecord>, ToolError> {
        let env = self.environment(&files)?;
        let mut out = Vec::with_capacity(files.len());

        for mut file in files.into_iter().filter(|f| !f.is_partial()) {
            let template = env
                .get_template(&slash_path(&file.path))
                .map_err(|e| self.error(&file, e))?;

            file.replace_extension(&self.extension);

            let mut ctx = self.context.clone();
            ctx.insert("page".to_string(), toml::Value::String(slash_path(&file.path)));

            let rendered = template.render(&ctx).map_err(|e| self.error(&file, e))?;
            let rendered = if self.pretty {
                rendered
            } else {
                BETWEEN_TAGS.replace_all(rendered.trim(), "><").into_owned()
            };

            file.contents = rendered.into_bytes();
            out.push(file);
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(pretty: bool, files: Vec<FileRecord>) -> Result<Vec<FileRecord>, ToolError> {
        TemplateRender::new(pretty, None, "html".into(), BTreeMap::new()).apply(files)
    }

    #[test]
    fn renders_includes_and_skips_partials() {
        let files = vec![
            FileRecord::new("_nav.j2", "content/_nav.j2", "<nav>{{ page }}</nav>"),
            FileRecord::new(
                "index.j2",
                "content/index.j2",
                "<html>\n  <body>\n    {% include \"_nav.j2\" %}\n  </body>\n</html>\n",
            ),
        ];

        let out = render(false, files).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path, PathBuf::from("index.html"));
        assert_eq!(
            String::from_utf8(out[0].contents.clone()).unwrap(),
            "<html><body><nav>index.html</nav></body></html>"
        );
    }

    #[test]
    fn pretty_output_keeps_whitespace() {
        let files = vec![FileRecord::new("a.j2", "content/a.j2", "<p>\n  {{ 1 + 1 }}\n</p>")];
        let out = render(true, files).unwrap();
        assert_eq!(String::from_utf8(out[0].contents.clone()).unwrap(), "<p>\n  2\n</p>");
    }

    #[test]
    fn syntax_errors_become_tool_errors() {
        let files = vec![FileRecord::new("bad.j2", "content/bad.j2", "{% if %}")];
        let err = render(false, files).unwrap_err();
        assert_eq!(err.adapter, "template");
        assert!(err.message.contains("content/bad.j2"));
    }

    #[test]
    fn context_values_are_visible() {
        let mut ctx = BTreeMap::new();
        ctx.insert("site".to_string(), toml::Value::String("Example".into()));
        let t = TemplateRender::new(true, None, "xml".into(), ctx);
        let out = t
            .apply(vec![FileRecord::new("feed.j2", "src/feed.j2", "<title>{{ site }}</title>")])
            .unwrap();
        assert_eq!(out[0].path, PathBuf::from("feed.xml"));
        assert_eq!(out[0].contents, b"<title>Example</title>".to_vec());
    }
}
