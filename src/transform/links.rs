// src/transform/links.rs

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::errors::ToolError;
use crate::pipeline::record::FileRecord;
use crate::transform::Transform;

static LINK_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(href|src)(\s*=\s*)(["'])([^"']*)(["'])"#).expect("valid regex")
});

/// Rewrites template source extensions inside `href`/`src` attributes so
/// links written against sources (`about.j2`) point at rendered pages
/// (`about.html`).
///
/// With `pretty = true` the extension is dropped altogether, as is any
/// literal `.html`, giving extension-less URLs. Absolute URLs (with a scheme
/// or `//`) are left alone. Only markup files are touched.
#[derive(Debug)]
pub struct RewriteLinks {
    from: Vec<String>,
    to: String,
    pretty: bool,
}

impl RewriteLinks {
    pub fn new(from: Vec<String>, to: String, pretty: bool) -> Self {
        let from = from
            .into_iter()
            .map(|ext| {
                if ext.starts_with('.') {
                    ext
                } else {
                    format!(".{ext}")
                }
            })
            .collect();
        Self { from, to, pretty }
    }

    fn rewrite_url(&self, url: &str) -> String {
        if url.contains("://") || url.starts_with("//") || url.starts_with("mailto:") {
            return url.to_string();
        }

        let split_at = url.find(['?', '#']).unwrap_or(url.len());
        let (path, suffix) = url.split_at(split_at);

        let matched = self
            .from
            .iter()
            .map(String::as_str)
            .find(|ext| path.ends_with(ext))
            .or_else(|| (self.pretty && path.ends_with(".html")).then_some(".html"));

        match matched {
            Some(ext) => {
                let stem = &path[..path.len() - ext.len()];
                if self.pretty {
                    format!("{stem}{suffix}")
                } else {
                    format!("{stem}{}{suffix}", self.to)
                }
            }
            None => url.to_string(),
        }
    }
}

impl Transform for RewriteLinks {
    fn name(&self) -> &str {
        "rewrite_links"
    }

    fn apply(&self, files: Vec<FileRecord>) -> Result<Vec<FileRecord>, ToolError> {
        files
            .into_iter()
            .map(|mut file| {
                if !file.has_extension(&["html", "htm", "xml"]) {
                    return Ok(file);
                }
                let text = file.text(self.name())?;
                let rewritten = LINK_ATTR.replace_all(text, |caps: &Captures| {
                    format!(
                        "{}{}{}{}{}",
                        &caps[1],
                        &caps[2],
                        &caps[3],
                        self.rewrite_url(&caps[4]),
                        &caps[5]
                    )
                });
                file.contents = rewritten.into_owned().into_bytes();
                Ok(file)
            })
            .collect()
    }
}
