// src/pipeline/record.rs

use std::path::{Path, PathBuf};

use crate::errors::ToolError;
use crate::pipeline::globs::slash_path;

/// A file travelling through a task's transform chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Output path relative to the task's output directory. Starts out as the
    /// input path relative to its glob base.
    pub path: PathBuf,
    /// Where the file was read from, relative to the project root.
    pub source: PathBuf,
    pub contents: Vec<u8>,
}

impl FileRecord {
    pub fn new(path: impl Into<PathBuf>, source: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
            contents: contents.into(),
        }
    }

    /// Contents as UTF-8, or a `ToolError` attributed to `adapter`.
    pub fn text(&self, adapter: &str) -> Result<&str, ToolError> {
        std::str::from_utf8(&self.contents).map_err(|e| {
            ToolError::new(adapter, format!("{} is not valid UTF-8: {e}", self.path.display()))
        })
    }

    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    /// Leading-underscore files are partials: they feed other files but are
    /// never emitted themselves.
    pub fn is_partial(&self) -> bool {
        self.file_name().starts_with('_')
    }

    pub fn has_extension(&self, exts: &[&str]) -> bool {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| exts.iter().any(|x| x.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }

    /// Replace the extension. A doubled result (`page.html.j2` → `page.html`
    /// rather than `page.html.html`) is collapsed.
    pub fn replace_extension(&mut self, ext: &str) {
        let ext = ext.trim_start_matches('.');
        let stem_has_ext = Path::new(self.path.file_stem().unwrap_or_default())
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case(ext));

        if stem_has_ext {
            self.path.set_extension("");
        } else {
            self.path.set_extension(ext);
        }
    }

    /// Forward-slash source path, used for glob matching.
    pub fn source_str(&self) -> String {
        slash_path(&self.source)
    }
}
