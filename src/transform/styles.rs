// src/transform/styles.rs

use std::path::PathBuf;

use crate::config::CssStyle;
use crate::errors::ToolError;
use crate::pipeline::record::FileRecord;
use crate::transform::Transform;

/// Compiles `.scss` files to CSS with grass.
///
/// Imports resolve relative to the source file's directory first, then the
/// configured load paths. `_partial.scss` files are consumed by imports but
/// produce no output. Plain `.css` files pass through unchanged.
#[derive(Debug)]
pub struct SassCompile {
    style: CssStyle,
    root: PathBuf,
    load_paths: Vec<PathBuf>,
}

impl SassCompile {
    pub fn new(style: CssStyle, root: PathBuf, load_paths: Vec<PathBuf>) -> Self {
        Self {
            style,
            root,
            load_paths,
        }
    }

    fn compile(&self, file: &FileRecord) -> Result<String, ToolError> {
        let source = file.text(self.name())?.to_string();

        let style = match self.style {
            CssStyle::Expanded => grass::OutputStyle::Expanded,
            CssStyle::Compressed => grass::OutputStyle::Compressed,
        };

        let source_path = self.root.join(&file.source);
        let mut options = grass::Options::default().style(style);
        if let Some(dir) = source_path.parent() {
            options = options.load_path(dir);
        }
        for path in self.load_paths.iter() {
            options = options.load_path(path);
        }

        grass::from_string(source, &options).map_err(|e| {
            ToolError::new(self.name(), format!("{}: {e}", file.source.display()))
        })
    }
}

impl Transform for SassCompile {
    fn name(&self) -> &str {
        "sass"
    }

    fn apply(&self, files: Vec<FileRecord>) -> Result<Vec<FileRecord>, ToolError> {
        let mut out = Vec::with_capacity(files.len());

        for mut file in files {
            if !file.has_extension(&["scss"]) {
                out.push(file);
                continue;
            }
            if file.is_partial() {
                continue;
            }

            let css = self.compile(&file)?;
            file.replace_extension("css");
            file.contents = css.into_bytes();
            out.push(file);
        }

        Ok(out)
    }
}
