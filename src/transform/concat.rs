// src/transform/concat.rs

use crate::errors::ToolError;
use crate::pipeline::record::FileRecord;
use crate::transform::Transform;

/// Joins the whole file set, in its current order, into one file.
///
/// An empty set stays empty rather than producing an empty bundle.
#[derive(Debug)]
pub struct Concat {
    file: String,
}

impl Concat {
    pub fn new(file: String) -> Self {
        Self { file }
    }
}

impl Transform for Concat {
    fn name(&self) -> &str {
        "concat"
    }

    fn apply(&self, files: Vec<FileRecord>) -> Result<Vec<FileRecord>, ToolError> {
        if files.is_empty() {
            return Ok(files);
        }

        let mut contents = Vec::new();
        for (idx, file) in files.iter().enumerate() {
            if idx > 0 && !contents.ends_with(b"\n") {
                contents.push(b'\n');
            }
            contents.extend_from_slice(&file.contents);
        }

        Ok(vec![FileRecord::new(&self.file, &self.file, contents)])
    }
}
