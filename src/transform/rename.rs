// src/transform/rename.rs

use crate::errors::ToolError;
use crate::pipeline::record::FileRecord;
use crate::transform::Transform;

/// Renames every file in the set, keeping its directory.
#[derive(Debug)]
pub struct Rename {
    to: String,
}

impl Rename {
    pub fn new(to: String) -> Self {
        Self { to }
    }
}

impl Transform for Rename {
    fn name(&self) -> &str {
        "rename"
    }

    fn apply(&self, files: Vec<FileRecord>) -> Result<Vec<FileRecord>, ToolError> {
        Ok(files
            .into_iter()
            .map(|mut file| {
                file.path = match file.path.parent() {
                    Some(dir) => dir.join(&self.to),
                    None => self.to.clone().into(),
                };
                file
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn keeps_directory() {
        let files = vec![FileRecord::new("js/site.js", "site.js", "x")];
        let out = Rename::new("site.min.js".into()).apply(files).unwrap();
        assert_eq!(out[0].path, PathBuf::from("js/site.min.js"));
        assert_eq!(out[0].source, PathBuf::from("site.js"));
    }
}
