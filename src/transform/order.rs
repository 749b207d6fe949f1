// src/transform/order.rs

use anyhow::Result;
use globset::GlobMatcher;

use crate::errors::ToolError;
use crate::pipeline::globs::build_matcher;
use crate::pipeline::record::FileRecord;
use crate::transform::Transform;

/// Reorders the file set so files matching earlier precedence patterns come
/// first. Files matching no pattern keep their relative order at the end.
#[derive(Debug)]
pub struct Order {
    precedence: Vec<GlobMatcher>,
}

impl Order {
    pub fn new(precedence: &[String]) -> Result<Self> {
        let precedence = precedence
            .iter()
            .map(|p| build_matcher(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { precedence })
    }

    fn rank(&self, file: &FileRecord) -> usize {
        let source = file.source_str();
        self.precedence
            .iter()
            .position(|m| m.is_match(&source))
            .unwrap_or(self.precedence.len())
    }
}

impl Transform for Order {
    fn name(&self) -> &str {
        "order"
    }

    fn apply(&self, mut files: Vec<FileRecord>) -> Result<Vec<FileRecord>, ToolError> {
        // sort_by_key is stable.
        files.sort_by_key(|f| self.rank(f));
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_then_original_order() {
        let order = Order::new(&["src/js/vendor/**".into(), "src/js/util.js".into()]).unwrap();
        let files = vec![
            FileRecord::new("app.js", "src/js/app.js", ""),
            FileRecord::new("util.js", "src/js/util.js", ""),
            FileRecord::new("main.js", "src/js/main.js", ""),
            FileRecord::new("vendor/jquery.js", "src/js/vendor/jquery.js", ""),
        ];
        let out = order.apply(files).unwrap();
        let names: Vec<_> = out.iter().map(|f| f.source_str()).collect();
        assert_eq!(
            names,
            ["src/js/vendor/jquery.js", "src/js/util.js", "src/js/app.js", "src/js/main.js"]
        );
    }

    #[test]
    fn invalid_precedence_pattern_is_rejected() {
        assert!(Order::new(&["src/[".into()]).is_err());
    }
}
