// src/watch/path_utils.rs

use std::path::Path;

use crate::pipeline::globs::slash_path;

/// Convert a path into a forward-slash string relative to `root`.
///
/// Falls back to canonicalizing both paths when a plain `strip_prefix`
/// fails (symlinked roots, `/private/var` on macOS). Returns `None` if the
/// path is not under `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(slash_path(rel));
    }

    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize()) {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return Some(slash_path(rel));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_root() {
        assert_eq!(
            relative_str(Path::new("/p/site"), Path::new("/p/site/src/a.scss")).as_deref(),
            Some("src/a.scss")
        );
        assert_eq!(relative_str(Path::new("/p/site"), Path::new("/q/x")), None);
    }
}
