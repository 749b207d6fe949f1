// src/pipeline/inputs.rs

//! Resolve a task's `input` globs into [`FileRecord`]s.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::fs::FileSystem;
use crate::pipeline::globs::{build_globset, build_matcher, glob_base, slash_path, split_negations};
use crate::pipeline::record::FileRecord;

/// Read every file matched by `patterns` under `root`.
///
/// - Positive patterns are processed in declared order; files already
///   matched by an earlier pattern are not read twice.
/// - `!`-prefixed patterns remove matches from every positive pattern.
/// - Each record's `path` is relative to the glob base of the pattern that
///   matched it, so `content/**/*.j2` maps `content/blog/a.j2` to `blog/a.j2`.
/// - Within one pattern files are returned in sorted path order.
///
/// A pattern whose base directory does not exist simply matches nothing.
pub fn resolve_inputs(fs: &dyn FileSystem, root: &Path, patterns: &[String]) -> Result<Vec<FileRecord>> {
    let (positive, negative) = split_negations(patterns);
    let exclude = build_globset(&negative)?;

    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut records = Vec::new();

    for pattern in positive.iter() {
        let matcher = build_matcher(pattern)?;
        let base = glob_base(pattern);

        let mut matched = Vec::new();
        for rel in walk_files(fs, root, &base)? {
            let rel_str = slash_path(&rel);
            if matcher.is_match(&rel_str) && !exclude.is_match(&rel_str) {
                matched.push(rel);
            }
        }
        matched.sort();

        debug!(pattern = %pattern, count = matched.len(), "resolved input glob");

        for rel in matched {
            if !seen.insert(rel.clone()) {
                continue;
            }
            let contents = fs
                .read(&root.join(&rel))
                .with_context(|| format!("reading input {}", rel.display()))?;
            let out_path = rel.strip_prefix(&base).unwrap_or(&rel).to_path_buf();
            records.push(FileRecord::new(out_path, rel, contents));
        }
    }

    Ok(records)
}

/// All regular files under `root/start`, as paths relative to `root`.
pub fn walk_files(fs: &dyn FileSystem, root: &Path, start: &Path) -> Result<Vec<PathBuf>> {
    let start_abs = root.join(start);
    let mut files = Vec::new();

    if fs.is_file(&start_abs) {
        files.push(start.to_path_buf());
        return Ok(files);
    }
    if !fs.is_dir(&start_abs) {
        return Ok(files);
    }

    let mut stack = vec![start_abs];
    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                if let Ok(rel) = path.strip_prefix(root) {
                    files.push(rel.to_path_buf());
                }
            }
        }
    }

    Ok(files)
}
