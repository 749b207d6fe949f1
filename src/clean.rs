// src/clean.rs

//! Removal of generated output.
//!
//! A path is removed when it matches an include glob and no exclude glob.
//! Exclusion also covers everything beneath an excluded directory, and
//! directories are only removed once they are empty.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::GlobSet;
use tracing::{debug, info};

use crate::fs::FileSystem;
use crate::pipeline::globs::{build_globset, glob_base, slash_path};

/// Paths removed (or, for a dry run, that would be), relative to the root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub removed_files: Vec<PathBuf>,
    pub removed_dirs: Vec<PathBuf>,
}

impl CleanReport {
    pub fn is_empty(&self) -> bool {
        self.removed_files.is_empty() && self.removed_dirs.is_empty()
    }
}

struct Selection {
    include: GlobSet,
    exclude: GlobSet,
}

impl Selection {
    fn excluded(&self, rel: &Path) -> bool {
        rel.ancestors()
            .filter(|p| !p.as_os_str().is_empty())
            .any(|p| self.exclude.is_match(slash_path(p)))
    }

    fn selected(&self, rel: &Path) -> bool {
        self.include.is_match(slash_path(rel)) && !self.excluded(rel)
    }
}

/// Delete generated output under `root`.
pub fn clean(
    fs: &dyn FileSystem,
    root: &Path,
    include: &[String],
    exclude: &[String],
    dry_run: bool,
) -> Result<CleanReport> {
    let selection = Selection {
        include: build_globset(include)?,
        exclude: build_globset(exclude)?,
    };

    let bases: BTreeSet<PathBuf> = include.iter().map(|p| glob_base(p)).collect();
    let mut files = BTreeSet::new();
    let mut dirs = BTreeSet::new();
    for base in &bases {
        walk(fs, root, base, &mut files, &mut dirs)?;
    }

    let mut report = CleanReport::default();
    let mut removed: HashSet<PathBuf> = HashSet::new();

    for rel in files {
        if !selection.selected(&rel) {
            continue;
        }
        if !dry_run {
            fs.remove_file(&root.join(&rel))
                .with_context(|| format!("removing {}", rel.display()))?;
        }
        debug!(path = %rel.display(), dry_run, "removed file");
        removed.insert(rel.clone());
        report.removed_files.push(rel);
    }

    // Deepest first, so a parent sees its children already gone.
    let mut dirs: Vec<PathBuf> = dirs.into_iter().collect();
    dirs.sort_by_key(|d| std::cmp::Reverse(d.components().count()));

    for rel in dirs {
        if !selection.selected(&rel) {
            continue;
        }
        let children = fs.read_dir(&root.join(&rel))?;
        let empty = children.iter().all(|child| {
            child
                .strip_prefix(root)
                .is_ok_and(|c| removed.contains(c))
        });
        if !empty {
            continue;
        }
        if !dry_run {
            fs.remove_dir(&root.join(&rel))
                .with_context(|| format!("removing directory {}", rel.display()))?;
        }
        debug!(path = %rel.display(), dry_run, "removed directory");
        removed.insert(rel.clone());
        report.removed_dirs.push(rel);
    }

    info!(
        files = report.removed_files.len(),
        dirs = report.removed_dirs.len(),
        dry_run,
        "clean finished"
    );
    Ok(report)
}

fn walk(
    fs: &dyn FileSystem,
    root: &Path,
    start: &Path,
    files: &mut BTreeSet<PathBuf>,
    dirs: &mut BTreeSet<PathBuf>,
) -> Result<()> {
    let start_abs = root.join(start);
    if !fs.is_dir(&start_abs) {
        return Ok(());
    }

    let mut stack = vec![start_abs];
    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            let Ok(rel) = path.strip_prefix(root) else {
                continue;
            };
            if fs.is_dir(&path) {
                dirs.insert(rel.to_path_buf());
                stack.push(path);
            } else if fs.is_file(&path) {
                files.insert(rel.to_path_buf());
            }
        }
    }
    Ok(())
}
