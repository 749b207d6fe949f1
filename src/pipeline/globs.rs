// src/pipeline/globs.rs

//! Glob helpers shared by task inputs, watch rules, clean and deploy.
//!
//! All patterns are evaluated against forward-slash paths relative to the
//! project root. `*` never crosses a `/`; use `**` for that.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};

/// Strip leading `./` segments so `./src/**/*.js` and `src/**/*.js` behave the same.
pub fn normalize_pattern(pattern: &str) -> String {
    let mut p = pattern.trim();
    while let Some(rest) = p.strip_prefix("./") {
        p = rest;
    }
    p.to_string()
}

fn compile(pattern: &str) -> Result<Glob> {
    let normalized = normalize_pattern(pattern);
    GlobBuilder::new(&normalized)
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob pattern: {pattern}"))
}

/// Compile a single pattern into a matcher.
pub fn build_matcher(pattern: &str) -> Result<GlobMatcher> {
    Ok(compile(pattern)?.compile_matcher())
}

/// Build a GlobSet from simple string patterns.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        builder.add(compile(pat)?);
    }
    Ok(builder.build()?)
}

/// Split a pattern list into positive patterns and `!`-negations.
pub fn split_negations(patterns: &[String]) -> (Vec<String>, Vec<String>) {
    let mut positive = Vec::new();
    let mut negative = Vec::new();
    for pat in patterns {
        match pat.trim().strip_prefix('!') {
            Some(neg) => negative.push(neg.to_string()),
            None => positive.push(pat.clone()),
        }
    }
    (positive, negative)
}

/// The literal directory prefix of a pattern (everything before the first
/// component containing a glob metacharacter).
///
/// `content/**/*.html` → `content`, `src/js/*.js` → `src/js`,
/// `feed.xml` → `` (the file itself is the only literal part, so its
/// directory is the base).
pub fn glob_base(pattern: &str) -> PathBuf {
    let normalized = normalize_pattern(pattern);
    let path = Path::new(&normalized);
    let mut base = PathBuf::new();
    let components: Vec<Component> = path.components().collect();

    for (idx, comp) in components.iter().enumerate() {
        let s = comp.as_os_str().to_string_lossy();
        if s.contains(['*', '?', '[', '{']) {
            return base;
        }
        // A fully literal pattern names a file; its base is the parent.
        if idx + 1 == components.len() {
            return base;
        }
        base.push(comp);
    }
    base
}

/// Forward-slash string form of a relative path.
pub fn slash_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
