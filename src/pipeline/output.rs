// src/pipeline/output.rs

use std::path::{Component, Path};

use anyhow::{bail, Result};
use tracing::debug;

use crate::fs::FileSystem;
use crate::pipeline::record::FileRecord;

/// Counts reported by [`write_outputs`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub written: usize,
    pub unchanged: usize,
}

/// Write records beneath `out_dir`, preserving their relative paths.
///
/// Files whose current bytes already hash to the same value are left
/// untouched, so rebuilding unchanged sources keeps output mtimes stable
/// (and a later differential deploy sends nothing).
pub fn write_outputs(fs: &dyn FileSystem, out_dir: &Path, records: &[FileRecord]) -> Result<WriteReport> {
    let mut report = WriteReport::default();

    for record in records {
        if record.path.as_os_str().is_empty()
            || record
                .path
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            bail!("refusing to write output outside the task directory: {:?}", record.path);
        }

        let target = out_dir.join(&record.path);

        if fs.is_file(&target) {
            let existing = fs.read(&target)?;
            if blake3::hash(&existing) == blake3::hash(&record.contents) {
                debug!(path = ?target, "output unchanged; skipping write");
                report.unchanged += 1;
                continue;
            }
        }

        fs.write(&target, &record.contents)?;
        debug!(path = ?target, bytes = record.contents.len(), "wrote output");
        report.written += 1;
    }

    Ok(report)
}
