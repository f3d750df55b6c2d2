// src/csv_out/mod.rs
pub mod assemble;
pub mod merge;

use anyhow::{Context, Result};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
};

pub use assemble::{assemble, write_rows, Assembled};
pub use merge::{merge_dir, merge_tables, read_table, Table};

/// Write through a hidden temp file next to `path`, then rename over it, so a
/// failed run never leaves a half-written CSV under the final name.
pub(crate) fn write_atomically<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let dir = path
        .parent()
        .with_context(|| format!("{} has no parent directory", path.display()))?;
    let name = path
        .file_name()
        .with_context(|| format!("{} has no file name", path.display()))?;
    let tmp_path = dir.join(format!(".{}.tmp", name.to_string_lossy()));

    let file =
        File::create(&tmp_path).with_context(|| format!("creating {}", tmp_path.display()))?;
    let mut w = BufWriter::new(file);
    fill(&mut w)?;
    w.flush()
        .with_context(|| format!("flushing {}", tmp_path.display()))?;
    drop(w);

    fs::rename(&tmp_path, path)
        .with_context(|| format!("renaming {} -> {}", tmp_path.display(), path.display()))?;
    Ok(())
}
