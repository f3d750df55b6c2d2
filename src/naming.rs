// src/naming.rs
use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use glob::glob;
use std::{
    fmt,
    path::{Path, PathBuf},
};

pub const ACCEPTED_CSV_PREFIX: &str = "IBOR_MIG_LEAD_InitLd";
pub const MERGED_CSV_PREFIX: &str = "IBOR_MIG_LEAD_InitLd_output";
pub const SKIPPED_CSV_PREFIX: &str = "skipped_portalNm_ssoId";

/// `YYYYMMDD_HHMMSS` suffix shared by every artifact produced in one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStamp(String);

impl RunStamp {
    pub fn now() -> Self {
        Self::at(Local::now().naive_local())
    }

    pub fn at(t: NaiveDateTime) -> Self {
        RunStamp(t.format("%Y%m%d_%H%M%S").to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn accepted_csv(&self) -> String {
        format!("{}_{}.csv", ACCEPTED_CSV_PREFIX, self.0)
    }

    pub fn skipped_csv(&self) -> String {
        format!("{}_{}.csv", SKIPPED_CSV_PREFIX, self.0)
    }

    /// Rows caught by the post-write audit rather than by projection.
    pub fn audit_skipped_csv(&self) -> String {
        format!("{}_{}_validation.csv", SKIPPED_CSV_PREFIX, self.0)
    }

    pub fn merged_csv(&self) -> String {
        format!("{}_{}.csv", MERGED_CSV_PREFIX, self.0)
    }
}

impl fmt::Display for RunStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sorted list of files in `dir` with the given extension (no recursion).
/// A missing directory yields an empty list.
pub fn list_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let pattern = format!(
        "{}/*.{}",
        glob::Pattern::escape(&dir.display().to_string()),
        extension
    );
    let mut files: Vec<PathBuf> = glob(&pattern)
        .with_context(|| format!("invalid glob pattern {}", pattern))?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    Ok(files)
}

/// Log file name for a written artifact: same stem, `.log` extension.
pub fn log_name_for(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".into());
    format!("{}.log", stem)
}
