// src/record/clean.rs
use anyhow::{Context, Result};
use std::{
    fs::{self, File},
    io::{BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::{info, warn};

use super::{decode_line, normalize, parse_item, policy::ValuePolicy, TypeTag};
use crate::{config::MigrationConfig, naming::list_files};

/// Per-file outcome of a cleaning pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanSummary {
    pub source: PathBuf,
    pub cleaned_path: PathBuf,
    pub log_path: PathBuf,
    pub valid: usize,
    pub skipped: usize,
}

/// Normalize every line of `input`, writing kept records to `out_dir/<name>`
/// and one `Line <n>: <reason>` entry per rejected line to `log_dir/<stem>.log`.
#[tracing::instrument(level = "info", skip_all, fields(path = %input.display()))]
pub fn clean_json_file(
    input: &Path,
    out_dir: &Path,
    log_dir: &Path,
    tags: &[TypeTag],
    policy: &dyn ValuePolicy,
) -> Result<CleanSummary> {
    let file_name = input
        .file_name()
        .with_context(|| format!("{} has no file name", input.display()))?;
    let cleaned_path = out_dir.join(file_name);
    let log_path = log_dir.join(Path::new(file_name).with_extension("log"));

    let infile = File::open(input).with_context(|| format!("opening {}", input.display()))?;
    let mut out = BufWriter::new(
        File::create(&cleaned_path)
            .with_context(|| format!("creating {}", cleaned_path.display()))?,
    );
    let mut log = BufWriter::new(
        File::create(&log_path).with_context(|| format!("creating {}", log_path.display()))?,
    );

    let mut valid = 0;
    let mut skipped = 0;
    for (idx, bytes) in BufReader::new(infile).split(b'\n').enumerate() {
        let line_no = idx + 1;
        let bytes = bytes.with_context(|| format!("reading {} line {}", input.display(), line_no))?;
        let text = decode_line(bytes);
        if matches!(&text, Ok(l) if l.trim().is_empty()) {
            continue;
        }

        let outcome = text
            .and_then(|l| parse_item(l.trim()))
            .and_then(|item| normalize(&item, tags, policy));
        match outcome {
            Ok(cleaned) => {
                serde_json::to_writer(&mut out, &cleaned.to_json())
                    .context("serializing cleaned record")?;
                out.write_all(b"\n")?;
                valid += 1;
            }
            Err(issue) => {
                writeln!(log, "Line {}: {}", line_no, issue)?;
                skipped += 1;
            }
        }
    }
    out.flush()
        .with_context(|| format!("flushing {}", cleaned_path.display()))?;
    log.flush()
        .with_context(|| format!("flushing {}", log_path.display()))?;

    info!(
        valid,
        skipped,
        "cleaned {} → {} (skips: {})",
        input.display(),
        cleaned_path.display(),
        log_path.display()
    );
    Ok(CleanSummary {
        source: input.to_path_buf(),
        cleaned_path,
        log_path,
        valid,
        skipped,
    })
}

/// Clean every `*.json` file in the raw folder into the cleaned folder.
/// A file that cannot be opened or written is reported and left behind.
pub fn clean_json_dir(cfg: &MigrationConfig) -> Result<Vec<CleanSummary>> {
    let files = list_files(&cfg.raw_json_dir, "json")?;
    if files.is_empty() {
        info!("no JSON files under {}", cfg.raw_json_dir.display());
        return Ok(Vec::new());
    }

    for d in [&cfg.cleaned_json_dir, &cfg.skip_log_dir] {
        fs::create_dir_all(d).with_context(|| format!("creating {}", d.display()))?;
    }
    let policy = cfg.value_policy()?;

    let mut summaries = Vec::with_capacity(files.len());
    for path in &files {
        match clean_json_file(
            path,
            &cfg.cleaned_json_dir,
            &cfg.skip_log_dir,
            &cfg.tags.normalization,
            policy.as_ref(),
        ) {
            Ok(s) => summaries.push(s),
            Err(e) => warn!("failed to clean {}: {:#}", path.display(), e),
        }
    }
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn cleaner_writes_records_and_skip_log() -> Result<()> {
        let dir = tempdir()?;
        let raw = dir.path().join("raw");
        fs::create_dir_all(&raw)?;
        fs::write(
            raw.join("export.json"),
            concat!(
                "{\"Item\": {\"portalNm_ssoId\": {\"S\": \"mc_42\"}, \"dob\": {\"N\": \"19900101\"}}}\n",
                "{not valid json\n",
                "\n",
                "{\"Item\": {\"x\": {\"S\": \"return 1\"}}}\n",
                "{\"NoItem\": 1}\n",
                "{\"Item\": {\"roles\": {\"L\": [{\"S\": \"a\"}, {\"S\": \"b\"}]}}}\n",
            ),
        )?;

        let cfg = MigrationConfig {
            raw_json_dir: raw,
            cleaned_json_dir: dir.path().join("cleaned"),
            skip_log_dir: dir.path().join("logs"),
            ..MigrationConfig::default()
        };
        let summaries = clean_json_dir(&cfg)?;
        assert_eq!(summaries.len(), 1);
        let s = &summaries[0];
        assert_eq!((s.valid, s.skipped), (2, 3));

        let cleaned = fs::read_to_string(&s.cleaned_path)?;
        let lines: Vec<&str> = cleaned.lines().collect();
        assert_eq!(
            lines[0],
            r#"{"Item":{"portalNm_ssoId":{"S":"mc_42"},"dob":{"S":"19900101"}}}"#
        );
        assert_eq!(lines[1], r#"{"Item":{"roles":{"S":"a,b"}}}"#);

        let log = fs::read_to_string(&s.log_path)?;
        let log_lines: Vec<&str> = log.lines().collect();
        assert_eq!(log_lines.len(), 3);
        assert!(log_lines[0].starts_with("Line 2: JSON decode error"));
        assert!(log_lines[1].starts_with("Line 4: Suspicious code in value of 'x'"));
        assert_eq!(log_lines[2], "Line 5: Missing 'Item' key");
        assert!(s.log_path.ends_with("logs/export.log"));
        Ok(())
    }

    #[test]
    fn bad_bytes_skip_one_line_and_keep_going() -> Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("a.json");
        let mut raw = b"{\"Item\": {\"portalNm_ssoId\": {\"S\": \"mc_1\"}}}\n".to_vec();
        raw.extend_from_slice(b"{\"Item\": {\"portalNm_ssoId\": {\"S\": \"mc_\xff2\"}}}\n");
        raw.extend_from_slice(b"{\"Item\": {\"portalNm_ssoId\": {\"S\": \"mc_3\"}}}\n");
        fs::write(&input, raw)?;

        let (out, logs) = (dir.path().join("out"), dir.path().join("logs"));
        fs::create_dir_all(&out)?;
        fs::create_dir_all(&logs)?;
        let s = clean_json_file(
            &input,
            &out,
            &logs,
            &TypeTag::PRIORITY,
            &crate::record::CodeLikeSubstrings::default(),
        )?;
        assert_eq!((s.valid, s.skipped), (2, 1));

        let cleaned = fs::read_to_string(&s.cleaned_path)?;
        assert!(cleaned.contains("mc_1"));
        assert!(cleaned.contains("mc_3"));
        let log = fs::read_to_string(&s.log_path)?;
        assert!(log.starts_with("Line 2: JSON decode error at column 39"));
        assert_eq!(log.lines().count(), 1);
        Ok(())
    }
}
