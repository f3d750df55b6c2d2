// src/record/validate.rs
use anyhow::{Context, Result};
use serde_json::Value;
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};
use tracing::{info, warn};

use super::{decode_line, describe, parse_item, policy::ValuePolicy, TypeTag};
use crate::{config::MigrationConfig, issue::RecordIssue, naming::list_files};

/// Outcome of checking one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineVerdict {
    Pass,
    Fail { line: usize, issue: RecordIssue },
}

impl LineVerdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, LineVerdict::Pass)
    }
}

/// Every failing line of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileVerdict {
    pub file_name: String,
    pub checked_lines: usize,
    pub failures: Vec<(usize, RecordIssue)>,
}

impl FileVerdict {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Structural check of one raw line. `file_name` is only used for log context.
pub fn validate_line(
    line: &str,
    line_no: usize,
    file_name: &str,
    tags: &[TypeTag],
    policy: &dyn ValuePolicy,
) -> LineVerdict {
    match check_line(line, tags, policy) {
        Ok(()) => LineVerdict::Pass,
        Err(issue) => {
            warn!(file = file_name, line = line_no, "{}", issue);
            LineVerdict::Fail {
                line: line_no,
                issue,
            }
        }
    }
}

fn check_line(line: &str, tags: &[TypeTag], policy: &dyn ValuePolicy) -> Result<(), RecordIssue> {
    let item = parse_item(line)?;

    for (name, value) in &item {
        if name.contains('(') || name.contains(')') {
            return Err(RecordIssue::SuspiciousFieldName(name.clone()));
        }
        let typed = value.as_object().ok_or_else(|| RecordIssue::FieldNotTyped {
            field: name.clone(),
            found: describe(value),
        })?;
        if !tags.iter().any(|t| typed.contains_key(t.key())) {
            return Err(RecordIssue::UnknownTypeTag {
                field: name.clone(),
                found: value.to_string(),
            });
        }
        if let Some(Value::String(s)) = typed.get(TypeTag::S.key()) {
            if policy.is_suspicious(s) {
                return Err(RecordIssue::SuspiciousCodeValue {
                    field: name.clone(),
                    value: s.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Validate every non-blank line of `path`.
#[tracing::instrument(level = "info", skip(path, tags, policy), fields(path = %path.display()))]
pub fn validate_file(
    path: &Path,
    tags: &[TypeTag],
    policy: &dyn ValuePolicy,
) -> Result<FileVerdict> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;

    let mut verdict = FileVerdict {
        file_name: file_name.clone(),
        checked_lines: 0,
        failures: Vec::new(),
    };
    for (idx, bytes) in BufReader::new(file).split(b'\n').enumerate() {
        let line_no = idx + 1;
        let bytes = bytes.with_context(|| format!("reading {} line {}", file_name, line_no))?;
        let line = match decode_line(bytes) {
            Ok(l) => l,
            Err(issue) => {
                warn!(file = %file_name, line = line_no, "{}", issue);
                verdict.checked_lines += 1;
                verdict.failures.push((line_no, issue));
                continue;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        verdict.checked_lines += 1;
        if let LineVerdict::Fail { line, issue } =
            validate_line(line, line_no, &file_name, tags, policy)
        {
            verdict.failures.push((line, issue));
        }
    }

    if verdict.is_clean() {
        info!("{} is valid and clean", file_name);
    } else {
        warn!(
            failures = verdict.failures.len(),
            "{} has structural issues", file_name
        );
    }
    Ok(verdict)
}

/// Validate every `*.json` file in the configured raw folder.
pub fn validate_dir(cfg: &MigrationConfig) -> Result<Vec<FileVerdict>> {
    let policy = cfg.value_policy()?;
    let files = list_files(&cfg.raw_json_dir, "json")?;
    if files.is_empty() {
        info!("no JSON files under {}", cfg.raw_json_dir.display());
        return Ok(Vec::new());
    }

    let mut verdicts = Vec::with_capacity(files.len());
    for path in &files {
        match validate_file(path, &cfg.tags.validation, policy.as_ref()) {
            Ok(v) => verdicts.push(v),
            Err(e) => warn!("skipping {}: {:#}", path.display(), e),
        }
    }

    let clean = verdicts.iter().filter(|v| v.is_clean()).count();
    info!(
        clean,
        problematic = verdicts.len() - clean,
        "validated {} files",
        verdicts.len()
    );
    Ok(verdicts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::CodeLikeSubstrings;
    use std::fs;
    use tempfile::tempdir;

    const TAGS: [TypeTag; 4] = [TypeTag::S, TypeTag::N, TypeTag::Bool, TypeTag::Null];

    fn check(line: &str) -> LineVerdict {
        validate_line(line, 3, "t.json", &TAGS, &CodeLikeSubstrings::default())
    }

    fn issue(line: &str) -> RecordIssue {
        match check(line) {
            LineVerdict::Fail { issue, .. } => issue,
            LineVerdict::Pass => panic!("expected failure for {line}"),
        }
    }

    #[test]
    fn well_formed_item_passes() {
        let v = check(
            r#"{"Item": {"portalNm_ssoId": {"S": "mc_42"}, "dob": {"N": "19900101"}, "x": {"NULL": true}, "b": {"BOOL": false}}}"#,
        );
        assert!(v.is_pass());
    }

    #[test]
    fn malformed_json_reports_decode_error_with_line() {
        match check("{not valid json") {
            LineVerdict::Fail { line, issue } => {
                assert_eq!(line, 3);
                assert!(matches!(issue, RecordIssue::DecodeError { .. }));
            }
            LineVerdict::Pass => panic!("decode should fail"),
        }
    }

    #[test]
    fn checks_short_circuit_in_order() {
        assert_eq!(issue(r#"{"Items": {}}"#), RecordIssue::MissingItemKey);
        assert_eq!(issue(r#"{"Item": "x"}"#), RecordIssue::ItemNotMapping);
        assert_eq!(
            issue(r#"{"Item": {"f(x)": "not even typed"}}"#),
            RecordIssue::SuspiciousFieldName("f(x)".into())
        );
        assert!(matches!(
            issue(r#"{"Item": {"a": "plain"}}"#),
            RecordIssue::FieldNotTyped { .. }
        ));
        assert!(matches!(
            issue(r#"{"Item": {"a": {"M": {}}}}"#),
            RecordIssue::UnknownTypeTag { .. }
        ));
        assert_eq!(
            issue(r#"{"Item": {"a": {"S": "function(){}"}}}"#),
            RecordIssue::SuspiciousCodeValue {
                field: "a".into(),
                value: "function(){}".into()
            }
        );
    }

    #[test]
    fn list_tag_is_outside_default_validation_set() {
        let line = r#"{"Item": {"roles": {"L": [{"S": "a"}]}}}"#;
        assert!(matches!(issue(line), RecordIssue::UnknownTypeTag { .. }));

        let all = TypeTag::PRIORITY;
        let v = validate_line(line, 1, "t.json", &all, &CodeLikeSubstrings::default());
        assert!(v.is_pass());
    }

    #[test]
    fn validate_dir_summarises_files() -> Result<()> {
        let dir = tempdir()?;
        let raw = dir.path().join("raw");
        fs::create_dir_all(&raw)?;
        fs::write(
            raw.join("good.json"),
            "{\"Item\": {\"portalNm_ssoId\": {\"S\": \"mc_1\"}}}\n\n",
        )?;
        fs::write(
            raw.join("bad.json"),
            "{not valid json\n{\"Item\": {\"portalNm_ssoId\": {\"S\": \"evn_2\"}}}\n",
        )?;

        let cfg = MigrationConfig {
            raw_json_dir: raw,
            ..MigrationConfig::default()
        };
        let verdicts = validate_dir(&cfg)?;
        assert_eq!(verdicts.len(), 2);

        let bad = &verdicts[0];
        assert_eq!(bad.file_name, "bad.json");
        assert_eq!(bad.checked_lines, 2);
        assert_eq!(bad.failures.len(), 1);
        assert_eq!(bad.failures[0].0, 1);

        let good = &verdicts[1];
        assert!(good.is_clean());
        assert_eq!(good.checked_lines, 1);
        Ok(())
    }

    #[test]
    fn bad_bytes_fail_their_line_only() -> Result<()> {
        let dir = tempdir()?;
        let raw = dir.path().join("raw");
        fs::create_dir_all(&raw)?;
        let mut data = b"{\"Item\": {\"portalNm_ssoId\": {\"S\": \"mc_1\"}}}\n".to_vec();
        data.extend_from_slice(b"{\"Item\": {\"portalNm_ssoId\": {\"S\": \"mc_\xff2\"}}}\n");
        data.extend_from_slice(b"{\"Item\": {\"portalNm_ssoId\": {\"S\": \"mc_3\"}}}\n");
        fs::write(raw.join("a.json"), data)?;

        let cfg = MigrationConfig {
            raw_json_dir: raw,
            ..MigrationConfig::default()
        };
        let verdicts = validate_dir(&cfg)?;
        assert_eq!(verdicts.len(), 1);
        assert_eq!(verdicts[0].checked_lines, 3);
        assert_eq!(verdicts[0].failures.len(), 1);
        assert_eq!(verdicts[0].failures[0].0, 2);
        assert!(matches!(
            verdicts[0].failures[0].1,
            RecordIssue::DecodeError { .. }
        ));
        Ok(())
    }

    #[test]
    fn missing_folder_is_a_no_op() -> Result<()> {
        let dir = tempdir()?;
        let cfg = MigrationConfig {
            raw_json_dir: dir.path().join("nope"),
            ..MigrationConfig::default()
        };
        assert!(validate_dir(&cfg)?.is_empty());
        Ok(())
    }
}
