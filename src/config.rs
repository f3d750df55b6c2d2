// src/config.rs
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

use crate::record::{CodeLikeSubstrings, PatternPolicy, TypeTag, ValuePolicy};

/// Target column order for every CSV handed to the ledger load.
pub const CANONICAL_COLUMNS: [&str; 21] = [
    "portalNm_ssoId",
    "created_ts",
    "dob",
    "emp_id",
    "frst_nm",
    "last_login",
    "last_nm",
    "last_trigger_ts",
    "last_updated_by",
    "last_updated_ts",
    "mfaEnrolledStatus",
    "okta_uid",
    "portalNm_regId",
    "prv_login",
    "role",
    "security_ans_plain",
    "security_answer",
    "security_question",
    "ssoId_status",
    "usr_agrmnt_status",
    "usr_agrmnt_vs",
];

/// Columns carried by older exports that the merged CSV must not contain.
pub const LEGACY_COLUMNS: [&str; 17] = [
    "dateOfBirth",
    "firstName",
    "frst_nm;",
    "lastName",
    "last_updated",
    "regId",
    "requestedBy",
    "sso_Id",
    "user_agreement_status",
    "user_agreement_vs",
    "usr_agrmnt_ts",
    "dup_email",
    "lastUpdateBy",
    "security_ans",
    "claimedEmailAddress",
    "sharedSsoId",
    "trigger",
];

pub const ACCEPTED_PREFIXES: [&str; 2] = ["mc_", "evn_"];

/// Column layout and row-routing rules shared by every CSV stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Ordered output columns; the first is the primary key, the last is required.
    pub columns: Vec<String>,
    pub accepted_prefixes: Vec<String>,
    pub legacy_columns: Vec<String>,
    /// Added empty by the merger when no input defines it.
    pub trigger_column: String,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            columns: CANONICAL_COLUMNS.iter().map(|c| c.to_string()).collect(),
            accepted_prefixes: ACCEPTED_PREFIXES.iter().map(|p| p.to_string()).collect(),
            legacy_columns: LEGACY_COLUMNS.iter().map(|c| c.to_string()).collect(),
            trigger_column: "last_trigger_ts".into(),
        }
    }
}

impl SchemaConfig {
    pub fn primary_key(&self) -> &str {
        self.columns.first().map(String::as_str).unwrap_or_default()
    }

    pub fn required_column(&self) -> &str {
        self.columns.last().map(String::as_str).unwrap_or_default()
    }

    pub fn has_accepted_prefix(&self, key: &str) -> bool {
        self.accepted_prefixes
            .iter()
            .any(|p| key.starts_with(p.as_str()))
    }
}

/// Type tags recognised by each stage.
///
/// The validator historically ignores `L` while the normalizer flattens it;
/// both sets are explicit here so they can be aligned per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagConfig {
    pub validation: Vec<TypeTag>,
    pub normalization: Vec<TypeTag>,
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            validation: vec![TypeTag::S, TypeTag::N, TypeTag::Bool, TypeTag::Null],
            normalization: TypeTag::PRIORITY.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuspicionConfig {
    pub substrings: Vec<String>,
    /// When set, replaces the substring list with a regex match.
    pub pattern: Option<String>,
}

impl Default for SuspicionConfig {
    fn default() -> Self {
        Self {
            substrings: CodeLikeSubstrings::DEFAULT_NEEDLES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            pattern: None,
        }
    }
}

/// Everything a run needs: folders, schema, tag sets and content policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Raw key-value export lines, one JSON object per line.
    pub raw_json_dir: PathBuf,
    pub cleaned_json_dir: PathBuf,
    /// Per-file `Line <n>: <reason>` logs from cleaning.
    pub skip_log_dir: PathBuf,
    pub csv_output_dir: PathBuf,
    pub csv_log_dir: PathBuf,
    /// Subfolder of `csv_output_dir` receiving skipped-row CSVs.
    pub skipped_subdir: String,
    /// Folder of previously produced CSVs to combine; output lands here too.
    pub merge_dir: PathBuf,
    pub schema: SchemaConfig,
    pub tags: TagConfig,
    pub suspicious: SuspicionConfig,
    /// Number of issues echoed to the console before the total.
    pub report_preview: usize,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            raw_json_dir: "TEST JSON FILES".into(),
            cleaned_json_dir: "test_cleaned_json_files".into(),
            skip_log_dir: "test_skipped_json_logs".into(),
            csv_output_dir: "dev_cleaned_csv_files".into(),
            csv_log_dir: "dev_csv_validation_logs".into(),
            skipped_subdir: "csv_skipped_records".into(),
            merge_dir: "PVS CSV FILES".into(),
            schema: SchemaConfig::default(),
            tags: TagConfig::default(),
            suspicious: SuspicionConfig::default(),
            report_preview: 10,
        }
    }
}

impl MigrationConfig {
    /// Load from a YAML file; missing keys keep their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let cfg: Self = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        cfg.check()?;
        Ok(cfg)
    }

    /// Config for a binary: first CLI argument is an optional YAML path.
    pub fn from_args() -> Result<Self> {
        match std::env::args().nth(1) {
            Some(p) => {
                info!(config = %p, "loading config");
                Self::from_yaml_file(Path::new(&p))
            }
            None => Ok(Self::default()),
        }
    }

    fn check(&self) -> Result<()> {
        if self.schema.columns.is_empty() {
            bail!("schema.columns must name at least one column");
        }
        if self.schema.accepted_prefixes.is_empty() {
            bail!("schema.accepted_prefixes must not be empty");
        }
        Ok(())
    }

    pub fn skipped_dir(&self) -> PathBuf {
        self.csv_output_dir.join(&self.skipped_subdir)
    }

    /// Build the content policy this config asks for.
    pub fn value_policy(&self) -> Result<Box<dyn ValuePolicy>> {
        Ok(match &self.suspicious.pattern {
            Some(p) => Box::new(PatternPolicy::new(p)?),
            None => Box::new(CodeLikeSubstrings::new(self.suspicious.substrings.clone())),
        })
    }
}
