// src/project/mod.rs
pub mod source;

use anyhow::Result;
use tracing::{info, warn};

use crate::{
    config::{MigrationConfig, SchemaConfig},
    naming::list_files,
    record::CleanedItem,
};

pub use source::CleanedItems;

/// Written in place of an empty required column so the CSV keeps an explicit
/// quoted-empty value there.
pub const EMPTY_REQUIRED_PLACEHOLDER: &str = "\"\"";

const QUOTE_CHARS: [char; 6] = ['"', '\'', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}'];

/// One output row, positionally aligned with `SchemaConfig::columns`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedRow {
    values: Vec<String>,
}

impl ProjectedRow {
    pub fn from_values(values: Vec<String>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn get<'a>(&'a self, schema: &SchemaConfig, column: &str) -> Option<&'a str> {
        let idx = schema.columns.iter().position(|c| c == column)?;
        self.values.get(idx).map(String::as_str)
    }

    pub fn primary_key(&self) -> &str {
        self.values.first().map(String::as_str).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Accepted,
    Skipped,
}

/// Trim whitespace, then drop one surrounding straight or curly quote.
pub fn clean_value(raw: &str) -> &str {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix(QUOTE_CHARS).unwrap_or(trimmed);
    trimmed.strip_suffix(QUOTE_CHARS).unwrap_or(trimmed)
}

/// Lay a cleaned item out over the schema columns.
pub fn project(item: &CleanedItem, schema: &SchemaConfig) -> ProjectedRow {
    let last = schema.columns.len().saturating_sub(1);
    let values = schema
        .columns
        .iter()
        .enumerate()
        .map(|(i, col)| {
            let v = clean_value(item.get(col).unwrap_or_default());
            if i == last && v.is_empty() {
                EMPTY_REQUIRED_PLACEHOLDER.to_string()
            } else {
                v.to_string()
            }
        })
        .collect();
    ProjectedRow { values }
}

pub fn classify(row: &ProjectedRow, schema: &SchemaConfig) -> Disposition {
    if schema.has_accepted_prefix(row.primary_key()) {
        Disposition::Accepted
    } else {
        Disposition::Skipped
    }
}

/// Rows from every input, split by disposition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pub accepted: Vec<ProjectedRow>,
    pub skipped: Vec<ProjectedRow>,
    /// Lines that could not be read as an item at all.
    pub failed: usize,
}

impl Partition {
    pub fn push(&mut self, row: ProjectedRow, schema: &SchemaConfig) {
        match classify(&row, schema) {
            Disposition::Accepted => self.accepted.push(row),
            Disposition::Skipped => self.skipped.push(row),
        }
    }

    /// Feed one file's items in; unreadable lines are logged and counted.
    pub fn extend_from<R: std::io::BufRead>(
        &mut self,
        items: CleanedItems<R>,
        schema: &SchemaConfig,
    ) {
        let name = items.name().to_string();
        for (line, item) in items {
            match item {
                Ok(item) => self.push(project(&item, schema), schema),
                Err(e) => {
                    warn!("Failed to process line {} in {}: {:#}", line, name, e);
                    self.failed += 1;
                }
            }
        }
    }
}

/// Project every cleaned JSON file in the configured folder.
pub fn partition_dir(cfg: &MigrationConfig) -> Result<Partition> {
    let mut partition = Partition::default();
    for path in list_files(&cfg.cleaned_json_dir, "json")? {
        let items = match CleanedItems::open(&path) {
            Ok(items) => items,
            Err(e) => {
                warn!("skipping {}: {:#}", path.display(), e);
                continue;
            }
        };
        partition.extend_from(items, &cfg.schema);
        info!(
            valid = partition.accepted.len(),
            skipped = partition.skipped.len(),
            "read {}",
            path.display()
        );
    }
    info!(
        "Finished reading all records. Total valid: {}, Skipped: {}",
        partition.accepted.len(),
        partition.skipped.len()
    );
    Ok(partition)
}
