// src/issue.rs
use thiserror::Error;

/// Why a single JSON line was rejected by the validator or the normalizer.
///
/// The `Display` text is what lands in skip logs after the `Line <n>: ` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordIssue {
    #[error("JSON decode error at column {column}: {message}")]
    DecodeError { column: usize, message: String },

    #[error("Missing 'Item' key")]
    MissingItemKey,

    #[error("'Item' is not a mapping")]
    ItemNotMapping,

    #[error("Suspicious key with parentheses: '{0}'")]
    SuspiciousFieldName(String),

    #[error("Field '{field}' is not a typed mapping (got: {found})")]
    FieldNotTyped { field: String, found: String },

    #[error("Field '{field}' missing expected type key (got: {found})")]
    UnknownTypeTag { field: String, found: String },

    #[error("Suspicious code in value of '{field}': '{value}'")]
    SuspiciousCodeValue { field: String, value: String },

    #[error("Unsupported list format in field '{0}'")]
    UnsupportedListFormat(String),
}

impl RecordIssue {
    pub fn decode(err: &serde_json::Error) -> Self {
        RecordIssue::DecodeError {
            column: err.column(),
            message: err.to_string(),
        }
    }

    /// A line that is not valid UTF-8; the column is the first bad character.
    pub fn invalid_utf8(err: &std::string::FromUtf8Error) -> Self {
        let valid = &err.as_bytes()[..err.utf8_error().valid_up_to()];
        let column = std::str::from_utf8(valid)
            .map(|s| s.chars().count())
            .unwrap_or(valid.len())
            + 1;
        RecordIssue::DecodeError {
            column,
            message: err.utf8_error().to_string(),
        }
    }
}

/// Structural problems found when re-reading a written CSV.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuditIssue {
    #[error("Column headers are not in the correct order (found: {})", .found.join(","))]
    HeaderMismatch { found: Vec<String> },

    #[error("Line {line}: Expected {expected} columns, found {found}")]
    RowWidthMismatch {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Line {line}: {column} does not start with an accepted prefix → {key}")]
    InvalidPrimaryKeyPrefix {
        line: usize,
        column: String,
        key: String,
    },

    #[error("Line {line}: '{column}' is empty")]
    RequiredFieldEmpty { line: usize, column: String },

    #[error("Duplicate {column} value '{key}' appears {count} times")]
    DuplicatePrimaryKey {
        column: String,
        key: String,
        count: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_issue_keeps_column_position() {
        let err = serde_json::from_str::<serde_json::Value>("{not valid json").unwrap_err();
        let issue = RecordIssue::decode(&err);
        match issue {
            RecordIssue::DecodeError { column, .. } => assert_eq!(column, 2),
            other => panic!("unexpected issue {other:?}"),
        }
    }

    #[test]
    fn invalid_utf8_points_at_first_bad_char() {
        let err = String::from_utf8(b"\"\xc3\xa9a\xffb".to_vec()).unwrap_err();
        match RecordIssue::invalid_utf8(&err) {
            RecordIssue::DecodeError { column, message } => {
                assert_eq!(column, 4);
                assert!(message.contains("utf-8"));
            }
            other => panic!("unexpected issue {other:?}"),
        }
    }

    #[test]
    fn audit_messages_carry_line_numbers() {
        let issue = AuditIssue::RowWidthMismatch {
            line: 7,
            expected: 21,
            found: 20,
        };
        assert_eq!(issue.to_string(), "Line 7: Expected 21 columns, found 20");
    }
}
