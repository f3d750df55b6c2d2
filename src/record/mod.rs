// src/record/mod.rs
pub mod clean;
pub mod normalize;
pub mod policy;
pub mod validate;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::issue::RecordIssue;

pub use clean::{clean_json_dir, clean_json_file, CleanSummary};
pub use normalize::{normalize, CleanedItem};
pub use policy::{CodeLikeSubstrings, PatternPolicy, ValuePolicy};
pub use validate::{validate_dir, validate_file, validate_line, FileVerdict, LineVerdict};

/// Key of the top-level object wrapping a record's fields.
pub const ITEM_KEY: &str = "Item";

/// The single-key wrappers a key-value store export puts around each field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    S,
    N,
    #[serde(rename = "BOOL")]
    Bool,
    #[serde(rename = "NULL")]
    Null,
    L,
}

impl TypeTag {
    /// Order in which tags are looked up when a wrapper carries more than one.
    pub const PRIORITY: [TypeTag; 5] = [
        TypeTag::S,
        TypeTag::N,
        TypeTag::Bool,
        TypeTag::Null,
        TypeTag::L,
    ];

    pub fn key(self) -> &'static str {
        match self {
            TypeTag::S => "S",
            TypeTag::N => "N",
            TypeTag::Bool => "BOOL",
            TypeTag::Null => "NULL",
            TypeTag::L => "L",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Parse one JSON line and return the `Item` mapping.
pub fn parse_item(line: &str) -> Result<Map<String, Value>, RecordIssue> {
    let obj: Value = serde_json::from_str(line).map_err(|e| RecordIssue::decode(&e))?;
    match obj.get(ITEM_KEY) {
        None => Err(RecordIssue::MissingItemKey),
        Some(Value::Object(item)) => Ok(item.clone()),
        Some(_) => Err(RecordIssue::ItemNotMapping),
    }
}

/// Decode one raw line. Bad UTF-8 rejects that line alone.
pub fn decode_line(bytes: Vec<u8>) -> Result<String, RecordIssue> {
    String::from_utf8(bytes).map_err(|e| RecordIssue::invalid_utf8(&e))
}

/// Short rendering of a JSON value for issue messages.
pub(crate) fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".into(),
        Value::Bool(_) => "bool".into(),
        Value::Number(_) => "number".into(),
        Value::String(_) => "string".into(),
        Value::Array(_) => "list".into(),
        Value::Object(_) => value.to_string(),
    }
}
