// src/record/normalize.rs
use serde_json::{json, Map, Value};

use super::{describe, parse_item, policy::ValuePolicy, TypeTag, ITEM_KEY};
use crate::issue::RecordIssue;

/// A record whose every field has been flattened to a string.
/// Field order follows the source line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanedItem {
    fields: Vec<(String, String)>,
}

impl CleanedItem {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == field)
            .map(|(_, v)| v.as_str())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `{"Item": {field: {"S": value}, ...}}`
    pub fn to_json(&self) -> Value {
        let item: Map<String, Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), json!({ "S": v })))
            .collect();
        json!({ ITEM_KEY: item })
    }

    /// Read a line previously written by the cleaner. Only each field's `S`
    /// string is consulted; a wrapper without one reads as empty.
    pub fn from_line(line: &str) -> Result<Self, RecordIssue> {
        let item = parse_item(line)?;
        let mut fields = Vec::with_capacity(item.len());
        for (name, value) in item {
            let typed = value.as_object().ok_or_else(|| RecordIssue::FieldNotTyped {
                field: name.clone(),
                found: describe(&value),
            })?;
            let s = typed
                .get(TypeTag::S.key())
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            fields.push((name, s));
        }
        Ok(Self { fields })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CleanedItem {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Flatten every typed field of `item` into a string.
///
/// The first field with an unsupported shape or suspicious content rejects
/// the whole record. Tags outside `tags` are treated as unknown.
/// The content policy is checked against every flattened value, `N`, `BOOL`
/// and joined `L` included, not only `S` strings.
pub fn normalize(
    item: &Map<String, Value>,
    tags: &[TypeTag],
    policy: &dyn ValuePolicy,
) -> Result<CleanedItem, RecordIssue> {
    let mut fields = Vec::with_capacity(item.len());
    for (name, value) in item {
        let text = flatten_field(name, value, tags)?;
        if policy.is_suspicious(&text) {
            return Err(RecordIssue::SuspiciousCodeValue {
                field: name.clone(),
                value: text,
            });
        }
        fields.push((name.clone(), text));
    }
    Ok(CleanedItem { fields })
}

fn flatten_field(name: &str, value: &Value, tags: &[TypeTag]) -> Result<String, RecordIssue> {
    let typed = value.as_object().ok_or_else(|| RecordIssue::FieldNotTyped {
        field: name.to_string(),
        found: describe(value),
    })?;
    let unknown = || RecordIssue::UnknownTypeTag {
        field: name.to_string(),
        found: value.to_string(),
    };

    let (tag, payload) = TypeTag::PRIORITY
        .iter()
        .filter(|t| tags.contains(*t))
        .find_map(|t| typed.get(t.key()).map(|p| (*t, p)))
        .ok_or_else(unknown)?;

    match (tag, payload) {
        (TypeTag::S, Value::String(s)) => Ok(s.clone()),
        (TypeTag::N, Value::String(s)) => Ok(s.clone()),
        (TypeTag::N, Value::Number(n)) => Ok(n.to_string()),
        (TypeTag::Bool, Value::Bool(true)) => Ok("True".into()),
        (TypeTag::Bool, Value::Bool(false)) => Ok("False".into()),
        (TypeTag::Bool, Value::String(s)) => Ok(s.clone()),
        (TypeTag::Null, _) => Ok(String::new()),
        (TypeTag::L, Value::Array(elems)) => Ok(join_list(elems)),
        (TypeTag::L, _) => Err(RecordIssue::UnsupportedListFormat(name.to_string())),
        _ => Err(unknown()),
    }
}

// Non-mapping elements are dropped; mappings without a string `S` give "".
fn join_list(elems: &[Value]) -> String {
    elems
        .iter()
        .filter_map(Value::as_object)
        .map(|e| {
            e.get(TypeTag::S.key())
                .and_then(Value::as_str)
                .unwrap_or_default()
        })
        .collect::<Vec<_>>()
        .join(",")
}
