use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::field::{FieldDefinition, FieldId};

/// Opaque reference to a file picked by an applicant. Nothing here uploads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileHandle {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl FileHandle {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: None,
            content_type: None,
        }
    }
}

/// Shape of a [`FieldValue`], used to match values against field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Text,
    Number,
    Boolean,
    List,
    File,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Text => "text",
            ValueKind::Number => "number",
            ValueKind::Boolean => "boolean",
            ValueKind::List => "list",
            ValueKind::File => "file",
        }
    }
}

/// Applicant-entered value. JSON form is untagged: string, number, bool,
/// array of strings, or a file object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum FieldValue {
    Boolean(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
    File(FileHandle),
}

impl FieldValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            FieldValue::Boolean(_) => ValueKind::Boolean,
            FieldValue::Number(_) => ValueKind::Number,
            FieldValue::Text(_) => ValueKind::Text,
            FieldValue::List(_) => ValueKind::List,
            FieldValue::File(_) => ValueKind::File,
        }
    }

    /// Empty strings and empty selections count as "not answered".
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(text) => text.is_empty(),
            FieldValue::List(items) => items.is_empty(),
            _ => false,
        }
    }

    /// Numeric view; text is coerced when it parses as a finite number.
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            FieldValue::Number(value) => Some(*value),
            FieldValue::Text(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        };
        value.filter(|value| value.is_finite())
    }

    /// Textual view for string-oriented rules; lists, booleans and files have none.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            FieldValue::Text(text) => Some(Cow::Borrowed(text.as_str())),
            FieldValue::Number(value) => Some(Cow::Owned(format_number(*value))),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(flag) => Some(*flag),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Length used by `minLength`/`maxLength`: characters for text, items for lists.
    pub fn length(&self) -> Option<usize> {
        match self {
            FieldValue::List(items) => Some(items.len()),
            other => other.as_text().map(|text| text.chars().count()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Boolean(flag) => write!(f, "{}", flag),
            FieldValue::Number(value) => f.write_str(&format_number(*value)),
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::List(items) => f.write_str(&items.join(", ")),
            FieldValue::File(handle) => write!(f, "<file {}>", handle.name),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

/// Integral values print without a trailing `.0`.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Values keyed by field id. `null` entries in JSON input are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<FieldId, Option<FieldValue>>")]
pub struct ValueMap(BTreeMap<FieldId, FieldValue>);

impl From<BTreeMap<FieldId, Option<FieldValue>>> for ValueMap {
    fn from(raw: BTreeMap<FieldId, Option<FieldValue>>) -> Self {
        ValueMap(
            raw.into_iter()
                .filter_map(|(key, value)| value.map(|value| (key, value)))
                .collect(),
        )
    }
}

impl FromIterator<(FieldId, FieldValue)> for ValueMap {
    fn from_iter<T: IntoIterator<Item = (FieldId, FieldValue)>>(iter: T) -> Self {
        ValueMap(iter.into_iter().collect())
    }
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field_id: &str) -> Option<&FieldValue> {
        self.0.get(field_id)
    }

    pub fn set(&mut self, field_id: impl Into<FieldId>, value: FieldValue) -> Option<FieldValue> {
        self.0.insert(field_id.into(), value)
    }

    pub fn remove(&mut self, field_id: &str) -> Option<FieldValue> {
        self.0.remove(field_id)
    }

    pub fn contains(&self, field_id: &str) -> bool {
        self.0.contains_key(field_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldId, &FieldValue)> {
        self.0.iter()
    }

    /// The field's value when it has the shape the field type expects.
    pub fn typed(&self, field: &FieldDefinition) -> Option<&FieldValue> {
        let expected = field.kind.value_kind()?;
        self.get(&field.id).filter(|value| value.kind() == expected)
    }

    /// Adds `option` to a multi-selection, or removes it if already selected.
    ///
    /// Remaining selections keep the order in which they were first picked.
    /// Returns whether the option is selected afterwards.
    pub fn toggle_option(&mut self, field_id: &str, option: &str) -> bool {
        let mut items = match self.0.remove(field_id) {
            Some(FieldValue::List(items)) => items,
            _ => Vec::new(),
        };
        let selected = match items.iter().position(|item| item == option) {
            Some(index) => {
                items.remove(index);
                false
            }
            None => {
                items.push(option.to_string());
                true
            }
        };
        self.0.insert(field_id.to_string(), FieldValue::List(items));
        selected
    }

    /// Keeps only the entries whose ids satisfy `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.0.retain(|key, _| keep(key));
    }
}
