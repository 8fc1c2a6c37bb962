use std::borrow::Cow;
use std::fmt;

use schemars::{JsonSchema, Schema, SchemaGenerator, json_schema};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::spec::rule::{RuleKind, ValidationRule};
use crate::value::{FieldValue, ValueKind};

pub type FieldId = String;
pub type CategoryId = String;

/// Message used when a required field is left empty and no `required` rule overrides it.
pub const REQUIRED_MESSAGE: &str = "This field is required";

/// Problems with a field definition itself, independent of any submitted value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("field label must not be empty")]
    EmptyLabel,
    #[error("field '{0}' is a {1} field and needs at least one option")]
    MissingOptions(String, &'static str),
    #[error("field '{0}' cannot be conditional on itself")]
    SelfReference(String),
    #[error("field name '{0}' is already used in this category")]
    DuplicateName(String),
}

/// Closed set of input types a field may take.
///
/// Type strings that are not recognized deserialize into [`FieldType::Unknown`]
/// so one bad definition never breaks decoding of a whole category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Text,
    Textarea,
    Number,
    Date,
    Select,
    Multiselect,
    Checkbox,
    Radio,
    File,
    Url,
    Email,
    Tel,
    Range,
    Color,
    Time,
    Datetime,
    Unknown,
}

impl FieldType {
    pub const ALL: [FieldType; 16] = [
        FieldType::Text,
        FieldType::Textarea,
        FieldType::Number,
        FieldType::Date,
        FieldType::Select,
        FieldType::Multiselect,
        FieldType::Checkbox,
        FieldType::Radio,
        FieldType::File,
        FieldType::Url,
        FieldType::Email,
        FieldType::Tel,
        FieldType::Range,
        FieldType::Color,
        FieldType::Time,
        FieldType::Datetime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Select => "select",
            FieldType::Multiselect => "multiselect",
            FieldType::Checkbox => "checkbox",
            FieldType::Radio => "radio",
            FieldType::File => "file",
            FieldType::Url => "url",
            FieldType::Email => "email",
            FieldType::Tel => "tel",
            FieldType::Range => "range",
            FieldType::Color => "color",
            FieldType::Time => "time",
            FieldType::Datetime => "datetime",
            FieldType::Unknown => "unknown",
        }
    }

    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        FieldType::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(raw))
            .unwrap_or(FieldType::Unknown)
    }

    /// Types whose values must come from `options`.
    pub fn is_choice(&self) -> bool {
        matches!(
            self,
            FieldType::Select | FieldType::Multiselect | FieldType::Radio
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Number | FieldType::Range)
    }

    /// Kind of value the field stores in a value map, `None` for unknown types.
    pub fn value_kind(&self) -> Option<ValueKind> {
        match self {
            FieldType::Number | FieldType::Range => Some(ValueKind::Number),
            FieldType::Checkbox => Some(ValueKind::Boolean),
            FieldType::Multiselect => Some(ValueKind::List),
            FieldType::File => Some(ValueKind::File),
            FieldType::Unknown => None,
            _ => Some(ValueKind::Text),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for FieldType {
    fn from(value: String) -> Self {
        FieldType::parse(&value)
    }
}

impl From<FieldType> for String {
    fn from(value: FieldType) -> Self {
        value.as_str().to_string()
    }
}

impl std::str::FromStr for FieldType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match FieldType::parse(value) {
            FieldType::Unknown => Err(format!("unknown field type '{}'", value)),
            kind => Ok(kind),
        }
    }
}

impl JsonSchema for FieldType {
    fn schema_name() -> Cow<'static, str> {
        "FieldType".into()
    }

    fn json_schema(_generator: &mut SchemaGenerator) -> Schema {
        let names = FieldType::ALL
            .iter()
            .map(|kind| kind.as_str())
            .collect::<Vec<_>>();
        json_schema!({
            "type": "string",
            "enum": names,
        })
    }
}

/// Shows a field only while another field holds a specific value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalField {
    pub field_id: FieldId,
    pub value: FieldValue,
}

/// One configurable input in a category's application form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    #[serde(default)]
    pub id: FieldId,
    #[serde(default)]
    pub category_id: CategoryId,
    pub label: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default)]
    pub order: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_rules: Vec<ValidationRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional_field: Option<ConditionalField>,
}

impl FieldDefinition {
    /// Builds a definition from the two mandatory attributes; `name` is derived from `label`.
    pub fn new(label: impl Into<String>, kind: FieldType) -> Result<Self, SpecError> {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(SpecError::EmptyLabel);
        }
        Ok(Self {
            id: String::new(),
            category_id: String::new(),
            name: derive_name(&label),
            label,
            kind,
            placeholder: None,
            required: false,
            options: Vec::new(),
            min: None,
            max: None,
            step: None,
            order: 0,
            validation_rules: Vec::new(),
            conditional_field: None,
        })
    }

    /// Assigns the row id; stores call this once when a field is created.
    pub fn with_id(mut self, id: impl Into<FieldId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn in_category(mut self, category_id: impl Into<CategoryId>) -> Self {
        self.category_id = category_id.into();
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_bounds(mut self, min: Option<f64>, max: Option<f64>, step: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self.step = step;
        self
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    pub fn with_rule(mut self, rule: ValidationRule) -> Self {
        self.validation_rules.push(rule);
        self
    }

    pub fn shown_when(mut self, field_id: impl Into<FieldId>, value: FieldValue) -> Self {
        self.conditional_field = Some(ConditionalField {
            field_id: field_id.into(),
            value,
        });
        self
    }

    /// Fills a missing `name` from the label, as stores do when rows arrive without one.
    pub fn normalized(mut self) -> Self {
        if self.name.trim().is_empty() {
            self.name = derive_name(&self.label);
        }
        self
    }

    /// Identity comparison: two definitions are the same field when their ids match.
    pub fn same_identity(&self, other: &FieldDefinition) -> bool {
        !self.id.is_empty() && self.id == other.id
    }

    /// Message shown when the field is required but empty.
    pub fn required_message(&self) -> &str {
        self.rules(RuleKind::Required)
            .map(|rule| rule.message.trim())
            .find(|message| !message.is_empty())
            .unwrap_or(REQUIRED_MESSAGE)
    }

    pub fn rules(&self, kind: RuleKind) -> impl Iterator<Item = &ValidationRule> {
        self.validation_rules
            .iter()
            .filter(move |rule| rule.kind == kind)
    }

    /// Definition-level problems; an empty list means the field is well formed.
    pub fn check(&self) -> Vec<SpecError> {
        let mut problems = Vec::new();
        if self.label.trim().is_empty() {
            problems.push(SpecError::EmptyLabel);
        }
        if self.kind.is_choice() && self.options.is_empty() {
            problems.push(SpecError::MissingOptions(
                self.label.clone(),
                self.kind.as_str(),
            ));
        }
        if let Some(condition) = &self.conditional_field
            && !self.id.is_empty()
            && condition.field_id == self.id
        {
            problems.push(SpecError::SelfReference(self.id.clone()));
        }
        problems
    }
}

/// Machine key for a label: trimmed, lowercased, whitespace runs joined with `_`.
pub fn derive_name(label: &str) -> String {
    label
        .split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}
