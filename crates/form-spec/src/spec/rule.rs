use std::borrow::Cow;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::value::format_number;

/// Kinds of rule an admin can attach to a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum RuleKind {
    Required,
    MinLength,
    MaxLength,
    Pattern,
    Min,
    Max,
    Email,
    Url,
    Phone,
    Custom,
}

impl RuleKind {
    /// Stable error code reported alongside failures of this rule.
    pub fn code(&self) -> &'static str {
        match self {
            RuleKind::Required => "required",
            RuleKind::MinLength => "min_length",
            RuleKind::MaxLength => "max_length",
            RuleKind::Pattern => "pattern_mismatch",
            RuleKind::Min => "min",
            RuleKind::Max => "max",
            RuleKind::Email => "email",
            RuleKind::Url => "url",
            RuleKind::Phone => "phone",
            RuleKind::Custom => "custom",
        }
    }

    fn fallback_message(&self) -> &'static str {
        match self {
            RuleKind::Required => crate::spec::field::REQUIRED_MESSAGE,
            RuleKind::MinLength => "Value is too short",
            RuleKind::MaxLength => "Value is too long",
            RuleKind::Pattern => "Value has an invalid format",
            RuleKind::Min => "Value is too small",
            RuleKind::Max => "Value is too large",
            RuleKind::Email => "Enter a valid email address",
            RuleKind::Url => "Enter a valid URL",
            RuleKind::Phone => "Enter a valid phone number",
            RuleKind::Custom => "Value is invalid",
        }
    }
}

/// Rule parameter: a threshold, a regular expression or a custom rule name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RuleValue {
    Number(f64),
    Text(String),
}

impl RuleValue {
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            RuleValue::Number(value) => Some(*value),
            RuleValue::Text(text) => text.trim().parse::<f64>().ok(),
        };
        value.filter(|value| value.is_finite())
    }

    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            RuleValue::Number(value) => Cow::Owned(format_number(*value)),
            RuleValue::Text(text) => Cow::Borrowed(text),
        }
    }
}

impl From<f64> for RuleValue {
    fn from(value: f64) -> Self {
        RuleValue::Number(value)
    }
}

impl From<&str> for RuleValue {
    fn from(value: &str) -> Self {
        RuleValue::Text(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationRule {
    #[serde(rename = "type")]
    pub kind: RuleKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<RuleValue>,
    #[serde(default)]
    pub message: String,
}

impl ValidationRule {
    pub fn new(kind: RuleKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            value: None,
            message: message.into(),
        }
    }

    pub fn with_value(mut self, value: impl Into<RuleValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Numeric parameter, `None` when missing or not a number.
    pub fn threshold(&self) -> Option<f64> {
        self.value.as_ref().and_then(RuleValue::as_f64)
    }

    /// Configured message, or a generic one for rules saved without text.
    pub fn message(&self) -> &str {
        let message = self.message.trim();
        if message.is_empty() {
            self.kind.fallback_message()
        } else {
            message
        }
    }
}
