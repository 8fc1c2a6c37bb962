use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::spec::category::CategorySpec;
use crate::spec::field::{FieldDefinition, FieldId, FieldType};
use crate::spec::rule::{RuleKind, ValidationRule};
use crate::value::{FieldValue, ValueMap, format_number};
use crate::visibility::visible_fields;

pub const INVALID_OPTION_MESSAGE: &str = "Please select a valid option";
pub const INVALID_NUMBER_MESSAGE: &str = "Please enter a valid number";
pub const TYPE_MISMATCH_MESSAGE: &str = "Value does not match the field type";

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://[^\s/?#]+(?:[/?#]\S*)?$").expect("url pattern compiles")
});
static PHONE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[0-9][0-9 ()\-.]{5,18}[0-9]$").expect("phone pattern compiles")
});

/// One failed check on one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field_id: FieldId,
    pub message: String,
    pub code: String,
}

/// Outcome of validating a value map; `valid` is all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    /// Every failed check, in field order and then rule order.
    pub errors: Vec<ValidationError>,
    pub missing_required: Vec<FieldId>,
}

impl ValidationResult {
    /// First error message per field, the one shown beneath a control.
    pub fn field_errors(&self) -> BTreeMap<FieldId, String> {
        let mut map = BTreeMap::new();
        for error in &self.errors {
            map.entry(error.field_id.clone())
                .or_insert_with(|| error.message.clone());
        }
        map
    }

    pub fn error_for(&self, field_id: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|error| error.field_id == field_id)
            .map(|error| error.message.as_str())
    }
}

type CustomRule = Arc<dyn Fn(&FieldValue) -> bool + Send + Sync>;

/// Validates value maps against field definitions.
///
/// `custom` rules name a function registered with [`Validator::with_custom_rule`];
/// the rule's `value` carries the name.
#[derive(Clone, Default)]
pub struct Validator {
    custom: HashMap<String, CustomRule>,
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = self.custom.keys().collect::<Vec<_>>();
        names.sort();
        f.debug_struct("Validator")
            .field("custom_rules", &names)
            .finish()
    }
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_custom_rule<F>(mut self, name: impl Into<String>, rule: F) -> Self
    where
        F: Fn(&FieldValue) -> bool + Send + Sync + 'static,
    {
        self.custom.insert(name.into(), Arc::new(rule));
        self
    }

    /// Validates the given fields, which callers have already filtered for visibility.
    pub fn validate<'a, I>(&self, fields: I, values: &ValueMap) -> ValidationResult
    where
        I: IntoIterator<Item = &'a FieldDefinition>,
    {
        let mut errors = Vec::new();
        let mut missing_required = Vec::new();

        for field in fields {
            if field.kind == FieldType::Unknown {
                continue;
            }
            let value = values.get(&field.id).filter(|value| !value.is_empty());
            match value {
                None => {
                    if let Some(message) = self.missing_message(field) {
                        if field.required {
                            missing_required.push(field.id.clone());
                        }
                        errors.push(field_error(field, message, RuleKind::Required.code()));
                    }
                }
                Some(value) => self.check_value(field, value, &mut errors),
            }
        }

        ValidationResult {
            valid: errors.is_empty(),
            errors,
            missing_required,
        }
    }

    /// Filters `fields` through the visibility evaluator, then validates what is shown.
    pub fn validate_visible(&self, fields: &[FieldDefinition], values: &ValueMap) -> ValidationResult {
        self.validate(visible_fields(fields, values), values)
    }

    fn missing_message<'f>(&self, field: &'f FieldDefinition) -> Option<&'f str> {
        if field.required {
            return Some(field.required_message());
        }
        field.rules(RuleKind::Required).next().map(ValidationRule::message)
    }

    fn check_value(
        &self,
        field: &FieldDefinition,
        value: &FieldValue,
        errors: &mut Vec<ValidationError>,
    ) {
        if let Some((message, code)) = check_shape(field, value) {
            errors.push(field_error(field, message, code));
        }
        if field.kind.is_numeric()
            && let Some(number) = value.as_number()
        {
            if let Some(min) = field.min
                && number < min
            {
                let message = format!("Must be at least {}", format_number(min));
                errors.push(field_error(field, &message, RuleKind::Min.code()));
            }
            if let Some(max) = field.max
                && number > max
            {
                let message = format!("Must be at most {}", format_number(max));
                errors.push(field_error(field, &message, RuleKind::Max.code()));
            }
        }

        for rule in &field.validation_rules {
            if !self.rule_passes(field, rule, value) {
                errors.push(field_error(field, rule.message(), rule.kind.code()));
            }
        }
    }

    fn rule_passes(&self, field: &FieldDefinition, rule: &ValidationRule, value: &FieldValue) -> bool {
        match rule.kind {
            RuleKind::Required => true,
            RuleKind::MinLength | RuleKind::MaxLength => {
                let Some(limit) = rule.threshold() else {
                    warn!(field = %field.id, rule = ?rule.kind, "length rule has no numeric limit");
                    return false;
                };
                match value.length() {
                    Some(length) if rule.kind == RuleKind::MinLength => length as f64 >= limit,
                    Some(length) => length as f64 <= limit,
                    None => true,
                }
            }
            RuleKind::Pattern => {
                let Some(pattern) = rule.value.as_ref().map(|value| value.as_text()) else {
                    warn!(field = %field.id, "pattern rule has no expression");
                    return false;
                };
                let regex = match Regex::new(&pattern) {
                    Ok(regex) => regex,
                    Err(err) => {
                        warn!(field = %field.id, pattern = %pattern, error = %err, "invalid pattern rule");
                        return false;
                    }
                };
                value.as_text().is_none_or(|text| regex.is_match(&text))
            }
            RuleKind::Min | RuleKind::Max => {
                let Some(limit) = rule.threshold() else {
                    warn!(field = %field.id, rule = ?rule.kind, "bound rule has no numeric limit");
                    return false;
                };
                match value.as_number() {
                    Some(number) if rule.kind == RuleKind::Min => number >= limit,
                    Some(number) => number <= limit,
                    None => false,
                }
            }
            RuleKind::Email => matches_format(&EMAIL_PATTERN, value),
            RuleKind::Url => matches_format(&URL_PATTERN, value),
            RuleKind::Phone => matches_format(&PHONE_PATTERN, value),
            RuleKind::Custom => {
                let name = rule
                    .value
                    .as_ref()
                    .map(|value| value.as_text().into_owned())
                    .unwrap_or_default();
                match self.custom.get(&name) {
                    Some(check) => check(value),
                    None => {
                        warn!(field = %field.id, rule = %name, "no custom rule registered under this name; skipping");
                        true
                    }
                }
            }
        }
    }
}

/// Type agreement and option membership for a present value.
fn check_shape(field: &FieldDefinition, value: &FieldValue) -> Option<(&'static str, &'static str)> {
    match field.kind {
        FieldType::Number | FieldType::Range => value
            .as_number()
            .is_none()
            .then_some((INVALID_NUMBER_MESSAGE, "type_mismatch")),
        FieldType::Select | FieldType::Radio => {
            let member = matches!(value, FieldValue::Text(text) if field.options.contains(text));
            (!member).then_some((INVALID_OPTION_MESSAGE, "invalid_option"))
        }
        FieldType::Multiselect => {
            let member = value
                .as_list()
                .is_some_and(|items| items.iter().all(|item| field.options.contains(item)));
            (!member).then_some((INVALID_OPTION_MESSAGE, "invalid_option"))
        }
        FieldType::Unknown => None,
        kind => {
            let expected = kind.value_kind()?;
            (value.kind() != expected).then_some((TYPE_MISMATCH_MESSAGE, "type_mismatch"))
        }
    }
}

fn matches_format(pattern: &Regex, value: &FieldValue) -> bool {
    value
        .as_text()
        .is_some_and(|text| pattern.is_match(text.trim()))
}

fn field_error(field: &FieldDefinition, message: &str, code: &str) -> ValidationError {
    ValidationError {
        field_id: field.id.clone(),
        message: message.to_string(),
        code: code.to_string(),
    }
}

/// Validates an already-visible list of fields with no custom rules registered.
pub fn validate(fields: &[FieldDefinition], values: &ValueMap) -> ValidationResult {
    Validator::default().validate(fields, values)
}

/// Validates a category's form: hidden fields are skipped, order follows `order`.
pub fn validate_category(category: &CategorySpec, values: &ValueMap) -> ValidationResult {
    let mut fields = category.fields.clone();
    crate::order::sort_by_order(&mut fields);
    Validator::default().validate_visible(&fields, values)
}
