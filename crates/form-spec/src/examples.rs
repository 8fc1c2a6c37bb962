use regex::Regex;

use crate::spec::field::{FieldDefinition, FieldType};
use crate::spec::rule::RuleKind;
use crate::value::{FieldValue, FileHandle, ValueMap};
use crate::visibility::VisibilityMap;

const EMAIL_SAMPLE: &str = "applicant@example.com";
const URL_SAMPLE: &str = "https://example.com";
const PHONE_SAMPLE: &str = "+1 555 010 0100";

/// Tried in order when a field carries `pattern` rules. A pattern none of
/// these match keeps the default sample.
const PATTERN_SAMPLES: &[&str] = &[
    EMAIL_SAMPLE,
    URL_SAMPLE,
    PHONE_SAMPLE,
    "12345",
    "ABC123",
    "abc123",
    "Example",
    "example",
    "2024-01-15",
    "#336699",
];

/// Sample value map for the visible fields, shaped to pass the built-in checks
/// and the field's own rules.
pub fn generate(fields: &[FieldDefinition], visibility: &VisibilityMap) -> ValueMap {
    fields
        .iter()
        .filter(|field| visibility.get(&field.id).copied().unwrap_or(true))
        .filter_map(|field| example_value(field).map(|value| (field.id.clone(), value)))
        .collect()
}

fn example_value(field: &FieldDefinition) -> Option<FieldValue> {
    let value = match field.kind {
        FieldType::Text | FieldType::Textarea => {
            FieldValue::Text(example_text(field, format!("example-{}", field.name)))
        }
        FieldType::Url => FieldValue::Text(example_text(field, URL_SAMPLE.into())),
        FieldType::Email => FieldValue::Text(example_text(field, EMAIL_SAMPLE.into())),
        FieldType::Tel => FieldValue::Text(example_text(field, PHONE_SAMPLE.into())),
        FieldType::Number | FieldType::Range => FieldValue::Number(example_number(field)),
        FieldType::Select | FieldType::Radio => FieldValue::Text(field.options.first()?.clone()),
        FieldType::Multiselect => {
            let wanted = length_bound(field, RuleKind::MinLength, f64::max)
                .map_or(1, |min| min.max(1.0).ceil() as usize);
            let cap = length_bound(field, RuleKind::MaxLength, f64::min)
                .map_or(usize::MAX, |max| max.max(0.0) as usize);
            FieldValue::List(field.options.iter().take(wanted.min(cap)).cloned().collect())
        }
        FieldType::Checkbox => FieldValue::Boolean(false),
        FieldType::File => FieldValue::File(FileHandle::named("example.pdf")),
        FieldType::Date => FieldValue::Text("2024-01-15".into()),
        FieldType::Time => FieldValue::Text("09:30".into()),
        FieldType::Datetime => FieldValue::Text("2024-01-15T09:30".into()),
        FieldType::Color => FieldValue::Text("#336699".into()),
        FieldType::Unknown => return None,
    };
    Some(value)
}

fn example_text(field: &FieldDefinition, default: String) -> String {
    let has = |kind: RuleKind| field.rules(kind).next().is_some();
    let base = if has(RuleKind::Email) {
        EMAIL_SAMPLE.to_string()
    } else if has(RuleKind::Url) {
        URL_SAMPLE.to_string()
    } else if has(RuleKind::Phone) {
        PHONE_SAMPLE.to_string()
    } else {
        default
    };

    let patterns = field
        .rules(RuleKind::Pattern)
        .filter_map(|rule| rule.value.as_ref())
        .filter_map(|value| Regex::new(&value.as_text()).ok())
        .collect::<Vec<_>>();
    let mut text = if patterns.is_empty() {
        base
    } else {
        let matching = std::iter::once(base.as_str())
            .chain(PATTERN_SAMPLES.iter().copied())
            .find(|candidate| patterns.iter().all(|regex| regex.is_match(candidate)))
            .map(str::to_string);
        matching.unwrap_or(base)
    };

    if let Some(min) = length_bound(field, RuleKind::MinLength, f64::max) {
        while (text.chars().count() as f64) < min {
            text.push('x');
        }
    }
    if let Some(max) = length_bound(field, RuleKind::MaxLength, f64::min) {
        text = text.chars().take(max.max(0.0) as usize).collect();
    }
    text
}

/// Lowest value allowed by the field's own bounds and its `min`/`max` rules.
fn example_number(field: &FieldDefinition) -> f64 {
    let low = field
        .min
        .into_iter()
        .chain(field.rules(RuleKind::Min).filter_map(|rule| rule.threshold()))
        .reduce(f64::max);
    let high = field
        .max
        .into_iter()
        .chain(field.rules(RuleKind::Max).filter_map(|rule| rule.threshold()))
        .reduce(f64::min);
    let value = low.unwrap_or(0.0);
    match high {
        Some(high) if high < value => high,
        _ => value,
    }
}

fn length_bound(field: &FieldDefinition, kind: RuleKind, pick: fn(f64, f64) -> f64) -> Option<f64> {
    field
        .rules(kind)
        .filter_map(|rule| rule.threshold())
        .reduce(pick)
}
