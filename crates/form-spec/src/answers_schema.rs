use serde_json::{Map, Value, json};

use crate::spec::field::{FieldDefinition, FieldType};
use crate::spec::rule::RuleKind;
use crate::visibility::VisibilityMap;

/// JSON Schema describing a value map for the visible fields, keyed by field id.
pub fn generate(fields: &[FieldDefinition], visibility: &VisibilityMap) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for field in fields {
        if !visibility.get(&field.id).copied().unwrap_or(true) {
            continue;
        }
        let Some(mut schema) = property_schema(field) else {
            continue;
        };
        if let Value::Object(map) = &mut schema {
            map.insert("title".into(), Value::String(field.label.clone()));
            apply_rules(field, map);
        }
        properties.insert(field.id.clone(), schema);
        if field.required {
            required.push(Value::String(field.id.clone()));
        }
    }

    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

fn property_schema(field: &FieldDefinition) -> Option<Value> {
    let schema = match field.kind {
        FieldType::Number | FieldType::Range => {
            let mut map = Map::new();
            map.insert("type".into(), json!("number"));
            if let Some(min) = field.min {
                map.insert("minimum".into(), json!(min));
            }
            if let Some(max) = field.max {
                map.insert("maximum".into(), json!(max));
            }
            Value::Object(map)
        }
        FieldType::Select | FieldType::Radio => json!({
            "type": "string",
            "enum": field.options,
        }),
        FieldType::Multiselect => json!({
            "type": "array",
            "items": { "type": "string", "enum": field.options },
            "uniqueItems": true,
        }),
        FieldType::Checkbox => json!({ "type": "boolean" }),
        FieldType::File => json!({
            "type": "object",
            "properties": { "name": { "type": "string" } },
            "required": ["name"],
        }),
        FieldType::Email => json!({ "type": "string", "format": "email" }),
        FieldType::Url => json!({ "type": "string", "format": "uri" }),
        FieldType::Date => json!({ "type": "string", "format": "date" }),
        FieldType::Time => json!({ "type": "string", "format": "time" }),
        FieldType::Unknown => return None,
        _ => json!({ "type": "string" }),
    };
    Some(schema)
}

fn apply_rules(field: &FieldDefinition, map: &mut Map<String, Value>) {
    let is_list = field.kind == FieldType::Multiselect;
    for rule in &field.validation_rules {
        match rule.kind {
            RuleKind::MinLength => {
                if let Some(limit) = rule.threshold() {
                    let key = if is_list { "minItems" } else { "minLength" };
                    map.insert(key.into(), json!(limit as u64));
                }
            }
            RuleKind::MaxLength => {
                if let Some(limit) = rule.threshold() {
                    let key = if is_list { "maxItems" } else { "maxLength" };
                    map.insert(key.into(), json!(limit as u64));
                }
            }
            RuleKind::Pattern => {
                if let Some(pattern) = &rule.value {
                    map.insert("pattern".into(), json!(pattern.as_text()));
                }
            }
            RuleKind::Min => {
                if let Some(limit) = rule.threshold() {
                    map.insert("minimum".into(), json!(limit));
                }
            }
            RuleKind::Max => {
                if let Some(limit) = rule.threshold() {
                    map.insert("maximum".into(), json!(limit));
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::rule::ValidationRule;
    use crate::value::{FieldValue, ValueMap};
    use crate::visibility::resolve_visibility;

    #[test]
    fn schema_lists_visible_fields_and_required() {
        let fields = vec![
            FieldDefinition::new("Full Name", FieldType::Text)
                .expect("field")
                .with_id("name")
                .required(true)
                .with_rule(ValidationRule::new(RuleKind::MaxLength, "Too long").with_value(80.0)),
            FieldDefinition::new("Level", FieldType::Select)
                .expect("field")
                .with_id("level")
                .with_options(["junior", "senior"]),
            FieldDefinition::new("Mentor", FieldType::Text)
                .expect("field")
                .with_id("mentor")
                .shown_when("level", FieldValue::Text("junior".into())),
        ];
        let visibility = resolve_visibility(&fields, &ValueMap::new());
        let schema = generate(&fields, &visibility);
        let properties = schema["properties"].as_object().expect("properties");
        assert!(properties.contains_key("name"));
        assert!(properties.contains_key("level"));
        assert!(!properties.contains_key("mentor"));
        assert_eq!(schema["properties"]["name"]["maxLength"], 80);
        assert_eq!(schema["properties"]["level"]["enum"][1], "senior");
        assert_eq!(schema["required"], json!(["name"]));
    }
}
