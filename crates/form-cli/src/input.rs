use std::fs;
use std::path::Path;

use form_spec::{CategorySpec, FieldDefinition, FieldType, FieldValue, ValueMap};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::CliResult;

/// Loads a field definition document: either a category object
/// (`{ "id", "name", "fields" }`) or a bare array of definitions, in which
/// case the file stem names the category.
pub fn load_category(path: &Path) -> CliResult<CategorySpec> {
    let document: Value = read_json(path)?;
    let category = match document {
        Value::Array(_) => {
            let fields: Vec<FieldDefinition> = from_document(path, document)?;
            let id = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "category".to_string());
            CategorySpec::new(id.clone(), id).with_fields(fields)
        }
        other => {
            let category: CategorySpec = from_document(path, other)?;
            CategorySpec::new(category.id, category.name).with_fields(category.fields)
        }
    };
    for problem in category.check() {
        warn!(path = %path.display(), problem = %problem, "field definition problem");
    }
    Ok(category)
}

/// Loads a value map keyed by field id; no path means an empty map.
pub fn load_values(path: Option<&Path>) -> CliResult<ValueMap> {
    match path {
        Some(path) => read_json(path),
        None => Ok(ValueMap::new()),
    }
}

pub fn load_field(path: &Path) -> CliResult<FieldDefinition> {
    read_json(path)
}

/// Resolves a field type name, rejecting the ones the renderer cannot display.
pub fn parse_field_type(raw: &str) -> CliResult<FieldType> {
    match FieldType::parse(raw) {
        FieldType::Unknown => {
            let known = FieldType::ALL
                .iter()
                .map(FieldType::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            Err(format!("unknown field type '{}' (expected one of: {})", raw, known).into())
        }
        kind => Ok(kind),
    }
}

/// Parses `FIELD_ID=VALUE`; the value is read as JSON when it parses, text otherwise.
pub fn parse_condition(raw: &str) -> CliResult<(String, FieldValue)> {
    let (field_id, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD_ID=VALUE, got '{}'", raw))?;
    let field_id = field_id.trim();
    if field_id.is_empty() {
        return Err("condition field id cannot be empty".into());
    }
    let value = serde_json::from_str::<FieldValue>(value)
        .unwrap_or_else(|_| FieldValue::Text(value.to_string()));
    Ok((field_id.to_string(), value))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    let raw = fs::read_to_string(path)
        .map_err(|err| format!("failed to read {}: {}", path.display(), err))?;
    serde_json::from_str(&raw)
        .map_err(|err| format!("{} is not valid: {}", path.display(), err).into())
}

fn from_document<T: DeserializeOwned>(path: &Path, document: Value) -> CliResult<T> {
    serde_json::from_value(document)
        .map_err(|err| format!("{} is not valid: {}", path.display(), err).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn bare_field_arrays_take_the_file_stem_as_category() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("volunteering.json");
        fs::write(
            &path,
            r#"[
                { "id": "b", "label": "Second", "type": "text", "order": 1 },
                { "id": "a", "label": "First Choice", "type": "text", "order": 0 }
            ]"#,
        )
        .expect("write");

        let category = load_category(&path).expect("category");
        assert_eq!(category.id, "volunteering");
        assert_eq!(category.fields[0].id, "a");
        assert_eq!(category.fields[0].name, "first_choice");
        assert_eq!(category.fields[1].category_id, "volunteering");
    }

    #[test]
    fn conditions_read_json_literals_then_text() {
        assert_eq!(
            parse_condition("f-relocate=true").expect("condition"),
            ("f-relocate".to_string(), FieldValue::Boolean(true))
        );
        assert_eq!(
            parse_condition("f-track=backend").expect("condition"),
            ("f-track".to_string(), FieldValue::Text("backend".into()))
        );
        assert!(parse_condition("no-separator").is_err());
        assert!(parse_condition("=x").is_err());
    }

    #[test]
    fn unknown_types_are_rejected() {
        assert_eq!(parse_field_type("email").expect("type"), FieldType::Email);
        let err = parse_field_type("signature").unwrap_err();
        assert!(err.to_string().contains("unknown field type 'signature'"));
    }

    #[test]
    fn missing_values_file_is_an_empty_map() {
        assert!(load_values(None).expect("values").is_empty());
    }
}
