use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::answers_schema;
use crate::order::sort_by_order;
use crate::spec::category::CategorySpec;
use crate::spec::field::{FieldDefinition, FieldId, FieldType};
use crate::validate::{ValidationResult, Validator};
use crate::value::{FieldValue, ValueMap};
use crate::visibility::{VisibilityMap, resolve_visibility};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("no field with id '{0}' in this form")]
    UnknownField(FieldId),
    #[error("field '{0}' is not a multiselect field")]
    NotMultiselect(FieldId),
    #[error("'{option}' is not an option of field '{field_id}'")]
    UnknownOption { field_id: FieldId, option: String },
}

/// Per-control lifecycle: `Invalid` is only reachable through a validation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlStatus {
    Pristine,
    Touched,
    Valid,
    Invalid,
}

impl ControlStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlStatus::Pristine => "pristine",
            ControlStatus::Touched => "touched",
            ControlStatus::Valid => "valid",
            ControlStatus::Invalid => "invalid",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceStyle {
    Dropdown,
    Radio,
}

/// Input widget chosen for a field type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "control", rename_all = "snake_case")]
pub enum ControlKind {
    /// Single-line input; `input_type` is the HTML input type.
    Input { input_type: &'static str },
    TextArea,
    Numeric {
        min: Option<f64>,
        max: Option<f64>,
        step: Option<f64>,
        slider: bool,
    },
    SingleChoice {
        options: Vec<String>,
        style: ChoiceStyle,
    },
    /// Selected values are shown as removable chips, in selection order.
    MultiChoice {
        options: Vec<String>,
        chips: Vec<String>,
    },
    Toggle { checked: bool },
    FilePicker { selected: Option<String> },
}

impl ControlKind {
    pub fn label(&self) -> &'static str {
        match self {
            ControlKind::Input { .. } => "input",
            ControlKind::TextArea => "text_area",
            ControlKind::Numeric { .. } => "numeric",
            ControlKind::SingleChoice { .. } => "single_choice",
            ControlKind::MultiChoice { .. } => "multi_choice",
            ControlKind::Toggle { .. } => "toggle",
            ControlKind::FilePicker { .. } => "file_picker",
        }
    }
}

/// One rendered control for a visible field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Control {
    pub field_id: FieldId,
    pub label: String,
    pub placeholder: Option<String>,
    pub required: bool,
    pub kind: ControlKind,
    pub value: Option<FieldValue>,
    pub status: ControlStatus,
    pub error: Option<String>,
}

impl Control {
    /// Whether the control's border should be flagged.
    pub fn is_flagged(&self) -> bool {
        self.error.is_some()
    }
}

/// Control for a field, or `None` when the type is not recognized.
pub fn control_kind(field: &FieldDefinition, value: Option<&FieldValue>) -> Option<ControlKind> {
    let kind = match field.kind {
        FieldType::Text => ControlKind::Input { input_type: "text" },
        FieldType::Url => ControlKind::Input { input_type: "url" },
        FieldType::Date => ControlKind::Input { input_type: "date" },
        FieldType::Email => ControlKind::Input { input_type: "email" },
        FieldType::Tel => ControlKind::Input { input_type: "tel" },
        FieldType::Time => ControlKind::Input { input_type: "time" },
        FieldType::Datetime => ControlKind::Input {
            input_type: "datetime-local",
        },
        FieldType::Color => ControlKind::Input { input_type: "color" },
        FieldType::Textarea => ControlKind::TextArea,
        FieldType::Number | FieldType::Range => ControlKind::Numeric {
            min: field.min,
            max: field.max,
            step: field.step,
            slider: field.kind == FieldType::Range,
        },
        FieldType::Select => ControlKind::SingleChoice {
            options: field.options.clone(),
            style: ChoiceStyle::Dropdown,
        },
        FieldType::Radio => ControlKind::SingleChoice {
            options: field.options.clone(),
            style: ChoiceStyle::Radio,
        },
        FieldType::Multiselect => ControlKind::MultiChoice {
            options: field.options.clone(),
            chips: value
                .and_then(FieldValue::as_list)
                .map(<[String]>::to_vec)
                .unwrap_or_default(),
        },
        FieldType::Checkbox => ControlKind::Toggle {
            checked: value.and_then(FieldValue::as_bool).unwrap_or(false),
        },
        FieldType::File => ControlKind::FilePicker {
            selected: match value {
                Some(FieldValue::File(handle)) => Some(handle.name.clone()),
                _ => None,
            },
        },
        FieldType::Unknown => return None,
    };
    Some(kind)
}

/// Live state of one applicant form: the ordered definitions, the value map,
/// which fields were touched, and the errors of the last validation pass.
#[derive(Debug, Clone)]
pub struct FormState {
    fields: Vec<FieldDefinition>,
    values: ValueMap,
    touched: BTreeSet<FieldId>,
    checked: BTreeSet<FieldId>,
    errors: BTreeMap<FieldId, String>,
    validator: Validator,
}

impl FormState {
    pub fn new(mut fields: Vec<FieldDefinition>) -> Self {
        sort_by_order(&mut fields);
        Self {
            fields,
            values: ValueMap::new(),
            touched: BTreeSet::new(),
            checked: BTreeSet::new(),
            errors: BTreeMap::new(),
            validator: Validator::default(),
        }
    }

    pub fn for_category(category: &CategorySpec) -> Self {
        Self::new(category.fields.clone())
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Seeds the value map without marking anything touched.
    pub fn with_values(mut self, values: ValueMap) -> Self {
        self.values = values;
        self
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn values(&self) -> &ValueMap {
        &self.values
    }

    pub fn into_values(self) -> ValueMap {
        self.values
    }

    pub fn field(&self, field_id: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.id == field_id)
    }

    pub fn visibility(&self) -> VisibilityMap {
        resolve_visibility(&self.fields, &self.values)
    }

    pub fn status(&self, field_id: &str) -> ControlStatus {
        if self.checked.contains(field_id) {
            if self.errors.contains_key(field_id) {
                ControlStatus::Invalid
            } else {
                ControlStatus::Valid
            }
        } else if self.touched.contains(field_id) {
            ControlStatus::Touched
        } else {
            ControlStatus::Pristine
        }
    }

    pub fn error(&self, field_id: &str) -> Option<&str> {
        self.errors.get(field_id).map(String::as_str)
    }

    /// The single write path into the value map.
    pub fn on_change(&mut self, field_id: &str, value: FieldValue) -> Result<(), RenderError> {
        self.ensure_field(field_id)?;
        self.values.set(field_id, value);
        self.mark_changed(field_id);
        Ok(())
    }

    /// Empties a field, as when an input is cleared.
    pub fn clear(&mut self, field_id: &str) -> Result<(), RenderError> {
        self.ensure_field(field_id)?;
        self.values.remove(field_id);
        self.mark_changed(field_id);
        Ok(())
    }

    /// Adds or removes one chip of a multiselect field; returns whether it is now selected.
    pub fn toggle_option(&mut self, field_id: &str, option: &str) -> Result<bool, RenderError> {
        let field = self.ensure_field(field_id)?;
        if field.kind != FieldType::Multiselect {
            return Err(RenderError::NotMultiselect(field_id.to_string()));
        }
        if !field.options.iter().any(|candidate| candidate == option) {
            return Err(RenderError::UnknownOption {
                field_id: field_id.to_string(),
                option: option.to_string(),
            });
        }
        let selected = self.values.toggle_option(field_id, option);
        self.mark_changed(field_id);
        Ok(selected)
    }

    /// One control per visible field of a recognized type, in display order.
    pub fn controls(&self) -> Vec<Control> {
        let visibility = self.visibility();
        self.fields
            .iter()
            .filter(|field| visibility.get(&field.id).copied().unwrap_or(true))
            .filter_map(|field| {
                let value = self.values.get(&field.id);
                let kind = control_kind(field, value)?;
                Some(Control {
                    field_id: field.id.clone(),
                    label: field.label.clone(),
                    placeholder: field.placeholder.clone(),
                    required: field.required,
                    kind,
                    value: value.cloned(),
                    status: self.status(&field.id),
                    error: self.errors.get(&field.id).cloned(),
                })
            })
            .collect()
    }

    /// Runs a validation pass over the visible fields and records its errors.
    pub fn validate(&mut self) -> ValidationResult {
        let visibility = self.visibility();
        let visible = self
            .fields
            .iter()
            .filter(|field| visibility.get(&field.id).copied().unwrap_or(true))
            .collect::<Vec<_>>();
        let result = self.validator.validate(visible.iter().copied(), &self.values);
        let checked = visible
            .iter()
            .map(|field| field.id.clone())
            .collect::<BTreeSet<_>>();

        self.errors = result.field_errors();
        self.checked = checked;
        result
    }

    /// Validates and, when valid, returns the values of the visible fields.
    ///
    /// On failure every entered value stays in place so the form remains editable.
    pub fn submit(&mut self) -> Result<ValueMap, ValidationResult> {
        let result = self.validate();
        if !result.valid {
            return Err(result);
        }
        let mut submitted = self.values.clone();
        submitted.retain(|field_id| self.checked.contains(field_id));
        Ok(submitted)
    }

    fn ensure_field(&self, field_id: &str) -> Result<&FieldDefinition, RenderError> {
        self.field(field_id)
            .ok_or_else(|| RenderError::UnknownField(field_id.to_string()))
    }

    fn mark_changed(&mut self, field_id: &str) {
        self.touched.insert(field_id.to_string());
        self.checked.remove(field_id);
        self.errors.remove(field_id);
    }
}

/// Status labels returned by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// A required visible field is still empty.
    NeedInput,
    /// The last validation pass left errors on screen.
    Invalid,
    /// Every required visible field holds a value.
    Complete,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::NeedInput => "need_input",
            RenderStatus::Invalid => "invalid",
            RenderStatus::Complete => "complete",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderProgress {
    pub answered: usize,
    pub total: usize,
}

/// Collected payload used by both text and JSON renderers.
#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub category_id: String,
    pub category_name: String,
    pub status: RenderStatus,
    pub progress: RenderProgress,
    pub controls: Vec<Control>,
    pub schema: Value,
}

pub fn build_render_payload(category: &CategorySpec, state: &FormState) -> RenderPayload {
    let visibility = state.visibility();
    let controls = state.controls();
    let answered = controls
        .iter()
        .filter(|control| control.value.as_ref().is_some_and(|value| !value.is_empty()))
        .count();
    let missing_required = controls.iter().any(|control| {
        control.required && control.value.as_ref().is_none_or(FieldValue::is_empty)
    });

    let status = if controls.iter().any(Control::is_flagged) {
        RenderStatus::Invalid
    } else if missing_required {
        RenderStatus::NeedInput
    } else {
        RenderStatus::Complete
    };

    RenderPayload {
        category_id: category.id.clone(),
        category_name: category.name.clone(),
        status,
        progress: RenderProgress {
            answered,
            total: controls.len(),
        },
        schema: answers_schema::generate(state.fields(), &visibility),
        controls,
    }
}

/// Render the payload as a structured JSON-friendly value.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let controls = payload
        .controls
        .iter()
        .map(|control| {
            let mut map = Map::new();
            map.insert("field_id".into(), Value::String(control.field_id.clone()));
            map.insert("label".into(), Value::String(control.label.clone()));
            map.insert(
                "placeholder".into(),
                control
                    .placeholder
                    .clone()
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            );
            map.insert("control".into(), control_json(&control.kind));
            map.insert("required".into(), Value::Bool(control.required));
            map.insert(
                "status".into(),
                Value::String(control.status.as_str().to_string()),
            );
            if let Some(value) = &control.value {
                map.insert("value".into(), field_value_json(value));
            }
            if let Some(error) = &control.error {
                map.insert("error".into(), Value::String(error.clone()));
            }
            map.insert("flagged".into(), Value::Bool(control.is_flagged()));
            Value::Object(map)
        })
        .collect::<Vec<_>>();

    json!({
        "category_id": payload.category_id,
        "category_name": payload.category_name,
        "status": payload.status.as_str(),
        "progress": {
            "answered": payload.progress.answered,
            "total": payload.progress.total,
        },
        "controls": controls,
        "schema": payload.schema,
    })
}

/// Render the payload as human-friendly text.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "Category: {} ({})",
        payload.category_name, payload.category_id
    ));
    lines.push(format!(
        "Status: {} ({}/{})",
        payload.status.as_str(),
        payload.progress.answered,
        payload.progress.total
    ));

    lines.push("Fields:".to_string());
    for control in &payload.controls {
        let mut entry = format!(" - {} [{}]", control.label, describe_control(&control.kind));
        if control.required {
            entry.push_str(" *");
        }
        if let Some(value) = &control.value {
            entry.push_str(&format!(" = {}", value));
        }
        lines.push(entry);
        if let Some(error) = &control.error {
            lines.push(format!("   ! {}", error));
        }
    }

    lines.join("\n")
}

fn describe_control(kind: &ControlKind) -> String {
    match kind {
        ControlKind::Input { input_type } => format!("input:{}", input_type),
        ControlKind::Numeric { slider: true, .. } => "slider".to_string(),
        ControlKind::SingleChoice { options, style } => {
            let style = match style {
                ChoiceStyle::Dropdown => "dropdown",
                ChoiceStyle::Radio => "radio",
            };
            format!("{}: {}", style, options.join(" | "))
        }
        ControlKind::MultiChoice { options, .. } => format!("choose any: {}", options.join(" | ")),
        other => other.label().to_string(),
    }
}

fn control_json(kind: &ControlKind) -> Value {
    match kind {
        ControlKind::Input { input_type } => json!({ "type": "input", "input_type": input_type }),
        ControlKind::TextArea => json!({ "type": "text_area" }),
        ControlKind::Numeric {
            min,
            max,
            step,
            slider,
        } => json!({
            "type": "numeric",
            "min": min,
            "max": max,
            "step": step,
            "slider": slider,
        }),
        ControlKind::SingleChoice { options, style } => json!({
            "type": "single_choice",
            "style": match style {
                ChoiceStyle::Dropdown => "dropdown",
                ChoiceStyle::Radio => "radio",
            },
            "options": options,
        }),
        ControlKind::MultiChoice { options, chips } => json!({
            "type": "multi_choice",
            "options": options,
            "chips": chips,
        }),
        ControlKind::Toggle { checked } => json!({ "type": "toggle", "checked": checked }),
        ControlKind::FilePicker { selected } => json!({ "type": "file_picker", "selected": selected }),
    }
}

fn field_value_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::Boolean(flag) => Value::Bool(*flag),
        FieldValue::Number(number) => json!(number),
        FieldValue::Text(text) => Value::String(text.clone()),
        FieldValue::List(items) => json!(items),
        FieldValue::File(handle) => json!({ "name": handle.name }),
    }
}
