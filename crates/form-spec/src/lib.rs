#![allow(missing_docs)]

pub mod answers_schema;
pub mod examples;
pub mod order;
pub mod render;
pub mod spec;
pub mod validate;
pub mod value;
pub mod visibility;

pub use answers_schema::generate as answers_schema;
pub use examples::generate as example_values;
pub use order::{OrderUpdate, contiguous_orders, move_to, sort_by_order};
pub use render::{
    ChoiceStyle, Control, ControlKind, ControlStatus, FormState, RenderError, RenderPayload,
    RenderProgress, RenderStatus, build_render_payload, render_json_ui, render_text,
};
pub use spec::{
    CategoryId, CategorySpec, ConditionalField, FieldDefinition, FieldId, FieldType, RuleKind,
    RuleValue, SpecError, ValidationRule, derive_name,
};
pub use validate::{ValidationError, ValidationResult, Validator, validate, validate_category};
pub use value::{FieldValue, FileHandle, ValueKind, ValueMap};
pub use visibility::{VisibilityMap, resolve_visibility, visible_fields};
