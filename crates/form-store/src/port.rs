use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use form_spec::{
    CategoryId, ConditionalField, FieldDefinition, FieldId, FieldType, OrderUpdate,
    ValidationRule,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("field '{0}' not found")]
    FieldNotFound(FieldId),
    #[error("category '{0}' not found")]
    CategoryNotFound(CategoryId),
    #[error("category '{0}' already exists")]
    CategoryExists(CategoryId),
    #[error("field name '{name}' is already used in category '{category_id}'")]
    DuplicateName { category_id: CategoryId, name: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("failed to access store file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("store file {path} is not valid: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A category row as kept by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRow {
    pub id: CategoryId,
    pub name: String,
}

/// Partial update of a field definition. `None` leaves an attribute untouched;
/// the nested options clear an optional attribute with `Some(None)`. Positions
/// only change through `FieldStore::reorder`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldPatch {
    pub label: Option<String>,
    pub name: Option<String>,
    pub kind: Option<FieldType>,
    pub placeholder: Option<Option<String>>,
    pub required: Option<bool>,
    pub options: Option<Vec<String>>,
    pub min: Option<Option<f64>>,
    pub max: Option<Option<f64>>,
    pub step: Option<Option<f64>>,
    pub validation_rules: Option<Vec<ValidationRule>>,
    pub conditional_field: Option<Option<ConditionalField>>,
}

impl FieldPatch {
    /// A patch that overwrites every editable attribute with `field`'s values.
    pub fn full(field: &FieldDefinition) -> Self {
        Self {
            label: Some(field.label.clone()),
            name: Some(field.name.clone()),
            kind: Some(field.kind),
            placeholder: Some(field.placeholder.clone()),
            required: Some(field.required),
            options: Some(field.options.clone()),
            min: Some(field.min),
            max: Some(field.max),
            step: Some(field.step),
            validation_rules: Some(field.validation_rules.clone()),
            conditional_field: Some(field.conditional_field.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == FieldPatch::default()
    }

    /// Applies the patch; `id`, `category_id` and `order` are never touched.
    pub fn apply(&self, field: &mut FieldDefinition) {
        if let Some(label) = &self.label {
            field.label = label.clone();
        }
        if let Some(name) = &self.name {
            field.name = name.clone();
        }
        if let Some(kind) = self.kind {
            field.kind = kind;
        }
        if let Some(placeholder) = &self.placeholder {
            field.placeholder = placeholder.clone();
        }
        if let Some(required) = self.required {
            field.required = required;
        }
        if let Some(options) = &self.options {
            field.options = options.clone();
        }
        if let Some(min) = self.min {
            field.min = min;
        }
        if let Some(max) = self.max {
            field.max = max;
        }
        if let Some(step) = self.step {
            field.step = step;
        }
        if let Some(rules) = &self.validation_rules {
            field.validation_rules = rules.clone();
        }
        if let Some(condition) = &self.conditional_field {
            field.conditional_field = condition.clone();
        }
    }
}

/// Row operations on the category field definitions collection.
///
/// Implementations assign ids on create and return `list` results sorted by
/// `order`. Deleting a category deletes its fields.
#[async_trait]
pub trait FieldStore: Send + Sync {
    async fn categories(&self) -> StoreResult<Vec<CategoryRow>>;

    async fn create_category(&self, id: &str, name: &str) -> StoreResult<CategoryRow>;

    /// Removes the category and every field in it; returns how many fields went with it.
    async fn delete_category(&self, id: &str) -> StoreResult<usize>;

    async fn list(&self, category_id: &str) -> StoreResult<Vec<FieldDefinition>>;

    async fn get(&self, id: &str) -> StoreResult<FieldDefinition>;

    /// Inserts a field; any id on the input is replaced by a store-assigned one.
    async fn create(&self, field: FieldDefinition) -> StoreResult<FieldDefinition>;

    async fn update(&self, id: &str, patch: FieldPatch) -> StoreResult<FieldDefinition>;

    async fn delete(&self, id: &str) -> StoreResult<()>;

    /// Writes new `order` values for the listed fields.
    async fn reorder(&self, updates: &[OrderUpdate]) -> StoreResult<()>;
}
