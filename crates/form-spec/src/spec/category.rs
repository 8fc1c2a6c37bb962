use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::order::sort_by_order;
use crate::spec::field::{CategoryId, FieldDefinition, SpecError};

/// A category and the field definitions making up its application form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategorySpec {
    pub id: CategoryId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldDefinition>,
}

impl CategorySpec {
    pub fn new(id: impl Into<CategoryId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Attaches fields, filling derived names and sorting them into display order.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldDefinition>) -> Self {
        let category_id = self.id.clone();
        self.fields = fields
            .into_iter()
            .map(|field| {
                let field = field.normalized();
                if field.category_id.is_empty() {
                    field.in_category(category_id.clone())
                } else {
                    field
                }
            })
            .collect();
        sort_by_order(&mut self.fields);
        self
    }

    pub fn field(&self, id: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.id == id)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Fields in display order; ties keep their original position.
    pub fn ordered_fields(&self) -> Vec<&FieldDefinition> {
        let mut fields = self.fields.iter().collect::<Vec<_>>();
        fields.sort_by_key(|field| field.order);
        fields
    }

    /// Every definition problem in the category, including duplicate names.
    pub fn check(&self) -> Vec<SpecError> {
        let mut problems = Vec::new();
        let mut names = BTreeSet::new();
        for field in &self.fields {
            problems.extend(field.check());
            if !names.insert(field.name.as_str()) {
                problems.push(SpecError::DuplicateName(field.name.clone()));
            }
        }
        problems
    }
}
