use std::collections::HashSet;

use form_spec::{FieldDefinition, OrderUpdate, sort_by_order};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::port::{CategoryRow, FieldPatch, StoreError, StoreResult};

/// Whole store contents: the document the adapters keep in memory or on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub categories: Vec<CategoryRow>,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

impl Catalog {
    pub fn categories(&self) -> Vec<CategoryRow> {
        self.categories.clone()
    }

    pub fn create_category(&mut self, id: &str, name: &str) -> StoreResult<CategoryRow> {
        if self.has_category(id) {
            return Err(StoreError::CategoryExists(id.to_string()));
        }
        let row = CategoryRow {
            id: id.to_string(),
            name: name.to_string(),
        };
        self.categories.push(row.clone());
        Ok(row)
    }

    pub fn delete_category(&mut self, id: &str) -> StoreResult<usize> {
        let before = self.categories.len();
        self.categories.retain(|category| category.id != id);
        if self.categories.len() == before {
            return Err(StoreError::CategoryNotFound(id.to_string()));
        }
        let fields_before = self.fields.len();
        self.fields.retain(|field| field.category_id != id);
        Ok(fields_before - self.fields.len())
    }

    pub fn list(&self, category_id: &str) -> StoreResult<Vec<FieldDefinition>> {
        if !self.has_category(category_id) {
            return Err(StoreError::CategoryNotFound(category_id.to_string()));
        }
        let mut fields = self
            .fields
            .iter()
            .filter(|field| field.category_id == category_id)
            .cloned()
            .collect::<Vec<_>>();
        sort_by_order(&mut fields);
        Ok(fields)
    }

    pub fn get(&self, id: &str) -> StoreResult<FieldDefinition> {
        Ok(self.fields[self.position(id)?].clone())
    }

    pub fn create(&mut self, field: FieldDefinition) -> StoreResult<FieldDefinition> {
        if !self.has_category(&field.category_id) {
            return Err(StoreError::CategoryNotFound(field.category_id.clone()));
        }
        let field = field
            .normalized()
            .with_id(Uuid::new_v4().to_string());
        self.ensure_unique_name(&field)?;
        self.fields.push(field.clone());
        Ok(field)
    }

    pub fn update(&mut self, id: &str, patch: &FieldPatch) -> StoreResult<FieldDefinition> {
        let index = self.position(id)?;
        let mut updated = self.fields[index].clone();
        patch.apply(&mut updated);
        let updated = updated.normalized();
        self.ensure_unique_name(&updated)?;
        self.fields[index] = updated.clone();
        Ok(updated)
    }

    pub fn delete(&mut self, id: &str) -> StoreResult<()> {
        let index = self.position(id)?;
        self.fields.remove(index);
        Ok(())
    }

    /// Applies every update or none of them.
    pub fn reorder(&mut self, updates: &[OrderUpdate]) -> StoreResult<()> {
        let known = self
            .fields
            .iter()
            .map(|field| field.id.as_str())
            .collect::<HashSet<_>>();
        if let Some(missing) = updates.iter().find(|update| !known.contains(update.id.as_str())) {
            return Err(StoreError::FieldNotFound(missing.id.clone()));
        }
        for update in updates {
            if let Some(field) = self.fields.iter_mut().find(|field| field.id == update.id) {
                field.order = update.order;
            }
        }
        Ok(())
    }

    fn has_category(&self, id: &str) -> bool {
        self.categories.iter().any(|category| category.id == id)
    }

    fn position(&self, id: &str) -> StoreResult<usize> {
        self.fields
            .iter()
            .position(|field| field.id == id)
            .ok_or_else(|| StoreError::FieldNotFound(id.to_string()))
    }

    fn ensure_unique_name(&self, candidate: &FieldDefinition) -> StoreResult<()> {
        let clash = self.fields.iter().any(|field| {
            field.category_id == candidate.category_id
                && field.id != candidate.id
                && field.name == candidate.name
        });
        if clash {
            return Err(StoreError::DuplicateName {
                category_id: candidate.category_id.clone(),
                name: candidate.name.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use form_spec::FieldType;

    fn catalog() -> Catalog {
        let mut catalog = Catalog::default();
        catalog.create_category("jobs", "Jobs").expect("category");
        catalog.create_category("grants", "Grants").expect("category");
        catalog
    }

    fn draft(category: &str, label: &str, order: u32) -> FieldDefinition {
        FieldDefinition::new(label, FieldType::Text)
            .expect("field")
            .in_category(category)
            .with_order(order)
    }

    #[test]
    fn create_assigns_ids_and_rejects_duplicate_names() {
        let mut catalog = catalog();
        let first = catalog.create(draft("jobs", "Full Name", 0)).expect("create");
        assert!(!first.id.is_empty());
        assert_eq!(first.name, "full_name");

        let err = catalog.create(draft("jobs", "full  name", 1)).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateName { .. }));

        // Same name in a different category is fine.
        catalog.create(draft("grants", "Full Name", 0)).expect("create");
    }

    #[test]
    fn deleting_category_cascades_to_fields() {
        let mut catalog = catalog();
        catalog.create(draft("jobs", "A", 0)).expect("create");
        catalog.create(draft("jobs", "B", 1)).expect("create");
        catalog.create(draft("grants", "C", 0)).expect("create");
        assert_eq!(catalog.delete_category("jobs").expect("delete"), 2);
        assert_eq!(catalog.fields.len(), 1);
        assert!(matches!(
            catalog.list("jobs"),
            Err(StoreError::CategoryNotFound(_))
        ));
    }

    #[test]
    fn reorder_is_all_or_nothing() {
        let mut catalog = catalog();
        let a = catalog.create(draft("jobs", "A", 0)).expect("create");
        let err = catalog
            .reorder(&[
                OrderUpdate { id: a.id.clone(), order: 5 },
                OrderUpdate { id: "ghost".into(), order: 0 },
            ])
            .unwrap_err();
        assert!(matches!(err, StoreError::FieldNotFound(id) if id == "ghost"));
        assert_eq!(catalog.list("jobs").expect("list")[0].order, 0);
    }

    #[test]
    fn update_keeps_id_and_category() {
        let mut catalog = catalog();
        let field = catalog.create(draft("jobs", "Email", 0)).expect("create");
        let patch = FieldPatch {
            label: Some("Work Email".into()),
            name: Some(String::new()),
            kind: Some(FieldType::Email),
            ..FieldPatch::default()
        };
        let updated = catalog.update(&field.id, &patch).expect("update");
        assert_eq!(updated.id, field.id);
        assert_eq!(updated.category_id, "jobs");
        assert_eq!(updated.name, "work_email");
        assert_eq!(updated.kind, FieldType::Email);
        assert_eq!(updated.order, field.order);
    }
}
