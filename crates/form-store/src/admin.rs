use std::collections::HashSet;
use std::sync::Arc;

use form_spec::{FieldDefinition, FieldId, SpecError, contiguous_orders, move_to};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::port::{CategoryRow, FieldPatch, FieldStore, StoreError};

#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid field definition: {0}")]
    Invalid(#[from] SpecError),
    #[error("cannot move field from position {from} to {to}: category has {len} fields")]
    MoveOutOfRange { from: usize, to: usize, len: usize },
    /// The submitted order does not match the fields the store holds.
    #[error("field order is out of date")]
    StaleOrder { authoritative: Vec<FieldDefinition> },
    /// The store rejected the new order. `authoritative` is the re-fetched list
    /// when the re-fetch itself succeeded.
    #[error("saving the new field order failed: {source}")]
    ReorderFailed {
        #[source]
        source: StoreError,
        authoritative: Option<Vec<FieldDefinition>>,
    },
}

impl AdminError {
    /// The list the caller should display instead of its local state, if any.
    pub fn authoritative(&self) -> Option<&[FieldDefinition]> {
        match self {
            AdminError::StaleOrder { authoritative } => Some(authoritative),
            AdminError::ReorderFailed { authoritative, .. } => authoritative.as_deref(),
            _ => None,
        }
    }

    pub fn notice(&self) -> Notice {
        match self {
            AdminError::Invalid(_) | AdminError::MoveOutOfRange { .. } => Notice {
                level: NoticeLevel::Warning,
                message: self.to_string(),
            },
            AdminError::StaleOrder { .. } => Notice {
                level: NoticeLevel::Warning,
                message: "The field list changed; showing the latest order.".to_string(),
            },
            AdminError::Store(_) | AdminError::ReorderFailed { .. } => Notice {
                level: NoticeLevel::Error,
                message: format!("Could not save changes: {}", self),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Warning,
    Error,
}

/// Transient, user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Admin-side category form builder over a [`FieldStore`].
///
/// Create and update failures are reported but nothing local is rolled back;
/// a failed reorder re-fetches the stored order.
pub struct FieldConfigService<S: ?Sized> {
    store: Arc<S>,
}

impl<S: FieldStore + ?Sized> FieldConfigService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub async fn categories(&self) -> Result<Vec<CategoryRow>, AdminError> {
        Ok(self.store.categories().await?)
    }

    pub async fn create_category(&self, id: &str, name: &str) -> Result<CategoryRow, AdminError> {
        let row = self
            .store
            .create_category(id, name)
            .await
            .inspect_err(|err| error!(category = id, error = %err, "failed to create category"))?;
        info!(category = id, "category created");
        Ok(row)
    }

    pub async fn delete_category(&self, id: &str) -> Result<usize, AdminError> {
        let removed = self
            .store
            .delete_category(id)
            .await
            .inspect_err(|err| error!(category = id, error = %err, "failed to delete category"))?;
        info!(category = id, fields = removed, "category deleted");
        Ok(removed)
    }

    pub async fn fields(&self, category_id: &str) -> Result<Vec<FieldDefinition>, AdminError> {
        Ok(self.store.list(category_id).await?)
    }

    /// Appends a field at the end of the category's form.
    pub async fn add_field(
        &self,
        category_id: &str,
        draft: FieldDefinition,
    ) -> Result<FieldDefinition, AdminError> {
        let existing = self.store.list(category_id).await?;
        let field = draft
            .normalized()
            .in_category(category_id)
            .with_order(existing.len() as u32);

        if let Some(problem) = field.check().into_iter().next() {
            return Err(problem.into());
        }
        if existing.iter().any(|other| other.name == field.name) {
            return Err(SpecError::DuplicateName(field.name).into());
        }
        if let Some(condition) = &field.conditional_field
            && !existing.iter().any(|other| other.id == condition.field_id)
        {
            warn!(
                category = category_id,
                source = %condition.field_id,
                "conditional field refers to a field outside this category"
            );
        }

        let created = self
            .store
            .create(field)
            .await
            .inspect_err(|err| error!(category = category_id, error = %err, "failed to create field"))?;
        info!(category = category_id, field = %created.id, order = created.order, "field created");
        Ok(created)
    }

    /// Applies `patch` to a field. The patched definition must pass
    /// [`FieldDefinition::check`] before anything is written.
    pub async fn update_field(
        &self,
        field_id: &str,
        patch: FieldPatch,
    ) -> Result<FieldDefinition, AdminError> {
        let mut candidate = self.store.get(field_id).await?;
        patch.apply(&mut candidate);
        if let Some(problem) = candidate.normalized().check().into_iter().next() {
            warn!(field = field_id, problem = %problem, "rejected field update");
            return Err(problem.into());
        }

        let updated = self
            .store
            .update(field_id, patch)
            .await
            .inspect_err(|err| error!(field = field_id, error = %err, "failed to update field"))?;
        info!(field = field_id, "field updated");
        Ok(updated)
    }

    /// Deletes a field and closes the gap it leaves in the category's order.
    pub async fn remove_field(
        &self,
        category_id: &str,
        field_id: &str,
    ) -> Result<Vec<FieldDefinition>, AdminError> {
        let current = self.store.list(category_id).await?;
        if !current.iter().any(|field| field.id == field_id) {
            return Err(StoreError::FieldNotFound(field_id.to_string()).into());
        }

        self.store
            .delete(field_id)
            .await
            .inspect_err(|err| error!(field = field_id, error = %err, "failed to delete field"))?;
        info!(category = category_id, field = field_id, "field deleted");

        let remaining = self.store.list(category_id).await?;
        let ids = remaining
            .iter()
            .map(|field| field.id.clone())
            .collect::<Vec<_>>();
        self.commit_order(category_id, &ids).await
    }

    /// Persists the order emitted after a drag-and-drop gesture.
    ///
    /// `ordered_ids` must name exactly the category's fields. On any failure the
    /// stored order is re-fetched and handed back through the error.
    pub async fn reorder(
        &self,
        category_id: &str,
        ordered_ids: &[FieldId],
    ) -> Result<Vec<FieldDefinition>, AdminError> {
        let current = self.store.list(category_id).await?;
        let stored = current
            .iter()
            .map(|field| field.id.as_str())
            .collect::<HashSet<_>>();
        let requested = ordered_ids
            .iter()
            .map(String::as_str)
            .collect::<HashSet<_>>();
        if requested.len() != ordered_ids.len() || stored != requested {
            warn!(category = category_id, "reorder request does not match stored fields");
            return Err(AdminError::StaleOrder {
                authoritative: current,
            });
        }
        self.commit_order(category_id, ordered_ids).await
    }

    /// Moves the field at position `from` to position `to`.
    pub async fn move_field(
        &self,
        category_id: &str,
        from: usize,
        to: usize,
    ) -> Result<Vec<FieldDefinition>, AdminError> {
        let current = self.store.list(category_id).await?;
        let ids = current
            .iter()
            .map(|field| field.id.clone())
            .collect::<Vec<_>>();
        let moved = move_to(&ids, from, to).ok_or(AdminError::MoveOutOfRange {
            from,
            to,
            len: ids.len(),
        })?;
        self.reorder(category_id, &moved).await
    }

    async fn commit_order(
        &self,
        category_id: &str,
        ordered_ids: &[FieldId],
    ) -> Result<Vec<FieldDefinition>, AdminError> {
        let updates = contiguous_orders(ordered_ids);
        if let Err(source) = self.store.reorder(&updates).await {
            error!(category = category_id, error = %source, "failed to save field order");
            let authoritative = match self.store.list(category_id).await {
                Ok(fields) => Some(fields),
                Err(err) => {
                    error!(category = category_id, error = %err, "failed to re-fetch field order");
                    None
                }
            };
            return Err(AdminError::ReorderFailed {
                source,
                authoritative,
            });
        }
        info!(category = category_id, fields = updates.len(), "field order saved");
        Ok(self.store.list(category_id).await?)
    }
}
