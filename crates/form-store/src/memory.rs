use async_trait::async_trait;
use form_spec::{FieldDefinition, OrderUpdate};
use tokio::sync::RwLock;

use crate::catalog::Catalog;
use crate::port::{CategoryRow, FieldPatch, FieldStore, StoreResult};

/// In-memory field store (for tests and embedding).
#[derive(Debug, Default)]
pub struct InMemoryFieldStore {
    catalog: RwLock<Catalog>,
}

impl InMemoryFieldStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: Catalog) -> Self {
        Self {
            catalog: RwLock::new(catalog),
        }
    }

    /// Copy of the current contents.
    pub async fn snapshot(&self) -> Catalog {
        self.catalog.read().await.clone()
    }
}

#[async_trait]
impl FieldStore for InMemoryFieldStore {
    async fn categories(&self) -> StoreResult<Vec<CategoryRow>> {
        Ok(self.catalog.read().await.categories())
    }

    async fn create_category(&self, id: &str, name: &str) -> StoreResult<CategoryRow> {
        self.catalog.write().await.create_category(id, name)
    }

    async fn delete_category(&self, id: &str) -> StoreResult<usize> {
        self.catalog.write().await.delete_category(id)
    }

    async fn list(&self, category_id: &str) -> StoreResult<Vec<FieldDefinition>> {
        self.catalog.read().await.list(category_id)
    }

    async fn get(&self, id: &str) -> StoreResult<FieldDefinition> {
        self.catalog.read().await.get(id)
    }

    async fn create(&self, field: FieldDefinition) -> StoreResult<FieldDefinition> {
        self.catalog.write().await.create(field)
    }

    async fn update(&self, id: &str, patch: FieldPatch) -> StoreResult<FieldDefinition> {
        self.catalog.write().await.update(id, &patch)
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        self.catalog.write().await.delete(id)
    }

    async fn reorder(&self, updates: &[OrderUpdate]) -> StoreResult<()> {
        self.catalog.write().await.reorder(updates)
    }
}
