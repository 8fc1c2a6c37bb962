use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use form_spec::{FieldDefinition, OrderUpdate};
use tokio::sync::Mutex;
use tracing::debug;

use crate::catalog::Catalog;
use crate::port::{CategoryRow, FieldPatch, FieldStore, StoreError, StoreResult};

/// Field store persisted as one JSON document.
///
/// Every operation reads the file, applies the change and writes it back; a
/// missing file is an empty store. Operations through one instance are
/// serialized, other processes writing the same file are not coordinated.
#[derive(Debug)]
pub struct JsonFileFieldStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileFieldStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> StoreResult<Catalog> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Catalog::default()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        serde_json::from_slice(&raw).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })
    }

    async fn save(&self, catalog: &Catalog) -> StoreResult<()> {
        let raw = serde_json::to_vec_pretty(catalog).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(&self.path, raw)
            .await
            .map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })?;
        debug!(path = %self.path.display(), fields = catalog.fields.len(), "store file written");
        Ok(())
    }

    async fn read<T>(&self, op: impl FnOnce(&Catalog) -> StoreResult<T> + Send) -> StoreResult<T> {
        let _guard = self.lock.lock().await;
        let catalog = self.load().await?;
        op(&catalog)
    }

    async fn write<T: Send>(
        &self,
        op: impl FnOnce(&mut Catalog) -> StoreResult<T> + Send,
    ) -> StoreResult<T> {
        let _guard = self.lock.lock().await;
        let mut catalog = self.load().await?;
        let output = op(&mut catalog)?;
        self.save(&catalog).await?;
        Ok(output)
    }
}

#[async_trait]
impl FieldStore for JsonFileFieldStore {
    async fn categories(&self) -> StoreResult<Vec<CategoryRow>> {
        self.read(|catalog| Ok(catalog.categories())).await
    }

    async fn create_category(&self, id: &str, name: &str) -> StoreResult<CategoryRow> {
        self.write(|catalog| catalog.create_category(id, name)).await
    }

    async fn delete_category(&self, id: &str) -> StoreResult<usize> {
        self.write(|catalog| catalog.delete_category(id)).await
    }

    async fn list(&self, category_id: &str) -> StoreResult<Vec<FieldDefinition>> {
        self.read(|catalog| catalog.list(category_id)).await
    }

    async fn get(&self, id: &str) -> StoreResult<FieldDefinition> {
        self.read(|catalog| catalog.get(id)).await
    }

    async fn create(&self, field: FieldDefinition) -> StoreResult<FieldDefinition> {
        self.write(|catalog| catalog.create(field)).await
    }

    async fn update(&self, id: &str, patch: FieldPatch) -> StoreResult<FieldDefinition> {
        self.write(|catalog| catalog.update(id, &patch)).await
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        self.write(|catalog| catalog.delete(id)).await
    }

    async fn reorder(&self, updates: &[OrderUpdate]) -> StoreResult<()> {
        self.write(|catalog| catalog.reorder(updates)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use form_spec::FieldType;

    #[tokio::test]
    async fn changes_survive_a_new_instance() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("store.json");

        let store = JsonFileFieldStore::new(&path);
        store.create_category("jobs", "Jobs").await.expect("category");
        let field = FieldDefinition::new("Portfolio", FieldType::Url)
            .expect("field")
            .in_category("jobs");
        let created = store.create(field).await.expect("create");

        let reopened = JsonFileFieldStore::new(&path);
        let fields = reopened.list("jobs").await.expect("list");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].id, created.id);
        assert_eq!(fields[0].kind, FieldType::Url);
    }

    #[tokio::test]
    async fn missing_file_is_an_empty_store() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = JsonFileFieldStore::new(dir.path().join("absent.json"));
        assert!(store.categories().await.expect("categories").is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_reports_json_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{ not json").expect("write");
        let store = JsonFileFieldStore::new(&path);
        assert!(matches!(
            store.categories().await,
            Err(StoreError::Json { .. })
        ));
    }
}
