use crate::{document::Document, error::StoreError, store::DocumentStore};
use async_trait::async_trait;
use std::path::Path;

/// Embedded store: one sled tree per collection, documents kept as JSON bytes.
pub struct SledDocumentStore {
    db: sled::Db,
}

impl SledDocumentStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Store backed by a temporary directory that is removed on drop.
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    /// Number of documents in `collection`, zero when it does not exist.
    pub fn document_count(&self, collection: &str) -> Result<usize, StoreError> {
        match self.existing_tree(collection) {
            Ok(tree) => Ok(tree.len()),
            Err(StoreError::CollectionMissing { .. }) => Ok(0),
            Err(err) => Err(err),
        }
    }

    /// sled's own default tree is listed by `tree_names` but is never a
    /// collection.
    fn is_reserved(&self, collection: &str) -> bool {
        &self.db.name()[..] == collection.as_bytes()
    }

    fn has_tree(&self, collection: &str) -> bool {
        !self.is_reserved(collection)
            && self
                .db
                .tree_names()
                .iter()
                .any(|name| &name[..] == collection.as_bytes())
    }

    /// Opens an existing tree. `open_tree` would create it, so existence is
    /// checked first.
    fn existing_tree(&self, collection: &str) -> Result<sled::Tree, StoreError> {
        if !self.has_tree(collection) {
            return Err(StoreError::CollectionMissing {
                collection: collection.to_string(),
            });
        }
        Ok(self.db.open_tree(collection)?)
    }
}

#[async_trait]
impl DocumentStore for SledDocumentStore {
    async fn upsert(
        &self,
        collection: &str,
        document_id: &str,
        document: &Document,
    ) -> Result<(), StoreError> {
        let tree = self.existing_tree(collection)?;
        let bytes = serde_json::to_vec(document)?;

        tree.insert(document_id, bytes)?;

        // flush_async stalls the runtime when several flushes overlap.
        tokio::task::spawn_blocking(move || tree.flush())
            .await
            .map_err(|e| StoreError::Backend(Box::new(e)))??;
        Ok(())
    }

    async fn get(
        &self,
        collection: &str,
        document_id: &str,
    ) -> Result<Option<Document>, StoreError> {
        let tree = self.existing_tree(collection)?;
        match tree.get(document_id)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn create_collection(&self, collection: &str) -> Result<(), StoreError> {
        if self.is_reserved(collection) {
            return Err(StoreError::Backend(
                format!("'{collection}' is reserved by sled").into(),
            ));
        }
        self.db.open_tree(collection)?;
        Ok(())
    }

    async fn collection_exists(&self, collection: &str) -> Result<bool, StoreError> {
        Ok(self.has_tree(collection))
    }
}
