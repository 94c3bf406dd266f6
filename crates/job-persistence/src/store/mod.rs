use crate::{document::Document, error::StoreError};
use async_trait::async_trait;

pub mod http_store;
pub mod memory;
pub mod sled_store;

/// Write/read client for a document-oriented datastore.
///
/// Collections are created only through [`DocumentStore::create_collection`];
/// writes into an absent collection fail with [`StoreError::CollectionMissing`].
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Creates or overwrites the document and returns once the store has
    /// acknowledged the write.
    async fn upsert(
        &self,
        collection: &str,
        document_id: &str,
        document: &Document,
    ) -> Result<(), StoreError>;

    async fn get(&self, collection: &str, document_id: &str)
    -> Result<Option<Document>, StoreError>;

    /// Idempotent.
    async fn create_collection(&self, collection: &str) -> Result<(), StoreError>;

    async fn collection_exists(&self, collection: &str) -> Result<bool, StoreError>;
}
