use crate::{
    error::StoreError,
    naming::{IndexResolver, counts_address},
    store::DocumentStore,
};
use model::counts::DataCounts;
use std::sync::Arc;
use tracing::debug;

/// Reads counts documents written by
/// [`CountsPersister`](crate::persister::CountsPersister). Errors are returned
/// to the caller.
#[derive(Clone)]
pub struct DataCountsReader {
    store: Arc<dyn DocumentStore>,
    resolver: Arc<dyn IndexResolver>,
}

impl DataCountsReader {
    pub fn new(store: Arc<dyn DocumentStore>, resolver: Arc<dyn IndexResolver>) -> Self {
        Self { store, resolver }
    }

    pub async fn data_counts(&self, job_id: &str) -> Result<Option<DataCounts>, StoreError> {
        let address = counts_address(self.resolver.as_ref(), job_id);
        debug!(%job_id, %address, "Loading data counts");

        match self
            .store
            .get(&address.collection, &address.document_id)
            .await?
        {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }
}
