#![allow(dead_code)]

use job_persistence::{
    naming::JobIndexNamer,
    persister::CountsPersister,
    reader::DataCountsReader,
    store::{DocumentStore, sled_store::SledDocumentStore},
};
use std::sync::Arc;
use tempfile::TempDir;


/// A sled store in a scratch directory plus a persister and reader over it.
/// The directory lives as long as the harness.
pub struct Harness {
    pub dir: TempDir,
    pub store: Arc<SledDocumentStore>,
    pub persister: Arc<CountsPersister>,
    pub reader: DataCountsReader,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(SledDocumentStore::open(dir.path()).expect("open sled"));
        let resolver = Arc::new(JobIndexNamer::default());
        let persister = Arc::new(CountsPersister::new(store.clone(), resolver.clone()));
        let reader = DataCountsReader::new(store.clone(), resolver);
        Self {
            dir,
            store,
            persister,
            reader,
        }
    }

    /// Creates the job's collection, as the job lifecycle would.
    pub async fn open_job(&self, job_id: &str) {
        let address = self.persister.address(job_id);
        self.store
            .create_collection(&address.collection)
            .await
            .expect("create collection");
    }

    pub async fn stored(&self, job_id: &str) -> Option<serde_json::Value> {
        let address = self.persister.address(job_id);
        self.store
            .get(&address.collection, &address.document_id)
            .await
            .expect("read document")
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
