use crate::{
    document::{DocumentAddress, to_document},
    error::{PersistError, StoreError},
    naming::{IndexResolver, counts_address},
    store::DocumentStore,
};
use model::counts::DataCounts;
use serde::Serialize;
use std::{fmt::Debug, sync::Arc};
use tracing::{Dispatch, dispatcher, error, warn};

/// Writes a job's [`DataCounts`] to its counts document.
///
/// Writes are best effort: failures are logged through the dispatcher held by
/// the persister and never returned to the caller. There are no retries, and
/// concurrent writes for the same job are last-write-wins in the store.
pub struct CountsPersister {
    store: Arc<dyn DocumentStore>,
    resolver: Arc<dyn IndexResolver>,
    dispatch: Dispatch,
}

impl CountsPersister {
    /// Uses the dispatcher that is current when the persister is built.
    pub fn new(store: Arc<dyn DocumentStore>, resolver: Arc<dyn IndexResolver>) -> Self {
        Self {
            store,
            resolver,
            dispatch: dispatcher::get_default(Dispatch::clone),
        }
    }

    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn address(&self, job_id: &str) -> DocumentAddress {
        counts_address(self.resolver.as_ref(), job_id)
    }

    /// Writes `counts` to the job's counts document. Failures are logged.
    pub async fn persist(&self, job_id: &str, counts: &DataCounts) {
        self.persist_logged(job_id, counts).await
    }

    async fn persist_logged<C>(&self, job_id: &str, counts: &C)
    where
        C: Serialize + Debug + Sync + ?Sized,
    {
        if let Err(err) = self.try_persist(job_id, counts).await {
            self.report(counts, &err);
        }
    }

    pub(crate) async fn try_persist<C>(&self, job_id: &str, counts: &C) -> Result<(), PersistError>
    where
        C: Serialize + Sync + ?Sized,
    {
        let document = to_document(counts).map_err(|source| PersistError::Serialization {
            job_id: job_id.to_string(),
            source,
        })?;

        let DocumentAddress {
            collection,
            document_id,
        } = self.address(job_id);

        self.store
            .upsert(&collection, &document_id, &document)
            .await
            .map_err(|err| match err {
                StoreError::CollectionMissing { collection } => PersistError::CollectionMissing {
                    job_id: job_id.to_string(),
                    collection,
                },
                source => PersistError::Storage {
                    job_id: job_id.to_string(),
                    source,
                },
            })
    }

    fn report<C: Debug + ?Sized>(&self, counts: &C, err: &PersistError) {
        dispatcher::with_default(&self.dispatch, || match err {
            PersistError::Serialization { job_id, source } => {
                warn!(%job_id, counts = ?counts, error = %source, "[{job_id}] Error serialising DataCounts stats");
            }
            PersistError::CollectionMissing { job_id, collection } => {
                warn!(%job_id, %collection, "[{job_id}] Error writing status stats: collection is missing");
            }
            PersistError::Storage { job_id, source } => {
                error!(%job_id, error = %source, "[{job_id}] Error writing status stats");
            }
        });
    }
}
