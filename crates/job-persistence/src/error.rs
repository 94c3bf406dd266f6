use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Collection '{collection}' does not exist")]
    CollectionMissing { collection: String },

    #[error("Failed to encode or decode document: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Request rejected with status {status}: {reason}")]
    Rejected { status: u16, reason: String },
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::Backend(Box::new(err))
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Backend(Box::new(err))
    }
}

/// Failures of a single counts write. Never surfaced past
/// [`CountsPersister::persist`](crate::persister::CountsPersister::persist).
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("[{job_id}] Error serialising DataCounts stats: {source}")]
    Serialization {
        job_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("[{job_id}] Error writing status stats: collection '{collection}' is missing")]
    CollectionMissing { job_id: String, collection: String },

    #[error("[{job_id}] Error writing status stats: {source}")]
    Storage {
        job_id: String,
        #[source]
        source: StoreError,
    },
}

impl PersistError {
    pub fn job_id(&self) -> &str {
        match self {
            PersistError::Serialization { job_id, .. }
            | PersistError::CollectionMissing { job_id, .. }
            | PersistError::Storage { job_id, .. } => job_id,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown store backend '{0}' (expected sled, memory or http)")]
    UnknownBackend(String),

    #[error("Missing {0} environment variable")]
    MissingVar(&'static str),

    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },

    #[error("Could not determine home directory")]
    NoHomeDir,

    #[error("Failed to open store: {0}")]
    Store(#[from] StoreError),
}
