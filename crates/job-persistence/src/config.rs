use crate::{
    error::ConfigError,
    logging::{DEFAULT_LOG_FILTER, build_dispatch},
    naming::{DEFAULT_INDEX_PREFIX, JobIndexNamer},
    store::{
        DocumentStore, http_store::HttpDocumentStore, memory::MemoryDocumentStore,
        sled_store::SledDocumentStore,
    },
};
use std::{collections::HashMap, path::PathBuf, sync::Arc, time::Duration};
use tracing::{Dispatch, info};

pub const STORE_VAR: &str = "COUNTS_STORE";
pub const STORE_PATH_VAR: &str = "COUNTS_STORE_PATH";
pub const STORE_URL_VAR: &str = "COUNTS_STORE_URL";
pub const STORE_TIMEOUT_VAR: &str = "COUNTS_STORE_TIMEOUT_MS";
pub const INDEX_PREFIX_VAR: &str = "COUNTS_INDEX_PREFIX";
pub const LOG_VAR: &str = "COUNTS_LOG";

const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Sled { path: PathBuf },
    Memory,
    Http { url: String, timeout: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceConfig {
    pub backend: StoreBackend,
    pub index_prefix: String,
    pub log_filter: String,
}

impl PersistenceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&std::env::vars().collect())
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };

        let backend = match get(STORE_VAR).unwrap_or("sled") {
            "sled" => StoreBackend::Sled {
                path: match get(STORE_PATH_VAR) {
                    Some(path) => PathBuf::from(path),
                    None => default_store_path()?,
                },
            },
            "memory" => StoreBackend::Memory,
            "http" => {
                let url = get(STORE_URL_VAR)
                    .ok_or(ConfigError::MissingVar(STORE_URL_VAR))?
                    .to_string();
                let timeout_ms = match get(STORE_TIMEOUT_VAR) {
                    Some(raw) => raw.parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                        var: STORE_TIMEOUT_VAR,
                        reason: e.to_string(),
                    })?,
                    None => DEFAULT_TIMEOUT_MS,
                };
                StoreBackend::Http {
                    url,
                    timeout: Duration::from_millis(timeout_ms),
                }
            }
            other => return Err(ConfigError::UnknownBackend(other.to_string())),
        };

        Ok(Self {
            backend,
            index_prefix: get(INDEX_PREFIX_VAR)
                .unwrap_or(DEFAULT_INDEX_PREFIX)
                .to_string(),
            log_filter: get(LOG_VAR).unwrap_or(DEFAULT_LOG_FILTER).to_string(),
        })
    }

    pub fn open_store(&self) -> Result<Arc<dyn DocumentStore>, ConfigError> {
        let store: Arc<dyn DocumentStore> = match &self.backend {
            StoreBackend::Sled { path } => {
                info!(path = %path.display(), "Opening sled counts store");
                Arc::new(SledDocumentStore::open(path)?)
            }
            StoreBackend::Memory => Arc::new(MemoryDocumentStore::new()),
            StoreBackend::Http { url, timeout } => {
                info!(%url, ?timeout, "Using HTTP counts store");
                Arc::new(HttpDocumentStore::new(url, *timeout)?)
            }
        };
        Ok(store)
    }

    pub fn index_resolver(&self) -> JobIndexNamer {
        JobIndexNamer::new(self.index_prefix.clone())
    }

    pub fn dispatch(&self) -> Dispatch {
        build_dispatch(&self.log_filter)
    }
}

fn default_store_path() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(".jobstats/counts"))
}
