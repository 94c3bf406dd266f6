use crate::document::DocumentAddress;

/// Appended to the job id to form the counts document id.
pub const DOCUMENT_SUFFIX: &str = "_data_counts";

pub const DEFAULT_INDEX_PREFIX: &str = "prelert-";

/// Maps a job id to the collection backing that job. Implementations must be
/// pure: the same job id always yields the same name.
pub trait IndexResolver: Send + Sync {
    fn index_name(&self, job_id: &str) -> String;
}

impl<F> IndexResolver for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn index_name(&self, job_id: &str) -> String {
        self(job_id)
    }
}

#[derive(Debug, Clone)]
pub struct JobIndexNamer {
    prefix: String,
}

impl JobIndexNamer {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for JobIndexNamer {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_PREFIX)
    }
}

impl IndexResolver for JobIndexNamer {
    fn index_name(&self, job_id: &str) -> String {
        format!("{}{}", self.prefix, job_id)
    }
}

pub fn counts_document_id(job_id: &str) -> String {
    format!("{job_id}{DOCUMENT_SUFFIX}")
}

pub fn counts_address(resolver: &dyn IndexResolver, job_id: &str) -> DocumentAddress {
    DocumentAddress {
        collection: resolver.index_name(job_id),
        document_id: counts_document_id(job_id),
    }
}
