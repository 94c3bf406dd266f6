use tracing::Dispatch;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_FILTER: &str = "info";

/// Builds the dispatcher handed to
/// [`CountsPersister::with_dispatch`](crate::persister::CountsPersister::with_dispatch).
/// Falls back to [`DEFAULT_LOG_FILTER`] when `filter` does not parse.
pub fn build_dispatch(filter: &str) -> Dispatch {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
    Dispatch::new(subscriber)
}
