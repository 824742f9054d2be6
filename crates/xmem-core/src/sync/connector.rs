//! External source connector trait and its type-erased wrapper.

use std::future::Future;
use std::pin::Pin;

use xmem_types::error::SyncError;
use xmem_types::source::{SourceConfig, SyncedItem};

/// Pulls new items from one external source.
///
/// Implementations live in xmem-infra (e.g. `HttpSourceConnector`).
pub trait SourceConnector: Send + Sync {
    /// Fetch items published since `config.last_sync_at`.
    fn fetch(
        &self,
        config: &SourceConfig,
    ) -> impl Future<Output = Result<Vec<SyncedItem>, SyncError>> + Send;
}

/// Object-safe version of [`SourceConnector`] with boxed futures.
pub trait SourceConnectorDyn: Send + Sync {
    fn fetch_boxed<'a>(
        &'a self,
        config: &'a SourceConfig,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SyncedItem>, SyncError>> + Send + 'a>>;
}

impl<T: SourceConnector> SourceConnectorDyn for T {
    fn fetch_boxed<'a>(
        &'a self,
        config: &'a SourceConfig,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SyncedItem>, SyncError>> + Send + 'a>> {
        Box::pin(self.fetch(config))
    }
}

pub struct BoxSourceConnector {
    inner: Box<dyn SourceConnectorDyn + Send + Sync>,
}

impl BoxSourceConnector {
    pub fn new<T: SourceConnector + 'static>(connector: T) -> Self {
        Self {
            inner: Box::new(connector),
        }
    }

    pub async fn fetch(&self, config: &SourceConfig) -> Result<Vec<SyncedItem>, SyncError> {
        self.inner.fetch_boxed(config).await
    }
}
