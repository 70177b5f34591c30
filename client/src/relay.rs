//! Client of the relays that serve whole blobs.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::{
    config::RelayClientConfig,
    context::{call_with_timeout, Context},
    errors::{ConfigError, TransportError},
    types::{BlobKey, RelayKey},
};

/// Wire transport to a relay.
pub trait RelayTransport: Send + Sync {
    fn get_blob(&self, ctx: &Context, url: &str, blob_key: &BlobKey)
        -> Result<Vec<u8>, TransportError>;

    fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Resolves a relay key to the url the relay listens on.
pub trait RelayUrlProvider: Send + Sync {
    fn get_relay_url(&self, ctx: &Context, relay_key: RelayKey) -> Result<String, TransportError>;
}

pub struct RelayClient {
    config: RelayClientConfig,
    transport: Arc<dyn RelayTransport>,
    url_provider: Arc<dyn RelayUrlProvider>,
    urls: RwLock<HashMap<RelayKey, String>>,
    closed: AtomicBool,
}

impl RelayClient {
    pub fn new(
        mut config: RelayClientConfig,
        transport: Arc<dyn RelayTransport>,
        url_provider: Arc<dyn RelayUrlProvider>,
    ) -> Result<Self, ConfigError> {
        config.check_and_set_defaults()?;
        info!(
            connection_pool_size = config.connection_pool_size,
            "creating relay client"
        );
        Ok(Self {
            config,
            transport,
            url_provider,
            urls: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
        })
    }

    /// Fetches a blob from the relay identified by `relay_key`. The call is
    /// bounded by the configured relay timeout.
    pub fn get_blob(
        &self,
        ctx: &Context,
        relay_key: RelayKey,
        blob_key: &BlobKey,
    ) -> Result<Vec<u8>, TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        let url = self.relay_url(ctx, relay_key)?;
        let transport = self.transport.clone();
        let blob_key = *blob_key;
        let blob = call_with_timeout(ctx, self.config.relay_timeout, move |call_ctx| {
            transport.get_blob(&call_ctx, &url, &blob_key)
        })?;
        if blob.len() > self.config.max_grpc_message_size {
            return Err(TransportError::Rpc(format!(
                "blob of {} bytes from relay {} exceeds the maximum message size of {} bytes",
                blob.len(),
                relay_key,
                self.config.max_grpc_message_size
            )));
        }
        Ok(blob)
    }

    fn relay_url(&self, ctx: &Context, relay_key: RelayKey) -> Result<String, TransportError> {
        if let Some(url) = self.urls.read().get(&relay_key) {
            return Ok(url.clone());
        }
        let url = self
            .url_provider
            .get_relay_url(ctx, relay_key)
            .map_err(|err| TransportError::Rpc(format!("get url for relay {}: {}", relay_key, err)))?;
        debug!(relay_key, url = %url, "resolved relay url");
        self.urls.write().insert(relay_key, url.clone());
        Ok(url)
    }

    pub fn close(&self) -> Result<(), TransportError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.urls.write().clear();
        self.transport.close()
    }
}
