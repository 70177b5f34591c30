use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;
use tracing::debug;

use crate::{
    context::Context, errors::TransportError, types::QuorumId, verification::CertVerifier,
};

/// Caches the quorums a cert verifier requires, keyed by the verifier's
/// address. The required quorums of a deployed verifier never change, so
/// entries are never evicted.
pub struct RequiredQuorumsStore {
    cert_verifier: Arc<dyn CertVerifier>,
    cache: RwLock<HashMap<String, Vec<QuorumId>>>,
}

impl RequiredQuorumsStore {
    pub fn new(cert_verifier: Arc<dyn CertVerifier>) -> Self {
        Self {
            cert_verifier,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn get_required_quorums(&self, ctx: &Context) -> Result<Vec<QuorumId>, TransportError> {
        let address = self.cert_verifier.address();
        if let Some(quorums) = self.cache.read().get(&address) {
            return Ok(quorums.clone());
        }

        let quorums = self.cert_verifier.quorum_numbers_required(ctx)?;
        debug!(address = %address, ?quorums, "fetched required quorums");
        self.cache.write().insert(address, quorums.clone());
        Ok(quorums)
    }
}
