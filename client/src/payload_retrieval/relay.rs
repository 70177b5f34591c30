use std::sync::Arc;

use rust_eigenda_primitives::payload::Payload;
use rust_eigenda_prover::srs::SRS;
use tracing::warn;

use crate::{
    config::RelayPayloadRetrieverConfig,
    context::{call_with_timeout, Context},
    errors::{ConfigError, RetrievalError},
    payload_retrieval::{shuffled_indices, verify_cert, BlobChecker, PayloadRetriever},
    relay::RelayClient,
    types::EigenDACert,
    verification::CertVerifier,
};

/// Retrieves payloads from the relays listed in the certificate.
pub struct RelayPayloadRetriever {
    config: RelayPayloadRetrieverConfig,
    relay_client: Arc<RelayClient>,
    cert_verifier: Option<Arc<dyn CertVerifier>>,
    checker: BlobChecker,
}

impl RelayPayloadRetriever {
    pub fn new(
        mut config: RelayPayloadRetrieverConfig,
        relay_client: Arc<RelayClient>,
        srs: Arc<SRS>,
        cert_verifier: Option<Arc<dyn CertVerifier>>,
    ) -> Result<Self, ConfigError> {
        config.check_and_set_defaults()?;
        let checker = BlobChecker::new(srs, config.payload_client_config.payload_polynomial_form);
        Ok(Self {
            config,
            relay_client,
            cert_verifier,
            checker,
        })
    }
}

impl PayloadRetriever for RelayPayloadRetriever {
    fn get_payload(&self, ctx: &Context, cert: &EigenDACert) -> Result<Payload, RetrievalError> {
        verify_cert(
            ctx,
            self.cert_verifier.as_ref(),
            self.config.payload_client_config.contract_call_timeout,
            cert,
        )?;

        let relay_keys = cert.relay_keys();
        if relay_keys.is_empty() {
            return Err(RetrievalError::NoRelayKeys);
        }
        let blob_key = cert.blob_key();
        let commitments = cert.commitments();

        for index in shuffled_indices(relay_keys.len()) {
            let relay_key = relay_keys[index];
            let relay_client = self.relay_client.clone();
            let fetched = call_with_timeout(ctx, self.config.relay_timeout, move |call_ctx| {
                relay_client.get_blob(&call_ctx, relay_key, &blob_key)
            });
            let bytes = match fetched {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(
                        blob_key = %blob_key,
                        relay_key,
                        error = %err,
                        "blob couldn't be retrieved from relay"
                    );
                    continue;
                }
            };

            let source_id = format!("relay {}", relay_key);
            if let Err(err) = self.checker.verify(&blob_key, &source_id, &bytes, commitments) {
                warn!(blob_key = %blob_key, relay_key, error = %err, "verify blob from relay");
                continue;
            }
            return self.checker.decode(&blob_key, &source_id, &bytes, commitments);
        }

        Err(RetrievalError::Exhausted {
            blob_key: blob_key.hex(),
            kind: "relay",
            count: relay_keys.len(),
        })
    }

    fn close(&self) -> Result<(), RetrievalError> {
        self.relay_client.close()?;
        Ok(())
    }
}
