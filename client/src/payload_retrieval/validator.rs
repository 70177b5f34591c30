use std::sync::Arc;

use rust_eigenda_primitives::payload::Payload;
use rust_eigenda_prover::srs::SRS;
use tracing::warn;

use crate::{
    config::ValidatorPayloadRetrieverConfig,
    context::{call_with_timeout, Context},
    errors::{ConfigError, RetrievalError},
    payload_retrieval::{shuffled_indices, verify_cert, BlobChecker, PayloadRetriever},
    retrieval_client::RetrievalClient,
    types::EigenDACert,
    verification::CertVerifier,
};

/// Retrieves payloads by collecting chunks from the validators of each
/// quorum through a [RetrievalClient].
pub struct ValidatorPayloadRetriever {
    config: ValidatorPayloadRetrieverConfig,
    retrieval_client: Arc<RetrievalClient>,
    cert_verifier: Option<Arc<dyn CertVerifier>>,
    checker: BlobChecker,
}

impl ValidatorPayloadRetriever {
    pub fn new(
        mut config: ValidatorPayloadRetrieverConfig,
        retrieval_client: Arc<RetrievalClient>,
        srs: Arc<SRS>,
        cert_verifier: Option<Arc<dyn CertVerifier>>,
    ) -> Result<Self, ConfigError> {
        config.check_and_set_defaults()?;
        let checker = BlobChecker::new(srs, config.payload_client_config.payload_polynomial_form);
        Ok(Self {
            config,
            retrieval_client,
            cert_verifier,
            checker,
        })
    }
}

impl PayloadRetriever for ValidatorPayloadRetriever {
    fn get_payload(&self, ctx: &Context, cert: &EigenDACert) -> Result<Payload, RetrievalError> {
        verify_cert(
            ctx,
            self.cert_verifier.as_ref(),
            self.config.payload_client_config.contract_call_timeout,
            cert,
        )?;

        let quorums = cert.quorum_numbers();
        if quorums.is_empty() {
            return Err(RetrievalError::NoQuorums);
        }
        let blob_key = cert.blob_key();
        let commitments = cert.commitments();
        let reference_block_number = cert.reference_block_number();

        for index in shuffled_indices(quorums.len()) {
            let quorum = quorums[index];
            let retrieval_client = self.retrieval_client.clone();
            let blob_header = cert.blob_header().clone();
            let fetched = call_with_timeout(ctx, self.config.retrieval_timeout, move |call_ctx| {
                retrieval_client.get_blob(&call_ctx, &blob_header, reference_block_number, quorum)
            });
            let bytes = match fetched {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(
                        blob_key = %blob_key,
                        quorum,
                        error = %err,
                        "blob couldn't be retrieved from quorum"
                    );
                    continue;
                }
            };

            let source_id = format!("quorum {}", quorum);
            if let Err(err) = self.checker.verify(&blob_key, &source_id, &bytes, commitments) {
                warn!(blob_key = %blob_key, quorum, error = %err, "verify blob from quorum");
                continue;
            }
            return self.checker.decode(&blob_key, &source_id, &bytes, commitments);
        }

        Err(RetrievalError::Exhausted {
            blob_key: blob_key.hex(),
            kind: "quorum",
            count: quorums.len(),
        })
    }
}
