use std::sync::Arc;

use crossbeam_channel::{select, tick};
use parking_lot::Mutex;
use rust_eigenda_primitives::{blob::Blob, payload::Payload};
use tracing::{debug, warn};

use crate::{
    config::PayloadDisperserConfig,
    context::{call_with_timeout, Context, ContextError},
    dispersal::{DisperserClient, RequiredQuorumsStore},
    errors::{DispersalError, TransportError},
    types::{BlobKey, BlobStatus, BlobStatusReply, EigenDACert, QuorumId},
    verification::CertVerifier,
};

/// Sends payloads to the disperser and waits for them to be certified.
pub struct PayloadDisperser {
    config: PayloadDisperserConfig,
    disperser_client: Arc<DisperserClient>,
    cert_verifier: Arc<dyn CertVerifier>,
    required_quorums: Arc<RequiredQuorumsStore>,
    confirmation_threshold: Mutex<Option<u8>>,
}

impl PayloadDisperser {
    pub fn new(
        mut config: PayloadDisperserConfig,
        disperser_client: Arc<DisperserClient>,
        cert_verifier: Arc<dyn CertVerifier>,
    ) -> Result<Self, DispersalError> {
        config.check_and_set_defaults()?;
        let required_quorums = Arc::new(RequiredQuorumsStore::new(cert_verifier.clone()));
        Ok(Self {
            config,
            disperser_client,
            cert_verifier,
            required_quorums,
            confirmation_threshold: Mutex::new(None),
        })
    }

    /// Disperses `payload` and returns a certificate the cert verifier
    /// accepts.
    ///
    /// The blob is dispersed to the configured quorums and to every quorum
    /// the cert verifier requires.
    pub fn send_payload(
        &self,
        ctx: &Context,
        payload: &Payload,
    ) -> Result<EigenDACert, DispersalError> {
        let client_config = &self.config.payload_client_config;
        let blob = Blob::from_payload(payload, client_config.payload_polynomial_form)?;
        debug!(
            payload_size = payload.len(),
            blob_symbols = blob.len_symbols(),
            "payload encoded to blob"
        );

        let store = self.required_quorums.clone();
        let required = call_with_timeout(ctx, client_config.contract_call_timeout, move |call_ctx| {
            store.get_required_quorums(&call_ctx)
        })
        .map_err(DispersalError::RequiredQuorums)?;
        let quorums = union_quorums(&self.config.quorums, &required);

        let disperser_client = self.disperser_client.clone();
        let blob_bytes = blob.get_bytes();
        let blob_version = client_config.blob_version;
        let dispersal_quorums = quorums.clone();
        let (blob_header, reply) =
            call_with_timeout(ctx, self.config.disperse_blob_timeout, move |call_ctx| {
                disperser_client.disperse_blob(
                    &call_ctx,
                    &blob_bytes,
                    blob_version,
                    &dispersal_quorums,
                )
            })?;

        let blob_key = blob_header.blob_key();
        if reply.blob_key != blob_key {
            return Err(DispersalError::BlobKeyMismatch {
                received: reply.blob_key.hex(),
                expected: blob_key.hex(),
            });
        }
        debug!(blob_key = %blob_key, status = %reply.result, "successful DisperseBlob");

        let poll_ctx = ctx.with_timeout(self.config.blob_certified_timeout);
        let status_reply =
            self.poll_until_certified(&poll_ctx, &blob_key, &quorums, &required, reply.result);
        poll_ctx.cancel();
        let status_reply = status_reply?;
        debug!(blob_key = %blob_key, "blob certified");

        let cert = build_cert(status_reply)?;

        let verifier = self.cert_verifier.clone();
        let checked_cert = cert.clone();
        call_with_timeout(ctx, client_config.contract_call_timeout, move |call_ctx| {
            verifier.check_da_cert(&call_ctx, &checked_cert)
        })
        .map_err(|err| match err {
            TransportError::Context(err) => DispersalError::Context(err),
            err => DispersalError::InvalidCert {
                blob_key: blob_key.hex(),
                reason: err.to_string(),
            },
        })?;
        debug!(blob_key = %blob_key, "EigenDACert verified");

        Ok(cert)
    }

    pub fn close(&self) -> Result<(), DispersalError> {
        self.disperser_client.close()
    }

    fn poll_until_certified(
        &self,
        ctx: &Context,
        blob_key: &BlobKey,
        quorums: &[QuorumId],
        required: &[QuorumId],
        initial_status: BlobStatus,
    ) -> Result<BlobStatusReply, DispersalError> {
        let mut previous_status = initial_status;
        let ticker = tick(self.config.blob_status_poll_interval);
        let deadline = ctx.deadline_channel();

        loop {
            let ticked = select! {
                recv(deadline) -> _ => false,
                recv(ticker) -> _ => true,
            };
            if !ticked || ctx.is_done() {
                return Err(DispersalError::StatusTimeout {
                    status: previous_status.to_string(),
                    source: ctx.err().unwrap_or(ContextError::DeadlineExceeded),
                });
            }

            let reply = match self.disperser_client.get_blob_status(ctx, blob_key) {
                Ok(reply) => reply,
                Err(err) => {
                    debug!(blob_key = %blob_key, error = %err, "get blob status");
                    continue;
                }
            };

            if reply.status != previous_status {
                debug!(
                    blob_key = %blob_key,
                    previous_status = %previous_status,
                    new_status = %reply.status,
                    "blob status changed"
                );
                previous_status = reply.status;
            }

            match reply.status {
                BlobStatus::Complete => {
                    self.check_thresholds(ctx, quorums, required, &reply)?;
                    return Ok(reply);
                }
                BlobStatus::Queued | BlobStatus::Encoded => {}
                BlobStatus::GatheringSignatures => {
                    match self.check_thresholds(ctx, quorums, required, &reply) {
                        Ok(()) => return Ok(reply),
                        Err(DispersalError::ThresholdNotMet(_)) => {}
                        Err(err) => {
                            warn!(blob_key = %blob_key, error = %err, "check thresholds")
                        }
                    }
                }
                status => {
                    return Err(DispersalError::TerminalStatus {
                        blob_key: blob_key.hex(),
                        status: status.to_string(),
                    })
                }
            }
        }
    }

    /// Every quorum of the blob must have signed at least the confirmation
    /// threshold, and every required quorum must be among them.
    fn check_thresholds(
        &self,
        ctx: &Context,
        quorums: &[QuorumId],
        required: &[QuorumId],
        reply: &BlobStatusReply,
    ) -> Result<(), DispersalError> {
        if quorums.is_empty() {
            return Err(DispersalError::ThresholdCheck(
                "blob has no quorums".to_string(),
            ));
        }
        let signed_batch = reply.signed_batch.as_ref().ok_or_else(|| {
            DispersalError::ThresholdCheck("reply has no signed batch".to_string())
        })?;
        let threshold = self.confirmation_threshold(ctx)?;

        let signed = signed_batch.attestation.signed_percentages();
        for quorum in quorums {
            let percentage = signed.get(quorum).copied().unwrap_or(0);
            if percentage < threshold {
                return Err(DispersalError::ThresholdNotMet(format!(
                    "quorum {} signed {}%, below threshold {}%",
                    quorum, percentage, threshold
                )));
            }
        }
        if let Some(missing) = required.iter().find(|quorum| !quorums.contains(quorum)) {
            return Err(DispersalError::ThresholdNotMet(format!(
                "required quorum {} is not among the blob quorums",
                missing
            )));
        }
        Ok(())
    }

    fn confirmation_threshold(&self, ctx: &Context) -> Result<u8, DispersalError> {
        let mut cached = self.confirmation_threshold.lock();
        if let Some(threshold) = *cached {
            return Ok(threshold);
        }
        let verifier = self.cert_verifier.clone();
        let threshold = call_with_timeout(
            ctx,
            self.config.payload_client_config.contract_call_timeout,
            move |call_ctx| verifier.confirmation_threshold(&call_ctx),
        )
        .map_err(|err| {
            DispersalError::ThresholdCheck(format!("get confirmation threshold: {}", err))
        })?;
        *cached = Some(threshold);
        Ok(threshold)
    }
}

fn union_quorums(configured: &[QuorumId], required: &[QuorumId]) -> Vec<QuorumId> {
    let mut quorums = configured.to_vec();
    for quorum in required {
        if !quorums.contains(quorum) {
            quorums.push(*quorum);
        }
    }
    quorums
}

fn build_cert(reply: BlobStatusReply) -> Result<EigenDACert, DispersalError> {
    let blob_inclusion_info = reply
        .blob_inclusion_info
        .ok_or_else(|| DispersalError::BuildCert("missing blob inclusion info".to_string()))?;
    let signed_batch = reply
        .signed_batch
        .ok_or_else(|| DispersalError::BuildCert("missing signed batch".to_string()))?;
    Ok(EigenDACert {
        blob_inclusion_info,
        batch_header: signed_batch.batch_header,
        signed_quorum_numbers: signed_batch.attestation.quorum_numbers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_quorums_keeps_configured_order() {
        assert_eq!(union_quorums(&[0, 1], &[1, 2]), vec![0, 1, 2]);
        assert_eq!(union_quorums(&[], &[0]), vec![0]);
    }

    #[test]
    fn test_build_cert_requires_inclusion_info() {
        let reply = BlobStatusReply {
            status: BlobStatus::Complete,
            blob_inclusion_info: None,
            signed_batch: None,
        };
        assert_eq!(
            build_cert(reply).unwrap_err().to_string(),
            "build cert: missing blob inclusion info"
        );
    }
}
