//! Retrieval of payloads given an [EigenDACert].
//!
//! Every retriever visits its backends in a uniformly random order and
//! accepts the first blob that matches the certificate. A blob that matches
//! the certificate commitment but fails to decode can only come from a
//! misconfigured codec or a malicious certificate, so it ends the call
//! instead of moving on to the next backend.

pub mod distributed;
pub mod relay;
pub mod validator;

use std::{sync::Arc, time::Duration};

use rand::seq::SliceRandom;
use rust_eigenda_primitives::{blob::Blob, payload::Payload, PolynomialForm};
use rust_eigenda_prover::{kzg::KZG, srs::SRS};
use tracing::error;

use crate::{
    context::{call_with_timeout, Context},
    errors::RetrievalError,
    types::{BlobCommitments, BlobKey, EigenDACert},
    verification::CertVerifier,
};

pub use self::{
    distributed::DistributedPayloadRetriever, relay::RelayPayloadRetriever,
    validator::ValidatorPayloadRetriever,
};

pub trait PayloadRetriever: Send + Sync {
    /// Fetches the blob the certificate points at, checks it against the
    /// certificate and decodes it into the payload.
    fn get_payload(&self, ctx: &Context, cert: &EigenDACert) -> Result<Payload, RetrievalError>;

    fn close(&self) -> Result<(), RetrievalError> {
        Ok(())
    }
}

/// Indices `0..count` in uniformly random order.
pub(crate) fn shuffled_indices(count: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..count).collect();
    indices.shuffle(&mut rand::thread_rng());
    indices
}

/// Checks `cert` on chain, when a verifier is configured.
pub(crate) fn verify_cert(
    ctx: &Context,
    cert_verifier: Option<&Arc<dyn CertVerifier>>,
    timeout: Duration,
    cert: &EigenDACert,
) -> Result<(), RetrievalError> {
    let Some(cert_verifier) = cert_verifier else {
        return Ok(());
    };
    let cert_verifier = cert_verifier.clone();
    let owned = cert.clone();
    call_with_timeout(ctx, timeout, move |call_ctx| {
        cert_verifier.check_da_cert(&call_ctx, &owned)
    })
    .map_err(|err| {
        RetrievalError::CertVerification(format!(
            "verify cert for blobKey {}: {}",
            cert.blob_key(),
            err
        ))
    })
}

/// Checks fetched blobs against certificates and decodes them.
pub(crate) struct BlobChecker {
    kzg: KZG,
    srs: Arc<SRS>,
    form: PolynomialForm,
}

impl BlobChecker {
    pub(crate) fn new(srs: Arc<SRS>, form: PolynomialForm) -> Self {
        Self {
            kzg: KZG::new(),
            srs,
            form,
        }
    }

    /// Checks that `bytes` is non-empty, commits to the certificate's
    /// commitment and fits within its length.
    pub(crate) fn verify(
        &self,
        blob_key: &BlobKey,
        source_id: &str,
        bytes: &[u8],
        commitments: &BlobCommitments,
    ) -> Result<(), RetrievalError> {
        let violation = |reason: String| RetrievalError::IntegrityViolation {
            blob_key: blob_key.hex(),
            source_id: source_id.to_string(),
            reason,
        };
        if bytes.is_empty() {
            return Err(violation("blob had length 0".to_string()));
        }
        if bytes.len() > commitments.max_blob_bytes() {
            return Err(violation(format!(
                "blob length ({} bytes) is greater than claimed blob length ({} bytes)",
                bytes.len(),
                commitments.max_blob_bytes()
            )));
        }
        let commitment = self
            .kzg
            .commit_blob_bytes(bytes, &self.srs)
            .map_err(|err| violation(format!("generate commitment: {}", err)))?;
        if commitment != commitments.commitment {
            return Err(violation("commitment is invalid for the bytes received".to_string()));
        }
        Ok(())
    }

    /// Decodes a blob that already passed [BlobChecker::verify].
    pub(crate) fn decode(
        &self,
        blob_key: &BlobKey,
        source_id: &str,
        bytes: &[u8],
        commitments: &BlobCommitments,
    ) -> Result<Payload, RetrievalError> {
        let decoded = Blob::with_length(bytes, commitments.length as usize, self.form)
            .and_then(|blob| blob.to_payload());
        decoded.map_err(|reason| {
            error!(
                blob_key = %blob_key,
                source = source_id,
                error = %reason,
                "blob verification was successful, but decode blob failed; this is likely a \
                 problem with the local blob codec configuration, but could indicate a \
                 maliciously generated certificate"
            );
            RetrievalError::DecodeAfterCommitmentMatch {
                blob_key: blob_key.hex(),
                source_id: source_id.to_string(),
                reason,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_shuffled_indices_is_a_permutation() {
        for count in [0usize, 1, 2, 17] {
            let indices = shuffled_indices(count);
            assert_eq!(indices.len(), count);
            let unique: HashSet<usize> = indices.into_iter().collect();
            assert_eq!(unique, (0..count).collect());
        }
    }

    #[test]
    fn test_shuffled_indices_reaches_every_first_position() {
        let mut firsts = HashSet::new();
        for _ in 0..500 {
            firsts.insert(shuffled_indices(4)[0]);
        }
        assert_eq!(firsts.len(), 4);
    }
}
