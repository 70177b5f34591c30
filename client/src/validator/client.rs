use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    config::ValidatorClientConfig,
    context::Context,
    encoding::Verifier,
    errors::RetrievalError,
    types::{
        BlobCommitments, BlobHeader, BlobKey, BlobParams, EncodingParams, OperatorState,
        QuorumId,
    },
    validator::{
        get_assignments,
        retrieval_worker::{BlobRequest, RetrievalWorker},
        ChainState, RetrievalPools, ValidatorBackends, ValidatorGrpcManager,
    },
};

/// Fetches blobs straight from validator nodes.
pub struct ValidatorClient {
    config: ValidatorClientConfig,
    pools: RetrievalPools,
    backends: ValidatorBackends,
    chain_state: Arc<dyn ChainState>,
    verifier: Arc<dyn Verifier>,
}

impl ValidatorClient {
    pub fn new(
        config: ValidatorClientConfig,
        chain_state: Arc<dyn ChainState>,
        verifier: Arc<dyn Verifier>,
        grpc_manager: Arc<dyn ValidatorGrpcManager>,
    ) -> Result<Self, RetrievalError> {
        let backends = ValidatorBackends::with_verifier(grpc_manager, verifier.clone());
        Self::with_backends(config, chain_state, verifier, backends)
    }

    /// Like [ValidatorClient::new], with custom chunk verification and
    /// decoding.
    pub fn with_backends(
        config: ValidatorClientConfig,
        chain_state: Arc<dyn ChainState>,
        verifier: Arc<dyn Verifier>,
        backends: ValidatorBackends,
    ) -> Result<Self, RetrievalError> {
        config.validate()?;
        let pools = RetrievalPools::new(&config)?;
        Ok(Self {
            config,
            pools,
            backends,
            chain_state,
            verifier,
        })
    }

    /// Retrieves the blob described by `blob_header`, trying each of its
    /// quorums in order until one yields the blob.
    pub fn get_blob(
        &self,
        ctx: &Context,
        blob_header: &BlobHeader,
        reference_block_number: u64,
    ) -> Result<Vec<u8>, RetrievalError> {
        let prepared = self.prepare(ctx, blob_header, reference_block_number)?;
        let mut last_error = RetrievalError::NoQuorums;
        for &quorum in &blob_header.quorum_numbers {
            match self.retrieve_from_quorum(ctx, &prepared, quorum) {
                Ok(blob) => return Ok(blob),
                Err(err) => {
                    warn!(
                        quorum,
                        blob_key = %prepared.blob_key,
                        error = %err,
                        "failed to retrieve blob from quorum"
                    );
                    last_error = err;
                }
            }
            if ctx.is_done() {
                break;
            }
        }
        Err(last_error)
    }

    /// Retrieves the blob from the validators of a single quorum.
    pub fn get_blob_from_quorum(
        &self,
        ctx: &Context,
        blob_header: &BlobHeader,
        reference_block_number: u64,
        quorum: QuorumId,
    ) -> Result<Vec<u8>, RetrievalError> {
        let prepared = self.prepare(ctx, blob_header, reference_block_number)?;
        self.retrieve_from_quorum(ctx, &prepared, quorum)
    }

    fn prepare(
        &self,
        ctx: &Context,
        blob_header: &BlobHeader,
        reference_block_number: u64,
    ) -> Result<PreparedBlob, RetrievalError> {
        if blob_header.quorum_numbers.is_empty() {
            return Err(RetrievalError::NoQuorums);
        }
        let commitments = blob_header.blob_commitments;
        self.verifier
            .verify_commit_equivalence_batch(&[commitments])
            .map_err(RetrievalError::CommitmentEquivalence)?;

        let operator_state = self.chain_state.get_operator_state_with_socket(
            ctx,
            reference_block_number,
            &blob_header.quorum_numbers,
        )?;
        let blob_versions = self.chain_state.get_all_versioned_blob_params(ctx)?;
        let blob_params = blob_versions
            .get(&blob_header.blob_version)
            .copied()
            .ok_or(RetrievalError::InvalidBlobVersion(blob_header.blob_version))?;
        let encoding_params = EncodingParams::for_blob(commitments.length, &blob_params)
            .map_err(RetrievalError::EncodingParams)?;

        Ok(PreparedBlob {
            blob_key: blob_header.blob_key(),
            commitments,
            operator_state,
            blob_params,
            encoding_params,
        })
    }

    fn retrieve_from_quorum(
        &self,
        ctx: &Context,
        prepared: &PreparedBlob,
        quorum: QuorumId,
    ) -> Result<Vec<u8>, RetrievalError> {
        if !prepared.operator_state.operators.contains_key(&quorum) {
            return Err(RetrievalError::UnknownQuorum(quorum));
        }
        let assignments = get_assignments(&prepared.operator_state, &prepared.blob_params, quorum)
            .map_err(RetrievalError::Assignment)?;
        let minimum_chunk_count =
            prepared.encoding_params.num_chunks / prepared.blob_params.coding_rate.max(1);

        let request = BlobRequest {
            blob_key: prepared.blob_key,
            quorum,
            blob_commitments: prepared.commitments,
            encoding_params: prepared.encoding_params,
            assignments,
            minimum_chunk_count,
        };
        let worker = RetrievalWorker::new(
            ctx,
            &self.config,
            self.pools.clone(),
            self.backends.clone(),
            request,
        )?;
        let blob = worker.retrieve_blob_from_validators()?;
        info!(quorum, blob_key = %prepared.blob_key, "retrieved blob from validators");
        Ok(blob)
    }
}

/// Chain state resolved once per blob and shared by every quorum attempt.
struct PreparedBlob {
    blob_key: BlobKey,
    commitments: BlobCommitments,
    operator_state: OperatorState,
    blob_params: BlobParams,
    encoding_params: EncodingParams,
}
