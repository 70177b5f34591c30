//! Retrieval that asks every assigned operator of a quorum for its chunks
//! and waits for all of them before decoding.

use std::sync::Arc;

use crossbeam_channel::{bounded, RecvTimeoutError};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, warn};

use crate::{
    context::{Context, ContextError},
    encoding::{Frame, Verifier},
    errors::{ConfigError, RetrievalError, TransportError},
    types::{BlobHeader, EncodingParams, OperatorId, QuorumId},
    validator::{get_assignments, ChainState, ValidatorBackends},
};

struct ChunksReply {
    operator: OperatorId,
    result: Result<Vec<Vec<u8>>, TransportError>,
}

pub struct RetrievalClient {
    chain_state: Arc<dyn ChainState>,
    verifier: Arc<dyn Verifier>,
    backends: ValidatorBackends,
    pool: ThreadPool,
}

impl RetrievalClient {
    /// `connection_count` bounds the number of concurrent requests to
    /// operators.
    pub fn new(
        chain_state: Arc<dyn ChainState>,
        verifier: Arc<dyn Verifier>,
        backends: ValidatorBackends,
        connection_count: usize,
    ) -> Result<Self, ConfigError> {
        if connection_count == 0 {
            return Err(ConfigError::Invalid(
                "connection count must be greater than zero".to_string(),
            ));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(connection_count)
            .thread_name(|i| format!("retrieval-client-{}", i))
            .build()
            .map_err(|err| ConfigError::Invalid(format!("connection pool: {}", err)))?;
        Ok(Self {
            chain_state,
            verifier,
            backends,
            pool,
        })
    }

    /// Gathers the chunks of `blob_header` held by the operators of
    /// `quorum` and decodes them.
    ///
    /// Operators that fail to answer or return chunks that do not verify
    /// are skipped. Decoding fails if the remaining chunks are not enough.
    pub fn get_blob(
        &self,
        ctx: &Context,
        blob_header: &BlobHeader,
        reference_block_number: u64,
        quorum: QuorumId,
    ) -> Result<Vec<u8>, RetrievalError> {
        let blob_key = blob_header.blob_key();
        let commitments = blob_header.blob_commitments;
        self.verifier
            .verify_commit_equivalence_batch(&[commitments])
            .map_err(RetrievalError::CommitmentEquivalence)?;

        let operator_state =
            self.chain_state
                .get_operator_state_with_socket(ctx, reference_block_number, &[quorum])?;
        if !operator_state.operators.contains_key(&quorum) {
            return Err(RetrievalError::UnknownQuorum(quorum));
        }
        let blob_versions = self.chain_state.get_all_versioned_blob_params(ctx)?;
        let blob_params = blob_versions
            .get(&blob_header.blob_version)
            .copied()
            .ok_or(RetrievalError::InvalidBlobVersion(blob_header.blob_version))?;
        let encoding_params = EncodingParams::for_blob(commitments.length, &blob_params)
            .map_err(RetrievalError::EncodingParams)?;
        let assignments = get_assignments(&operator_state, &blob_params, quorum)
            .map_err(RetrievalError::Assignment)?;

        let (sender, receiver) = bounded(assignments.len().max(1));
        for operator in assignments.keys().copied() {
            let sender = sender.clone();
            let grpc_manager = self.backends.grpc_manager.clone();
            let ctx = ctx.clone();
            self.pool.spawn(move || {
                let result = grpc_manager.download_chunks(&ctx, &blob_key, &operator, quorum);
                let _ = sender.send(ChunksReply { operator, result });
            });
        }
        drop(sender);

        let mut frames: Vec<Frame> = Vec::new();
        let mut indices: Vec<u32> = Vec::new();
        for _ in 0..assignments.len() {
            let received = match ctx.deadline() {
                Some(deadline) => receiver.recv_deadline(deadline),
                None => receiver.recv().map_err(RecvTimeoutError::from),
            };
            let reply = match received {
                Ok(reply) => reply,
                Err(RecvTimeoutError::Timeout) => {
                    return Err(ctx.err().unwrap_or(ContextError::DeadlineExceeded).into())
                }
                Err(RecvTimeoutError::Disconnected) => break,
            };
            let chunks = match reply.result {
                Ok(chunks) => chunks,
                Err(err) => {
                    warn!(
                        operator = %reply.operator,
                        blob_key = %blob_key,
                        error = %err,
                        "failed to get chunks from operator"
                    );
                    continue;
                }
            };
            let Some(assignment) = assignments.get(&reply.operator) else {
                continue;
            };
            match self.backends.deserializer.deserialize_and_verify(
                &blob_key,
                &reply.operator,
                &chunks,
                assignment,
                &commitments,
                &encoding_params,
            ) {
                Ok(operator_frames) => {
                    debug!(
                        operator = %reply.operator,
                        blob_key = %blob_key,
                        chunks = operator_frames.len(),
                        "verified chunks from operator"
                    );
                    frames.extend(operator_frames);
                    indices.extend_from_slice(&assignment.indices);
                }
                Err(err) => {
                    warn!(
                        operator = %reply.operator,
                        blob_key = %blob_key,
                        error = %err,
                        "failed to verify chunks from operator"
                    );
                }
            }
        }

        if frames.is_empty() {
            return Err(RetrievalError::NotEnoughChunks {
                verified: 0,
                minimum: encoding_params.num_chunks / blob_params.coding_rate.max(1),
            });
        }
        self.backends
            .decoder
            .decode_blob(&blob_key, frames, indices, &encoding_params, &commitments)
            .map_err(RetrievalError::Decode)
    }
}
