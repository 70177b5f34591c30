//! Retrieval of blobs directly from validator nodes.
//!
//! A [client::ValidatorClient] resolves which operators hold which chunks
//! of a blob and hands the work to a [retrieval_worker::RetrievalWorker],
//! which downloads, verifies and decodes the chunks.

pub mod client;
pub mod retrieval_worker;

use std::{collections::HashMap, sync::Arc};

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::{
    config::ValidatorClientConfig,
    context::Context,
    encoding::{Frame, Verifier},
    errors::{ConfigError, TransportError},
    types::{
        Assignment, BlobCommitments, BlobKey, BlobParams, BlobVersion, EncodingParams,
        OperatorId, OperatorInfo, OperatorState, QuorumId,
    },
};

/// Downloads the chunks a validator holds for a blob.
pub trait ValidatorGrpcManager: Send + Sync {
    fn download_chunks(
        &self,
        ctx: &Context,
        blob_key: &BlobKey,
        operator: &OperatorId,
        quorum: QuorumId,
    ) -> Result<Vec<Vec<u8>>, TransportError>;
}

/// Turns the raw chunks of one operator into verified frames.
pub trait ChunkDeserializer: Send + Sync {
    fn deserialize_and_verify(
        &self,
        blob_key: &BlobKey,
        operator: &OperatorId,
        chunks: &[Vec<u8>],
        assignment: &Assignment,
        commitments: &BlobCommitments,
        params: &EncodingParams,
    ) -> Result<Vec<Frame>, String>;
}

/// Rebuilds a blob from verified frames and their chunk indices.
pub trait BlobDecoder: Send + Sync {
    fn decode_blob(
        &self,
        blob_key: &BlobKey,
        frames: Vec<Frame>,
        indices: Vec<u32>,
        params: &EncodingParams,
        commitments: &BlobCommitments,
    ) -> Result<Vec<u8>, String>;
}

/// Chain reads needed to locate a blob's chunks.
pub trait ChainState: Send + Sync {
    fn get_operator_state_with_socket(
        &self,
        ctx: &Context,
        reference_block_number: u64,
        quorums: &[QuorumId],
    ) -> Result<OperatorState, TransportError>;

    fn get_all_versioned_blob_params(
        &self,
        ctx: &Context,
    ) -> Result<HashMap<BlobVersion, BlobParams>, TransportError>;
}

/// [ChunkDeserializer] backed by a [Verifier].
pub struct VerifyingChunkDeserializer {
    verifier: Arc<dyn Verifier>,
}

impl VerifyingChunkDeserializer {
    pub fn new(verifier: Arc<dyn Verifier>) -> Self {
        Self { verifier }
    }
}

impl ChunkDeserializer for VerifyingChunkDeserializer {
    fn deserialize_and_verify(
        &self,
        _blob_key: &BlobKey,
        operator: &OperatorId,
        chunks: &[Vec<u8>],
        assignment: &Assignment,
        commitments: &BlobCommitments,
        params: &EncodingParams,
    ) -> Result<Vec<Frame>, String> {
        if chunks.len() != assignment.indices.len() {
            return Err(format!(
                "operator {} returned {} chunks, expected {}",
                operator,
                chunks.len(),
                assignment.indices.len()
            ));
        }
        let frames = chunks
            .iter()
            .map(|chunk| Frame::deserialize(chunk))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| format!("failed to deserialize chunk from operator {}: {}", operator, err))?;
        self.verifier
            .verify_frames(&frames, &assignment.indices, commitments, params)
            .map_err(|err| format!("failed to verify chunks from operator {}: {}", operator, err))?;
        Ok(frames)
    }
}

/// [BlobDecoder] backed by a [Verifier].
pub struct VerifierBlobDecoder {
    verifier: Arc<dyn Verifier>,
}

impl VerifierBlobDecoder {
    pub fn new(verifier: Arc<dyn Verifier>) -> Self {
        Self { verifier }
    }
}

impl BlobDecoder for VerifierBlobDecoder {
    fn decode_blob(
        &self,
        _blob_key: &BlobKey,
        frames: Vec<Frame>,
        indices: Vec<u32>,
        params: &EncodingParams,
        commitments: &BlobCommitments,
    ) -> Result<Vec<u8>, String> {
        self.verifier
            .decode(&frames, &indices, params, commitments.max_blob_bytes())
    }
}

/// The pluggable pieces a retrieval worker calls out to.
#[derive(Clone)]
pub struct ValidatorBackends {
    pub grpc_manager: Arc<dyn ValidatorGrpcManager>,
    pub deserializer: Arc<dyn ChunkDeserializer>,
    pub decoder: Arc<dyn BlobDecoder>,
}

impl ValidatorBackends {
    /// Backends that verify and decode with `verifier`.
    pub fn with_verifier(
        grpc_manager: Arc<dyn ValidatorGrpcManager>,
        verifier: Arc<dyn Verifier>,
    ) -> Self {
        Self {
            grpc_manager,
            deserializer: Arc::new(VerifyingChunkDeserializer::new(verifier.clone())),
            decoder: Arc::new(VerifierBlobDecoder::new(verifier)),
        }
    }
}

/// Thread pools shared by every retrieval worker of a client: one for
/// network bound downloads, one for CPU bound verification and decoding.
/// Their size comes from configuration, never from the operator count.
#[derive(Clone)]
pub struct RetrievalPools {
    pub connection_pool: Arc<ThreadPool>,
    pub compute_pool: Arc<ThreadPool>,
}

impl RetrievalPools {
    pub fn new(config: &ValidatorClientConfig) -> Result<Self, ConfigError> {
        let connection_pool = ThreadPoolBuilder::new()
            .num_threads(config.connection_pool_size)
            .thread_name(|i| format!("validator-download-{}", i))
            .build()
            .map_err(|err| ConfigError::Invalid(format!("connection pool: {}", err)))?;
        let compute_pool = ThreadPoolBuilder::new()
            .num_threads(config.compute_pool_size)
            .thread_name(|i| format!("validator-compute-{}", i))
            .build()
            .map_err(|err| ConfigError::Invalid(format!("compute pool: {}", err)))?;
        Ok(Self {
            connection_pool: Arc::new(connection_pool),
            compute_pool: Arc::new(compute_pool),
        })
    }
}

/// Splits the chunks of a blob between the operators of `quorum` in
/// proportion to their stake.
///
/// Each operator gets `ceil(stake * (num_chunks - max_num_operators) /
/// total_stake)` chunks. Operators are ordered by descending stake, then
/// by operator index, and receive contiguous ranges of chunk indices.
pub fn get_assignments(
    state: &OperatorState,
    blob_params: &BlobParams,
    quorum: QuorumId,
) -> Result<HashMap<OperatorId, Assignment>, String> {
    let operators = state
        .operators
        .get(&quorum)
        .ok_or_else(|| format!("no operators for quorum {}", quorum))?;
    if operators.len() > blob_params.max_num_operators as usize {
        return Err(format!(
            "too many operators ({}) to assign chunks to, max is {}",
            operators.len(),
            blob_params.max_num_operators
        ));
    }
    if blob_params.num_chunks < blob_params.max_num_operators {
        return Err(format!(
            "number of chunks ({}) is smaller than the maximum number of operators ({})",
            blob_params.num_chunks, blob_params.max_num_operators
        ));
    }
    let total_stake = state.total_stake(quorum);
    if total_stake.is_zero() {
        return Err(format!("total stake of quorum {} is zero", quorum));
    }

    let effective_chunks = BigUint::from(blob_params.num_chunks - blob_params.max_num_operators);
    let mut entries = operators
        .iter()
        .map(|(id, info)| {
            let numerator = &info.stake * &effective_chunks + &total_stake - 1u32;
            let chunks = (numerator / &total_stake)
                .to_u32()
                .ok_or_else(|| format!("chunk count of operator {} overflows", id))?;
            Ok((*id, info, chunks))
        })
        .collect::<Result<Vec<(OperatorId, &OperatorInfo, u32)>, String>>()?;
    entries.sort_by(|a, b| b.1.stake.cmp(&a.1.stake).then(a.1.index.cmp(&b.1.index)));

    let mut next_index = 0u32;
    let mut assignments = HashMap::with_capacity(entries.len());
    for (id, _, chunks) in entries {
        assignments.insert(id, Assignment::contiguous(next_index, chunks));
        next_index += chunks;
    }
    Ok(assignments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(stakes: &[u64]) -> OperatorState {
        let operators = stakes
            .iter()
            .enumerate()
            .map(|(i, stake)| {
                let mut id = [0u8; 32];
                id[0] = i as u8;
                (
                    OperatorId(id),
                    OperatorInfo {
                        stake: BigUint::from(*stake),
                        index: i as u32,
                        socket: format!("localhost:{}", 32000 + i),
                    },
                )
            })
            .collect();
        OperatorState {
            operators: HashMap::from([(0, operators)]),
            block_number: 1,
        }
    }

    #[test]
    fn test_assignments_follow_stake() {
        let params = BlobParams {
            coding_rate: 8,
            max_num_operators: 4,
            num_chunks: 104,
        };
        let assignments = get_assignments(&state(&[1, 1, 2]), &params, 0).unwrap();
        let mut counts: Vec<u32> = assignments.values().map(|a| a.num_chunks()).collect();
        counts.sort_unstable();
        assert_eq!(counts, vec![25, 25, 50]);

        // indices are disjoint and contiguous from 0
        let mut indices: Vec<u32> = assignments
            .values()
            .flat_map(|a| a.indices.iter().copied())
            .collect();
        indices.sort_unstable();
        assert_eq!(indices, (0..100).collect::<Vec<u32>>());
    }

    #[test]
    fn test_assignments_reject_bad_input() {
        let params = BlobParams {
            coding_rate: 8,
            max_num_operators: 2,
            num_chunks: 64,
        };
        get_assignments(&state(&[1, 1, 1]), &params, 0).expect_err("too many operators");
        get_assignments(&state(&[1]), &params, 1).expect_err("unknown quorum");
        get_assignments(&state(&[0, 0]), &params, 0).expect_err("no stake");
    }
}
