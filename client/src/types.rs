//! Protocol data shared by the dispersal and retrieval clients.

use std::{collections::HashMap, fmt};

use ark_bn254::G1Affine;
use ark_serialize::CanonicalSerialize;
use num_bigint::BigUint;
use rust_eigenda_primitives::consts::BYTES_PER_SYMBOL;
use sha3::{Digest, Keccak256};

use crate::payment::PaymentMetadata;

pub type QuorumId = u8;
pub type RelayKey = u32;
pub type BlobVersion = u16;

/// Highest quorum number a blob header may reference.
pub const MAX_QUORUM_ID: QuorumId = 254;

pub(crate) fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

macro_rules! hex_id {
    ($name:ident, $len:expr) => {
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub fn hex(&self) -> String {
                hex::encode(self.0)
            }

            pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
                let mut bytes = [0u8; $len];
                hex::decode_to_slice(s.trim_start_matches("0x"), &mut bytes)?;
                Ok(Self(bytes))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.hex())
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }
    };
}

hex_id!(BlobKey, 32);
hex_id!(OperatorId, 32);
hex_id!(AccountId, 20);

/// Commitment to a blob along with its length in symbols.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlobCommitments {
    pub commitment: G1Affine,
    pub length: u32,
}

impl BlobCommitments {
    /// Upper bound, in bytes, of a blob matching these commitments.
    pub fn max_blob_bytes(&self) -> usize {
        self.length as usize * BYTES_PER_SYMBOL
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BlobHeader {
    pub blob_version: BlobVersion,
    pub quorum_numbers: Vec<QuorumId>,
    pub blob_commitments: BlobCommitments,
    pub payment_metadata: PaymentMetadata,
}

impl BlobHeader {
    /// Keccak-256 over the version, quorums and commitments, followed by
    /// the payment metadata hash.
    pub fn blob_key(&self) -> BlobKey {
        let mut inner = Vec::with_capacity(128);
        inner.extend_from_slice(&self.blob_version.to_be_bytes());
        inner.push(self.quorum_numbers.len() as u8);
        let mut quorums = self.quorum_numbers.clone();
        quorums.sort_unstable();
        inner.extend_from_slice(&quorums);
        let mut commitment = Vec::new();
        // serializing into a Vec cannot fail
        let _ = self
            .blob_commitments
            .commitment
            .serialize_compressed(&mut commitment);
        inner.extend_from_slice(&commitment);
        inner.extend_from_slice(&self.blob_commitments.length.to_be_bytes());

        let mut outer = keccak256(&inner).to_vec();
        outer.extend_from_slice(&self.payment_metadata.hash());
        BlobKey(keccak256(&outer))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BlobCertificate {
    pub blob_header: BlobHeader,
    pub signature: Vec<u8>,
    pub relay_keys: Vec<RelayKey>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BlobInclusionInfo {
    pub blob_certificate: BlobCertificate,
    pub blob_index: u32,
    pub inclusion_proof: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchHeader {
    pub batch_root: [u8; 32],
    pub reference_block_number: u64,
}

/// Aggregated signing result of a batch, as reported by the disperser.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Attestation {
    pub quorum_numbers: Vec<QuorumId>,
    pub quorum_signed_percentages: Vec<u8>,
}

impl Attestation {
    pub fn signed_percentages(&self) -> HashMap<QuorumId, u8> {
        self.quorum_numbers
            .iter()
            .copied()
            .zip(self.quorum_signed_percentages.iter().copied())
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedBatch {
    pub batch_header: BatchHeader,
    pub attestation: Attestation,
}

/// Proof that a blob was certified by the network.
#[derive(Clone, Debug, PartialEq)]
pub struct EigenDACert {
    pub blob_inclusion_info: BlobInclusionInfo,
    pub batch_header: BatchHeader,
    pub signed_quorum_numbers: Vec<QuorumId>,
}

impl EigenDACert {
    pub fn blob_header(&self) -> &BlobHeader {
        &self.blob_inclusion_info.blob_certificate.blob_header
    }

    pub fn blob_key(&self) -> BlobKey {
        self.blob_header().blob_key()
    }

    pub fn commitments(&self) -> &BlobCommitments {
        &self.blob_header().blob_commitments
    }

    pub fn relay_keys(&self) -> &[RelayKey] {
        &self.blob_inclusion_info.blob_certificate.relay_keys
    }

    pub fn quorum_numbers(&self) -> &[QuorumId] {
        &self.blob_header().quorum_numbers
    }

    pub fn reference_block_number(&self) -> u64 {
        self.batch_header.reference_block_number
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlobStatus {
    Unknown,
    Queued,
    Encoded,
    GatheringSignatures,
    Complete,
    Failed,
}

impl fmt::Display for BlobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BlobStatus::Unknown => "UNKNOWN",
            BlobStatus::Queued => "QUEUED",
            BlobStatus::Encoded => "ENCODED",
            BlobStatus::GatheringSignatures => "GATHERING_SIGNATURES",
            BlobStatus::Complete => "COMPLETE",
            BlobStatus::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BlobStatusReply {
    pub status: BlobStatus,
    pub blob_inclusion_info: Option<BlobInclusionInfo>,
    pub signed_batch: Option<SignedBatch>,
}

/// Parameters of a blob version, read from chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlobParams {
    pub coding_rate: u32,
    pub max_num_operators: u32,
    pub num_chunks: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncodingParams {
    pub chunk_length: u32,
    pub num_chunks: u32,
}

impl EncodingParams {
    /// Derives the encoding of a blob of `blob_length` symbols.
    pub fn for_blob(blob_length: u32, params: &BlobParams) -> Result<Self, String> {
        if blob_length == 0 {
            return Err("blob length must be greater than 0".to_string());
        }
        if !blob_length.is_power_of_two() {
            return Err("blob length must be power of 2".to_string());
        }
        if params.num_chunks == 0 {
            return Err("number of chunks must be greater than 0".to_string());
        }
        let chunk_length = (blob_length as u64 * params.coding_rate as u64
            / params.num_chunks as u64)
            .max(1) as u32;
        Ok(Self {
            chunk_length,
            num_chunks: params.num_chunks,
        })
    }
}

/// The chunk indices an operator holds for a blob.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Assignment {
    pub indices: Vec<u32>,
}

impl Assignment {
    pub fn contiguous(start_index: u32, num_chunks: u32) -> Self {
        Self {
            indices: (start_index..start_index + num_chunks).collect(),
        }
    }

    pub fn num_chunks(&self) -> u32 {
        self.indices.len() as u32
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperatorInfo {
    pub stake: BigUint,
    pub index: u32,
    pub socket: String,
}

/// Stakes of every operator in the requested quorums at a block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OperatorState {
    pub operators: HashMap<QuorumId, HashMap<OperatorId, OperatorInfo>>,
    pub block_number: u64,
}

impl OperatorState {
    pub fn total_stake(&self, quorum: QuorumId) -> BigUint {
        self.operators
            .get(&quorum)
            .map(|ops| ops.values().map(|op| &op.stake).sum())
            .unwrap_or_default()
    }
}
