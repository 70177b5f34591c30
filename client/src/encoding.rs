//! Erasure coded chunks and the verifier that checks and decodes them.
//!
//! Proof verification and Reed-Solomon decoding are supplied by the
//! caller through [Verifier].

use ark_bn254::{Fr, G1Affine};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use rust_eigenda_primitives::{
    consts::BYTES_PER_FIELD_ELEMENT,
    helpers::{to_byte_array, to_fr_array},
};

use crate::types::{BlobCommitments, EncodingParams};

const COMPRESSED_G1_LEN: usize = 32;

/// One erasure coded chunk of a blob and its opening proof.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    pub proof: G1Affine,
    pub coeffs: Vec<Fr>,
}

impl Frame {
    /// Compressed proof followed by the big-endian coefficients.
    pub fn serialize(&self) -> Result<Vec<u8>, String> {
        let mut bytes = Vec::with_capacity(
            COMPRESSED_G1_LEN + self.coeffs.len() * BYTES_PER_FIELD_ELEMENT,
        );
        self.proof
            .serialize_compressed(&mut bytes)
            .map_err(|err| format!("serialize proof: {}", err))?;
        bytes.extend(to_byte_array(
            &self.coeffs,
            self.coeffs.len() * BYTES_PER_FIELD_ELEMENT,
        ));
        Ok(bytes)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, String> {
        if bytes.len() < COMPRESSED_G1_LEN {
            return Err(format!(
                "frame of {} bytes is shorter than a proof",
                bytes.len()
            ));
        }
        let (proof_bytes, coeff_bytes) = bytes.split_at(COMPRESSED_G1_LEN);
        if coeff_bytes.len() % BYTES_PER_FIELD_ELEMENT != 0 {
            return Err(format!(
                "frame coefficients of {} bytes are not a multiple of {}",
                coeff_bytes.len(),
                BYTES_PER_FIELD_ELEMENT
            ));
        }
        let proof = G1Affine::deserialize_compressed(proof_bytes)
            .map_err(|err| format!("deserialize proof: {}", err))?;
        let coeffs = to_fr_array(coeff_bytes).map_err(|err| err.to_string())?;
        Ok(Self { proof, coeffs })
    }
}

/// Checks chunks against blob commitments, and rebuilds blobs from them.
pub trait Verifier: Send + Sync {
    /// Checks that the commitments and their length proofs agree.
    fn verify_commit_equivalence_batch(&self, commitments: &[BlobCommitments])
        -> Result<(), String>;

    /// Checks each frame's proof at its chunk index.
    fn verify_frames(
        &self,
        frames: &[Frame],
        indices: &[u32],
        commitments: &BlobCommitments,
        params: &EncodingParams,
    ) -> Result<(), String>;

    /// Rebuilds at most `max_input_size` bytes of blob from frames and
    /// their chunk indices.
    fn decode(
        &self,
        frames: &[Frame],
        indices: &[u32],
        params: &EncodingParams,
        max_input_size: usize,
    ) -> Result<Vec<u8>, String>;
}
