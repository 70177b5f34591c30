//! ## Library Design / Architecture
//!
//! This crate holds the data model shared by the dispersal and retrieval
//! sides of the EigenDA v2 client.
//!
//! ### Data Types
//!
//! The main data pipeline goes:
//! > user data -> [payload::Payload] -> [encoded_payload::EncodedPayload] ->
//! > [polynomial::PolynomialEvalForm]/[polynomial::PolynomialCoeffForm] -> [blob::Blob]
//!
//! - Payload: bytes array, meaningful to users (typically a rollup batch).
//! - EncodedPayload: a 32 byte header followed by the payload with a zero
//!   byte inserted in front of every 31 bytes, so that every 32 bytes is an
//!   element of bn254. The symbol count is a power of 2.
//! - Polynomial: bn254 field elements array, interpreted as coefficients or
//!   evaluations of a polynomial. FFT/IFFT convert between the two.
//! - Blob: what gets dispersed to the network. Holds either the encoded
//!   payload directly or the coefficients of its IFFT, never both.
//!
//! The [codec] module additionally provides the generic blob codecs whose
//! header carries a 64 bit length.
//!
//! ## Examples
//!
//! ### Round trip some user data through a blob
//! ```rust
//! use rust_eigenda_primitives::{blob::Blob, payload::Payload, PolynomialForm};
//!
//! let payload = Payload::new(b"some rollup batcher data".to_vec());
//! let blob = Blob::from_payload(&payload, PolynomialForm::Coeff).unwrap();
//! let recovered = blob.to_payload().unwrap();
//! assert_eq!(recovered, payload);
//! ```

pub mod blob;
pub mod codec;
pub mod consts;
pub mod encoded_payload;
pub mod errors;
pub mod helpers;
pub mod payload;
pub mod polynomial;

use serde::{Deserialize, Serialize};

/// The form a payload is in once it has been encoded. This dictates what
/// conversion, if any, is performed when building a [blob::Blob] from it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolynomialForm {
    /// The encoded payload is treated as evaluations, and the blob holds it
    /// verbatim.
    #[default]
    Eval,
    /// The encoded payload is IFFTed, and the blob holds the resulting
    /// coefficients.
    Coeff,
}
