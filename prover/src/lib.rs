//! KZG commitments for EigenDA v2 blobs.
//!
//! The SRS is supplied in memory through [srs::SRS::from_points]; reading
//! SRS files is left to the caller.
//!
//! ```rust
//! use ark_bn254::{Fr, G1Affine};
//! use ark_ec::{AffineRepr, CurveGroup};
//! use rust_eigenda_primitives::{blob::Blob, payload::Payload, PolynomialForm};
//! use rust_eigenda_prover::{kzg::KZG, srs::SRS};
//!
//! // toy setup with a known secret, never use outside of tests
//! let tau = Fr::from(7u64);
//! let mut power = Fr::from(1u64);
//! let mut g1 = Vec::new();
//! for _ in 0..16 {
//!     g1.push((G1Affine::generator() * power).into_affine());
//!     power *= tau;
//! }
//! let srs = SRS::from_points(g1, 16).unwrap();
//!
//! let payload = Payload::new(b"commit to me".to_vec());
//! let blob = Blob::from_payload(&payload, PolynomialForm::Coeff).unwrap();
//! let commitment = KZG::new().commit_blob(&blob, &srs).unwrap();
//! assert!(commitment.is_on_curve());
//! ```

pub mod errors;
pub mod kzg;
pub mod srs;
