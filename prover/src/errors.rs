use rust_eigenda_primitives::errors::PolynomialError;
use thiserror::Error;

/// Errors raised while setting up an SRS or computing commitments.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum KzgError {
    #[error("polynomial of length {polynomial_len} exceeds SRS capacity of {srs_len} points")]
    SrsCapacityExceeded {
        polynomial_len: usize,
        srs_len: usize,
    },

    #[error("invalid SRS point at index {0}")]
    InvalidSrsPoint(usize),

    #[error("commit error: {0}")]
    CommitError(String),

    #[error("FFT error: {0}")]
    FFTError(String),

    #[error("polynomial error: {0}")]
    PolynomialError(#[from] PolynomialError),

    #[error("generic error: {0}")]
    GenericError(String),
}
