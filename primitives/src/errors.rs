use thiserror::Error;

/// Errors related to Polynomial operations.
///
/// The `PolynomialError` enum encapsulates all possible errors that can occur
/// during operations on the polynomial structs, such as FFT transformations
/// and field element conversion.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum PolynomialError {
    /// Error related to Fast Fourier Transform (FFT) operations with a descriptive message.
    #[error("FFT error: {0}")]
    FFTError(String),

    /// Error indicating invalid field element bytes that exceed the field modulus.
    #[error("invalid field element: {0}")]
    InvalidFieldElement(String),

    /// A generic error with a descriptive message.
    #[error("generic error: {0}")]
    GenericError(String),
}

/// Errors raised while encoding or decoding payloads.
///
/// All of these are malformed-input errors: they are returned immediately
/// and retrying the same input can never succeed.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum CodecError {
    #[error("input too short: got {len} bytes, need at least {min}")]
    InputTooShort { len: usize, min: usize },

    #[error("length mismatch: claimed {claimed} bytes but only {available} bytes are available")]
    LengthMismatch { claimed: usize, available: usize },

    #[error("unsupported encoding version: {0}")]
    UnsupportedEncodingVersion(u8),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("invalid internal padding: {0}")]
    InvalidInternalPadding(String),

    /// Error indicating invalid field element bytes that exceed the field modulus.
    #[error("invalid field element: {0}")]
    InvalidFieldElement(String),

    #[error("invalid input length: {0}")]
    InvalidInputLength(String),

    #[error("polynomial error: {0}")]
    PolynomialError(#[from] PolynomialError),
}

/// Errors related to [crate::blob::Blob] conversions. Each variant names the
/// stage of the pipeline that failed.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum BlobError {
    #[error("encode payload: {0}")]
    Encode(CodecError),

    #[error("convert coefficient form to evaluation form: {0}")]
    CoeffToEval(PolynomialError),

    #[error("convert evaluation form to encoded payload: {0}")]
    EvalToEncodedPayload(CodecError),

    #[error("convert encoded payload to coefficient form: {0}")]
    EncodedPayloadToCoeff(PolynomialError),

    #[error("decode encoded payload: {0}")]
    Decode(CodecError),

    #[error("invalid blob bytes: {0}")]
    InvalidBlobBytes(String),
}
