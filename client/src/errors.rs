use rust_eigenda_primitives::errors::{BlobError, CodecError};
use rust_eigenda_prover::errors::KzgError;
use thiserror::Error;

use crate::context::ContextError;

/// Errors raised while loading or checking configuration.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    #[error("{0} must be provided")]
    MissingField(&'static str),

    #[error("{field} must be greater than 1.0, got {value}")]
    PessimismTooLow { field: &'static str, value: f64 },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors raised by the [crate::accountant::Accountant].
///
/// Reservation and on-demand errors are ordinary control flow: callers
/// are expected to pick another payment path or retry later.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum PaymentError {
    #[error("no quorum numbers provided")]
    NoQuorums,

    #[error("number of symbols must be greater than zero")]
    ZeroSymbols,

    #[error("no reservation found for quorum {0}")]
    NoReservation(u8),

    #[error("reservation for quorum {0} is not active")]
    InactiveReservation(u8),

    #[error("quorum {0} not found in payment configs")]
    MissingPaymentConfig(u8),

    #[error("quorum {0} not found in protocol configs")]
    MissingProtocolConfig(u8),

    #[error("invalid reservation window for quorum {0}")]
    InvalidWindow(u8),

    #[error("reservation limit exceeded for quorum {0}")]
    ReservationLimitExceeded(u8),

    #[error("quorum number mismatch: {0}")]
    QuorumNumberMismatch(u8),

    #[error("insufficient ondemand payment: {needed} > {available}")]
    InsufficientOnDemandPayment { needed: String, available: String },

    #[error("no bandwidth reservation found for account {account}, reservation: {reservation}, ondemand: {on_demand}")]
    NoPaymentAvailable {
        account: String,
        reservation: Box<PaymentError>,
        on_demand: Box<PaymentError>,
    },

    #[error("payment vault params cannot be nil")]
    MissingVaultParams,

    #[error("payment quorum configs cannot be nil")]
    MissingQuorumPaymentConfigs,

    #[error("payment quorum protocol configs cannot be nil")]
    MissingQuorumProtocolConfigs,
}

/// Failures of a single call to an external collaborator (disperser,
/// relay, validator node, or contract).
#[derive(Clone, Debug, PartialEq, Error)]
pub enum TransportError {
    #[error("{0}")]
    Context(#[from] ContextError),

    #[error("call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("connection closed")]
    Closed,
}

/// Errors raised while retrieving a blob or payload.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum RetrievalError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("{0}")]
    Context(#[from] ContextError),

    #[error("relay key count is zero")]
    NoRelayKeys,

    #[error("no quorums to retrieve from")]
    NoQuorums,

    #[error("no quorum with ID: {0}")]
    UnknownQuorum(u8),

    #[error("invalid blob version {0}")]
    InvalidBlobVersion(u16),

    #[error("get encoding params: {0}")]
    EncodingParams(String),

    #[error("failed to get assignments: {0}")]
    Assignment(String),

    #[error("verify commitment: {0}")]
    CommitmentEquivalence(String),

    #[error("verify cert: {0}")]
    CertVerification(String),

    #[error("not enough chunks verified: {verified} < {minimum}")]
    NotEnoughChunks { verified: u32, minimum: u32 },

    #[error("failed to decode blob: {0}")]
    Decode(String),

    #[error("{0}")]
    Kzg(#[from] KzgError),

    /// A backend returned data that does not match the certificate. The
    /// backend is skipped.
    #[error("integrity violation for blob {blob_key} from {source_id}: {reason}")]
    IntegrityViolation {
        blob_key: String,
        source_id: String,
        reason: String,
    },

    /// The blob matched the certificate commitment but does not decode. An
    /// honest certificate can never produce this, so it is never retried.
    #[error("decode blob {blob_key} from {source_id} after commitment match: {reason}")]
    DecodeAfterCommitmentMatch {
        blob_key: String,
        source_id: String,
        reason: BlobError,
    },

    #[error("unable to retrieve blob {blob_key} from any {kind}. {kind} count: {count}")]
    Exhausted {
        blob_key: String,
        kind: &'static str,
        count: usize,
    },
}

/// Errors raised while dispersing a payload.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum DispersalError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Blob(#[from] BlobError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Kzg(#[from] KzgError),

    #[error("{0}")]
    Context(#[from] ContextError),

    #[error("quorum numbers must be provided")]
    NoQuorums,

    #[error("quorum number must be less than 256")]
    InvalidQuorum,

    #[error("accountant is nil")]
    NoAccountant,

    #[error("populating accountant: {0}")]
    PopulateAccountant(String),

    #[error("encountered an error to convert a 32-bytes into a valid field element: {0}")]
    InvalidFieldElement(String),

    #[error("blob commitment length ({actual}) from disperser doesn't match expected length ({expected})")]
    CommitmentLengthMismatch { actual: u32, expected: u32 },

    #[error("error signing request: {0}")]
    Signing(String),

    #[error("{operation} rpc: {source}")]
    Rpc {
        operation: &'static str,
        source: TransportError,
    },

    #[error("blob key returned by disperser ({received}) doesn't match blob which was dispersed ({expected})")]
    BlobKeyMismatch { received: String, expected: String },

    #[error("timed out waiting for COMPLETE blob status, final status was {status}: {source}")]
    StatusTimeout {
        status: String,
        source: ContextError,
    },

    #[error("terminal dispersal failure for blobKey {blob_key}. blob status: {status}")]
    TerminalStatus { blob_key: String, status: String },

    #[error("check thresholds: {0}")]
    ThresholdNotMet(String),

    #[error("check thresholds: {0}")]
    ThresholdCheck(String),

    #[error("build cert: {0}")]
    BuildCert(String),

    #[error("checkDACert failed with blobKey {blob_key}: {reason}")]
    InvalidCert { blob_key: String, reason: String },

    #[error("get required quorums: {0}")]
    RequiredQuorums(TransportError),
}

impl DispersalError {
    /// Whether the error means the network did not do its job and a
    /// rollup should fail over to another DA layer.
    pub fn is_failover(&self) -> bool {
        matches!(
            self,
            DispersalError::Rpc { .. }
                | DispersalError::Context(_)
                | DispersalError::StatusTimeout { .. }
                | DispersalError::TerminalStatus { .. }
                | DispersalError::ThresholdNotMet(_)
                | DispersalError::InvalidCert { .. }
        )
    }
}

/// Crate wide error.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Dispersal(#[from] DispersalError),
}
