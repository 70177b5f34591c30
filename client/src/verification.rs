//! On-chain certificate verification.

use crate::{
    context::Context,
    errors::TransportError,
    types::{EigenDACert, QuorumId},
};

/// Calls into the cert verifier contract.
///
/// A rejected certificate is reported as a [TransportError::Rpc] carrying
/// the revert reason.
pub trait CertVerifier: Send + Sync {
    /// Address of the contract this verifier calls.
    fn address(&self) -> String;

    /// Quorums every certificate must be signed by.
    fn quorum_numbers_required(&self, ctx: &Context) -> Result<Vec<QuorumId>, TransportError>;

    /// Percentage of stake that must sign a quorum for a certificate to
    /// be valid.
    fn confirmation_threshold(&self, ctx: &Context) -> Result<u8, TransportError>;

    fn check_da_cert(&self, ctx: &Context, cert: &EigenDACert) -> Result<(), TransportError>;
}
