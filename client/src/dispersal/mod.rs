//! Dispersal of payloads to the network.
//!
//! [DisperserClient] talks to a single disperser and pays for each blob
//! through the [crate::accountant::Accountant]. [PayloadDisperser] drives
//! a payload all the way to a verified [crate::types::EigenDACert].

pub mod disperser_client;
pub mod payload_disperser;
pub mod required_quorums;

use crate::{
    context::Context,
    errors::TransportError,
    payment::PaymentStateSnapshot,
    types::{AccountId, BlobCommitments, BlobHeader, BlobKey, BlobStatus, BlobStatusReply},
};

pub use self::{
    disperser_client::DisperserClient, payload_disperser::PayloadDisperser,
    required_quorums::RequiredQuorumsStore,
};

#[derive(Clone, Debug, PartialEq)]
pub struct DisperseBlobRequest {
    pub blob: Vec<u8>,
    pub signature: Vec<u8>,
    pub blob_header: BlobHeader,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisperseBlobReply {
    pub result: BlobStatus,
    pub blob_key: BlobKey,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentStateRequest {
    pub account_id: AccountId,
    pub signature: Vec<u8>,
    /// Nanoseconds since the unix epoch.
    pub timestamp: u64,
}

/// Wire transport to a disperser.
pub trait DisperserRpc: Send + Sync {
    fn disperse_blob(
        &self,
        ctx: &Context,
        request: &DisperseBlobRequest,
    ) -> Result<DisperseBlobReply, TransportError>;

    fn get_blob_status(
        &self,
        ctx: &Context,
        blob_key: &BlobKey,
    ) -> Result<BlobStatusReply, TransportError>;

    fn get_blob_commitment(
        &self,
        ctx: &Context,
        blob: &[u8],
    ) -> Result<BlobCommitments, TransportError>;

    fn get_payment_state(
        &self,
        ctx: &Context,
        request: &PaymentStateRequest,
    ) -> Result<PaymentStateSnapshot, TransportError>;

    fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Signs requests on behalf of the paying account.
pub trait BlobRequestSigner: Send + Sync {
    fn sign_blob_request(&self, blob_header: &BlobHeader) -> Result<Vec<u8>, String>;

    fn sign_payment_state_request(&self, timestamp: u64) -> Result<Vec<u8>, String>;

    fn account_id(&self) -> AccountId;
}
