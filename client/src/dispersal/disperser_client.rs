use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use parking_lot::Mutex;
use rust_eigenda_primitives::helpers::{
    get_blob_length_power_of_2, validate_blob_data_as_canonical_field_elements,
};
use rust_eigenda_prover::{kzg::KZG, srs::SRS};
use tracing::{debug, info};

use crate::{
    accountant::Accountant,
    config::DisperserClientConfig,
    context::Context,
    dispersal::{
        BlobRequestSigner, DisperseBlobReply, DisperseBlobRequest, DisperserRpc,
        PaymentStateRequest,
    },
    errors::DispersalError,
    payment::PaymentStateSnapshot,
    types::{
        BlobCommitments, BlobHeader, BlobKey, BlobStatusReply, BlobVersion, QuorumId,
        MAX_QUORUM_ID,
    },
};

fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as i64)
        .unwrap_or_default()
}

/// Client of a single disperser.
///
/// Blobs are paid for through the accountant, which is populated from the
/// disperser on first use. Dispersals paid on demand are serialized so
/// that the cumulative payments reach the disperser in order.
pub struct DisperserClient {
    config: DisperserClientConfig,
    rpc: Arc<dyn DisperserRpc>,
    signer: Arc<dyn BlobRequestSigner>,
    accountant: Option<Arc<Accountant>>,
    srs: Option<Arc<SRS>>,
    kzg: KZG,
    // result of populating the accountant, once attempted
    dispersal_lock: Mutex<Option<Result<(), String>>>,
}

impl DisperserClient {
    /// `srs` enables computing commitments locally; without it the
    /// disperser is trusted to compute them.
    pub fn new(
        mut config: DisperserClientConfig,
        rpc: Arc<dyn DisperserRpc>,
        signer: Arc<dyn BlobRequestSigner>,
        accountant: Option<Arc<Accountant>>,
        srs: Option<Arc<SRS>>,
    ) -> Result<Self, DispersalError> {
        config.check_and_set_defaults()?;
        info!(
            address = %config.address(),
            connection_count = config.connection_count,
            local_commitments = srs.is_some(),
            "creating disperser client"
        );
        Ok(Self {
            config,
            rpc,
            signer,
            accountant,
            srs,
            kzg: KZG::new(),
            dispersal_lock: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &DisperserClientConfig {
        &self.config
    }

    /// Loads the payment state of the signer's account into the accountant.
    pub fn populate_accountant(&self, ctx: &Context) -> Result<(), DispersalError> {
        let accountant = self.accountant.as_ref().ok_or(DispersalError::NoAccountant)?;
        let payment_state = self.get_payment_state(ctx).map_err(|err| {
            DispersalError::PopulateAccountant(format!(
                "error getting payment state for initializing accountant: {}",
                err
            ))
        })?;
        accountant.set_payment_state(&payment_state).map_err(|err| {
            DispersalError::PopulateAccountant(format!(
                "error setting payment state for accountant: {}",
                err
            ))
        })
    }

    /// Pays for, signs and sends a blob. Returns the header that was sent
    /// along with the disperser's reply.
    pub fn disperse_blob(
        &self,
        ctx: &Context,
        data: &[u8],
        blob_version: BlobVersion,
        quorums: &[QuorumId],
    ) -> Result<(BlobHeader, DisperseBlobReply), DispersalError> {
        if quorums.is_empty() {
            return Err(DispersalError::NoQuorums);
        }
        if quorums.iter().any(|&quorum| quorum > MAX_QUORUM_ID) {
            return Err(DispersalError::InvalidQuorum);
        }
        let accountant = self.accountant.as_ref().ok_or(DispersalError::NoAccountant)?;

        let symbol_length = get_blob_length_power_of_2(data.len());

        let mut guard = self.dispersal_lock.lock();
        if guard.is_none() {
            *guard = Some(self.populate_accountant(ctx).map_err(|err| err.to_string()));
        }
        if let Some(Err(err)) = guard.as_ref() {
            return Err(DispersalError::PopulateAccountant(err.clone()));
        }
        let payment_metadata =
            accountant.account_blob(now_nanos(), symbol_length as u64, quorums)?;
        // reservation dispersals may run concurrently, on-demand ones may not
        let _on_demand_guard = if payment_metadata.is_on_demand() {
            Some(guard)
        } else {
            drop(guard);
            None
        };

        validate_blob_data_as_canonical_field_elements(data)
            .map_err(|err| DispersalError::InvalidFieldElement(err.to_string()))?;

        let blob_commitments = match &self.srs {
            Some(srs) => BlobCommitments {
                commitment: self.kzg.commit_blob_bytes(data, srs)?,
                length: symbol_length as u32,
            },
            None => {
                let commitments = self.get_blob_commitment(ctx, data)?;
                if commitments.length != symbol_length as u32 {
                    return Err(DispersalError::CommitmentLengthMismatch {
                        actual: commitments.length,
                        expected: symbol_length as u32,
                    });
                }
                commitments
            }
        };

        let blob_header = BlobHeader {
            blob_version,
            quorum_numbers: quorums.to_vec(),
            blob_commitments,
            payment_metadata,
        };
        let signature = self
            .signer
            .sign_blob_request(&blob_header)
            .map_err(DispersalError::Signing)?;

        let request = DisperseBlobRequest {
            blob: data.to_vec(),
            signature,
            blob_header,
        };
        let reply = self
            .rpc
            .disperse_blob(ctx, &request)
            .map_err(|source| DispersalError::Rpc {
                operation: "DisperseBlob",
                source,
            })?;
        debug!(
            blob_key = %reply.blob_key,
            status = %reply.result,
            size = data.len(),
            "dispersed blob"
        );
        Ok((request.blob_header, reply))
    }

    pub fn get_blob_status(
        &self,
        ctx: &Context,
        blob_key: &BlobKey,
    ) -> Result<BlobStatusReply, DispersalError> {
        self.rpc
            .get_blob_status(ctx, blob_key)
            .map_err(|source| DispersalError::Rpc {
                operation: "GetBlobStatus",
                source,
            })
    }

    pub fn get_blob_commitment(
        &self,
        ctx: &Context,
        data: &[u8],
    ) -> Result<BlobCommitments, DispersalError> {
        self.rpc
            .get_blob_commitment(ctx, data)
            .map_err(|source| DispersalError::Rpc {
                operation: "GetBlobCommitment",
                source,
            })
    }

    /// Fetches the payment state of the signer's account.
    pub fn get_payment_state(&self, ctx: &Context) -> Result<PaymentStateSnapshot, DispersalError> {
        let timestamp = now_nanos().max(0) as u64;
        let signature = self
            .signer
            .sign_payment_state_request(timestamp)
            .map_err(DispersalError::Signing)?;
        let request = PaymentStateRequest {
            account_id: self.signer.account_id(),
            signature,
            timestamp,
        };
        self.rpc
            .get_payment_state(ctx, &request)
            .map_err(|source| DispersalError::Rpc {
                operation: "GetPaymentState",
                source,
            })
    }

    pub fn close(&self) -> Result<(), DispersalError> {
        self.rpc.close().map_err(|source| DispersalError::Rpc {
            operation: "Close",
            source,
        })
    }
}
