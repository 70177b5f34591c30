//! ## Library Design / Architecture
//!
//! Clients for dispersing payloads to EigenDA v2 and retrieving them again.
//!
//! ### Dispersal
//!
//! > payload -> blob -> [dispersal::DisperserClient] -> status polling ->
//! > [types::EigenDACert]
//!
//! [dispersal::PayloadDisperser] encodes a payload into a blob, pays for it
//! through the [accountant::Accountant], sends it to the disperser and polls
//! until the network has certified it. The resulting certificate is checked
//! against the cert verifier contract before it is returned.
//!
//! ### Retrieval
//!
//! Every [payload_retrieval::PayloadRetriever] takes a certificate and
//! returns the payload it commits to:
//!
//! - [payload_retrieval::RelayPayloadRetriever] fetches the whole blob from
//!   one of the relays named in the certificate.
//! - [payload_retrieval::ValidatorPayloadRetriever] gathers chunks from the
//!   validators of a quorum through a [retrieval_client::RetrievalClient].
//! - [payload_retrieval::DistributedPayloadRetriever] does the same with the
//!   pessimistic [validator::retrieval_worker::RetrievalWorker], which
//!   downloads and verifies only as many chunks as it needs.
//!
//! Whatever the source, the blob is checked against the certificate's KZG
//! commitment before it is decoded. A source that serves a mismatching blob
//! is skipped.
//!
//! ### Transports
//!
//! Network and contract access goes through the traits in
//! [dispersal], [relay], [validator] and [verification]. Every call carries
//! a [context::Context] holding its deadline and cancellation.

pub mod accountant;
pub mod config;
pub mod context;
pub mod dispersal;
pub mod encoding;
pub mod errors;
pub mod payload_retrieval;
pub mod payment;
pub mod relay;
pub mod retrieval_client;
pub mod types;
pub mod validator;
pub mod verification;
