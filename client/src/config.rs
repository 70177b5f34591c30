//! Client configuration.
//!
//! Every struct implements [Default] with the values the clients are tuned
//! for, and deserializes with `#[serde(default)]` so a partial document
//! only overrides what it names.

use std::time::Duration;

use rust_eigenda_primitives::{codec::BlobEncodingVersion, PolynomialForm};
use serde::{Deserialize, Serialize};

use crate::{errors::ConfigError, types::QuorumId};

/// Upper bound on the number of connections to the disperser.
pub const MAX_NUMBER_OF_CONNECTIONS: u32 = 32;

fn default_encoding_version() -> u8 {
    BlobEncodingVersion::Default as u8
}

/// Settings shared by every payload client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayloadClientConfig {
    pub blob_encoding_version: u8,
    pub eth_rpc_url: String,
    pub cert_verifier_address: String,
    pub payload_polynomial_form: PolynomialForm,
    pub contract_call_timeout: Duration,
    pub block_number_poll_interval: Duration,
    pub blob_version: u16,
}

impl Default for PayloadClientConfig {
    fn default() -> Self {
        Self {
            blob_encoding_version: default_encoding_version(),
            eth_rpc_url: String::new(),
            cert_verifier_address: String::new(),
            payload_polynomial_form: PolynomialForm::Eval,
            contract_call_timeout: Duration::from_secs(5),
            block_number_poll_interval: Duration::from_secs(1),
            blob_version: 0,
        }
    }
}

impl PayloadClientConfig {
    /// Fills zero durations with defaults and rejects missing required
    /// values.
    pub fn check_and_set_defaults(&mut self) -> Result<(), ConfigError> {
        if self.eth_rpc_url.trim().is_empty() {
            return Err(ConfigError::MissingField("eth rpc url"));
        }
        if self.cert_verifier_address.trim().is_empty() {
            return Err(ConfigError::MissingField("cert verifier address"));
        }
        BlobEncodingVersion::try_from(self.blob_encoding_version)
            .map_err(|err| ConfigError::Invalid(err.to_string()))?;

        let defaults = Self::default();
        if self.contract_call_timeout.is_zero() {
            self.contract_call_timeout = defaults.contract_call_timeout;
        }
        if self.block_number_poll_interval.is_zero() {
            self.block_number_poll_interval = defaults.block_number_poll_interval;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayPayloadRetrieverConfig {
    pub payload_client_config: PayloadClientConfig,
    /// Timeout of a single fetch from one relay.
    pub relay_timeout: Duration,
}

impl Default for RelayPayloadRetrieverConfig {
    fn default() -> Self {
        Self {
            payload_client_config: PayloadClientConfig::default(),
            relay_timeout: Duration::from_secs(5),
        }
    }
}

impl RelayPayloadRetrieverConfig {
    pub fn check_and_set_defaults(&mut self) -> Result<(), ConfigError> {
        self.payload_client_config.check_and_set_defaults()?;
        if self.relay_timeout.is_zero() {
            self.relay_timeout = Self::default().relay_timeout;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorPayloadRetrieverConfig {
    pub payload_client_config: PayloadClientConfig,
    /// Timeout of a single retrieval from one quorum.
    pub retrieval_timeout: Duration,
    /// Size of the pool fanning requests out to validators.
    pub connection_count: usize,
}

impl Default for ValidatorPayloadRetrieverConfig {
    fn default() -> Self {
        Self {
            payload_client_config: PayloadClientConfig::default(),
            retrieval_timeout: Duration::from_secs(20),
            connection_count: 10,
        }
    }
}

impl ValidatorPayloadRetrieverConfig {
    pub fn check_and_set_defaults(&mut self) -> Result<(), ConfigError> {
        self.payload_client_config.check_and_set_defaults()?;
        let defaults = Self::default();
        if self.retrieval_timeout.is_zero() {
            self.retrieval_timeout = defaults.retrieval_timeout;
        }
        if self.connection_count == 0 {
            self.connection_count = defaults.connection_count;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayloadDisperserConfig {
    pub payload_client_config: PayloadClientConfig,
    pub disperse_blob_timeout: Duration,
    /// How long to wait for the blob to be certified once dispersed.
    pub blob_certified_timeout: Duration,
    pub blob_status_poll_interval: Duration,
    pub quorums: Vec<QuorumId>,
}

impl Default for PayloadDisperserConfig {
    fn default() -> Self {
        Self {
            payload_client_config: PayloadClientConfig::default(),
            disperse_blob_timeout: Duration::from_secs(5),
            blob_certified_timeout: Duration::from_secs(10),
            blob_status_poll_interval: Duration::from_secs(1),
            quorums: vec![0, 1],
        }
    }
}

impl PayloadDisperserConfig {
    pub fn check_and_set_defaults(&mut self) -> Result<(), ConfigError> {
        self.payload_client_config.check_and_set_defaults()?;
        let defaults = Self::default();
        if self.disperse_blob_timeout.is_zero() {
            self.disperse_blob_timeout = defaults.disperse_blob_timeout;
        }
        if self.blob_certified_timeout.is_zero() {
            self.blob_certified_timeout = defaults.blob_certified_timeout;
        }
        if self.blob_status_poll_interval.is_zero() {
            self.blob_status_poll_interval = defaults.blob_status_poll_interval;
        }
        if self.quorums.is_empty() {
            self.quorums = defaults.quorums;
        }
        Ok(())
    }
}

/// Settings of the validator retrieval workers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorClientConfig {
    /// How many chunks to download, as a multiple of the number needed to
    /// reconstruct the blob.
    pub download_pessimism: f64,
    /// How many chunks to verify, as a multiple of the number needed to
    /// reconstruct the blob.
    pub verification_pessimism: f64,
    /// Time after which a download stops counting against the download
    /// budget. The download keeps running.
    pub pessimistic_timeout: Duration,
    /// Hard timeout of a single download.
    pub download_timeout: Duration,
    pub control_loop_period: Duration,
    pub connection_pool_size: usize,
    pub compute_pool_size: usize,
    pub detailed_logging: bool,
}

impl Default for ValidatorClientConfig {
    fn default() -> Self {
        Self {
            download_pessimism: 2.0,
            verification_pessimism: 1.0,
            pessimistic_timeout: Duration::from_secs(10),
            download_timeout: Duration::from_secs(30),
            control_loop_period: Duration::from_secs(1),
            connection_pool_size: 32,
            compute_pool_size: num_cpus::get(),
            detailed_logging: false,
        }
    }
}

impl ValidatorClientConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.download_pessimism < 1.0 {
            return Err(ConfigError::PessimismTooLow {
                field: "downloadPessimism",
                value: self.download_pessimism,
            });
        }
        if self.verification_pessimism < 1.0 {
            return Err(ConfigError::PessimismTooLow {
                field: "verificationPessimism",
                value: self.verification_pessimism,
            });
        }
        if self.control_loop_period.is_zero() {
            return Err(ConfigError::Invalid(
                "control loop period must be greater than zero".to_string(),
            ));
        }
        if self.connection_pool_size == 0 || self.compute_pool_size == 0 {
            return Err(ConfigError::Invalid(
                "pool sizes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisperserClientConfig {
    pub hostname: String,
    pub port: String,
    pub use_secure_grpc: bool,
    pub connection_count: u32,
}

impl Default for DisperserClientConfig {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            port: String::new(),
            use_secure_grpc: true,
            connection_count: 1,
        }
    }
}

impl DisperserClientConfig {
    /// Rejects a missing address and clamps the connection count to
    /// `[1, MAX_NUMBER_OF_CONNECTIONS]`.
    pub fn check_and_set_defaults(&mut self) -> Result<(), ConfigError> {
        if self.hostname.trim().is_empty() {
            return Err(ConfigError::MissingField("hostname"));
        }
        if self.port.trim().is_empty() {
            return Err(ConfigError::MissingField("port"));
        }
        self.connection_count = self.connection_count.clamp(1, MAX_NUMBER_OF_CONNECTIONS);
        Ok(())
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayClientConfig {
    pub max_grpc_message_size: usize,
    pub connection_pool_size: usize,
    /// Timeout of a single call to a relay.
    pub relay_timeout: Duration,
}

impl Default for RelayClientConfig {
    fn default() -> Self {
        Self {
            max_grpc_message_size: 4 * 1024 * 1024,
            connection_pool_size: 1,
            relay_timeout: Duration::from_secs(5),
        }
    }
}

impl RelayClientConfig {
    pub fn check_and_set_defaults(&mut self) -> Result<(), ConfigError> {
        let defaults = Self::default();
        if self.max_grpc_message_size == 0 {
            self.max_grpc_message_size = defaults.max_grpc_message_size;
        }
        if self.connection_pool_size == 0 {
            self.connection_pool_size = defaults.connection_pool_size;
        }
        if self.relay_timeout.is_zero() {
            self.relay_timeout = defaults.relay_timeout;
        }
        Ok(())
    }
}
