use crate::{encoded_payload::EncodedPayload, errors::CodecError};

/// Arbitrary user data, the unit a rollup disperses and retrieves.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Payload {
    bytes: Vec<u8>,
}

impl Payload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn serialize(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Encodes the payload: a 32 byte header followed by the padded payload,
    /// zero-extended until the symbol count is a power of 2.
    pub fn to_encoded_payload(&self) -> Result<EncodedPayload, CodecError> {
        EncodedPayload::from_payload(self)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}
