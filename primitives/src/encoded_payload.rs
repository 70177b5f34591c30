use ark_bn254::Fr;

use crate::{
    consts::{
        BYTES_PER_FIELD_ELEMENT, BYTES_PER_SYMBOL, ENCODED_PAYLOAD_HEADER_LEN_BYTES,
        PAYLOAD_ENCODING_VERSION_0,
    },
    errors::CodecError,
    helpers,
    payload::Payload,
};

/// A payload after encoding: a 32 byte header followed by the payload bytes
/// with internal padding, so that every 32 bytes is a bn254 field element.
///
/// Header layout:
/// ```text
/// [0x00, version, len_be[0], len_be[1], len_be[2], len_be[3], 0x00 ... 0x00]
/// ```
/// The leading zero byte keeps the header itself a valid field element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedPayload {
    bytes: Vec<u8>,
}

impl EncodedPayload {
    /// Wraps bytes that are already encoded. Only the length is checked here;
    /// the header and padding are checked by [Self::decode].
    pub fn new(bytes: Vec<u8>) -> Result<Self, CodecError> {
        if bytes.len() < ENCODED_PAYLOAD_HEADER_LEN_BYTES {
            return Err(CodecError::InputTooShort {
                len: bytes.len(),
                min: ENCODED_PAYLOAD_HEADER_LEN_BYTES,
            });
        }
        Ok(Self { bytes })
    }

    pub fn from_payload(payload: &Payload) -> Result<Self, CodecError> {
        let payload_len = u32::try_from(payload.len()).map_err(|_| {
            CodecError::InvalidInputLength(format!(
                "payload of {} bytes does not fit a 32 bit length",
                payload.len()
            ))
        })?;

        let padded = helpers::pad_payload(payload.serialize());
        let symbols = (ENCODED_PAYLOAD_HEADER_LEN_BYTES + padded.len())
            .div_ceil(BYTES_PER_SYMBOL)
            .next_power_of_two();

        let mut bytes = vec![0u8; symbols * BYTES_PER_SYMBOL];
        bytes[1] = PAYLOAD_ENCODING_VERSION_0;
        bytes[2..6].copy_from_slice(&payload_len.to_be_bytes());
        bytes[ENCODED_PAYLOAD_HEADER_LEN_BYTES..ENCODED_PAYLOAD_HEADER_LEN_BYTES + padded.len()]
            .copy_from_slice(&padded);

        Ok(Self { bytes })
    }

    /// Builds an encoded payload from the field elements of a blob in
    /// evaluation form.
    pub fn from_field_elements(elements: &[Fr]) -> Result<Self, CodecError> {
        let bytes = helpers::to_byte_array(elements, elements.len() * BYTES_PER_FIELD_ELEMENT);
        Self::new(bytes)
    }

    /// Validates the header and strips all encoding, returning the original
    /// payload.
    pub fn decode(&self) -> Result<Payload, CodecError> {
        if self.bytes[0] != 0x00 {
            return Err(CodecError::InvalidHeader(format!(
                "first byte must be 0x00, got {:#04x}",
                self.bytes[0]
            )));
        }
        let version = self.bytes[1];
        if version != PAYLOAD_ENCODING_VERSION_0 {
            return Err(CodecError::UnsupportedEncodingVersion(version));
        }

        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&self.bytes[2..6]);
        let claimed = u32::from_be_bytes(len_bytes) as usize;

        let unpadded =
            helpers::remove_internal_padding(&self.bytes[ENCODED_PAYLOAD_HEADER_LEN_BYTES..])?;
        if unpadded.len() < claimed {
            return Err(CodecError::LengthMismatch {
                claimed,
                available: unpadded.len(),
            });
        }

        Ok(Payload::new(unpadded[..claimed].to_vec()))
    }

    /// Interprets the encoded bytes as field elements, rejecting any that are
    /// not canonical.
    pub fn to_field_elements(&self) -> Result<Vec<Fr>, CodecError> {
        Ok(helpers::to_fr_array(&self.bytes)?)
    }

    pub fn len_symbols(&self) -> usize {
        self.bytes.len().div_ceil(BYTES_PER_SYMBOL)
    }

    pub fn serialize(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let payload = Payload::new(vec![7u8; 40]);
        let encoded = payload.to_encoded_payload().unwrap();
        let bytes = encoded.serialize();

        assert_eq!(bytes[0], 0x00);
        assert_eq!(bytes[1], PAYLOAD_ENCODING_VERSION_0);
        assert_eq!(&bytes[2..6], &40u32.to_be_bytes());
        assert!(bytes[6..32].iter().all(|b| *b == 0));
        // header + 2 padded symbols = 3 symbols, rounded to 4
        assert_eq!(encoded.len_symbols(), 4);
    }

    #[test]
    fn test_decode_rejects_short_body() {
        let mut bytes = vec![0u8; 64];
        bytes[2..6].copy_from_slice(&100u32.to_be_bytes());
        let encoded = EncodedPayload::new(bytes).unwrap();
        assert_eq!(
            encoded.decode().unwrap_err(),
            CodecError::LengthMismatch {
                claimed: 100,
                available: 31
            }
        );
    }

    #[test]
    fn test_decode_rejects_unknown_version() {
        let mut bytes = vec![0u8; 32];
        bytes[1] = 1;
        let encoded = EncodedPayload::new(bytes).unwrap();
        assert_eq!(
            encoded.decode().unwrap_err(),
            CodecError::UnsupportedEncodingVersion(1)
        );
    }

    #[test]
    fn test_new_rejects_short_input() {
        assert_eq!(
            EncodedPayload::new(vec![0u8; 31]).unwrap_err(),
            CodecError::InputTooShort { len: 31, min: 32 }
        );
    }
}
