//! Generic blob codecs.
//!
//! These predate [crate::encoded_payload::EncodedPayload] and frame the data
//! with a header that carries a 64 bit length:
//! ```text
//! [0x00, version, len_be[0..8], 0x00 ... 0x00] ++ pad(data)
//! ```

use serde::{Deserialize, Serialize};

use crate::{
    consts::ENCODED_PAYLOAD_HEADER_LEN_BYTES,
    errors::CodecError,
    helpers,
    polynomial::{PolynomialCoeffForm, PolynomialEvalForm},
    PolynomialForm,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum BlobEncodingVersion {
    /// Header followed by internally padded data.
    #[default]
    Default = 0,
}

impl TryFrom<u8> for BlobEncodingVersion {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(BlobEncodingVersion::Default),
            v => Err(CodecError::UnsupportedEncodingVersion(v)),
        }
    }
}

pub trait BlobCodec: Send + Sync {
    fn encode_blob(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;
    fn decode_blob(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultBlobCodec;

impl BlobCodec for DefaultBlobCodec {
    fn encode_blob(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let padded = helpers::pad_payload(data);

        let mut encoded = Vec::with_capacity(ENCODED_PAYLOAD_HEADER_LEN_BYTES + padded.len());
        encoded.extend_from_slice(&[0u8; ENCODED_PAYLOAD_HEADER_LEN_BYTES]);
        encoded[1] = BlobEncodingVersion::Default as u8;
        encoded[2..10].copy_from_slice(&(data.len() as u64).to_be_bytes());
        encoded.extend_from_slice(&padded);

        Ok(encoded)
    }

    fn decode_blob(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        if data.len() < ENCODED_PAYLOAD_HEADER_LEN_BYTES {
            return Err(CodecError::InputTooShort {
                len: data.len(),
                min: ENCODED_PAYLOAD_HEADER_LEN_BYTES,
            });
        }
        if data[0] != 0x00 {
            return Err(CodecError::InvalidHeader(format!(
                "first byte must be 0x00, got {:#04x}",
                data[0]
            )));
        }
        BlobEncodingVersion::try_from(data[1])?;

        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&data[2..10]);
        let claimed = u64::from_be_bytes(len_bytes);

        let content = helpers::remove_internal_padding(&data[ENCODED_PAYLOAD_HEADER_LEN_BYTES..])?;
        if claimed > content.len() as u64 {
            return Err(CodecError::LengthMismatch {
                claimed: usize::try_from(claimed).unwrap_or(usize::MAX),
                available: content.len(),
            });
        }

        Ok(content[..claimed as usize].to_vec())
    }
}

/// Encodes with the wrapped codec and then IFFTs, so the dispersed blob holds
/// the coefficients of the polynomial whose evaluations are the data.
pub struct IfftBlobCodec {
    inner: Box<dyn BlobCodec>,
}

impl IfftBlobCodec {
    pub fn new(inner: Box<dyn BlobCodec>) -> Self {
        Self { inner }
    }
}

impl BlobCodec for IfftBlobCodec {
    fn encode_blob(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let encoded = self.inner.encode_blob(data)?;
        let evals = PolynomialEvalForm::from_bytes_be(&encoded)?;
        let coeffs = evals.to_coeff_form(evals.len())?;
        Ok(coeffs.to_bytes_be())
    }

    fn decode_blob(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let coeffs = PolynomialCoeffForm::from_bytes_be(data)?;
        let evals = coeffs.to_eval_form(coeffs.len())?;
        self.inner.decode_blob(&evals.to_bytes_be())
    }
}

/// Passes data straight through to the wrapped codec.
pub struct NoIfftCodec {
    inner: Box<dyn BlobCodec>,
}

impl NoIfftCodec {
    pub fn new(inner: Box<dyn BlobCodec>) -> Self {
        Self { inner }
    }
}

impl BlobCodec for NoIfftCodec {
    fn encode_blob(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        self.inner.encode_blob(data)
    }

    fn decode_blob(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        self.inner.decode_blob(data)
    }
}

pub fn codec_for_version(version: BlobEncodingVersion) -> Box<dyn BlobCodec> {
    match version {
        BlobEncodingVersion::Default => Box::new(DefaultBlobCodec),
    }
}

/// Data in evaluation form must be IFFTed before dispersal; data already in
/// coefficient form is dispersed as is.
pub fn codec_for_form(version: BlobEncodingVersion, form: PolynomialForm) -> Box<dyn BlobCodec> {
    let inner = codec_for_version(version);
    match form {
        PolynomialForm::Eval => Box::new(IfftBlobCodec::new(inner)),
        PolynomialForm::Coeff => Box::new(NoIfftCodec::new(inner)),
    }
}
