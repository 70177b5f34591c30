use ark_bn254::Fr;
use ark_std::Zero;

use crate::{
    consts::BYTES_PER_SYMBOL,
    encoded_payload::EncodedPayload,
    errors::BlobError,
    helpers,
    payload::Payload,
    polynomial::{PolynomialCoeffForm, PolynomialEvalForm},
    PolynomialForm,
};

/// The data dispersed to, and retrieved from, the network.
///
/// A blob is held in exactly one representation: either the encoded payload
/// itself (the payload was treated as evaluations) or the coefficients
/// obtained by IFFTing the encoded payload.
#[derive(Clone, Debug, PartialEq)]
pub enum Blob {
    EncodedPayload(EncodedPayload),
    Coeff(PolynomialCoeffForm),
}

impl Blob {
    /// Builds a blob from its serialized bytes. `form` says how the payload
    /// was encoded before dispersal. Every 32 byte group must be a canonical
    /// field element.
    pub fn new(bytes: &[u8], form: PolynomialForm) -> Result<Self, BlobError> {
        let symbols = bytes.len().div_ceil(BYTES_PER_SYMBOL);
        Self::with_length(bytes, symbols, form)
    }

    /// Like [Blob::new], but zero-extends the blob to `blob_length_symbols`
    /// symbols. Trailing zero symbols may be dropped by whoever stores the
    /// blob, so the length recorded at dispersal is the one that counts.
    pub fn with_length(
        bytes: &[u8],
        blob_length_symbols: usize,
        form: PolynomialForm,
    ) -> Result<Self, BlobError> {
        let mut elements = helpers::to_fr_array(bytes)
            .map_err(|e| BlobError::InvalidBlobBytes(e.to_string()))?;
        if elements.len() < blob_length_symbols {
            elements.resize(blob_length_symbols, Fr::zero());
        }

        match form {
            PolynomialForm::Eval => {
                let encoded = EncodedPayload::from_field_elements(&elements)
                    .map_err(|e| BlobError::InvalidBlobBytes(e.to_string()))?;
                Ok(Blob::EncodedPayload(encoded))
            }
            PolynomialForm::Coeff => {
                let poly = PolynomialCoeffForm::new(elements)
                    .map_err(|e| BlobError::InvalidBlobBytes(e.to_string()))?;
                Ok(Blob::Coeff(poly))
            }
        }
    }

    /// Encodes `payload` and, for [PolynomialForm::Coeff], IFFTs it.
    pub fn from_payload(payload: &Payload, form: PolynomialForm) -> Result<Self, BlobError> {
        let encoded = payload.to_encoded_payload().map_err(BlobError::Encode)?;
        match form {
            PolynomialForm::Eval => Ok(Blob::EncodedPayload(encoded)),
            PolynomialForm::Coeff => {
                let evals = PolynomialEvalForm::from_bytes_be(encoded.serialize())
                    .map_err(BlobError::EncodedPayloadToCoeff)?;
                let coeffs = evals
                    .to_coeff_form(encoded.len_symbols())
                    .map_err(BlobError::EncodedPayloadToCoeff)?;
                Ok(Blob::Coeff(coeffs))
            }
        }
    }

    /// Recovers the payload held by the blob.
    pub fn to_payload(&self) -> Result<Payload, BlobError> {
        match self {
            Blob::EncodedPayload(encoded) => encoded.decode().map_err(BlobError::Decode),
            Blob::Coeff(coeffs) => {
                let evals = coeffs
                    .to_eval_form(coeffs.len())
                    .map_err(BlobError::CoeffToEval)?;
                let encoded = EncodedPayload::from_field_elements(evals.evaluations())
                    .map_err(BlobError::EvalToEncodedPayload)?;
                encoded.decode().map_err(BlobError::Decode)
            }
        }
    }

    /// Returns the bytes of whichever representation the blob holds.
    pub fn get_bytes(&self) -> Vec<u8> {
        match self {
            Blob::EncodedPayload(encoded) => encoded.serialize().to_vec(),
            Blob::Coeff(coeffs) => coeffs.to_bytes_be(),
        }
    }

    pub fn len_symbols(&self) -> usize {
        match self {
            Blob::EncodedPayload(encoded) => encoded.len_symbols(),
            Blob::Coeff(coeffs) => coeffs.len(),
        }
    }

    pub fn polynomial_form(&self) -> PolynomialForm {
        match self {
            Blob::EncodedPayload(_) => PolynomialForm::Eval,
            Blob::Coeff(_) => PolynomialForm::Coeff,
        }
    }
}

impl From<EncodedPayload> for Blob {
    fn from(encoded: EncodedPayload) -> Self {
        Blob::EncodedPayload(encoded)
    }
}

impl From<PolynomialCoeffForm> for Blob {
    fn from(coeffs: PolynomialCoeffForm) -> Self {
        Blob::Coeff(coeffs)
    }
}
