use ark_bn254::Fr;
use ark_poly::{EvaluationDomain, GeneralEvaluationDomain};
use ark_std::Zero;

use crate::{
    consts::{BYTES_PER_FIELD_ELEMENT, MAX_POLYNOMIAL_SIZE},
    errors::PolynomialError,
    helpers,
};

fn pad_to_power_of_two(mut elements: Vec<Fr>) -> Result<Vec<Fr>, PolynomialError> {
    if elements.len() > MAX_POLYNOMIAL_SIZE {
        return Err(PolynomialError::GenericError(
            "Input size exceeds maximum polynomial size".to_string(),
        ));
    }
    let size = elements.len().next_power_of_two();
    elements.resize(size, Fr::zero());
    Ok(elements)
}

/// Size of the FFT domain used when converting a polynomial of `len`
/// elements that belongs to a blob of `blob_length_symbols` symbols.
fn domain_size(len: usize, blob_length_symbols: usize) -> usize {
    len.max(blob_length_symbols).next_power_of_two()
}

fn domain(size: usize) -> Result<GeneralEvaluationDomain<Fr>, PolynomialError> {
    GeneralEvaluationDomain::<Fr>::new(size).ok_or(PolynomialError::FFTError(format!(
        "Failed to construct domain of size {}",
        size
    )))
}

#[derive(Clone, Debug, PartialEq)]
pub struct PolynomialEvalForm {
    /// evaluations contains the evaluations of the polynomial, padded with 0s
    /// to the next power of two. Hence if the polynomial is created with
    /// evaluations [1, 2, 3], the internal representation will be [1, 2, 3, 0].
    evaluations: Vec<Fr>,
}

impl PolynomialEvalForm {
    /// Creates a new [PolynomialEvalForm] from the given evaluations. The
    /// evaluations are padded to the next power of two by appending zeros.
    pub fn new(evals: Vec<Fr>) -> Result<Self, PolynomialError> {
        Ok(Self {
            evaluations: pad_to_power_of_two(evals)?,
        })
    }

    /// Interprets `bytes` as big-endian field elements, 32 bytes each. Every
    /// element must be canonical; nothing is reduced modulo the field order.
    pub fn from_bytes_be(bytes: &[u8]) -> Result<Self, PolynomialError> {
        Self::new(helpers::to_fr_array(bytes)?)
    }

    pub fn evaluations(&self) -> &[Fr] {
        &self.evaluations
    }

    /// Returns the number of evaluations in the padded polynomial.
    pub fn len(&self) -> usize {
        self.evaluations.len()
    }

    pub fn get_evaluation(&self, i: usize) -> Option<&Fr> {
        self.evaluations.get(i)
    }

    pub fn is_empty(&self) -> bool {
        self.evaluations.is_empty()
    }

    /// Converts all `Fr` elements in the polynomial to a single big-endian byte vector.
    pub fn to_bytes_be(&self) -> Vec<u8> {
        helpers::to_byte_array(
            &self.evaluations,
            self.evaluations.len() * BYTES_PER_FIELD_ELEMENT,
        )
    }

    /// Converts the polynomial to coefficient form with an IFFT.
    ///
    /// The domain has `next_pow2(max(len, blob_length_symbols))` points; the
    /// evaluations are zero-extended to that size first.
    pub fn to_coeff_form(
        &self,
        blob_length_symbols: usize,
    ) -> Result<PolynomialCoeffForm, PolynomialError> {
        let size = domain_size(self.len(), blob_length_symbols);
        let mut evals = self.evaluations.clone();
        evals.resize(size, Fr::zero());
        let coeffs = domain(size)?.ifft(&evals);
        PolynomialCoeffForm::new(coeffs)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PolynomialCoeffForm {
    /// coeffs contains the coefficients of the polynomial, padded with 0s to
    /// the next power of two.
    coeffs: Vec<Fr>,
}

impl PolynomialCoeffForm {
    /// Creates a new [PolynomialCoeffForm] from the given coefficients. The
    /// coefficients are padded to the next power of two by appending zeros.
    pub fn new(coeffs: Vec<Fr>) -> Result<Self, PolynomialError> {
        Ok(Self {
            coeffs: pad_to_power_of_two(coeffs)?,
        })
    }

    /// Interprets `bytes` as big-endian coefficients, 32 bytes each.
    pub fn from_bytes_be(bytes: &[u8]) -> Result<Self, PolynomialError> {
        Self::new(helpers::to_fr_array(bytes)?)
    }

    pub fn coeffs(&self) -> &[Fr] {
        &self.coeffs
    }

    /// Returns the number of coefficients in the padded polynomial.
    pub fn len(&self) -> usize {
        self.coeffs.len()
    }

    pub fn get_at_index(&self, i: usize) -> Option<&Fr> {
        self.coeffs.get(i)
    }

    pub fn is_empty(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// Converts all `Fr` elements in the `Polynomial` to a single byte vector.
    pub fn to_bytes_be(&self) -> Vec<u8> {
        helpers::to_byte_array(&self.coeffs, self.coeffs.len() * BYTES_PER_FIELD_ELEMENT)
    }

    /// Converts the polynomial to evaluation form with an FFT over a domain of
    /// `next_pow2(max(len, blob_length_symbols))` points.
    pub fn to_eval_form(
        &self,
        blob_length_symbols: usize,
    ) -> Result<PolynomialEvalForm, PolynomialError> {
        let size = domain_size(self.len(), blob_length_symbols);
        let mut coeffs = self.coeffs.clone();
        coeffs.resize(size, Fr::zero());
        let evals = domain(size)?.fft(&coeffs);
        PolynomialEvalForm::new(evals)
    }
}
