use ark_bn254::{Fr, G1Affine, G1Projective};
use ark_ec::{CurveGroup, VariableBaseMSM};
use ark_poly::{EvaluationDomain, GeneralEvaluationDomain};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use rust_eigenda_primitives::{
    blob::Blob,
    polynomial::{PolynomialCoeffForm, PolynomialEvalForm},
};

use crate::{errors::KzgError, srs::SRS};

/// [KZG] computes commitments to blobs against the SRS points in monomial
/// form, either from a [PolynomialCoeffForm], a [PolynomialEvalForm], raw
/// blob bytes, or a [Blob].
#[derive(Debug, Default, PartialEq, Clone)]
pub struct KZG;

impl KZG {
    pub fn new() -> Self {
        Self
    }

    fn check_capacity(len: usize, srs: &SRS) -> Result<(), KzgError> {
        if len > srs.g1.len() {
            return Err(KzgError::SrsCapacityExceeded {
                polynomial_len: len,
                srs_len: srs.g1.len(),
            });
        }
        Ok(())
    }

    /// Commit the polynomial with the srs values loaded into [KZG].
    pub fn commit_eval_form(
        &self,
        polynomial: &PolynomialEvalForm,
        srs: &SRS,
    ) -> Result<G1Affine, KzgError> {
        Self::check_capacity(polynomial.len(), srs)?;

        // When the polynomial is in evaluation form, use IFFT to transform monomial srs
        // points to lagrange form.
        let bases = self.g1_ifft(polynomial.len(), srs)?;

        match G1Projective::msm(&bases, polynomial.evaluations()) {
            Ok(res) => Ok(res.into_affine()),
            Err(err) => Err(KzgError::CommitError(format!(
                "msm length mismatch at {}",
                err
            ))),
        }
    }

    /// Commit the polynomial with the srs values loaded into [KZG].
    pub fn commit_coeff_form(
        &self,
        polynomial: &PolynomialCoeffForm,
        srs: &SRS,
    ) -> Result<G1Affine, KzgError> {
        Self::check_capacity(polynomial.len(), srs)?;

        // When the polynomial is in coefficient form, use the original srs points (in
        // monomial form).
        let bases = &srs.g1[..polynomial.len()];

        match G1Projective::msm(bases, polynomial.coeffs()) {
            Ok(res) => Ok(res.into_affine()),
            Err(err) => Err(KzgError::CommitError(format!(
                "msm length mismatch at {}",
                err
            ))),
        }
    }

    /// Commits to serialized blob bytes. The bytes are the coefficients of
    /// the blob polynomial, 32 big-endian bytes each, and must all be
    /// canonical field elements.
    pub fn commit_blob_bytes(&self, bytes: &[u8], srs: &SRS) -> Result<G1Affine, KzgError> {
        let polynomial = PolynomialCoeffForm::from_bytes_be(bytes)?;
        self.commit_coeff_form(&polynomial, srs)
    }

    /// Commits to the bytes a [Blob] is dispersed as.
    pub fn commit_blob(&self, blob: &Blob, srs: &SRS) -> Result<G1Affine, KzgError> {
        self.commit_blob_bytes(&blob.get_bytes(), srs)
    }

    /// function to compute the inverse FFT
    pub fn g1_ifft(&self, length: usize, srs: &SRS) -> Result<Vec<G1Affine>, KzgError> {
        // is not power of 2
        if !length.is_power_of_two() {
            return Err(KzgError::FFTError(
                "length provided is not a power of 2".to_string(),
            ));
        }
        Self::check_capacity(length, srs)?;

        let points_projective: Vec<G1Projective> = srs.g1[..length]
            .par_iter()
            .map(|&p| G1Projective::from(p))
            .collect();
        let ifft_result: Vec<_> = GeneralEvaluationDomain::<Fr>::new(length)
            .ok_or(KzgError::FFTError(
                "Could not perform IFFT due to domain consturction error".to_string(),
            ))?
            .ifft(&points_projective)
            .par_iter()
            .map(|p| p.into_affine())
            .collect();

        Ok(ifft_result)
    }
}
