use ark_bn254::G1Affine;

use crate::errors::KzgError;

/// Represents the Structured Reference String (SRS) used in KZG commitments.
#[derive(Debug, PartialEq, Clone)]
pub struct SRS {
    // SRS points are stored in monomial form, ready to be used for commitments with polynomials
    // in coefficient form. To commit against a polynomial in evaluation form, we need to transform
    // the SRS points to lagrange form using IFFT.
    pub g1: Vec<G1Affine>,
    /// The order of the SRS.
    pub order: u32,
}

impl SRS {
    /// Builds an SRS from G1 points already held in memory.
    ///
    /// # Arguments
    ///
    /// * `g1` - The monomial G1 points `[tau^i]_1`, starting at `i = 0`.
    /// * `order` - The total order of the SRS the points were taken from.
    ///
    /// Every point must be on the curve and in the prime order subgroup.
    pub fn from_points(g1: Vec<G1Affine>, order: u32) -> Result<Self, KzgError> {
        if g1.len() > order as usize {
            return Err(KzgError::GenericError(
                "Number of points to load exceeds SRS order.".to_string(),
            ));
        }

        if let Some(index) = g1.iter().position(|p| {
            !p.is_on_curve() || !p.is_in_correct_subgroup_assuming_on_curve()
        }) {
            return Err(KzgError::InvalidSrsPoint(index));
        }

        Ok(Self { g1, order })
    }

    /// Number of points available for commitments.
    pub fn len(&self) -> usize {
        self.g1.len()
    }

    pub fn is_empty(&self) -> bool {
        self.g1.is_empty()
    }
}
