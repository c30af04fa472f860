//! Label overlap.

use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor};
use mindreg_core::interpolation::NearestNeighborInterpolator;
use mindreg_core::DisplacementField;

use super::trait_::{warp_scalar, Metric};
use crate::error::{RegistrationError, Result};

const DICE_EPSILON: f32 = 1e-8;

/// Dice overlap per label `1..=max_label` of two label volumes.
///
/// Labels are non-negative integers stored as floats; 0 is background.
/// `max_label` is the largest label found in either volume, and a label
/// absent from both scores 0.
pub fn dice_scores<B: Backend>(a: &Tensor<B, 3>, b: &Tensor<B, 3>) -> Result<Vec<f32>> {
    if a.dims() != b.dims() {
        return Err(RegistrationError::shape_mismatch(&a.dims(), &b.dims()));
    }

    let max_a = a.clone().max().into_scalar().elem::<f32>();
    let max_b = b.clone().max().into_scalar().elem::<f32>();
    let max_label = max_a.max(max_b).round();
    if !max_label.is_finite() {
        return Err(RegistrationError::numerical_instability("Label volume contains non-finite values"));
    }

    let mut scores = Vec::new();
    for label in 1..=(max_label.max(0.0) as usize) {
        let in_a = a.clone().equal_elem(label as f32).float();
        let in_b = b.clone().equal_elem(label as f32).float();
        let overlap = (in_a.clone() * in_b.clone()).mean().into_scalar().elem::<f32>();
        let size_a = in_a.mean().into_scalar().elem::<f32>();
        let size_b = in_b.mean().into_scalar().elem::<f32>();
        scores.push(2.0 * overlap / (DICE_EPSILON + size_a + size_b));
    }
    Ok(scores)
}

/// One minus the mean Dice overlap of the fixed labels and the moving
/// labels warped with nearest-neighbour sampling.
#[derive(Debug, Clone, Default)]
pub struct DiceOverlap {
    interpolator: NearestNeighborInterpolator,
}

impl DiceOverlap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mean Dice overlap after warping; 1 when neither volume has a label.
    pub fn evaluate<B: Backend>(
        &self,
        fixed: &Tensor<B, 3>,
        moving: &Tensor<B, 3>,
        field: &DisplacementField<B>,
    ) -> Result<f32> {
        if fixed.dims() != field.shape() {
            return Err(RegistrationError::shape_mismatch(&fixed.dims(), &field.shape()));
        }
        let warped = warp_scalar(moving, field, &self.interpolator);
        let scores = dice_scores(fixed, &warped)?;
        if scores.is_empty() {
            return Ok(1.0);
        }
        Ok(scores.iter().sum::<f32>() / scores.len() as f32)
    }
}

impl<B: Backend> Metric<B> for DiceOverlap {
    /// # Panics
    /// If the fixed volume and the field have different shapes, or a label
    /// volume holds non-finite values. Use [`DiceOverlap::evaluate`] to get
    /// these as errors.
    fn forward(&self, fixed: &Tensor<B, 3>, moving: &Tensor<B, 3>, field: &DisplacementField<B>) -> Tensor<B, 1> {
        let mean = self
            .evaluate(fixed, moving, field)
            .unwrap_or_else(|err| panic!("Dice overlap failed: {err}"));
        Tensor::from_floats([1.0 - mean], &fixed.device())
    }

    fn name(&self) -> &'static str {
        "DiceOverlap"
    }
}
