//! Symmetric inverse-consistency correction of a forward/backward pair.

use burn::tensor::backend::Backend;
use mindreg_core::interpolation::LinearInterpolator;
use mindreg_core::DisplacementField;

use crate::config::DEFAULT_INVERSE_CONSISTENCY_ITERATIONS;
use crate::error::Result;
use crate::metric::inverse_consistency_residual;
use crate::progress::{ProgressTracker, Stage};
use crate::validation::validate_field_shapes;

/// Jacobi-style inverse-consistency corrector.
///
/// Each iteration replaces both fields at once, using only the previous
/// pair:
///
/// ```text
/// f' = (f - b o (id + f)) / 2
/// b' = (b - f o (id + b)) / 2
/// ```
///
/// A pair of exact inverses is a fixed point. Compositions use trilinear
/// sampling with border clamping.
#[derive(Clone)]
pub struct InverseConsistencyCorrector {
    iterations: usize,
    progress: Option<ProgressTracker>,
}

impl Default for InverseConsistencyCorrector {
    fn default() -> Self {
        Self::new(DEFAULT_INVERSE_CONSISTENCY_ITERATIONS)
    }
}

impl std::fmt::Debug for InverseConsistencyCorrector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InverseConsistencyCorrector")
            .field("iterations", &self.iterations)
            .finish()
    }
}

impl InverseConsistencyCorrector {
    pub fn new(iterations: usize) -> Self {
        Self {
            iterations,
            progress: None,
        }
    }

    /// Report the residual after every iteration.
    pub fn with_progress(mut self, progress: ProgressTracker) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Correct the pair. Both fields must share one grid.
    pub fn correct<B: Backend>(
        &self,
        forward: DisplacementField<B>,
        backward: DisplacementField<B>,
    ) -> Result<(DisplacementField<B>, DisplacementField<B>)> {
        validate_field_shapes(&forward, &backward)?;

        let interpolator = LinearInterpolator::new();
        let mut forward = forward;
        let mut backward = backward;

        for iteration in 0..self.iterations {
            let pulled_backward = forward.warp(backward.data(), &interpolator);
            let pulled_forward = backward.warp(forward.data(), &interpolator);

            let next_forward = (forward.data().clone() - pulled_backward).mul_scalar(0.5);
            let next_backward = (backward.data().clone() - pulled_forward).mul_scalar(0.5);
            forward = DisplacementField::new(next_forward);
            backward = DisplacementField::new(next_backward);

            if let Some(progress) = self.progress.as_ref().filter(|p| !p.is_empty()) {
                let residual = inverse_consistency_residual(&forward, &backward)?;
                tracing::debug!(
                    "Inverse consistency iteration {}/{}: residual {:.6}",
                    iteration + 1,
                    self.iterations,
                    residual
                );
                progress.update(
                    Stage::InverseConsistency,
                    iteration + 1,
                    Some(self.iterations),
                    &[("residual", residual as f64)],
                );
            }
        }

        Ok((forward, backward))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistrationError;
    use burn::tensor::{Shape, Tensor, TensorData};
    use burn_ndarray::NdArray;

    type Backend = NdArray<f32>;

    fn constant_field(shape: [usize; 3], t: [f32; 3]) -> DisplacementField<Backend> {
        let device = Default::default();
        let n: usize = shape.iter().product();
        let mut values = Vec::with_capacity(3 * n);
        for c in 0..3 {
            values.extend(std::iter::repeat(t[c]).take(n));
        }
        DisplacementField::new(Tensor::from_data(
            TensorData::new(values, Shape::new([3, shape[0], shape[1], shape[2]])),
            &device,
        ))
    }

    /// `t + 0.3 * sin(...)`, a smooth perturbation of a constant shift.
    fn perturbed_field(shape: [usize; 3], t: [f32; 3]) -> DisplacementField<Backend> {
        let device = Default::default();
        let [h, w, d] = shape;
        let mut values = Vec::with_capacity(3 * h * w * d);
        for c in 0..3 {
            for i in 0..h {
                for j in 0..w {
                    for k in 0..d {
                        let phase = 0.5 * i as f32 + 0.3 * j as f32 + 0.2 * k as f32 + c as f32;
                        values.push(t[c] + 0.3 * phase.sin());
                    }
                }
            }
        }
        DisplacementField::new(Tensor::from_data(TensorData::new(values, Shape::new([3, h, w, d])), &device))
    }

    #[test]
    fn test_exact_inverses_are_a_fixed_point() {
        let t = [1.5, -0.5, 2.0];
        let forward = constant_field([6, 7, 8], t);
        let backward = constant_field([6, 7, 8], t.map(|v| -v));

        let (f, b) = InverseConsistencyCorrector::new(3)
            .correct(forward.clone(), backward.clone())
            .unwrap();
        let df = (f.into_data() - forward.into_data()).abs().max().into_scalar();
        let db = (b.into_data() - backward.into_data()).abs().max().into_scalar();
        assert!(df < 1e-5);
        assert!(db < 1e-5);
    }

    #[test]
    fn test_residual_decreases() {
        let shape = [12, 12, 12];
        let t = [1.0, 0.5, -1.0];
        let forward = perturbed_field(shape, t);
        let backward = constant_field(shape, t.map(|v| -v));
        let initial = inverse_consistency_residual(&forward, &backward).unwrap();

        let mut previous = initial;
        for iterations in 1..=5 {
            let (f, b) = InverseConsistencyCorrector::new(iterations)
                .correct(forward.clone(), backward.clone())
                .unwrap();
            let residual = inverse_consistency_residual(&f, &b).unwrap();
            assert!(
                residual < previous,
                "iteration {iterations}: {residual} not below {previous}"
            );
            previous = residual;
        }
        assert!(previous < 0.5 * initial, "{previous} vs {initial}");
    }

    #[test]
    fn test_zero_iterations_is_identity() {
        let forward = perturbed_field([5, 5, 5], [0.0; 3]);
        let backward = constant_field([5, 5, 5], [0.2, 0.0, 0.0]);
        let (f, b) = InverseConsistencyCorrector::new(0)
            .correct(forward.clone(), backward.clone())
            .unwrap();
        assert_eq!(f.into_data().into_data(), forward.into_data().into_data());
        assert_eq!(b.into_data().into_data(), backward.into_data().into_data());
    }

    #[test]
    fn test_mismatched_grids_are_rejected() {
        let forward = constant_field([4, 4, 4], [0.0; 3]);
        let backward = constant_field([4, 4, 5], [0.0; 3]);
        assert!(matches!(
            InverseConsistencyCorrector::default().correct(forward, backward),
            Err(RegistrationError::ShapeMismatch { .. })
        ));
    }
}
