//! Coupled convex regularization of a cost volume.
//!
//! Each round solves, independently per cell, the discrete problem
//!
//! `min_k  C(x, k) + alpha * |v_k - u(x)|^2`
//!
//! where `v_k` is the lattice offset of label `k` and `u` the current soft
//! field, then recomputes `u` as the 3x3x3 box average of the selected
//! offsets. The coupling weight `alpha` grows over a fixed schedule, so
//! late rounds are dominated by the smoothness term.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use mindreg_core::filter::BoxFilter;
use mindreg_core::DisplacementField;

use crate::config::DEFAULT_COUPLING_SCHEDULE;
use crate::correlation::{CostVolume, LabelField};
use crate::error::{RegistrationError, Result};
use crate::progress::{ProgressTracker, Stage};

/// Coupled convex solver.
///
/// Runs exactly one round per schedule entry; there is no convergence test.
#[derive(Clone)]
pub struct CoupledConvexSolver {
    schedule: Vec<f32>,
    progress: Option<ProgressTracker>,
}

impl std::fmt::Debug for CoupledConvexSolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoupledConvexSolver")
            .field("schedule", &self.schedule)
            .finish()
    }
}

impl Default for CoupledConvexSolver {
    fn default() -> Self {
        Self::with_default_schedule()
    }
}

impl CoupledConvexSolver {
    /// Create a solver with an explicit coupling schedule.
    pub fn new(schedule: Vec<f32>) -> Self {
        Self {
            schedule,
            progress: None,
        }
    }

    /// Solver with the default six-round schedule.
    pub fn with_default_schedule() -> Self {
        Self::new(DEFAULT_COUPLING_SCHEDULE.to_vec())
    }

    /// Report each round to a progress tracker.
    pub fn with_progress(mut self, progress: ProgressTracker) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn schedule(&self) -> &[f32] {
        &self.schedule
    }

    /// Regularize the labels of a cost volume.
    ///
    /// Consumes the cost volume so its memory is released once the field is
    /// computed. Returns the soft field in grid cells, `[3, H, W, D]`.
    pub fn solve<B: Backend>(&self, cost: CostVolume<B>, initial: &LabelField<B>) -> Result<DisplacementField<B>> {
        let shape = cost.shape();
        if initial.shape() != shape {
            return Err(RegistrationError::shape_mismatch(&shape, &initial.shape()));
        }
        if self.schedule.is_empty() {
            return Err(RegistrationError::invalid_configuration(
                "Coupling schedule must contain at least one coefficient",
            ));
        }

        let [h, w, d] = shape;
        let device = cost.data().device();
        let labels = cost.lattice().len();
        let coordinates = cost.lattice().coordinates::<B>(&device);
        let candidates = coordinates.clone().reshape([3, labels, 1]);
        let smoother = BoxFilter::new(1);

        let mut soft = smoother.apply(initial.displacements(&coordinates));

        for (round, &alpha) in self.schedule.iter().enumerate() {
            let mut rows = Vec::with_capacity(h);
            for i in 0..h {
                let current = soft.clone().narrow(1, i, 1).reshape([3, 1, w * d]);
                let penalty = (candidates.clone() - current)
                    .powf_scalar(2.0)
                    .sum_dim(0)
                    .reshape([labels, 1, w, d]);
                let coupled = cost.row(i) + penalty.mul_scalar(alpha);
                rows.push(coupled.argmin(0));
            }

            let refined = LabelField::new(Tensor::cat(rows, 1).reshape([h, w, d]));
            soft = smoother.apply(refined.displacements(&coordinates));

            tracing::debug!("Coupled convex round {}/{} (alpha = {})", round + 1, self.schedule.len(), alpha);
            if let Some(progress) = &self.progress {
                progress.update(
                    Stage::CoupledConvex,
                    round + 1,
                    Some(self.schedule.len()),
                    &[("alpha", alpha as f64)],
                );
            }
        }

        Ok(DisplacementField::new(soft))
    }
}
