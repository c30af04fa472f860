//! Configuration of the convex registration pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{RegistrationError, Result};

/// Coupling coefficients of the coupled convex rounds, weakest first.
pub const DEFAULT_COUPLING_SCHEDULE: [f32; 6] = [0.003, 0.01, 0.03, 0.1, 0.3, 1.0];

/// Fixed-point iterations of the inverse-consistency correction.
pub const DEFAULT_INVERSE_CONSISTENCY_ITERATIONS: usize = 5;

/// Trimming rounds of the least-trimmed rigid fit.
pub const DEFAULT_RIGID_ROUNDS: usize = 15;

/// Grid points evaluated per batch by the thin-plate spline.
pub const DEFAULT_TPS_CHUNK: usize = 4096;

/// Configuration for [`ConvexRegistration`](crate::registration::ConvexRegistration).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvexRegistrationConfig {
    /// Descriptor patch radius.
    pub mind_radius: usize,
    /// Descriptor sampling dilation.
    pub mind_dilation: usize,
    /// Downsampling factor between the volumes and the displacement grid.
    pub grid_spacing: usize,
    /// Half-width of the displacement lattice, in grid cells.
    pub disp_hw: usize,
    /// Coupling coefficient of each coupled convex round.
    pub coupling_schedule: Vec<f32>,
    /// Inverse-consistency iterations; 0 skips the backward registration.
    pub inverse_consistency_iterations: usize,
    /// Least-trimmed rounds of the rigid fit.
    pub rigid_rounds: usize,
    /// Intensity above which a voxel is foreground; `None` keeps the whole grid.
    pub foreground_threshold: Option<f32>,
    /// Weight of the squared offset length added to the cost before argmin.
    pub tie_break_epsilon: f32,
    /// Reject non-finite input volumes.
    pub check_finite: bool,
}

impl Default for ConvexRegistrationConfig {
    fn default() -> Self {
        Self {
            mind_radius: 2,
            mind_dilation: 2,
            grid_spacing: 4,
            disp_hw: 4,
            coupling_schedule: DEFAULT_COUPLING_SCHEDULE.to_vec(),
            inverse_consistency_iterations: DEFAULT_INVERSE_CONSISTENCY_ITERATIONS,
            rigid_rounds: DEFAULT_RIGID_ROUNDS,
            foreground_threshold: Some(0.0),
            tie_break_epsilon: 1e-6,
            check_finite: true,
        }
    }
}

impl ConvexRegistrationConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set descriptor radius and dilation.
    pub fn with_descriptor(mut self, radius: usize, dilation: usize) -> Self {
        self.mind_radius = radius;
        self.mind_dilation = dilation;
        self
    }

    /// Set the grid spacing.
    pub fn with_grid_spacing(mut self, grid_spacing: usize) -> Self {
        self.grid_spacing = grid_spacing;
        self
    }

    /// Set the displacement lattice half-width.
    pub fn with_disp_hw(mut self, disp_hw: usize) -> Self {
        self.disp_hw = disp_hw;
        self
    }

    /// Replace the coupling schedule.
    pub fn with_coupling_schedule(mut self, schedule: Vec<f32>) -> Self {
        self.coupling_schedule = schedule;
        self
    }

    /// Set the inverse-consistency iteration count.
    pub fn with_inverse_consistency_iterations(mut self, iterations: usize) -> Self {
        self.inverse_consistency_iterations = iterations;
        self
    }

    /// Set the rigid trimming rounds.
    pub fn with_rigid_rounds(mut self, rounds: usize) -> Self {
        self.rigid_rounds = rounds;
        self
    }

    /// Set or clear the foreground threshold.
    pub fn with_foreground_threshold(mut self, threshold: Option<f32>) -> Self {
        self.foreground_threshold = threshold;
        self
    }

    /// Set the argmin tie-break weight.
    pub fn with_tie_break_epsilon(mut self, epsilon: f32) -> Self {
        self.tie_break_epsilon = epsilon;
        self
    }

    /// Disable the finite-value check on the inputs.
    pub fn without_finite_check(mut self) -> Self {
        self.check_finite = false;
        self
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if self.grid_spacing == 0 {
            return Err(RegistrationError::invalid_configuration(
                "Grid spacing must be positive",
            ));
        }
        if self.mind_dilation == 0 {
            return Err(RegistrationError::invalid_configuration(
                "Descriptor dilation must be positive",
            ));
        }
        if self.coupling_schedule.is_empty() {
            return Err(RegistrationError::invalid_configuration(
                "Coupling schedule must contain at least one coefficient",
            ));
        }
        if let Some(c) = self.coupling_schedule.iter().find(|c| !c.is_finite() || **c < 0.0) {
            return Err(RegistrationError::invalid_configuration(format!(
                "Coupling coefficients must be finite and non-negative, got {}",
                c
            )));
        }
        if self.rigid_rounds == 0 {
            return Err(RegistrationError::invalid_configuration(
                "Rigid fit needs at least one round",
            ));
        }
        if !self.tie_break_epsilon.is_finite() || self.tie_break_epsilon < 0.0 {
            return Err(RegistrationError::invalid_configuration(format!(
                "Tie-break epsilon must be finite and non-negative, got {}",
                self.tie_break_epsilon
            )));
        }
        Ok(())
    }
}
