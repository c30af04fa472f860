//! End-to-end convex registration of two volumes.
//!
//! The pipeline runs, in order:
//!
//! 1. input validation (shapes, grid spacing, finiteness)
//! 2. MIND-SSC descriptors of both volumes, average-pooled onto the grid
//! 3. per direction: cost volume, foreground masking, argmin labels and
//!    coupled convex regularization
//! 4. inverse-consistency correction of the forward/backward pair
//! 5. upsampling of the grid field to full resolution
//! 6. a least-trimmed rigid fit of the dense field

use std::sync::Arc;
use std::time::Instant;

use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor};
use mindreg_core::filter::{foreground_mask, AveragePool};
use mindreg_core::interpolation::{LinearInterpolator, NearestNeighborInterpolator};
use mindreg_core::{DisplacementField, RigidTransform, Volume};
use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ConvexRegistrationConfig;
use crate::correlation::CostVolumeBuilder;
use crate::descriptor::MindSsc;
use crate::error::Result;
use crate::progress::{ProgressCallback, ProgressTracker, Stage};
use crate::regularization::{CoupledConvexSolver, InverseConsistencyCorrector};
use crate::rigid::{PointCorrespondenceSet, RobustRigidFitter};
use crate::validation::{validate_finite, validate_grid, validate_volume_shapes};

/// Resampling used when warping a volume through the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Interpolation {
    /// Nearest voxel, for label maps.
    Nearest,
    /// Trilinear.
    #[default]
    Linear,
}

/// Result of a registration.
///
/// All fields live on the fixed grid and are in voxel units, channel order
/// `(h, w, d)`: fixed voxel `x` corresponds to moving voxel `x + u(x)`.
#[derive(Debug, Clone)]
pub struct RegistrationOutput<B: Backend> {
    displacement: DisplacementField<B>,
    backward: Option<DisplacementField<B>>,
    rigid: RigidTransform,
    fixed_affine: Matrix4<f64>,
    moving_affine: Matrix4<f64>,
}

impl<B: Backend> RegistrationOutput<B> {
    /// Dense forward field at full resolution, `[3, H, W, D]`.
    pub fn displacement(&self) -> &DisplacementField<B> {
        &self.displacement
    }

    /// Backward field at full resolution, present when inverse consistency ran.
    pub fn backward_displacement(&self) -> Option<&DisplacementField<B>> {
        self.backward.as_ref()
    }

    /// Forward field in channel-last layout, `[H, W, D, 3]`.
    pub fn displacement_channels_last(&self) -> Tensor<B, 4> {
        self.displacement.to_channels_last()
    }

    /// Rigid transform mapping fixed voxel coordinates to moving voxel
    /// coordinates.
    pub fn rigid(&self) -> &RigidTransform {
        &self.rigid
    }

    /// The rigid transform expressed between the two world spaces, or
    /// `None` when the fixed affine is not invertible.
    pub fn rigid_world_matrix(&self) -> Option<Matrix4<f64>> {
        self.rigid.to_world(&self.fixed_affine, &self.moving_affine)
    }

    /// The rigid transform as a dense field on the fixed grid.
    pub fn rigid_displacement(&self) -> DisplacementField<B> {
        self.rigid
            .to_displacement_field(self.displacement.shape(), &self.displacement.device())
    }

    /// Resample the moving volume onto the fixed grid through the dense field.
    pub fn warp_moving(&self, moving: &Volume<B>, interpolation: Interpolation) -> Tensor<B, 3> {
        let [h, w, d] = moving.shape();
        let data = moving.data().clone().reshape([1, h, w, d]);
        let warped = match interpolation {
            Interpolation::Nearest => self.displacement.warp(&data, &NearestNeighborInterpolator::new()),
            Interpolation::Linear => self.displacement.warp(&data, &LinearInterpolator::new()),
        };
        let [fh, fw, fd] = self.displacement.shape();
        warped.reshape([fh, fw, fd])
    }
}

/// Training-free deformable and rigid registration.
///
/// # Examples
/// ```rust,no_run
/// use burn::tensor::Tensor;
/// use burn_ndarray::NdArray;
/// use mindreg_core::Volume;
/// use mindreg_registration::{ConvexRegistration, ConvexRegistrationConfig};
///
/// type Backend = NdArray<f32>;
///
/// let device = Default::default();
/// let fixed = Volume::<Backend>::from_data(Tensor::zeros([32, 32, 32], &device));
/// let moving = fixed.clone();
///
/// let config = ConvexRegistrationConfig::default().with_grid_spacing(2);
/// let output = ConvexRegistration::new(config).execute(&fixed, &moving)?;
/// let field = output.displacement_channels_last();
/// # Ok::<(), mindreg_registration::RegistrationError>(())
/// ```
#[derive(Clone)]
pub struct ConvexRegistration {
    config: ConvexRegistrationConfig,
    progress: ProgressTracker,
}

impl ConvexRegistration {
    pub fn new(config: ConvexRegistrationConfig) -> Self {
        Self {
            config,
            progress: ProgressTracker::new(),
        }
    }

    /// Register a progress callback.
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress.add_callback(callback);
        self
    }

    pub fn config(&self) -> &ConvexRegistrationConfig {
        &self.config
    }

    /// Register `moving` onto `fixed`.
    pub fn execute<B: Backend>(&self, fixed: &Volume<B>, moving: &Volume<B>) -> Result<RegistrationOutput<B>> {
        self.progress.start();
        match self.run(fixed, moving) {
            Ok(output) => {
                self.progress.complete();
                Ok(output)
            }
            Err(err) => {
                self.progress.error(&err.to_string());
                Err(err)
            }
        }
    }

    fn run<B: Backend>(&self, fixed: &Volume<B>, moving: &Volume<B>) -> Result<RegistrationOutput<B>> {
        let config = &self.config;
        config.validate()?;
        validate_volume_shapes(fixed, moving)?;
        let shape = fixed.shape();
        validate_grid(shape, config.grid_spacing)?;
        if config.check_finite {
            validate_finite(fixed.data(), "Fixed volume")?;
            validate_finite(moving.data(), "Moving volume")?;
        }

        let started = Instant::now();
        info!(
            "Convex registration: shape {:?}, grid spacing {}, lattice half-width {}, {} coupling rounds",
            shape,
            config.grid_spacing,
            config.disp_hw,
            config.coupling_schedule.len()
        );

        let extractor = MindSsc::new(config.mind_radius, config.mind_dilation);
        let pool = AveragePool::new(config.grid_spacing);
        let fixed_features = pool.apply(extractor.compute(fixed.data())?);
        let moving_features = pool.apply(extractor.compute(moving.data())?);
        let grid_shape = pool.output_shape(shape);
        debug!("Descriptors pooled to grid {:?}", grid_shape);
        self.progress.update(Stage::Descriptor, 1, Some(1), &[]);

        let fixed_mask = self.grid_mask(fixed.data(), grid_shape, "fixed");
        let symmetric = config.inverse_consistency_iterations > 0;
        let directions = if symmetric { 2 } else { 1 };

        let forward = self.solve_direction(&fixed_features, &moving_features, &fixed_mask, 1, directions)?;
        let (forward, backward) = if symmetric {
            let moving_mask = self.grid_mask(moving.data(), grid_shape, "moving");
            let backward = self.solve_direction(&moving_features, &fixed_features, &moving_mask, 2, directions)?;
            let (forward, backward) = InverseConsistencyCorrector::new(config.inverse_consistency_iterations)
                .with_progress(self.progress.clone())
                .correct(forward, backward)?;
            (forward, Some(backward))
        } else {
            (forward, None)
        };

        let displacement = forward.upsample(shape, config.grid_spacing);
        let backward = backward.map(|field| field.upsample(shape, config.grid_spacing));
        debug!("Upsampled displacement to {:?}", shape);
        self.progress.update(Stage::Upsample, 1, Some(1), &[]);

        let correspondences = PointCorrespondenceSet::from_field(&displacement, &fixed_mask, config.grid_spacing)?;
        let rigid = RobustRigidFitter::new(config.rigid_rounds).fit(&correspondences)?;
        self.progress.update(
            Stage::RigidFit,
            1,
            Some(1),
            &[("correspondences", correspondences.len() as f64)],
        );

        info!(
            "Convex registration finished in {:.2?} ({} rigid correspondences)",
            started.elapsed(),
            correspondences.len()
        );

        Ok(RegistrationOutput {
            displacement,
            backward,
            rigid,
            fixed_affine: *fixed.affine(),
            moving_affine: *moving.affine(),
        })
    }

    /// Cost volume, argmin and coupled convex solve of one direction.
    ///
    /// The initial labels are the argmin of the masked cost, so cells outside
    /// the foreground start at the zero displacement through the tie-break.
    fn solve_direction<B: Backend>(
        &self,
        fixed: &Tensor<B, 4>,
        moving: &Tensor<B, 4>,
        mask: &Tensor<B, 3>,
        direction: usize,
        directions: usize,
    ) -> Result<DisplacementField<B>> {
        let cost = CostVolumeBuilder::new(self.config.disp_hw)
            .build(fixed, moving)?
            .masked(mask)?;
        self.progress.update(Stage::CostVolume, direction, Some(directions), &[]);

        let labels = cost.argmin(self.config.tie_break_epsilon);
        CoupledConvexSolver::new(self.config.coupling_schedule.clone())
            .with_progress(self.progress.clone())
            .solve(cost, &labels)
    }

    /// Foreground cells of a volume on the grid, or the whole grid when no
    /// threshold is set or no cell qualifies.
    fn grid_mask<B: Backend>(&self, volume: &Tensor<B, 3>, grid_shape: [usize; 3], name: &str) -> Tensor<B, 3> {
        let device = volume.device();
        let Some(threshold) = self.config.foreground_threshold else {
            return Tensor::ones(grid_shape, &device);
        };

        let mask = foreground_mask(volume, threshold, self.config.grid_spacing);
        let cells = mask.clone().sum().into_scalar().elem::<f32>();
        if cells == 0.0 {
            warn!(
                "Foreground mask of the {} volume is empty at threshold {}; using the whole grid",
                name, threshold
            );
            return Tensor::ones(grid_shape, &device);
        }
        debug!("Foreground mask of the {} volume: {} cells", name, cells);
        mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistrationError;
    use crate::progress::HistoryCallback;
    use burn_ndarray::NdArray;

    type Backend = NdArray<f32>;

    fn small_config() -> ConvexRegistrationConfig {
        ConvexRegistrationConfig::default()
            .with_descriptor(1, 1)
            .with_grid_spacing(2)
            .with_disp_hw(2)
            .with_rigid_rounds(3)
    }

    fn sphere(shape: [usize; 3], radius: f32) -> Volume<Backend> {
        let [h, w, d] = shape;
        let centre = [h, w, d].map(|n| (n as f32 - 1.0) / 2.0);
        let mut values = Vec::with_capacity(h * w * d);
        for i in 0..h {
            for j in 0..w {
                for k in 0..d {
                    let r2 = (i as f32 - centre[0]).powi(2) + (j as f32 - centre[1]).powi(2) + (k as f32 - centre[2]).powi(2);
                    values.push(if r2 <= radius * radius { 1.0 } else { 0.0 });
                }
            }
        }
        Volume::from_vec(values, shape, &Default::default())
    }

    #[test]
    fn test_identical_volumes_give_identity() {
        let volume = sphere([16, 16, 16], 5.0);
        let history = Arc::new(HistoryCallback::new());
        let output = ConvexRegistration::new(small_config())
            .with_progress(history.clone())
            .execute(&volume, &volume)
            .unwrap();

        let max = output.displacement().data().clone().abs().max().into_scalar();
        assert!(max < 1e-5, "max displacement {max}");
        assert!((output.rigid().matrix() - Matrix4::identity()).abs().max() < 1e-6);
        assert!(output.backward_displacement().is_some());
        assert_eq!(output.displacement_channels_last().dims(), [16, 16, 16, 3]);
        assert!(!history.stage_history(Stage::CoupledConvex).is_empty());
        assert!(!history.stage_history(Stage::RigidFit).is_empty());
    }

    #[test]
    fn test_shape_mismatch_is_reported() {
        let a = sphere([8, 8, 8], 3.0);
        let b = sphere([8, 8, 10], 3.0);
        let err = ConvexRegistration::new(small_config()).execute(&a, &b).unwrap_err();
        assert!(matches!(err, RegistrationError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_non_finite_input_is_rejected() {
        let device = Default::default();
        let mut values = vec![0.0f32; 512];
        values[17] = f32::NAN;
        let bad = Volume::<Backend>::from_vec(values, [8, 8, 8], &device);
        let good = sphere([8, 8, 8], 3.0);
        let err = ConvexRegistration::new(small_config()).execute(&good, &bad).unwrap_err();
        assert!(matches!(err, RegistrationError::NumericalInstability(_)));
    }

    #[test]
    fn test_volume_smaller_than_grid_is_rejected() {
        let volume = sphere([3, 8, 8], 2.0);
        let config = small_config().with_grid_spacing(4);
        let err = ConvexRegistration::new(config).execute(&volume, &volume).unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_warp_with_zero_field_is_identity() {
        let volume = sphere([8, 8, 8], 3.0);
        let output = ConvexRegistration::new(small_config().with_inverse_consistency_iterations(0))
            .execute(&volume, &volume)
            .unwrap();
        assert!(output.backward_displacement().is_none());

        for interpolation in [Interpolation::Nearest, Interpolation::Linear] {
            let warped = output.warp_moving(&volume, interpolation);
            let diff = (warped - volume.data().clone()).abs().max().into_scalar();
            assert!(diff < 1e-5);
        }
        let rigid_field = output.rigid_displacement();
        assert!(rigid_field.into_data().abs().max().into_scalar() < 1e-5);
        let world = output.rigid_world_matrix().unwrap();
        assert!((world - Matrix4::identity()).abs().max() < 1e-6);
    }
}
