//! Training-free deformable and rigid registration of 3-D volumes.
//!
//! MIND-SSC descriptors of both volumes are compared over a discrete
//! lattice of displacements; the resulting cost volume is regularized by a
//! coupled convex relaxation, symmetrized by an inverse-consistency
//! correction, upsampled to full resolution and summarized by a robust
//! rigid fit. [`ConvexRegistration`] runs the whole pipeline; every stage
//! is also usable on its own.

pub mod config;
pub mod correlation;
pub mod descriptor;
pub mod error;
pub mod keypoints;
pub mod metric;
pub mod progress;
pub mod registration;
pub mod regularization;
pub mod rigid;
pub mod validation;

pub(crate) mod readback;

pub use config::ConvexRegistrationConfig;
pub use correlation::{CostVolume, CostVolumeBuilder, DisplacementLattice, LabelField};
pub use descriptor::MindSsc;
pub use error::{RegistrationError, Result};
pub use keypoints::{ThinPlateDensifier, ThinPlateSpline};
pub use progress::{ConsoleProgressCallback, HistoryCallback, ProgressCallback, ProgressInfo, ProgressTracker, Stage};
pub use registration::{ConvexRegistration, Interpolation, RegistrationOutput};
pub use regularization::{CoupledConvexSolver, InverseConsistencyCorrector};
pub use rigid::{PointCorrespondenceSet, RobustAffineFitter, RobustRigidFitter};
