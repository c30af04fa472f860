//! Global rigid and affine components of a dense field.
//!
//! Correspondences are read off the dense field at the grid-cell centres,
//! then fitted in closed form inside a least-trimmed-squares loop that
//! discards the worst half of the pairs every round.

pub mod correspondence;
pub mod least_trimmed;
pub mod procrustes;

pub use correspondence::PointCorrespondenceSet;
pub use least_trimmed::{RobustAffineFitter, RobustRigidFitter};
pub use procrustes::{fit_affine, fit_rigid, MIN_CORRESPONDENCES};
