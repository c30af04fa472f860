//! Sparse keypoint correspondences and their densification.

pub mod coords;
pub mod thin_plate;

pub use coords::{normalized_to_voxel, voxel_to_normalized};
pub use thin_plate::{ThinPlateDensifier, ThinPlateSpline};
