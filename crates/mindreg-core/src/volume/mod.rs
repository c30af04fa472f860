//! Volume types and voxel grids.
//!
//! This module provides the Volume type, a scalar 3-D array paired with
//! its voxel-to-world affine, and helpers for materializing voxel grids.

pub mod volume;
pub mod grid;

pub use volume::Volume;
pub use grid::{generate_grid_3d, voxel_grid};
