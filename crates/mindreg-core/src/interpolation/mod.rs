//! Interpolation types and operations.
//!
//! Samplers read multi-channel `[C, H, W, D]` volumes at continuous voxel
//! coordinates. Coordinates outside the volume clamp to the border voxel.

pub mod trait_;
pub mod linear;
pub mod nearest;

pub use trait_::Interpolator;
pub use linear::LinearInterpolator;
pub use nearest::NearestNeighborInterpolator;
