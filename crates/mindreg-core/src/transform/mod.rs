//! Transform types and operations.
//!
//! This module provides the transform trait together with the two
//! transforms a registration produces: a dense displacement field and a
//! rigid 4x4 matrix. Both work in voxel coordinates `(h, w, d)`.

pub mod trait_;
pub mod rigid;
pub mod displacement_field;

pub use trait_::Transform;
pub use rigid::RigidTransform;
pub use displacement_field::DisplacementField;
