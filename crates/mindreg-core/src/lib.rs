pub mod volume;
pub mod distance;
pub mod filter;
pub mod interpolation;
pub mod transform;

pub use volume::Volume;
pub use transform::{DisplacementField, RigidTransform};
