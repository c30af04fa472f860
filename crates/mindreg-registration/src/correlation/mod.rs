//! Discrete displacement search.
//!
//! A [`DisplacementLattice`] enumerates the candidate offsets, and a
//! [`CostVolume`] holds the smoothed descriptor distance of every grid cell
//! for every candidate.

pub mod lattice;
pub mod cost_volume;

pub use lattice::DisplacementLattice;
pub use cost_volume::{CostVolume, CostVolumeBuilder, LabelField};
