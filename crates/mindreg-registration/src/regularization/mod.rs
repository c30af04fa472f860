//! Regularization of discrete displacement estimates.
//!
//! * **CoupledConvexSolver**: turns per-cell argmin labels into a smooth
//!   field by alternating a quadratic coupling step with box averaging.
//! * **InverseConsistencyCorrector**: symmetrizes a forward/backward pair
//!   so that their composition approaches the identity.

pub mod coupled_convex;
pub mod inverse_consistency;

pub use coupled_convex::CoupledConvexSolver;
pub use inverse_consistency::InverseConsistencyCorrector;
