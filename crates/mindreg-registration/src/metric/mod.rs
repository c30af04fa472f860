//! Evaluation metrics.
//!
//! Similarity between a fixed volume and a moving volume seen through a
//! displacement field, label overlap, and the inverse-consistency residual
//! of a forward/backward pair.

pub mod consistency;
pub mod dice;
pub mod mse;
pub mod trait_;

pub use consistency::inverse_consistency_residual;
pub use dice::{dice_scores, DiceOverlap};
pub use mse::{mean_squared_error, MeanSquaredError};
pub use trait_::Metric;
