//! Validation utilities for registration operations.
//!
//! Input checks run before the descriptor stage so that shape and value
//! problems are reported as errors instead of propagating as NaN.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use mindreg_core::{DisplacementField, Volume};

use crate::error::{RegistrationError, Result};
use crate::readback::to_vec_f32;

/// Validate that two volumes have the same spatial shape.
pub fn validate_volume_shapes<B: Backend>(fixed: &Volume<B>, moving: &Volume<B>) -> Result<()> {
    let fixed_shape = fixed.shape();
    let moving_shape = moving.shape();

    if fixed_shape != moving_shape {
        return Err(RegistrationError::shape_mismatch(&fixed_shape, &moving_shape));
    }

    Ok(())
}

/// Validate that two displacement fields live on the same grid.
pub fn validate_field_shapes<B: Backend>(
    forward: &DisplacementField<B>,
    backward: &DisplacementField<B>,
) -> Result<()> {
    let forward_shape = forward.shape();
    let backward_shape = backward.shape();

    if forward_shape != backward_shape {
        return Err(RegistrationError::shape_mismatch(&forward_shape, &backward_shape));
    }

    Ok(())
}

/// Validate that a volume can be pooled onto a grid of spacing `grid_spacing`.
pub fn validate_grid(shape: [usize; 3], grid_spacing: usize) -> Result<()> {
    if grid_spacing == 0 {
        return Err(RegistrationError::invalid_configuration(
            "Grid spacing must be positive",
        ));
    }

    if shape.iter().any(|&n| n < grid_spacing) {
        return Err(RegistrationError::invalid_configuration(format!(
            "Volume shape {:?} is smaller than grid spacing {}",
            shape, grid_spacing
        )));
    }

    Ok(())
}

/// Validate that every element of a tensor is finite.
pub fn validate_finite<B: Backend, const D: usize>(tensor: &Tensor<B, D>, name: &str) -> Result<()> {
    let values = to_vec_f32(tensor.clone())?;
    if let Some(position) = values.iter().position(|v| !v.is_finite()) {
        return Err(RegistrationError::numerical_instability(format!(
            "{} contains a non-finite value at flat index {}",
            name, position
        )));
    }

    Ok(())
}
