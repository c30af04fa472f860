//! Inverse-consistency residual of a forward/backward pair.

use burn::tensor::backend::Backend;
use burn::tensor::ElementConversion;
use mindreg_core::DisplacementField;

use crate::error::Result;
use crate::validation::validate_field_shapes;

/// Mean over the grid of `|f(x) + b(x + f(x))|`.
///
/// Zero when `backward` exactly undoes `forward`.
pub fn inverse_consistency_residual<B: Backend>(
    forward: &DisplacementField<B>,
    backward: &DisplacementField<B>,
) -> Result<f32> {
    validate_field_shapes(forward, backward)?;
    let round_trip = DisplacementField::compose(backward, forward);
    Ok(round_trip
        .into_data()
        .powf_scalar(2.0)
        .sum_dim(0)
        .sqrt()
        .mean()
        .into_scalar()
        .elem::<f32>())
}
