//! Host read-back of tensor data.
//!
//! Stages that finish on the host (rigid and thin-plate solves, metrics)
//! pull tensors back through these helpers so conversion failures surface
//! as `RegistrationError::DataConversion`.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::error::{RegistrationError, Result};

/// Read a float tensor back as row-major `f32` values.
pub fn to_vec_f32<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| RegistrationError::data_conversion(format!("{e:?}")))
}

