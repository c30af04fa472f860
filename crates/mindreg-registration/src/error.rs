//! Error types for registration operations.
//!
//! Every fallible stage of the registration engine reports one of these
//! variants; numeric degeneracies that are clamped internally never surface
//! here.

use thiserror::Error;

/// Main error type for registration operations.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// Two arrays that must share a shape do not.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Non-finite values detected.
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),

    /// A linear system could not be solved.
    #[error("Singular system: {0}")]
    SingularSystem(String),

    /// Too few point pairs for a fit.
    #[error("Insufficient correspondences: need at least {required}, got {actual}")]
    InsufficientCorrespondences { required: usize, actual: usize },

    /// Tensor data could not be read back to the host.
    #[error("Data conversion error: {0}")]
    DataConversion(String),
}

/// Result type for registration operations.
pub type Result<T> = std::result::Result<T, RegistrationError>;

impl RegistrationError {
    /// Create a shape mismatch error.
    pub fn shape_mismatch(expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create a numerical instability error.
    pub fn numerical_instability(msg: impl Into<String>) -> Self {
        Self::NumericalInstability(msg.into())
    }

    /// Create a singular system error.
    pub fn singular_system(msg: impl Into<String>) -> Self {
        Self::SingularSystem(msg.into())
    }

    /// Create a data conversion error.
    pub fn data_conversion(msg: impl Into<String>) -> Self {
        Self::DataConversion(msg.into())
    }
}
