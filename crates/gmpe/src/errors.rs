use thiserror::Error;

/// A result type for ground-motion model queries
pub type Result<T> = std::result::Result<T, GmpeError>;

/// An error when querying a [`GroundMotionModel`](crate::GroundMotionModel)
/// or a [`ComponentConverter`](crate::ComponentConverter)
#[derive(Error, Debug)]
pub enum GmpeError {
    /// When a value is out of its domain (negative period, mismatched array lengths...)
    #[error("InvalidValue error: {0}")]
    InvalidValueError(String),
    /// When a context does not provide a parameter the model requires
    #[error("Missing parameter: {0}")]
    MissingParameter(String),
    /// When the intensity measure is not handled by the model
    #[error("Unsupported IMT: {0}")]
    UnsupportedImt(String),
    /// When a standard deviation type is not handled by the model
    #[error("Unsupported standard deviation type: {0}")]
    UnsupportedStdDevType(String),
    /// When no conversion is known between two component conventions
    #[error("Conversion error: {0}")]
    ConversionError(String),
    /// Any other failure raised by a model implementation
    #[error("Model error: {0}")]
    ModelError(String),
}
