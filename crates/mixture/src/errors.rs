use shakemix_gmpe::GmpeError;
use thiserror::Error;

/// A result type for the mixture of ground-motion models
pub type Result<T> = std::result::Result<T, MixtureError>;

/// An error when building or querying a [`GmpeMixture`](crate::GmpeMixture)
#[derive(Error, Debug)]
pub enum MixtureError {
    /// When the models cannot be combined
    #[error("Compatibility error: {0}")]
    CompatibilityError(String),
    /// When the request is outside what the mixture supports
    #[error("Unsupported request: {0}")]
    UnsupportedRequestError(String),
    /// When the contexts do not provide what a model requires
    #[error("Missing context: {0}")]
    MissingContextError(String),
    /// When error due to a bad value
    #[error("InvalidValue error: {0}")]
    InvalidValueError(String),
    /// When a model or the component converter fails
    #[error(transparent)]
    GmpeError(#[from] GmpeError),
}

impl From<MixtureError> for GmpeError {
    fn from(error: MixtureError) -> GmpeError {
        match error {
            MixtureError::GmpeError(err) => err,
            MixtureError::MissingContextError(msg) => GmpeError::MissingParameter(msg),
            MixtureError::InvalidValueError(msg) => GmpeError::InvalidValueError(msg),
            err => GmpeError::ModelError(err.to_string()),
        }
    }
}
