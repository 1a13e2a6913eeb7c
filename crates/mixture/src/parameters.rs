use crate::errors::{MixtureError, Result};
use linfa::ParamGuard;
use shakemix_gmpe::{ComponentConverter, GroundMotionModel, IdentityConverter};
use std::sync::Arc;

/// Default tolerance on the sum of weights
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Mixture of ground-motion models checked parameters
#[derive(Clone)]
pub struct GmpeMixtureValidParams {
    /// Constituent models, in weights order
    models: Vec<Arc<dyn GroundMotionModel>>,
    /// Weight of each model
    weights: Vec<f64>,
    /// Service used to bring each model predictions to the mixture component
    converter: Arc<dyn ComponentConverter>,
    /// Whether weights are rescaled to sum to one or required to
    normalize_weights: bool,
    /// Accepted distance of the weights sum to one when not normalized
    weight_tolerance: f64,
}

impl GmpeMixtureValidParams {
    /// The constituent models
    pub fn models(&self) -> &[Arc<dyn GroundMotionModel>] {
        &self.models
    }

    /// The weights as given
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// The component conversion service
    pub fn converter(&self) -> &Arc<dyn ComponentConverter> {
        &self.converter
    }

    /// Whether weights are rescaled to sum to one
    pub fn normalize_weights(&self) -> bool {
        self.normalize_weights
    }

    /// The accepted distance of the weights sum to one
    pub fn weight_tolerance(&self) -> f64 {
        self.weight_tolerance
    }
}

/// Mixture of ground-motion models parameters
#[derive(Clone)]
pub struct GmpeMixtureParams(GmpeMixtureValidParams);

impl GmpeMixtureParams {
    /// Constructor of mixture parameters with `models` weighted by `weights`.
    ///
    /// By default, predictions are not converted (see [`converter()`](Self::converter))
    /// and weights are required to sum to one.
    pub fn new(models: Vec<Arc<dyn GroundMotionModel>>, weights: &[f64]) -> GmpeMixtureParams {
        Self(GmpeMixtureValidParams {
            models,
            weights: weights.to_vec(),
            converter: Arc::new(IdentityConverter),
            normalize_weights: false,
            weight_tolerance: WEIGHT_SUM_TOLERANCE,
        })
    }

    /// Sets the component conversion service
    pub fn converter(mut self, converter: Arc<dyn ComponentConverter>) -> Self {
        self.0.converter = converter;
        self
    }

    /// Sets whether weights are rescaled to sum to one instead of being required to
    pub fn normalize_weights(mut self, normalize_weights: bool) -> Self {
        self.0.normalize_weights = normalize_weights;
        self
    }

    /// Sets the accepted distance of the weights sum to one
    pub fn weight_tolerance(mut self, weight_tolerance: f64) -> Self {
        self.0.weight_tolerance = weight_tolerance;
        self
    }
}

impl ParamGuard for GmpeMixtureParams {
    type Checked = GmpeMixtureValidParams;
    type Error = MixtureError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        let n = self.0.models.len();
        if n == 0 {
            return Err(MixtureError::InvalidValueError(
                "At least one model is required".to_string(),
            ));
        }
        if n != self.0.weights.len() {
            return Err(MixtureError::InvalidValueError(format!(
                "Models and weights should have the same length, got {} models and {} weights",
                n,
                self.0.weights.len()
            )));
        }
        if let Some(w) = self.0.weights.iter().find(|w| !w.is_finite() || **w < 0.) {
            return Err(MixtureError::InvalidValueError(format!(
                "Weights should be finite and non-negative, got {w}"
            )));
        }
        if self.0.weight_tolerance.is_nan() || self.0.weight_tolerance < 0. {
            return Err(MixtureError::InvalidValueError(format!(
                "`weight_tolerance` should be non-negative, got {}",
                self.0.weight_tolerance
            )));
        }
        let sum: f64 = self.0.weights.iter().sum();
        if self.0.normalize_weights {
            if sum <= 0. {
                return Err(MixtureError::InvalidValueError(
                    "Weights cannot be normalized, their sum is zero".to_string(),
                ));
            }
        } else if (sum - 1.).abs() > self.0.weight_tolerance {
            return Err(MixtureError::InvalidValueError(format!(
                "Weights should sum to 1, got {sum}"
            )));
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

impl From<GmpeMixtureValidParams> for GmpeMixtureParams {
    fn from(item: GmpeMixtureValidParams) -> Self {
        GmpeMixtureParams(item)
    }
}
