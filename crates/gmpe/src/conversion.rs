//! Conversion of ground motions between intensity measure component conventions.
//!
//! Conversion factors between conventions are defined on linear amplitudes,
//! hence converters take and return linear (not logarithmic) values.
use crate::errors::{GmpeError, Result};
use crate::types::{Imc, Imt, ImtSpec};
use log::trace;
use ndarray::Array1;
use std::collections::HashMap;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// A trait for intensity measure component conversion services
pub trait ComponentConverter: Sync + Send {
    /// Convert linear amplitudes of `imt` from `from` convention to `to` convention
    fn convert_amplitude(
        &self,
        amplitudes: &Array1<f64>,
        from: Imc,
        to: Imc,
        imt: Imt,
    ) -> Result<Array1<f64>>;

    /// Convert exponentiated standard deviations of `imt` from `from` convention to `to` convention
    fn convert_sigma(
        &self,
        sigmas: &Array1<f64>,
        from: Imc,
        to: Imc,
        imt: Imt,
    ) -> Result<Array1<f64>>;
}

fn no_conversion(from: Imc, to: Imc, imt: Imt) -> GmpeError {
    GmpeError::ConversionError(format!("no conversion from {from} to {to} for {imt}"))
}

/// A converter only accepting identical conventions
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityConverter;

impl ComponentConverter for IdentityConverter {
    fn convert_amplitude(
        &self,
        amplitudes: &Array1<f64>,
        from: Imc,
        to: Imc,
        imt: Imt,
    ) -> Result<Array1<f64>> {
        if from != to {
            return Err(no_conversion(from, to, imt));
        }
        Ok(amplitudes.to_owned())
    }

    fn convert_sigma(
        &self,
        sigmas: &Array1<f64>,
        from: Imc,
        to: Imc,
        imt: Imt,
    ) -> Result<Array1<f64>> {
        if from != to {
            return Err(no_conversion(from, to, imt));
        }
        Ok(sigmas.to_owned())
    }
}

/// Multiplicative factors converting from one convention to another
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct ConversionFactors {
    amplitude: f64,
    sigma: f64,
}

impl ConversionFactors {
    /// Factors applied to linear amplitudes and to exponentiated standard deviations
    ///
    /// # Errors
    ///
    /// [GmpeError::InvalidValueError] if a factor is not a finite positive number.
    pub fn new(amplitude: f64, sigma: f64) -> Result<ConversionFactors> {
        for (name, value) in [("amplitude", amplitude), ("sigma", sigma)] {
            if !value.is_finite() || value <= 0. {
                return Err(GmpeError::InvalidValueError(format!(
                    "{name} factor should be a finite positive number, got {value}"
                )));
            }
        }
        Ok(ConversionFactors { amplitude, sigma })
    }

    /// Factors leaving values unchanged
    pub fn identity() -> ConversionFactors {
        ConversionFactors {
            amplitude: 1.,
            sigma: 1.,
        }
    }

    /// Amplitude factor
    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    /// Sigma factor
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Factors of the reverse conversion
    pub fn inverse(&self) -> ConversionFactors {
        ConversionFactors {
            amplitude: 1. / self.amplitude,
            sigma: 1. / self.sigma,
        }
    }
}

/// A converter using a table of ratios between conventions
///
/// Ratios are registered per pair of conventions, optionally refined per
/// intensity measure family. A pair registered in one direction is served in
/// the other one using the inverse ratios.
#[derive(Clone, Debug, Default)]
pub struct RatioConverter {
    factors: HashMap<(Imc, Imc), ConversionFactors>,
    imt_factors: HashMap<(Imc, Imc, ImtSpec), ConversionFactors>,
}

impl RatioConverter {
    /// Converter without any registered ratio
    pub fn new() -> RatioConverter {
        RatioConverter::default()
    }

    /// Registers the conversion factors from `from` to `to` for every intensity measure
    pub fn factors(mut self, from: Imc, to: Imc, factors: ConversionFactors) -> Self {
        self.factors.insert((from, to), factors);
        self
    }

    /// Registers the conversion factors from `from` to `to` for the given intensity
    /// measure families.
    ///
    /// They take precedence, in either direction, over the ones registered with
    /// [`factors()`](RatioConverter::factors)
    pub fn imt_factors(
        mut self,
        from: Imc,
        to: Imc,
        imts: ImtSpec,
        factors: ConversionFactors,
    ) -> Self {
        for imt in imts.iter() {
            self.imt_factors.insert((from, to, imt), factors);
        }
        self
    }

    /// The factors to convert `imt` values from `from` to `to`
    pub fn lookup(&self, from: Imc, to: Imc, imt: Imt) -> Result<ConversionFactors> {
        if from == to {
            return Ok(ConversionFactors::identity());
        }
        let spec = imt.spec();
        self.imt_factors
            .get(&(from, to, spec))
            .copied()
            .or_else(|| {
                self.imt_factors
                    .get(&(to, from, spec))
                    .map(|f| f.inverse())
            })
            .or_else(|| self.factors.get(&(from, to)).copied())
            .or_else(|| self.factors.get(&(to, from)).map(|f| f.inverse()))
            .ok_or_else(|| no_conversion(from, to, imt))
    }
}

impl ComponentConverter for RatioConverter {
    fn convert_amplitude(
        &self,
        amplitudes: &Array1<f64>,
        from: Imc,
        to: Imc,
        imt: Imt,
    ) -> Result<Array1<f64>> {
        let factors = self.lookup(from, to, imt)?;
        trace!("{imt} amplitude {from} -> {to} x{}", factors.amplitude());
        Ok(amplitudes.mapv(|a| a * factors.amplitude()))
    }

    fn convert_sigma(
        &self,
        sigmas: &Array1<f64>,
        from: Imc,
        to: Imc,
        imt: Imt,
    ) -> Result<Array1<f64>> {
        let factors = self.lookup(from, to, imt)?;
        trace!("{imt} sigma {from} -> {to} x{}", factors.sigma());
        Ok(sigmas.mapv(|s| s * factors.sigma()))
    }
}
