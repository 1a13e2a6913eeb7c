//! This library implements a weighted mixture of [ground-motion models](shakemix_gmpe).
//!
//! When several ground-motion prediction equations (GMPEs) are deemed relevant for
//! a tectonic region, their predictions are combined in a single model whose log mean
//! and log standard deviations at a site are the first two moments of the weighted
//! mixture of the constituent predictions:
//!
//! * `mean = sum_i w_i * mean_i`
//! * `stddev = sqrt(sum_i w_i * (mean_i^2 + stddev_i^2) - mean^2)`
//!
//! The mixture declares the capabilities derived from its constituents:
//! * the tectonic region they all share (models of different regions cannot be mixed),
//! * the union of their intensity measures: a constituent is queried even for an
//!   intensity measure it does not declare and decides how to handle it,
//! * the intersection of their standard deviation types,
//! * the union of their site, rupture and distance parameters.
//!
//! Predictions are given for the greater of the two horizontal components
//! ([TARGET_IMC]): constituent predictions made with another component convention
//! are converted by a [ComponentConverter](shakemix_gmpe::ComponentConverter)
//! before being mixed.
//!
//! # Implementation
//!
//! * Parameters follow the [linfa](https://docs.rs/linfa) `ParamGuard` pattern:
//!   [GmpeMixtureParams] is checked into [GmpeMixtureValidParams] which builds the [GmpeMixture].
//! * Constituents are evaluated in parallel using [rayon](https://docs.rs/rayon),
//!   results being mixed in constituent order.
//! * A [GmpeMixture] being a [GroundMotionModel](shakemix_gmpe::GroundMotionModel),
//!   mixtures can be nested.
//!
//! # Features
//!
//! ## serializable
//!
//! The `serializable` feature enables serialization of the model descriptors
//! based on [serde crate](https://serde.rs/).
//!
//! # Example
//!
//! ```
//! use shakemix_gmpe::*;
//! use shakemix_mixture::GmpeMixture;
//! use linfa::ParamGuard;
//! use ndarray::array;
//! use std::sync::Arc;
//!
//! let region = TectonicRegion::ActiveShallowCrust;
//! let caps = |imc| {
//!     ModelCapabilities::new(region, imc)
//!         .imts(ImtSpec::PGA | ImtSpec::SA)
//!         .stddev_types(StdDevSpec::TOTAL)
//!         .site_params(SiteParamSpec::VS30)
//!         .distances(DistanceSpec::RJB)
//! };
//! let models: Vec<Arc<dyn GroundMotionModel>> = vec![
//!     Arc::new(ConstantGmpe::new("A", caps(Imc::RotD50), 0.2f64.ln(), 0.6)),
//!     Arc::new(ConstantGmpe::new("B", caps(Imc::GreaterOfTwoHorizontal), 0.3f64.ln(), 0.7)),
//! ];
//! let converter = RatioConverter::new().factors(
//!     Imc::RotD50,
//!     Imc::GreaterOfTwoHorizontal,
//!     ConversionFactors::new(1.1, 1.0).expect("valid factors"),
//! );
//!
//! let mixture = GmpeMixture::params(models, &[0.5, 0.5])
//!     .converter(Arc::new(converter))
//!     .check()
//!     .expect("valid parameters")
//!     .build()
//!     .expect("compatible models");
//!
//! let (lnmu, lnsd) = mixture
//!     .evaluate(
//!         &SitesContext::new(array![760., 300.]),
//!         &RuptureContext::new(6.5),
//!         &DistancesContext::new().rjb(array![5., 30.]),
//!         Imt::Pga,
//!         &[StdDevType::Total],
//!     )
//!     .expect("mixture prediction");
//! assert_eq!(lnmu.len(), 2);
//! assert_eq!(lnsd[0].len(), 2);
//! ```
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod algorithm;
mod errors;
mod parameters;

pub use algorithm::*;
pub use errors::*;
pub use parameters::*;
