//! This library defines what the mixture of ground-motion models needs to know about
//! a ground-motion prediction equation (GMPE) and how it is queried.
//!
//! A GMPE predicts the natural logarithm of an intensity measure ([Imt]) and its
//! standard deviations ([StdDevType]) at a set of sites given the site, rupture and
//! distance contexts ([SitesContext], [RuptureContext], [DistancesContext]).
//!
//! Every model declares its [ModelCapabilities]:
//! * the tectonic region it is defined for,
//! * the supported intensity measure families ([ImtSpec]),
//! * the intensity measure component convention ([Imc]) of its predictions,
//! * the supported standard deviation kinds ([StdDevSpec]),
//! * the site, rupture and distance parameters it requires
//!   ([SiteParamSpec], [RuptureParamSpec], [DistanceSpec]).
//!
//! Models are implemented through the [GroundMotionModel] trait. Predictions made
//! with different component conventions are brought to a common one by a
//! [ComponentConverter] working on linear amplitudes.
//!
//! # Features
//!
//! ## serializable
//!
//! The `serializable` feature enables serialization of descriptors and contexts
//! based on [serde crate](https://serde.rs/).
//!
//! # Example
//!
//! ```
//! use shakemix_gmpe::*;
//! use ndarray::array;
//!
//! let caps = ModelCapabilities::new(TectonicRegion::ActiveShallowCrust, Imc::RotD50)
//!     .imts(ImtSpec::PGA | ImtSpec::SA)
//!     .stddev_types(StdDevSpec::TOTAL)
//!     .site_params(SiteParamSpec::VS30);
//! let gmpe = ConstantGmpe::new("Placeholder", caps, -1.5, 0.6);
//!
//! let sites = SitesContext::new(array![760., 360.]);
//! let (lnmu, lnsd) = gmpe
//!     .mean_and_stddevs(
//!         &sites,
//!         &RuptureContext::new(6.5),
//!         &DistancesContext::new().rjb(array![5., 20.]),
//!         Imt::sa(1.0).unwrap(),
//!         &[StdDevType::Total],
//!     )
//!     .expect("prediction");
//! assert_eq!(lnmu.len(), 2);
//! assert_eq!(lnsd.len(), 1);
//! ```
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod contexts;
mod conversion;
mod errors;
mod model;
mod types;

pub use contexts::*;
pub use conversion::*;
pub use errors::*;
pub use model::*;
pub use types::*;
