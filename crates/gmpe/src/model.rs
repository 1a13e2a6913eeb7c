use crate::contexts::{DistancesContext, RuptureContext, SitesContext, Z1pt0Flavor};
use crate::errors::{GmpeError, Result};
use crate::types::{Imt, ModelCapabilities, SiteParamSpec, StdDevSpec, StdDevType};
use ndarray::Array1;
use std::borrow::Cow;

/// A trait for ground-motion prediction models (GMPEs)
///
/// A model predicts, for every site of the context, the natural logarithm of the
/// intensity measure and its standard deviations, one vector per requested
/// [`StdDevType`], in request order.
pub trait GroundMotionModel: std::fmt::Display + Sync + Send {
    /// What the model is defined for and requires
    fn capabilities(&self) -> &ModelCapabilities;

    /// The sites context this model has to be given, derived from the `sites` shared
    /// between several models. Default is the shared context as is.
    fn resolve_sites<'a>(&self, sites: &'a SitesContext) -> Result<Cow<'a, SitesContext>> {
        Ok(Cow::Borrowed(sites))
    }

    /// Predict log means and log standard deviations of `imt` at every site
    fn mean_and_stddevs(
        &self,
        sites: &SitesContext,
        rupture: &RuptureContext,
        distances: &DistancesContext,
        imt: Imt,
        stddev_types: &[StdDevType],
    ) -> Result<(Array1<f64>, Vec<Array1<f64>>)>;
}

/// An adapter giving to the wrapped model the `z1pt0` computed with its own convention
///
/// The adapter requires the `flavor` depth ([`Z1pt0Flavor::spec()`]) in place of
/// the generic `z1pt0` the wrapped model declares.
#[derive(Clone, Debug)]
pub struct DepthFlavored<M: GroundMotionModel> {
    model: M,
    flavor: Z1pt0Flavor,
    capabilities: ModelCapabilities,
}

impl<M: GroundMotionModel> DepthFlavored<M> {
    /// Wrap `model` so that it is given the `flavor` z1pt0
    pub fn new(model: M, flavor: Z1pt0Flavor) -> DepthFlavored<M> {
        let capabilities = model.capabilities().clone();
        let mut site_params = capabilities.required_site_params();
        if site_params.contains(SiteParamSpec::Z1PT0) {
            site_params.remove(SiteParamSpec::Z1PT0);
            site_params.insert(flavor.spec());
        }
        let capabilities = capabilities.site_params(site_params);
        DepthFlavored {
            model,
            flavor,
            capabilities,
        }
    }

    /// The selected flavor
    pub fn flavor(&self) -> Z1pt0Flavor {
        self.flavor
    }

    /// The wrapped model
    pub fn inner(&self) -> &M {
        &self.model
    }
}

impl<M: GroundMotionModel> std::fmt::Display for DepthFlavored<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.model, self.flavor)
    }
}

impl<M: GroundMotionModel> GroundMotionModel for DepthFlavored<M> {
    fn capabilities(&self) -> &ModelCapabilities {
        &self.capabilities
    }

    fn resolve_sites<'a>(&self, sites: &'a SitesContext) -> Result<Cow<'a, SitesContext>> {
        sites.with_z1pt0_flavor(self.flavor)
    }

    fn mean_and_stddevs(
        &self,
        sites: &SitesContext,
        rupture: &RuptureContext,
        distances: &DistancesContext,
        imt: Imt,
        stddev_types: &[StdDevType],
    ) -> Result<(Array1<f64>, Vec<Array1<f64>>)> {
        self.model
            .mean_and_stddevs(sites, rupture, distances, imt, stddev_types)
    }
}

/// A model predicting the same log mean and log standard deviations everywhere.
///
/// Used as a scenario placeholder or as a reference model in tests.
#[derive(Clone, Debug)]
pub struct ConstantGmpe {
    name: String,
    capabilities: ModelCapabilities,
    mean: f64,
    total: f64,
    inter_event: f64,
    intra_event: f64,
}

impl ConstantGmpe {
    /// Constant model predicting `mean` with `stddev` for every standard deviation kind
    pub fn new(name: &str, capabilities: ModelCapabilities, mean: f64, stddev: f64) -> Self {
        ConstantGmpe {
            name: name.to_string(),
            capabilities,
            mean,
            total: stddev,
            inter_event: stddev,
            intra_event: stddev,
        }
    }

    /// Sets the standard deviation predicted for the `kind` kind
    pub fn with_stddev(mut self, kind: StdDevType, stddev: f64) -> Self {
        match kind {
            StdDevType::Total => self.total = stddev,
            StdDevType::InterEvent => self.inter_event = stddev,
            StdDevType::IntraEvent => self.intra_event = stddev,
        }
        self
    }

    /// The predicted log mean
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// The predicted log standard deviation of the `kind` kind
    pub fn stddev(&self, kind: StdDevType) -> f64 {
        match kind {
            StdDevType::Total => self.total,
            StdDevType::InterEvent => self.inter_event,
            StdDevType::IntraEvent => self.intra_event,
        }
    }
}

impl std::fmt::Display for ConstantGmpe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl GroundMotionModel for ConstantGmpe {
    fn capabilities(&self) -> &ModelCapabilities {
        &self.capabilities
    }

    fn mean_and_stddevs(
        &self,
        sites: &SitesContext,
        _rupture: &RuptureContext,
        _distances: &DistancesContext,
        imt: Imt,
        stddev_types: &[StdDevType],
    ) -> Result<(Array1<f64>, Vec<Array1<f64>>)> {
        if !self.capabilities.supports_imt(&imt) {
            return Err(GmpeError::UnsupportedImt(format!(
                "{imt} not defined for {}",
                self.name
            )));
        }
        let requested = StdDevSpec::from_types(stddev_types);
        if !self
            .capabilities
            .supported_stddev_types()
            .contains(requested)
        {
            return Err(GmpeError::UnsupportedStdDevType(format!(
                "{:?} not defined for {}",
                requested.difference(self.capabilities.supported_stddev_types()),
                self.name
            )));
        }
        let n = sites.len();
        let stddevs = stddev_types
            .iter()
            .map(|kind| Array1::from_elem(n, self.stddev(*kind)))
            .collect();
        Ok((Array1::from_elem(n, self.mean), stddevs))
    }
}
