//! Site, rupture and distance contexts given to ground-motion models.
//!
//! Site and distance parameters are per-site vectors which all have the length
//! of the `vs30` vector, rupture parameters are scalars.
use crate::errors::{GmpeError, Result};
use crate::types::{DistanceSpec, RuptureParamSpec, SiteParamSpec};
use ndarray::Array1;
use std::borrow::Cow;
use std::fmt::Display;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Convention used to compute the depth to the 1.0 km/s horizon
///
/// Some models expect `z1pt0` to be derived from vs30 with their own
/// relationship rather than the generic one.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum Z1pt0Flavor {
    /// The `z1pt0` vector as given
    #[default]
    Generic,
    /// Abrahamson et al. (2014) vs30 to z1pt0 relationship
    Ask14,
    /// Chiou and Youngs (2014) vs30 to z1pt0 relationship
    Cy14,
}

impl Z1pt0Flavor {
    /// The site parameter flag of this flavor
    pub fn spec(&self) -> SiteParamSpec {
        match self {
            Z1pt0Flavor::Generic => SiteParamSpec::Z1PT0,
            Z1pt0Flavor::Ask14 => SiteParamSpec::Z1PT0_ASK14,
            Z1pt0Flavor::Cy14 => SiteParamSpec::Z1PT0_CY14,
        }
    }
}

impl Display for Z1pt0Flavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Z1pt0Flavor::Generic => write!(f, "z1pt0"),
            Z1pt0Flavor::Ask14 => write!(f, "z1pt0_ask14"),
            Z1pt0Flavor::Cy14 => write!(f, "z1pt0_cy14"),
        }
    }
}

fn check_len(name: &str, values: Option<&Array1<f64>>, n: usize) -> Result<()> {
    match values {
        Some(v) if v.len() != n => Err(GmpeError::InvalidValueError(format!(
            "`{name}` should have {n} values, got {}",
            v.len()
        ))),
        _ => Ok(()),
    }
}

/// Site parameters of the sites where ground motion is predicted
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct SitesContext {
    vs30: Array1<f64>,
    vs30measured: Option<Array1<f64>>,
    z1pt0: Option<Array1<f64>>,
    z1pt0_ask14: Option<Array1<f64>>,
    z1pt0_cy14: Option<Array1<f64>>,
    z2pt5: Option<Array1<f64>>,
    backarc: Option<Array1<f64>>,
}

impl SitesContext {
    /// Sites defined by their vs30 (m/s)
    pub fn new(vs30: Array1<f64>) -> SitesContext {
        SitesContext {
            vs30,
            vs30measured: None,
            z1pt0: None,
            z1pt0_ask14: None,
            z1pt0_cy14: None,
            z2pt5: None,
            backarc: None,
        }
    }

    /// Sets vs30 measured flags (1. measured, 0. inferred)
    pub fn vs30measured(mut self, vs30measured: Array1<f64>) -> Self {
        self.vs30measured = Some(vs30measured);
        self
    }

    /// Sets the generic depth to the 1.0 km/s horizon (m)
    pub fn z1pt0(mut self, z1pt0: Array1<f64>) -> Self {
        self.z1pt0 = Some(z1pt0);
        self
    }

    /// Sets the depth to the 1.0 km/s horizon for the given flavor (m)
    pub fn z1pt0_flavor(mut self, flavor: Z1pt0Flavor, z1pt0: Array1<f64>) -> Self {
        match flavor {
            Z1pt0Flavor::Generic => self.z1pt0 = Some(z1pt0),
            Z1pt0Flavor::Ask14 => self.z1pt0_ask14 = Some(z1pt0),
            Z1pt0Flavor::Cy14 => self.z1pt0_cy14 = Some(z1pt0),
        }
        self
    }

    /// Sets the depth to the 2.5 km/s horizon (km)
    pub fn z2pt5(mut self, z2pt5: Array1<f64>) -> Self {
        self.z2pt5 = Some(z2pt5);
        self
    }

    /// Sets the backarc indicators (1. backarc, 0. forearc)
    pub fn backarc(mut self, backarc: Array1<f64>) -> Self {
        self.backarc = Some(backarc);
        self
    }

    /// Number of sites
    pub fn len(&self) -> usize {
        self.vs30.len()
    }

    /// Whether there is no site
    pub fn is_empty(&self) -> bool {
        self.vs30.is_empty()
    }

    /// Vs30 values
    pub fn get_vs30(&self) -> &Array1<f64> {
        &self.vs30
    }

    /// Vs30 measured flags if any
    pub fn get_vs30measured(&self) -> Option<&Array1<f64>> {
        self.vs30measured.as_ref()
    }

    /// Generic z1pt0 values if any
    pub fn get_z1pt0(&self) -> Option<&Array1<f64>> {
        self.z1pt0.as_ref()
    }

    /// Z1pt0 values of the given flavor if any
    pub fn get_z1pt0_flavor(&self, flavor: Z1pt0Flavor) -> Option<&Array1<f64>> {
        match flavor {
            Z1pt0Flavor::Generic => self.z1pt0.as_ref(),
            Z1pt0Flavor::Ask14 => self.z1pt0_ask14.as_ref(),
            Z1pt0Flavor::Cy14 => self.z1pt0_cy14.as_ref(),
        }
    }

    /// Z2pt5 values if any
    pub fn get_z2pt5(&self) -> Option<&Array1<f64>> {
        self.z2pt5.as_ref()
    }

    /// Backarc indicators if any
    pub fn get_backarc(&self) -> Option<&Array1<f64>> {
        self.backarc.as_ref()
    }

    /// Site parameters this context provides
    pub fn provides(&self) -> SiteParamSpec {
        let mut spec = SiteParamSpec::VS30;
        spec.set(SiteParamSpec::VS30MEASURED, self.vs30measured.is_some());
        spec.set(SiteParamSpec::Z1PT0, self.z1pt0.is_some());
        spec.set(SiteParamSpec::Z1PT0_ASK14, self.z1pt0_ask14.is_some());
        spec.set(SiteParamSpec::Z1PT0_CY14, self.z1pt0_cy14.is_some());
        spec.set(SiteParamSpec::Z2PT5, self.z2pt5.is_some());
        spec.set(SiteParamSpec::BACKARC, self.backarc.is_some());
        spec
    }

    /// Check every site vector has one value per site
    pub fn check(&self) -> Result<()> {
        let n = self.len();
        check_len("vs30measured", self.vs30measured.as_ref(), n)?;
        check_len("z1pt0", self.z1pt0.as_ref(), n)?;
        check_len("z1pt0_ask14", self.z1pt0_ask14.as_ref(), n)?;
        check_len("z1pt0_cy14", self.z1pt0_cy14.as_ref(), n)?;
        check_len("z2pt5", self.z2pt5.as_ref(), n)?;
        check_len("backarc", self.backarc.as_ref(), n)
    }

    /// Sites context where `z1pt0` is the one of the given `flavor`.
    ///
    /// The context is borrowed as is for [`Z1pt0Flavor::Generic`].
    ///
    /// # Errors
    ///
    /// [GmpeError::MissingParameter] if the context has no value for that flavor.
    pub fn with_z1pt0_flavor(&self, flavor: Z1pt0Flavor) -> Result<Cow<'_, SitesContext>> {
        if flavor == Z1pt0Flavor::Generic {
            return Ok(Cow::Borrowed(self));
        }
        let z1pt0 = self
            .get_z1pt0_flavor(flavor)
            .ok_or_else(|| GmpeError::MissingParameter(format!("{flavor} not in sites context")))?;
        let mut sites = self.clone();
        sites.z1pt0 = Some(z1pt0.to_owned());
        Ok(Cow::Owned(sites))
    }
}

/// Parameters of the rupture
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct RuptureContext {
    mag: f64,
    rake: Option<f64>,
    dip: Option<f64>,
    ztor: Option<f64>,
    width: Option<f64>,
    hypo_depth: Option<f64>,
}

impl RuptureContext {
    /// Rupture of moment magnitude `mag`
    pub fn new(mag: f64) -> RuptureContext {
        RuptureContext {
            mag,
            rake: None,
            dip: None,
            ztor: None,
            width: None,
            hypo_depth: None,
        }
    }

    /// Sets rake angle (degrees)
    pub fn rake(mut self, rake: f64) -> Self {
        self.rake = Some(rake);
        self
    }

    /// Sets dip angle (degrees)
    pub fn dip(mut self, dip: f64) -> Self {
        self.dip = Some(dip);
        self
    }

    /// Sets depth to top of rupture (km)
    pub fn ztor(mut self, ztor: f64) -> Self {
        self.ztor = Some(ztor);
        self
    }

    /// Sets down-dip width (km)
    pub fn width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    /// Sets hypocentral depth (km)
    pub fn hypo_depth(mut self, hypo_depth: f64) -> Self {
        self.hypo_depth = Some(hypo_depth);
        self
    }

    /// Moment magnitude
    pub fn get_mag(&self) -> f64 {
        self.mag
    }

    /// Rake angle if any
    pub fn get_rake(&self) -> Option<f64> {
        self.rake
    }

    /// Dip angle if any
    pub fn get_dip(&self) -> Option<f64> {
        self.dip
    }

    /// Depth to top of rupture if any
    pub fn get_ztor(&self) -> Option<f64> {
        self.ztor
    }

    /// Down-dip width if any
    pub fn get_width(&self) -> Option<f64> {
        self.width
    }

    /// Hypocentral depth if any
    pub fn get_hypo_depth(&self) -> Option<f64> {
        self.hypo_depth
    }

    /// Rupture parameters this context provides
    pub fn provides(&self) -> RuptureParamSpec {
        let mut spec = RuptureParamSpec::MAG;
        spec.set(RuptureParamSpec::RAKE, self.rake.is_some());
        spec.set(RuptureParamSpec::DIP, self.dip.is_some());
        spec.set(RuptureParamSpec::ZTOR, self.ztor.is_some());
        spec.set(RuptureParamSpec::WIDTH, self.width.is_some());
        spec.set(RuptureParamSpec::HYPO_DEPTH, self.hypo_depth.is_some());
        spec
    }
}

/// Distances from the rupture to each site (km)
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct DistancesContext {
    rrup: Option<Array1<f64>>,
    rjb: Option<Array1<f64>>,
    rx: Option<Array1<f64>>,
    ry0: Option<Array1<f64>>,
    rhypo: Option<Array1<f64>>,
    repi: Option<Array1<f64>>,
}

macro_rules! distance_accessors {
    ($($name:ident => $getter:ident, $doc:literal);* $(;)?) => {
        $(
            #[doc = concat!("Sets ", $doc)]
            pub fn $name(mut self, $name: Array1<f64>) -> Self {
                self.$name = Some($name);
                self
            }

            #[doc = concat!($doc, " if any")]
            pub fn $getter(&self) -> Option<&Array1<f64>> {
                self.$name.as_ref()
            }
        )*
    };
}

impl DistancesContext {
    /// Context without any distance
    pub fn new() -> DistancesContext {
        DistancesContext::default()
    }

    distance_accessors! {
        rrup => get_rrup, "rupture distances";
        rjb => get_rjb, "Joyner-Boore distances";
        rx => get_rx, "strike-normal distances to the top edge";
        ry0 => get_ry0, "strike-parallel distances off the rupture end";
        rhypo => get_rhypo, "hypocentral distances";
        repi => get_repi, "epicentral distances";
    }

    /// Distance measures this context provides
    pub fn provides(&self) -> DistanceSpec {
        let mut spec = DistanceSpec::empty();
        spec.set(DistanceSpec::RRUP, self.rrup.is_some());
        spec.set(DistanceSpec::RJB, self.rjb.is_some());
        spec.set(DistanceSpec::RX, self.rx.is_some());
        spec.set(DistanceSpec::RY0, self.ry0.is_some());
        spec.set(DistanceSpec::RHYPO, self.rhypo.is_some());
        spec.set(DistanceSpec::REPI, self.repi.is_some());
        spec
    }

    /// Check every distance vector has `n_sites` values
    pub fn check(&self, n_sites: usize) -> Result<()> {
        check_len("rrup", self.rrup.as_ref(), n_sites)?;
        check_len("rjb", self.rjb.as_ref(), n_sites)?;
        check_len("rx", self.rx.as_ref(), n_sites)?;
        check_len("ry0", self.ry0.as_ref(), n_sites)?;
        check_len("rhypo", self.rhypo.as_ref(), n_sites)?;
        check_len("repi", self.repi.as_ref(), n_sites)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_sites_provides() {
        let sites = SitesContext::new(array![760., 400.]).z1pt0(array![40., 300.]);
        assert_eq!(sites.len(), 2);
        assert_eq!(
            sites.provides(),
            SiteParamSpec::VS30 | SiteParamSpec::Z1PT0
        );
        // flavored depths are not the generic z1pt0
        let sites = SitesContext::new(array![760.]).z1pt0_flavor(Z1pt0Flavor::Cy14, array![40.]);
        assert_eq!(
            sites.provides(),
            SiteParamSpec::VS30 | SiteParamSpec::Z1PT0_CY14
        );
        assert!(!sites.provides().contains(Z1pt0Flavor::Generic.spec()));
    }

    #[test]
    fn test_sites_check() {
        let sites = SitesContext::new(array![760., 400.]).z2pt5(array![1.]);
        assert!(matches!(
            sites.check(),
            Err(GmpeError::InvalidValueError(_))
        ));
        let sites = SitesContext::new(array![760., 400.]).z2pt5(array![1., 2.]);
        assert!(sites.check().is_ok());
    }

    #[test]
    fn test_z1pt0_flavor() {
        let sites = SitesContext::new(array![760., 300.])
            .z1pt0(array![1., 2.])
            .z1pt0_flavor(Z1pt0Flavor::Ask14, array![10., 20.]);

        let generic = sites.with_z1pt0_flavor(Z1pt0Flavor::Generic).unwrap();
        assert!(matches!(generic, Cow::Borrowed(_)));

        let ask14 = sites.with_z1pt0_flavor(Z1pt0Flavor::Ask14).unwrap();
        assert_abs_diff_eq!(*ask14.get_z1pt0().unwrap(), array![10., 20.]);
        assert!(ask14.provides().contains(Z1pt0Flavor::Ask14.spec()));
        assert_abs_diff_eq!(*ask14.get_vs30(), array![760., 300.]);

        assert!(matches!(
            sites.with_z1pt0_flavor(Z1pt0Flavor::Cy14),
            Err(GmpeError::MissingParameter(_))
        ));
    }

    #[test]
    fn test_rupture_provides() {
        let rup = RuptureContext::new(6.5).rake(90.).ztor(2.);
        assert_eq!(
            rup.provides(),
            RuptureParamSpec::MAG | RuptureParamSpec::RAKE | RuptureParamSpec::ZTOR
        );
        assert_eq!(rup.get_mag(), 6.5);
        assert_eq!(rup.get_dip(), None);
    }

    #[test]
    fn test_distances() {
        let dists = DistancesContext::new()
            .rjb(array![10., 20.])
            .rrup(array![12., 21.]);
        assert_eq!(dists.provides(), DistanceSpec::RJB | DistanceSpec::RRUP);
        assert!(dists.check(2).is_ok());
        assert!(dists.check(3).is_err());
        assert!(dists.get_rx().is_none());
    }
}
