use crate::errors::{GmpeError, Result};
use bitflags::bitflags;
use std::fmt::Display;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Tectonic region a ground-motion model is defined for
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum TectonicRegion {
    /// Active shallow crust
    ActiveShallowCrust,
    /// Stable continental shallow crust
    StableShallowCrust,
    /// Subduction interface
    SubductionInterface,
    /// Subduction intraslab
    SubductionIntraslab,
    /// Upper mantle
    UpperMantle,
    /// Volcanic
    Volcanic,
    /// Geothermal or volcanic shallow crust
    GeothermalOrVolcanicShallowCrust,
}

impl Display for TectonicRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TectonicRegion::ActiveShallowCrust => "Active Shallow Crust",
            TectonicRegion::StableShallowCrust => "Stable Shallow Crust",
            TectonicRegion::SubductionInterface => "Subduction Interface",
            TectonicRegion::SubductionIntraslab => "Subduction IntraSlab",
            TectonicRegion::UpperMantle => "Upper Mantle",
            TectonicRegion::Volcanic => "Volcanic",
            TectonicRegion::GeothermalOrVolcanicShallowCrust => {
                "Geothermal or Volcanic Shallow Crust"
            }
        };
        write!(f, "{name}")
    }
}

/// Intensity measure type requested to a model
///
/// Spectral accelerations carry their period in seconds, see [`Imt::sa()`].
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum Imt {
    /// Peak ground acceleration
    Pga,
    /// Peak ground velocity
    Pgv,
    /// Peak ground displacement
    Pgd,
    /// Modified Mercalli intensity
    Mmi,
    /// Pseudo spectral acceleration at the given period (s)
    Sa(f64),
}

impl Imt {
    /// Spectral acceleration at `period` seconds
    ///
    /// # Errors
    ///
    /// [GmpeError::InvalidValueError] if `period` is not a finite positive number.
    pub fn sa(period: f64) -> Result<Imt> {
        if !period.is_finite() || period <= 0. {
            return Err(GmpeError::InvalidValueError(format!(
                "SA period should be a finite positive number, got {period}"
            )));
        }
        Ok(Imt::Sa(period))
    }

    /// The family flag of this intensity measure
    pub fn spec(&self) -> ImtSpec {
        match self {
            Imt::Pga => ImtSpec::PGA,
            Imt::Pgv => ImtSpec::PGV,
            Imt::Pgd => ImtSpec::PGD,
            Imt::Mmi => ImtSpec::MMI,
            Imt::Sa(_) => ImtSpec::SA,
        }
    }
}

impl Display for Imt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Imt::Pga => write!(f, "PGA"),
            Imt::Pgv => write!(f, "PGV"),
            Imt::Pgd => write!(f, "PGD"),
            Imt::Mmi => write!(f, "MMI"),
            Imt::Sa(period) => write!(f, "SA({period})"),
        }
    }
}

bitflags! {
    /// Flags to specify the intensity measure families a model is defined for.
    ///
    /// Flags can be combined with bit-wise `or` operator.
    /// ```ignore
    /// let spec = ImtSpec::PGA | ImtSpec::SA;
    /// ```
    #[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
    #[cfg_attr(feature = "serializable", derive(Serialize, Deserialize), serde(transparent))]
    pub struct ImtSpec: u8 {
        /// Peak ground acceleration
        const PGA = 0x01;
        /// Peak ground velocity
        const PGV = 0x02;
        /// Peak ground displacement
        const PGD = 0x04;
        /// Pseudo spectral acceleration, any period
        const SA = 0x08;
        /// Modified Mercalli intensity
        const MMI = 0x10;
    }
}

/// Intensity measure component convention
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum Imc {
    /// Geometric mean of the two horizontal components
    AverageHorizontal,
    /// Orientation-independent geometric mean, 50th percentile
    GmRotI50,
    /// Rotated 50th percentile
    RotD50,
    /// Rotated 100th percentile
    RotD100,
    /// Larger of the two horizontal components
    GreaterOfTwoHorizontal,
    /// Randomly chosen horizontal component
    RandomHorizontal,
    /// Unspecified horizontal component
    Horizontal,
    /// Median of the horizontal components
    Median,
    /// Vertical component
    Vertical,
}

impl Display for Imc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Imc::AverageHorizontal => "Average Horizontal",
            Imc::GmRotI50 => "Average Horizontal (GMRotI50)",
            Imc::RotD50 => "Average Horizontal (RotD50)",
            Imc::RotD100 => "Horizontal Maximum Direction (RotD100)",
            Imc::GreaterOfTwoHorizontal => "Greater of two horizontal",
            Imc::RandomHorizontal => "Random horizontal",
            Imc::Horizontal => "Horizontal",
            Imc::Median => "Median horizontal",
            Imc::Vertical => "Vertical",
        };
        write!(f, "{name}")
    }
}

/// Kind of standard deviation of the log intensity
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum StdDevType {
    /// Total standard deviation
    Total,
    /// Between-event (inter-event) standard deviation
    InterEvent,
    /// Within-event (intra-event) standard deviation
    IntraEvent,
}

impl StdDevType {
    /// The flag of this standard deviation kind
    pub fn spec(&self) -> StdDevSpec {
        match self {
            StdDevType::Total => StdDevSpec::TOTAL,
            StdDevType::InterEvent => StdDevSpec::INTER_EVENT,
            StdDevType::IntraEvent => StdDevSpec::INTRA_EVENT,
        }
    }
}

impl Display for StdDevType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StdDevType::Total => write!(f, "Total"),
            StdDevType::InterEvent => write!(f, "Inter event"),
            StdDevType::IntraEvent => write!(f, "Intra event"),
        }
    }
}

bitflags! {
    /// Flags to specify the standard deviation kinds a model is defined for.
    #[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
    #[cfg_attr(feature = "serializable", derive(Serialize, Deserialize), serde(transparent))]
    pub struct StdDevSpec: u8 {
        /// Total standard deviation
        const TOTAL = 0x01;
        /// Inter-event standard deviation
        const INTER_EVENT = 0x02;
        /// Intra-event standard deviation
        const INTRA_EVENT = 0x04;
    }
}

impl StdDevSpec {
    /// Flags of the given standard deviation kinds
    pub fn from_types(types: &[StdDevType]) -> StdDevSpec {
        types
            .iter()
            .fold(StdDevSpec::empty(), |acc, t| acc | t.spec())
    }
}

bitflags! {
    /// Flags to specify the site parameters a model requires.
    #[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
    #[cfg_attr(feature = "serializable", derive(Serialize, Deserialize), serde(transparent))]
    pub struct SiteParamSpec: u8 {
        /// Time-averaged shear wave velocity of the top 30m (m/s)
        const VS30 = 0x01;
        /// Whether vs30 was measured or inferred
        const VS30MEASURED = 0x02;
        /// Depth to the 1.0 km/s shear velocity horizon (m)
        const Z1PT0 = 0x04;
        /// Depth to the 2.5 km/s shear velocity horizon (km)
        const Z2PT5 = 0x08;
        /// Backarc site indicator
        const BACKARC = 0x10;
        /// Depth to the 1.0 km/s horizon from the Abrahamson et al. (2014) relationship (m)
        const Z1PT0_ASK14 = 0x20;
        /// Depth to the 1.0 km/s horizon from the Chiou and Youngs (2014) relationship (m)
        const Z1PT0_CY14 = 0x40;
    }
}

bitflags! {
    /// Flags to specify the rupture parameters a model requires.
    #[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
    #[cfg_attr(feature = "serializable", derive(Serialize, Deserialize), serde(transparent))]
    pub struct RuptureParamSpec: u8 {
        /// Moment magnitude
        const MAG = 0x01;
        /// Rake angle (degrees)
        const RAKE = 0x02;
        /// Dip angle (degrees)
        const DIP = 0x04;
        /// Depth to top of rupture (km)
        const ZTOR = 0x08;
        /// Down-dip rupture width (km)
        const WIDTH = 0x10;
        /// Hypocentral depth (km)
        const HYPO_DEPTH = 0x20;
    }
}

bitflags! {
    /// Flags to specify the distance measures a model requires.
    #[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
    #[cfg_attr(feature = "serializable", derive(Serialize, Deserialize), serde(transparent))]
    pub struct DistanceSpec: u8 {
        /// Closest distance to the rupture
        const RRUP = 0x01;
        /// Joyner-Boore distance
        const RJB = 0x02;
        /// Horizontal distance to the top edge, perpendicular to strike
        const RX = 0x04;
        /// Horizontal distance off the end of the rupture, parallel to strike
        const RY0 = 0x08;
        /// Hypocentral distance
        const RHYPO = 0x10;
        /// Epicentral distance
        const REPI = 0x20;
    }
}

/// What a ground-motion model is defined for and what it requires
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct ModelCapabilities {
    tectonic_region: TectonicRegion,
    imts: ImtSpec,
    imc: Imc,
    stddev_types: StdDevSpec,
    site_params: SiteParamSpec,
    rupture_params: RuptureParamSpec,
    distances: DistanceSpec,
}

impl ModelCapabilities {
    /// Capabilities for the given region and component, defined for no intensity
    /// measure, no standard deviation and requiring nothing.
    pub fn new(tectonic_region: TectonicRegion, imc: Imc) -> ModelCapabilities {
        ModelCapabilities {
            tectonic_region,
            imts: ImtSpec::empty(),
            imc,
            stddev_types: StdDevSpec::empty(),
            site_params: SiteParamSpec::empty(),
            rupture_params: RuptureParamSpec::empty(),
            distances: DistanceSpec::empty(),
        }
    }

    /// Sets the supported intensity measure families
    pub fn imts(mut self, imts: ImtSpec) -> Self {
        self.imts = imts;
        self
    }

    /// Sets the supported standard deviation kinds
    pub fn stddev_types(mut self, stddev_types: StdDevSpec) -> Self {
        self.stddev_types = stddev_types;
        self
    }

    /// Sets the required site parameters
    pub fn site_params(mut self, site_params: SiteParamSpec) -> Self {
        self.site_params = site_params;
        self
    }

    /// Sets the required rupture parameters
    pub fn rupture_params(mut self, rupture_params: RuptureParamSpec) -> Self {
        self.rupture_params = rupture_params;
        self
    }

    /// Sets the required distance measures
    pub fn distances(mut self, distances: DistanceSpec) -> Self {
        self.distances = distances;
        self
    }

    /// The tectonic region
    pub fn tectonic_region(&self) -> TectonicRegion {
        self.tectonic_region
    }

    /// The supported intensity measure families
    pub fn supported_imts(&self) -> ImtSpec {
        self.imts
    }

    /// The intensity measure component convention
    pub fn imc(&self) -> Imc {
        self.imc
    }

    /// The supported standard deviation kinds
    pub fn supported_stddev_types(&self) -> StdDevSpec {
        self.stddev_types
    }

    /// The required site parameters
    pub fn required_site_params(&self) -> SiteParamSpec {
        self.site_params
    }

    /// The required rupture parameters
    pub fn required_rupture_params(&self) -> RuptureParamSpec {
        self.rupture_params
    }

    /// The required distance measures
    pub fn required_distances(&self) -> DistanceSpec {
        self.distances
    }

    /// Whether `imt` belongs to a supported family
    pub fn supports_imt(&self, imt: &Imt) -> bool {
        self.imts.contains(imt.spec())
    }
}
