use crate::errors::{MixtureError, Result};
use crate::parameters::{GmpeMixtureParams, GmpeMixtureValidParams};
use linfa::ParamGuard;
use log::{debug, trace, warn};
use ndarray::{Array1, Zip};
use rayon::prelude::*;
use shakemix_gmpe::{
    ComponentConverter, DistanceSpec, DistancesContext, GmpeError, GroundMotionModel, Imc, Imt,
    ImtSpec, ModelCapabilities, RuptureContext, RuptureParamSpec, SiteParamSpec, SitesContext,
    StdDevSpec, StdDevType, TectonicRegion,
};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Component convention of the mixture predictions, whatever the constituents ones
pub const TARGET_IMC: Imc = Imc::GreaterOfTwoHorizontal;

/// Log means and log standard deviations (one vector per requested kind) at every site
type Prediction = (Array1<f64>, Vec<Array1<f64>>);

impl GmpeMixtureValidParams {
    /// Build the mixture from checked parameters
    ///
    /// # Errors
    ///
    /// * [MixtureError::CompatibilityError]: if the models are not all defined for the same tectonic region
    ///
    pub fn build(&self) -> Result<GmpeMixture> {
        let regions: BTreeSet<TectonicRegion> = self
            .models()
            .iter()
            .map(|m| m.capabilities().tectonic_region())
            .collect();
        let region = match regions.first() {
            Some(region) if regions.len() == 1 => *region,
            _ => {
                return Err(MixtureError::CompatibilityError(format!(
                    "tectonic region mismatch, models are defined for {regions:?}"
                )))
            }
        };

        let capabilities: Vec<&ModelCapabilities> =
            self.models().iter().map(|m| m.capabilities()).collect();

        // Union of imts: missing ones are left to the constituents
        // (e.g. PGV is often lacking in stable crust and subduction models)
        let imts = capabilities
            .iter()
            .fold(ImtSpec::empty(), |acc, c| acc | c.supported_imts());
        let stddev_types = capabilities
            .iter()
            .fold(StdDevSpec::all(), |acc, c| acc & c.supported_stddev_types());
        let site_params = capabilities
            .iter()
            .fold(SiteParamSpec::empty(), |acc, c| acc | c.required_site_params());
        let rupture_params = capabilities
            .iter()
            .fold(RuptureParamSpec::empty(), |acc, c| {
                acc | c.required_rupture_params()
            });
        let distances = capabilities
            .iter()
            .fold(DistanceSpec::empty(), |acc, c| acc | c.required_distances());
        let imcs: Vec<Imc> = capabilities.iter().map(|c| c.imc()).collect();

        if stddev_types.is_empty() {
            warn!("No standard deviation type common to all models, only means can be predicted");
        }

        let mut weights = Array1::from_vec(self.weights().to_vec());
        if self.normalize_weights() {
            let sum = weights.sum();
            weights /= sum;
        }

        let capabilities = ModelCapabilities::new(region, TARGET_IMC)
            .imts(imts)
            .stddev_types(stddev_types)
            .site_params(site_params)
            .rupture_params(rupture_params)
            .distances(distances);
        debug!("Mixture capabilities {:?}", capabilities);
        debug!("Mixture weights {}", weights);

        Ok(GmpeMixture {
            models: self.models().to_vec(),
            weights,
            imcs,
            capabilities,
            converter: self.converter().clone(),
        })
    }
}

/// Weighted mixture of ground-motion models
///
/// The mixture is itself a [GroundMotionModel] predicting for each site the first two
/// moments of the weighted mixture of the constituents log-normal predictions:
///
/// * `mean = sum_i w_i * mean_i`
/// * `stddev = sqrt(sum_i w_i * (mean_i^2 + stddev_i^2) - mean^2)`
///
/// after conversion of each constituent prediction to the [TARGET_IMC] convention.
#[derive(Clone)]
pub struct GmpeMixture {
    /// Constituent models
    models: Vec<Arc<dyn GroundMotionModel>>,
    /// Weight of each constituent
    weights: Array1<f64>,
    /// Component convention of each constituent
    imcs: Vec<Imc>,
    /// Derived capabilities
    capabilities: ModelCapabilities,
    /// Service converting constituent predictions to the target component
    converter: Arc<dyn ComponentConverter>,
}

impl std::fmt::Display for GmpeMixture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let models = self
            .models
            .iter()
            .zip(self.weights.iter())
            .map(|(model, w)| format!("{w}*{model}"))
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "Mixture[{}]({})",
            self.capabilities.tectonic_region(),
            models
        )
    }
}

impl GmpeMixture {
    /// Constructor of mixture parameters
    pub fn params(models: Vec<Arc<dyn GroundMotionModel>>, weights: &[f64]) -> GmpeMixtureParams {
        GmpeMixtureParams::new(models, weights)
    }

    /// Build a mixture of `models` weighted by `weights` with default parameters
    pub fn from_list(models: Vec<Arc<dyn GroundMotionModel>>, weights: &[f64]) -> Result<Self> {
        GmpeMixtureParams::new(models, weights).check()?.build()
    }

    /// Constituent models
    pub fn models(&self) -> &[Arc<dyn GroundMotionModel>] {
        &self.models
    }

    /// Weights of the constituents, normalized if requested at build
    pub fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    /// Component convention of each constituent
    pub fn imcs(&self) -> &[Imc] {
        &self.imcs
    }

    /// Number of constituents
    pub fn n_models(&self) -> usize {
        self.models.len()
    }

    /// Predict log means and log standard deviations of `imt` at every site,
    /// one standard deviation vector per requested kind, in `stddev_types` order.
    ///
    /// # Errors
    ///
    /// * [MixtureError::UnsupportedRequestError]: if `imt` or a standard deviation kind is not supported
    /// * [MixtureError::CompatibilityError]: if a standard deviation is requested while
    ///   the models have none in common
    /// * [MixtureError::MissingContextError]: if contexts lack a parameter a model requires
    /// * [MixtureError::GmpeError]: if a model or the conversion fails
    pub fn evaluate(
        &self,
        sites: &SitesContext,
        rupture: &RuptureContext,
        distances: &DistancesContext,
        imt: Imt,
        stddev_types: &[StdDevType],
    ) -> Result<Prediction> {
        self.check_request(imt, stddev_types)?;
        sites
            .check()
            .and_then(|_| distances.check(sites.len()))
            .map_err(|err| MixtureError::InvalidValueError(err.to_string()))?;

        let predictions = self
            .models
            .par_iter()
            .zip(&self.imcs)
            .map(|(model, imc)| {
                self.predict_constituent(
                    model.as_ref(),
                    *imc,
                    sites,
                    rupture,
                    distances,
                    imt,
                    stddev_types,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        let n = sites.len();
        let mut lnmu = Array1::<f64>::zeros(n);
        let mut lnsd2 = vec![Array1::<f64>::zeros(n); stddev_types.len()];
        for ((lmean, lsds), &w) in predictions.iter().zip(self.weights.iter()) {
            lnmu.scaled_add(w, lmean);
            for (acc, lsd) in lnsd2.iter_mut().zip(lsds) {
                Zip::from(acc)
                    .and(lmean)
                    .and(lsd)
                    .for_each(|a, &m, &s| *a += w * (m * m + s * s));
            }
        }
        // Cancellation may give slightly negative variances
        let lnsd = lnsd2
            .into_iter()
            .map(|mut var| {
                Zip::from(&mut var)
                    .and(&lnmu)
                    .for_each(|v, &mu| *v = (*v - mu * mu).max(0.).sqrt());
                var
            })
            .collect();
        trace!("{} {} at {} sites: mean={}", self, imt, n, lnmu);
        Ok((lnmu, lnsd))
    }

    fn check_request(&self, imt: Imt, stddev_types: &[StdDevType]) -> Result<()> {
        if !self.capabilities.supports_imt(&imt) {
            return Err(MixtureError::UnsupportedRequestError(format!(
                "{imt} not in {:?}",
                self.capabilities.supported_imts()
            )));
        }
        let requested = StdDevSpec::from_types(stddev_types);
        let supported = self.capabilities.supported_stddev_types();
        if !requested.is_empty() && supported.is_empty() {
            return Err(MixtureError::CompatibilityError(format!(
                "models have no standard deviation type in common, {requested:?} cannot be computed"
            )));
        }
        if !supported.contains(requested) {
            return Err(MixtureError::UnsupportedRequestError(format!(
                "standard deviation types {:?} not in {supported:?}",
                requested.difference(supported)
            )));
        }
        Ok(())
    }

    /// Prediction of one constituent converted to the target component
    #[allow(clippy::too_many_arguments)]
    fn predict_constituent(
        &self,
        model: &dyn GroundMotionModel,
        imc: Imc,
        sites: &SitesContext,
        rupture: &RuptureContext,
        distances: &DistancesContext,
        imt: Imt,
        stddev_types: &[StdDevType],
    ) -> Result<Prediction> {
        let sites = model.resolve_sites(sites)?;
        check_context(model, &sites, rupture, distances)?;
        if !model.capabilities().supports_imt(&imt) {
            trace!("{imt} not declared by {model}, left to the model");
        }

        let (lmean, lsds) = model.mean_and_stddevs(&sites, rupture, distances, imt, stddev_types)?;
        let n = sites.len();
        if lmean.len() != n
            || lsds.len() != stddev_types.len()
            || lsds.iter().any(|lsd| lsd.len() != n)
        {
            return Err(MixtureError::InvalidValueError(format!(
                "{model} prediction shape mismatch: expected {} stddevs of {n} sites, got {} means and {} stddevs",
                stddev_types.len(),
                lmean.len(),
                lsds.len()
            )));
        }

        let target = self.capabilities.imc();
        if imc == target {
            return Ok((lmean, lsds));
        }
        // Conversion factors are defined on linear amplitudes
        let lmean = self
            .converter
            .convert_amplitude(&lmean.mapv(f64::exp), imc, target, imt)?
            .mapv(f64::ln);
        let lsds = lsds
            .iter()
            .map(|lsd| {
                self.converter
                    .convert_sigma(&lsd.mapv(f64::exp), imc, target, imt)
                    .map(|sd| sd.mapv(f64::ln))
            })
            .collect::<std::result::Result<Vec<_>, GmpeError>>()?;
        Ok((lmean, lsds))
    }
}

/// Check the contexts give `model` every parameter it requires
fn check_context(
    model: &dyn GroundMotionModel,
    sites: &SitesContext,
    rupture: &RuptureContext,
    distances: &DistancesContext,
) -> Result<()> {
    let caps = model.capabilities();
    let mut missing = vec![];
    let site_params = caps.required_site_params().difference(sites.provides());
    if !site_params.is_empty() {
        missing.push(format!("{site_params:?}"));
    }
    let rupture_params = caps
        .required_rupture_params()
        .difference(rupture.provides());
    if !rupture_params.is_empty() {
        missing.push(format!("{rupture_params:?}"));
    }
    let dists = caps.required_distances().difference(distances.provides());
    if !dists.is_empty() {
        missing.push(format!("{dists:?}"));
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(MixtureError::MissingContextError(format!(
            "{model} requires {}",
            missing.join(", ")
        )))
    }
}

impl GroundMotionModel for GmpeMixture {
    fn capabilities(&self) -> &ModelCapabilities {
        &self.capabilities
    }

    fn mean_and_stddevs(
        &self,
        sites: &SitesContext,
        rupture: &RuptureContext,
        distances: &DistancesContext,
        imt: Imt,
        stddev_types: &[StdDevType],
    ) -> shakemix_gmpe::Result<Prediction> {
        self.evaluate(sites, rupture, distances, imt, stddev_types)
            .map_err(GmpeError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use shakemix_gmpe::{ConstantGmpe, DepthFlavored, Z1pt0Flavor};
    use std::sync::Mutex;

    fn caps(region: TectonicRegion, imc: Imc, stddevs: StdDevSpec) -> ModelCapabilities {
        ModelCapabilities::new(region, imc)
            .imts(ImtSpec::PGA | ImtSpec::SA)
            .stddev_types(stddevs)
            .site_params(SiteParamSpec::VS30)
            .rupture_params(RuptureParamSpec::MAG)
    }

    fn constant(name: &str, mean: f64, sd: f64) -> Arc<dyn GroundMotionModel> {
        Arc::new(ConstantGmpe::new(
            name,
            caps(TectonicRegion::ActiveShallowCrust, TARGET_IMC, StdDevSpec::all()),
            mean,
            sd,
        ))
    }

    fn contexts() -> (SitesContext, RuptureContext, DistancesContext) {
        (
            SitesContext::new(array![760., 400., 180.]),
            RuptureContext::new(6.5).rake(0.),
            DistancesContext::new().rjb(array![2., 15., 80.]),
        )
    }

    /// Predicts ln(z1pt0) with zero standard deviations
    struct DepthEcho(ModelCapabilities);

    impl std::fmt::Display for DepthEcho {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "DepthEcho")
        }
    }

    impl GroundMotionModel for DepthEcho {
        fn capabilities(&self) -> &ModelCapabilities {
            &self.0
        }

        fn mean_and_stddevs(
            &self,
            sites: &SitesContext,
            _rupture: &RuptureContext,
            _distances: &DistancesContext,
            _imt: Imt,
            stddev_types: &[StdDevType],
        ) -> shakemix_gmpe::Result<Prediction> {
            let z1pt0 = sites
                .get_z1pt0()
                .ok_or_else(|| GmpeError::MissingParameter("z1pt0".to_string()))?;
            Ok((
                z1pt0.mapv(f64::ln),
                vec![Array1::zeros(sites.len()); stddev_types.len()],
            ))
        }
    }

    /// Always fails
    struct Failing(ModelCapabilities);

    impl std::fmt::Display for Failing {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "Failing")
        }
    }

    impl GroundMotionModel for Failing {
        fn capabilities(&self) -> &ModelCapabilities {
            &self.0
        }

        fn mean_and_stddevs(
            &self,
            _sites: &SitesContext,
            _rupture: &RuptureContext,
            _distances: &DistancesContext,
            _imt: Imt,
            _stddev_types: &[StdDevType],
        ) -> shakemix_gmpe::Result<Prediction> {
            Err(GmpeError::ModelError("coefficients not found".to_string()))
        }
    }

    /// Converter scaling amplitudes by 1.2 and sigmas by 1.1, recording its inputs
    #[derive(Default)]
    struct RecordingConverter {
        amplitudes: Mutex<Vec<Array1<f64>>>,
        sigmas: Mutex<Vec<Array1<f64>>>,
    }

    impl ComponentConverter for RecordingConverter {
        fn convert_amplitude(
            &self,
            amplitudes: &Array1<f64>,
            _from: Imc,
            _to: Imc,
            _imt: Imt,
        ) -> shakemix_gmpe::Result<Array1<f64>> {
            self.amplitudes.lock().unwrap().push(amplitudes.to_owned());
            Ok(amplitudes * 1.2)
        }

        fn convert_sigma(
            &self,
            sigmas: &Array1<f64>,
            _from: Imc,
            _to: Imc,
            _imt: Imt,
        ) -> shakemix_gmpe::Result<Array1<f64>> {
            self.sigmas.lock().unwrap().push(sigmas.to_owned());
            Ok(sigmas * 1.1)
        }
    }

    #[test]
    fn test_build_single_region() {
        let mixture = GmpeMixture::from_list(
            vec![constant("A", 0., 0.5), constant("B", 0., 0.5)],
            &[0.4, 0.6],
        )
        .expect("mixture built");
        assert_eq!(
            mixture.capabilities().tectonic_region(),
            TectonicRegion::ActiveShallowCrust
        );
        assert_eq!(mixture.capabilities().imc(), Imc::GreaterOfTwoHorizontal);
        assert_eq!(mixture.n_models(), 2);
        assert_eq!(format!("{mixture}"), "Mixture[Active Shallow Crust](0.4*A, 0.6*B)");
    }

    #[test]
    fn test_build_region_mismatch() {
        let stable: Arc<dyn GroundMotionModel> = Arc::new(ConstantGmpe::new(
            "Stable",
            caps(TectonicRegion::StableShallowCrust, TARGET_IMC, StdDevSpec::all()),
            0.,
            0.5,
        ));
        let res = GmpeMixture::from_list(vec![constant("Active", 0., 0.5), stable], &[0.5, 0.5]);
        assert!(matches!(res, Err(MixtureError::CompatibilityError(_))));
    }

    #[test]
    fn test_derived_capabilities() {
        let region = TectonicRegion::SubductionInterface;
        let a: Arc<dyn GroundMotionModel> = Arc::new(ConstantGmpe::new(
            "A",
            ModelCapabilities::new(region, Imc::AverageHorizontal)
                .imts(ImtSpec::PGA)
                .stddev_types(StdDevSpec::TOTAL)
                .site_params(SiteParamSpec::VS30)
                .distances(DistanceSpec::RRUP),
            0.,
            0.5,
        ));
        let b: Arc<dyn GroundMotionModel> = Arc::new(ConstantGmpe::new(
            "B",
            ModelCapabilities::new(region, Imc::RotD50)
                .imts(ImtSpec::SA)
                .stddev_types(StdDevSpec::TOTAL | StdDevSpec::INTRA_EVENT)
                .site_params(SiteParamSpec::VS30 | SiteParamSpec::BACKARC)
                .rupture_params(RuptureParamSpec::MAG | RuptureParamSpec::ZTOR),
            0.,
            0.5,
        ));
        let c: Arc<dyn GroundMotionModel> = Arc::new(ConstantGmpe::new(
            "C",
            ModelCapabilities::new(region, Imc::GreaterOfTwoHorizontal)
                .imts(ImtSpec::PGA | ImtSpec::PGV)
                .stddev_types(StdDevSpec::TOTAL | StdDevSpec::INTER_EVENT)
                .rupture_params(RuptureParamSpec::MAG | RuptureParamSpec::HYPO_DEPTH)
                .distances(DistanceSpec::RHYPO),
            0.,
            0.5,
        ));
        let mixture = GmpeMixture::from_list(vec![a, b, c], &[0.3, 0.3, 0.4]).unwrap();
        let caps = mixture.capabilities();
        assert_eq!(caps.tectonic_region(), region);
        assert_eq!(caps.supported_stddev_types(), StdDevSpec::TOTAL);
        assert_eq!(
            caps.supported_imts(),
            ImtSpec::PGA | ImtSpec::SA | ImtSpec::PGV
        );
        assert_eq!(
            caps.required_site_params(),
            SiteParamSpec::VS30 | SiteParamSpec::BACKARC
        );
        assert_eq!(
            caps.required_rupture_params(),
            RuptureParamSpec::MAG | RuptureParamSpec::ZTOR | RuptureParamSpec::HYPO_DEPTH
        );
        assert_eq!(
            caps.required_distances(),
            DistanceSpec::RRUP | DistanceSpec::RHYPO
        );
        assert_eq!(caps.imc(), Imc::GreaterOfTwoHorizontal);
        assert_eq!(
            mixture.imcs(),
            &[Imc::AverageHorizontal, Imc::RotD50, Imc::GreaterOfTwoHorizontal]
        );
    }

    #[test]
    fn test_params_check() {
        let res = GmpeMixture::params(vec![], &[]).check();
        assert!(matches!(res, Err(MixtureError::InvalidValueError(_))));

        let res = GmpeMixture::params(vec![constant("A", 0., 0.5)], &[0.5, 0.5]).check();
        assert!(matches!(res, Err(MixtureError::InvalidValueError(_))));

        let res = GmpeMixture::params(
            vec![constant("A", 0., 0.5), constant("B", 0., 0.5)],
            &[1.5, -0.5],
        )
        .check();
        assert!(matches!(res, Err(MixtureError::InvalidValueError(_))));

        let res = GmpeMixture::params(
            vec![constant("A", 0., 0.5), constant("B", 0., 0.5)],
            &[0.5, 0.4],
        )
        .check();
        assert!(matches!(res, Err(MixtureError::InvalidValueError(_))));

        let res = GmpeMixture::params(
            vec![constant("A", 0., 0.5), constant("B", 0., 0.5)],
            &[0., 0.],
        )
        .normalize_weights(true)
        .check();
        assert!(matches!(res, Err(MixtureError::InvalidValueError(_))));

        let mixture = GmpeMixture::params(
            vec![constant("A", 0., 0.5), constant("B", 0., 0.5)],
            &[1., 3.],
        )
        .normalize_weights(true)
        .check()
        .unwrap()
        .build()
        .unwrap();
        assert_abs_diff_eq!(*mixture.weights(), array![0.25, 0.75]);
    }

    #[test]
    fn test_single_model() {
        let mixture = GmpeMixture::from_list(vec![constant("A", -1.7, 0.65)], &[1.]).unwrap();
        let (sites, rup, dists) = contexts();
        let (lnmu, lnsd) = mixture
            .evaluate(&sites, &rup, &dists, Imt::Pga, &[StdDevType::Total])
            .unwrap();
        assert_abs_diff_eq!(lnmu, array![-1.7, -1.7, -1.7], epsilon = 1e-12);
        assert_eq!(lnsd.len(), 1);
        assert_abs_diff_eq!(lnsd[0], array![0.65, 0.65, 0.65], epsilon = 1e-12);
    }

    #[test]
    fn test_two_models_equal_weights() {
        let _ = env_logger::try_init();
        let mixture = GmpeMixture::from_list(
            vec![constant("A", 1.0, 0.2), constant("B", 1.2, 0.3)],
            &[0.5, 0.5],
        )
        .unwrap();
        let (sites, rup, dists) = contexts();
        let (lnmu, lnsd) = mixture
            .evaluate(&sites, &rup, &dists, Imt::Sa(0.3), &[StdDevType::Total])
            .unwrap();
        assert_abs_diff_eq!(lnmu, array![1.1, 1.1, 1.1], epsilon = 1e-12);
        // 0.5 * (1.0 + 0.04) + 0.5 * (1.44 + 0.09) - 1.21
        let expected = 0.075f64.sqrt();
        assert_abs_diff_eq!(lnsd[0][0], 0.27386, epsilon = 1e-5);
        assert_abs_diff_eq!(
            lnsd[0],
            array![expected, expected, expected],
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_stddev_kinds_computed_independently() {
        let a: Arc<dyn GroundMotionModel> = Arc::new(
            ConstantGmpe::new(
                "A",
                caps(TectonicRegion::ActiveShallowCrust, TARGET_IMC, StdDevSpec::all()),
                1.0,
                0.6,
            )
            .with_stddev(StdDevType::InterEvent, 0.3),
        );
        let b: Arc<dyn GroundMotionModel> = Arc::new(
            ConstantGmpe::new(
                "B",
                caps(TectonicRegion::ActiveShallowCrust, TARGET_IMC, StdDevSpec::all()),
                1.0,
                0.8,
            )
            .with_stddev(StdDevType::InterEvent, 0.4),
        );
        let mixture = GmpeMixture::from_list(vec![a, b], &[0.5, 0.5]).unwrap();
        let (sites, rup, dists) = contexts();
        let (_, lnsd) = mixture
            .evaluate(
                &sites,
                &rup,
                &dists,
                Imt::Pga,
                &[StdDevType::InterEvent, StdDevType::Total],
            )
            .unwrap();
        // same means: variance is the weighted mean of variances
        assert_abs_diff_eq!(lnsd[0][1], (0.5f64 * 0.09 + 0.5 * 0.16).sqrt(), epsilon = 1e-9);
        assert_abs_diff_eq!(lnsd[1][1], (0.5f64 * 0.36 + 0.5 * 0.64).sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_unsupported_stddev_then_valid_request() {
        let a: Arc<dyn GroundMotionModel> = Arc::new(ConstantGmpe::new(
            "A",
            caps(TectonicRegion::ActiveShallowCrust, TARGET_IMC, StdDevSpec::TOTAL),
            1.,
            0.5,
        ));
        let b: Arc<dyn GroundMotionModel> = Arc::new(ConstantGmpe::new(
            "B",
            caps(
                TectonicRegion::ActiveShallowCrust,
                TARGET_IMC,
                StdDevSpec::TOTAL | StdDevSpec::INTRA_EVENT,
            ),
            1.,
            0.5,
        ));
        let mixture = GmpeMixture::from_list(vec![a, b], &[0.5, 0.5]).unwrap();
        let (sites, rup, dists) = contexts();
        let res = mixture.evaluate(&sites, &rup, &dists, Imt::Pga, &[StdDevType::IntraEvent]);
        assert!(matches!(res, Err(MixtureError::UnsupportedRequestError(_))));
        assert_eq!(
            mixture.capabilities().supported_stddev_types(),
            StdDevSpec::TOTAL
        );
        let (lnmu, _) = mixture
            .evaluate(&sites, &rup, &dists, Imt::Pga, &[StdDevType::Total])
            .expect("valid request after a rejected one");
        assert_abs_diff_eq!(lnmu, array![1., 1., 1.], epsilon = 1e-12);
    }

    #[test]
    fn test_unsupported_imt() {
        let mixture = GmpeMixture::from_list(vec![constant("A", 1., 0.5)], &[1.]).unwrap();
        let (sites, rup, dists) = contexts();
        let res = mixture.evaluate(&sites, &rup, &dists, Imt::Pgv, &[StdDevType::Total]);
        assert!(matches!(res, Err(MixtureError::UnsupportedRequestError(_))));
    }

    #[test]
    fn test_no_common_stddev() {
        let a: Arc<dyn GroundMotionModel> = Arc::new(ConstantGmpe::new(
            "A",
            caps(TectonicRegion::ActiveShallowCrust, TARGET_IMC, StdDevSpec::INTER_EVENT),
            1.,
            0.5,
        ));
        let b: Arc<dyn GroundMotionModel> = Arc::new(ConstantGmpe::new(
            "B",
            caps(TectonicRegion::ActiveShallowCrust, TARGET_IMC, StdDevSpec::TOTAL),
            2.,
            0.5,
        ));
        let mixture = GmpeMixture::from_list(vec![a, b], &[0.5, 0.5]).expect("mixture built");
        let (sites, rup, dists) = contexts();
        let res = mixture.evaluate(&sites, &rup, &dists, Imt::Pga, &[StdDevType::Total]);
        assert!(matches!(res, Err(MixtureError::CompatibilityError(_))));
        let (lnmu, lnsd) = mixture
            .evaluate(&sites, &rup, &dists, Imt::Pga, &[])
            .expect("mean only");
        assert_abs_diff_eq!(lnmu, array![1.5, 1.5, 1.5], epsilon = 1e-12);
        assert!(lnsd.is_empty());
    }

    #[test]
    fn test_conversion_in_linear_space() {
        let a: Arc<dyn GroundMotionModel> = Arc::new(ConstantGmpe::new(
            "GeoMean",
            caps(
                TectonicRegion::ActiveShallowCrust,
                Imc::AverageHorizontal,
                StdDevSpec::all(),
            ),
            0.2f64.ln(),
            0.5,
        ));
        let b = constant("Max", 0.3f64.ln(), 0.5);
        let converter = Arc::new(RecordingConverter::default());
        let mixture = GmpeMixture::params(vec![a, b], &[1., 0.])
            .converter(converter.clone())
            .check()
            .unwrap()
            .build()
            .unwrap();
        let (sites, rup, dists) = contexts();
        let (lnmu, lnsd) = mixture
            .evaluate(&sites, &rup, &dists, Imt::Pga, &[StdDevType::Total])
            .unwrap();

        // only the model not already in the target component is converted
        let amplitudes = converter.amplitudes.lock().unwrap();
        assert_eq!(amplitudes.len(), 1);
        assert_abs_diff_eq!(amplitudes[0], array![0.2, 0.2, 0.2], epsilon = 1e-12);
        let sigmas = converter.sigmas.lock().unwrap();
        assert_eq!(sigmas.len(), 1);
        let e = 0.5f64.exp();
        assert_abs_diff_eq!(sigmas[0], array![e, e, e], epsilon = 1e-12);

        let mu = 0.24f64.ln();
        assert_abs_diff_eq!(lnmu, array![mu, mu, mu], epsilon = 1e-12);
        let sd = 0.5 + 1.1f64.ln();
        assert_abs_diff_eq!(lnsd[0], array![sd, sd, sd], epsilon = 1e-12);
    }

    #[test]
    fn test_missing_conversion() {
        let a: Arc<dyn GroundMotionModel> = Arc::new(ConstantGmpe::new(
            "RotD50",
            caps(TectonicRegion::ActiveShallowCrust, Imc::RotD50, StdDevSpec::all()),
            0.,
            0.5,
        ));
        // default identity converter cannot change component
        let mixture = GmpeMixture::from_list(vec![a], &[1.]).unwrap();
        let (sites, rup, dists) = contexts();
        let res = mixture.evaluate(&sites, &rup, &dists, Imt::Pga, &[StdDevType::Total]);
        assert!(matches!(
            res,
            Err(MixtureError::GmpeError(GmpeError::ConversionError(_)))
        ));
    }

    #[test]
    fn test_order_invariance() {
        let (sites, rup, dists) = contexts();
        let models = [
            constant("A", 0.3, 0.5),
            constant("B", -0.4, 0.7),
            constant("C", 0.1, 0.6),
        ];
        let weights = [0.2, 0.5, 0.3];
        let m1 = GmpeMixture::from_list(models.to_vec(), &weights).unwrap();
        let m2 = GmpeMixture::from_list(
            vec![models[2].clone(), models[0].clone(), models[1].clone()],
            &[weights[2], weights[0], weights[1]],
        )
        .unwrap();
        let (mu1, sd1) = m1
            .evaluate(&sites, &rup, &dists, Imt::Pga, &[StdDevType::Total])
            .unwrap();
        let (mu2, sd2) = m2
            .evaluate(&sites, &rup, &dists, Imt::Pga, &[StdDevType::Total])
            .unwrap();
        assert_abs_diff_eq!(mu1, mu2, epsilon = 1e-12);
        assert_abs_diff_eq!(sd1[0], sd2[0], epsilon = 1e-12);
    }

    #[test]
    fn test_negative_variance_is_clamped() {
        // sum_i w_i * m_i^2 - mean^2 rounds to -5.55e-17 here
        let mixture = GmpeMixture::from_list(
            vec![constant("A", 0.7, 0.), constant("B", 0.7, 0.)],
            &[0.3, 0.7],
        )
        .unwrap();
        let (sites, rup, dists) = contexts();
        let (lnmu, lnsd) = mixture
            .evaluate(&sites, &rup, &dists, Imt::Pga, &[StdDevType::Total])
            .unwrap();
        assert_abs_diff_eq!(lnmu, array![0.7, 0.7, 0.7], epsilon = 1e-12);
        assert!(lnsd[0].iter().all(|sd| *sd == 0.));
    }

    #[test]
    fn test_constituent_failure() {
        let failing: Arc<dyn GroundMotionModel> = Arc::new(Failing(caps(
            TectonicRegion::ActiveShallowCrust,
            TARGET_IMC,
            StdDevSpec::all(),
        )));
        let mixture =
            GmpeMixture::from_list(vec![constant("A", 0., 0.5), failing], &[0.5, 0.5]).unwrap();
        let (sites, rup, dists) = contexts();
        match mixture.evaluate(&sites, &rup, &dists, Imt::Pga, &[StdDevType::Total]) {
            Err(MixtureError::GmpeError(GmpeError::ModelError(msg))) => {
                assert_eq!(msg, "coefficients not found")
            }
            _ => panic!("constituent error should be propagated"),
        }
    }

    #[test]
    fn test_missing_context() {
        let a: Arc<dyn GroundMotionModel> = Arc::new(ConstantGmpe::new(
            "A",
            caps(TectonicRegion::ActiveShallowCrust, TARGET_IMC, StdDevSpec::all())
                .distances(DistanceSpec::RRUP),
            0.,
            0.5,
        ));
        let mixture = GmpeMixture::from_list(vec![a], &[1.]).unwrap();
        let (sites, rup, dists) = contexts();
        let res = mixture.evaluate(&sites, &rup, &dists, Imt::Pga, &[StdDevType::Total]);
        assert!(matches!(res, Err(MixtureError::MissingContextError(_))));

        let dists = dists.rrup(array![1., 2.]);
        let res = mixture.evaluate(&sites, &rup, &dists, Imt::Pga, &[StdDevType::Total]);
        assert!(matches!(res, Err(MixtureError::InvalidValueError(_))));
    }

    #[test]
    fn test_depth_flavors() {
        let echo_caps = caps(TectonicRegion::ActiveShallowCrust, TARGET_IMC, StdDevSpec::all())
            .site_params(SiteParamSpec::VS30 | SiteParamSpec::Z1PT0);
        let ask14: Arc<dyn GroundMotionModel> = Arc::new(DepthFlavored::new(
            DepthEcho(echo_caps.clone()),
            Z1pt0Flavor::Ask14,
        ));
        let cy14: Arc<dyn GroundMotionModel> = Arc::new(DepthFlavored::new(
            DepthEcho(echo_caps),
            Z1pt0Flavor::Cy14,
        ));
        let mixture = GmpeMixture::from_list(vec![ask14, cy14], &[0.5, 0.5]).unwrap();
        assert_eq!(
            mixture.capabilities().required_site_params(),
            SiteParamSpec::VS30 | SiteParamSpec::Z1PT0_ASK14 | SiteParamSpec::Z1PT0_CY14
        );

        let (_, rup, dists) = contexts();
        let sites = SitesContext::new(array![760., 400., 180.])
            .z1pt0_flavor(Z1pt0Flavor::Ask14, array![10., 100., 1000.])
            .z1pt0_flavor(Z1pt0Flavor::Cy14, array![1000., 100., 10.]);
        let (lnmu, _) = mixture
            .evaluate(&sites, &rup, &dists, Imt::Pga, &[])
            .unwrap();
        let mid = 100f64.ln();
        assert_abs_diff_eq!(lnmu, array![mid, mid, mid], epsilon = 1e-12);

        // the generic z1pt0 is not enough for flavored models
        let sites = SitesContext::new(array![760.]).z1pt0(array![10.]);
        let res = mixture.evaluate(
            &sites,
            &rup,
            &DistancesContext::new(),
            Imt::Pga,
            &[],
        );
        assert!(matches!(
            res,
            Err(MixtureError::GmpeError(GmpeError::MissingParameter(_)))
        ));
    }

    #[test]
    fn test_nested_depth_flavors() {
        let echo_caps = caps(TectonicRegion::ActiveShallowCrust, TARGET_IMC, StdDevSpec::all())
            .site_params(SiteParamSpec::VS30 | SiteParamSpec::Z1PT0);
        let ask14: Arc<dyn GroundMotionModel> = Arc::new(DepthFlavored::new(
            DepthEcho(echo_caps.clone()),
            Z1pt0Flavor::Ask14,
        ));
        let cy14: Arc<dyn GroundMotionModel> = Arc::new(DepthFlavored::new(
            DepthEcho(echo_caps),
            Z1pt0Flavor::Cy14,
        ));
        let inner: Arc<dyn GroundMotionModel> =
            Arc::new(GmpeMixture::from_list(vec![ask14, cy14], &[0.5, 0.5]).unwrap());
        let outer = GmpeMixture::from_list(vec![inner], &[1.]).unwrap();
        let required = outer.capabilities().required_site_params();
        assert!(!required.contains(SiteParamSpec::Z1PT0));

        // sites built from the declared requirements only
        let sites = SitesContext::new(array![760., 400.])
            .z1pt0_flavor(Z1pt0Flavor::Ask14, array![2f64.exp(), 1f64.exp()])
            .z1pt0_flavor(Z1pt0Flavor::Cy14, array![0f64.exp(), 1f64.exp()]);
        assert!(sites.provides().contains(required));
        let (lnmu, _) = outer
            .evaluate(
                &sites,
                &RuptureContext::new(6.5),
                &DistancesContext::new(),
                Imt::Pga,
                &[],
            )
            .expect("flavored depths reach nested models");
        assert_abs_diff_eq!(lnmu, array![1., 1.], epsilon = 1e-12);
    }

    #[test]
    fn test_nested_mixture() {
        let inner = GmpeMixture::from_list(
            vec![constant("A", 1.0, 0.2), constant("B", 1.2, 0.3)],
            &[0.5, 0.5],
        )
        .unwrap();
        let inner: Arc<dyn GroundMotionModel> = Arc::new(inner);
        let outer =
            GmpeMixture::from_list(vec![inner, constant("C", 1.1, 0.1)], &[0.5, 0.5]).unwrap();
        let (sites, rup, dists) = contexts();
        let (lnmu, lnsd) = outer
            .evaluate(&sites, &rup, &dists, Imt::Pga, &[StdDevType::Total])
            .unwrap();
        assert_abs_diff_eq!(lnmu[0], 1.1, epsilon = 1e-12);
        // 0.5 * (1.21 + 0.075) + 0.5 * (1.21 + 0.01) - 1.21
        assert_abs_diff_eq!(lnsd[0][0], 0.0425f64.sqrt(), epsilon = 1e-9);
        assert!(format!("{outer}").starts_with("Mixture[Active Shallow Crust](0.5*Mixture["));
    }
}
