use linfa::ParamGuard;
use ndarray::{Array1, Zip};
use shakemix_gmpe::*;
use shakemix_mixture::GmpeMixture;
use std::error::Error;
use std::sync::Arc;

/// Simple magnitude-distance-vs30 attenuation law:
/// `ln(y) = c0 + c1 * (mag - 6) - c2 * ln(sqrt(rjb^2 + h^2)) - c3 * ln(vs30 / 760)`
struct Attenuation {
    name: &'static str,
    capabilities: ModelCapabilities,
    coefs: [f64; 5],
    phi: f64,
    tau: f64,
}

impl std::fmt::Display for Attenuation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl GroundMotionModel for Attenuation {
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
    ) -> Result<(Array1<f64>, Vec<Array1<f64>>)> {
        if !self.capabilities.supports_imt(&imt) {
            return Err(GmpeError::UnsupportedImt(format!("{imt} for {self}")));
        }
        let rjb = distances
            .get_rjb()
            .ok_or_else(|| GmpeError::MissingParameter("rjb".to_string()))?;
        let [c0, c1, c2, c3, h] = self.coefs;
        let mag_term = c0 + c1 * (rupture.get_mag() - 6.);
        let mut lnmu = Array1::zeros(sites.len());
        Zip::from(&mut lnmu)
            .and(rjb)
            .and(sites.get_vs30())
            .for_each(|m, &r, &vs30| {
                *m = mag_term - c2 * (r * r + h * h).sqrt().ln() - c3 * (vs30 / 760.).ln()
            });
        let stddevs = stddev_types
            .iter()
            .map(|kind| {
                let sd = match kind {
                    StdDevType::Total => self.phi.hypot(self.tau),
                    StdDevType::InterEvent => self.tau,
                    StdDevType::IntraEvent => self.phi,
                };
                Array1::from_elem(sites.len(), sd)
            })
            .collect();
        Ok((lnmu, stddevs))
    }
}

fn attenuation(
    name: &'static str,
    imc: Imc,
    coefs: [f64; 5],
    phi: f64,
    tau: f64,
) -> Arc<dyn GroundMotionModel> {
    let capabilities = ModelCapabilities::new(TectonicRegion::ActiveShallowCrust, imc)
        .imts(ImtSpec::PGA | ImtSpec::SA)
        .stddev_types(StdDevSpec::all())
        .site_params(SiteParamSpec::VS30)
        .rupture_params(RuptureParamSpec::MAG)
        .distances(DistanceSpec::RJB);
    Arc::new(Attenuation {
        name,
        capabilities,
        coefs,
        phi,
        tau,
    })
}

fn main() -> std::result::Result<(), Box<dyn Error>> {
    let _ = env_logger::try_init();

    let models = vec![
        attenuation("Near", Imc::RotD50, [0.2, 1.1, 1.2, 0.5, 6.], 0.55, 0.35),
        attenuation("Far", Imc::AverageHorizontal, [0.1, 1.0, 1.0, 0.6, 4.5], 0.6, 0.4),
        attenuation(
            "Local",
            Imc::GreaterOfTwoHorizontal,
            [0.3, 1.2, 1.3, 0.4, 7.],
            0.5,
            0.3,
        ),
    ];
    let converter = RatioConverter::new()
        .factors(
            Imc::RotD50,
            Imc::GreaterOfTwoHorizontal,
            ConversionFactors::new(1.1, 1.0)?,
        )
        .factors(
            Imc::AverageHorizontal,
            Imc::GreaterOfTwoHorizontal,
            ConversionFactors::new(1.15, 1.02)?,
        )
        .imt_factors(
            Imc::AverageHorizontal,
            Imc::GreaterOfTwoHorizontal,
            ImtSpec::SA,
            ConversionFactors::new(1.2, 1.03)?,
        );

    let mixture = GmpeMixture::params(models, &[0.4, 0.35, 0.25])
        .converter(Arc::new(converter))
        .check()?
        .build()?;
    println!("{mixture}");

    let sites = SitesContext::new(Array1::from_vec(vec![760., 400., 270., 180.]));
    let distances =
        DistancesContext::new().rjb(Array1::from_vec(vec![1., 10., 50., 150.]));
    let rupture = RuptureContext::new(6.7).rake(0.).dip(90.);

    for imt in [Imt::Pga, Imt::sa(0.3)?, Imt::sa(1.0)?] {
        let (lnmu, lnsd) = mixture.evaluate(
            &sites,
            &rupture,
            &distances,
            imt,
            &[StdDevType::Total],
        )?;
        println!("{imt}");
        println!("  median (g) = {}", lnmu.mapv(f64::exp));
        println!("  sigma (ln) = {}", lnsd[0]);
    }

    Ok(())
}
