//! Closed-form empirical formulas for the profile's characteristic values.
//!
//! Angles are in degrees, times in local hours, densities in m⁻³.

use crate::domain::{SunCycle, TopsideShape, TopsideVariant};
use crate::math::epstein::{step, step_between};
use crate::math::find_root;

/// Upper limits of the "restricted" solar indices.
pub const MAX_RESTRICTED_SUNSPOT: f64 = 150.0;
pub const MAX_RESTRICTED_FLUX: f64 = 193.0;

/// Fixed E-peak height (km).
pub const HME: f64 = 105.0;
/// Night floor of the D-peak density (m⁻³).
pub const NIGHT_NMD: f64 = 4e8;

/// Half-width (km) of the bracket around the linearized topside offset.
const DELTA_BRACKET: f64 = 50.0;
/// Bracket tolerance (km) of the topside offset search.
const DELTA_TOLERANCE: f64 = 1e-6;

/// B0 table, ordered day/night × season × low/high activity × low/mid modip.
const B0_TABLE: [f64; 32] = [
    114.0, 64.0, 134.0, 77.0, 128.0, 66.0, 75.0, 73.0, 113.0, 115.0, 150.0, 116.0, 138.0, 123.0,
    94.0, 132.0, 72.0, 84.0, 83.0, 89.0, 75.0, 85.0, 57.0, 76.0, 102.0, 100.0, 120.0, 110.0,
    107.0, 103.0, 76.0, 86.0,
];

/// Sunspot number and 10.7 cm flux, plain and restricted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarActivity {
    pub r: f64,
    pub cov: f64,
    pub rg: f64,
    pub covg: f64,
}

impl SolarActivity {
    /// `rz12 >= 0` is a 12-month sunspot number, negative values are `-F10.7`.
    pub fn from_rz12(rz12: f64) -> Self {
        let (r, cov) = if rz12 >= 0.0 {
            (rz12, rz12 * (rz12 * 8.9e-4 + 0.728) + 63.75)
        } else {
            let cov = -rz12;
            (((cov + 85.12).sqrt() - 12.2) * 33.52, cov)
        };
        Self { r, cov, rg: r.min(MAX_RESTRICTED_SUNSPOT), covg: cov.min(MAX_RESTRICTED_FLUX) }
    }
}

/// Season index (1 spring, 2 summer, 3 autumn, 4 winter) and the day number
/// used by seasonal formulas, both shifted by half a year south of the equator.
pub fn season(day_of_year: u32, lat: f64) -> (u8, u32) {
    let mut season = ((day_of_year as f64 + 45.0) / 92.0) as u8;
    if season < 1 {
        season = 4;
    }
    if lat > 0.0 {
        return (season, day_of_year);
    }
    let season = if season > 2 { season - 2 } else { season + 2 };
    let mut seaday = day_of_year + 183;
    if seaday > 366 {
        seaday -= 366;
    }
    (season, seaday)
}

/// Whether `hour` falls between sunset and sunrise.
pub fn is_night(hour: f64, sun: SunCycle) -> bool {
    match sun {
        SunCycle::PolarDay => false,
        SunCycle::PolarNight => true,
        SunCycle::Regular { sunrise, sunset } if sunrise <= sunset => hour > sunset || hour < sunrise,
        SunCycle::Regular { sunrise, sunset } => hour > sunset && hour < sunrise,
    }
}

/// Smooth day/night interpolation with one-hour Epstein steps at sunrise
/// and sunset.
pub fn hpol(hour: f64, day: f64, night: f64, sun: SunCycle) -> f64 {
    match sun {
        SunCycle::PolarDay => day,
        SunCycle::PolarNight => night,
        SunCycle::Regular { sunrise, sunset } => {
            night + (day - night) * step(hour, 1.0, sunrise) + (night - day) * step(hour, 1.0, sunset)
        }
    }
}

/// Low-to-mid latitude blending divisor from the modified dip.
pub fn dela(modip: f64) -> f64 {
    let m = modip.abs();
    if m >= 18.0 { 1.0 + (-(m - 30.0) / 10.0).exp() } else { 4.32 }
}

/// Dip latitude from the magnetic dip.
pub fn dip_latitude(dip: f64) -> f64 {
    (0.5 * dip.to_radians().tan()).atan().to_degrees()
}

/// E-layer critical frequency (MHz).
pub fn fo_e(cov: f64, zenith: f64, noon_zenith: f64, abs_lat: f64) -> f64 {
    let a = 1.0 + 0.0094 * (cov - 66.0);
    let sl = abs_lat.to_radians().cos();
    let (sm, c) = if abs_lat < 32.0 {
        (1.92 * sl - 1.93, 116.0 * sl + 23.0)
    } else {
        (0.11 - 0.49 * sl, 35.0 * sl + 92.0)
    };
    let b = noon_zenith.min(89.999).to_radians().cos().powf(sm);
    let sp = if abs_lat > 12.0 { 1.2 } else { 1.31 };
    // Zenith angle smoothly limited near 90 degrees.
    let xhic = zenith - 3.0 * ((zenith - 89.98) / 3.0).exp().ln_1p();
    let d = xhic.to_radians().cos().powf(sp);

    let smin = (0.121 + 0.0015 * (cov - 60.0)).powi(2);
    (a * b * c * d).max(smin).powf(0.25)
}

/// F2 peak height (km) from M(3000)F2, foF2/foE and the dip latitude.
pub fn hm_f2(dip_lat: f64, rg: f64, fo_ratio: f64, m3000: f64) -> f64 {
    let f1 = 0.00232 * rg + 0.222;
    let f2 = 1.2 - 0.0116 * (0.0239 * rg).exp();
    let f3 = (rg - 25.0) * 0.096 / 150.0;
    let delm = f1 * (1.0 - rg / 150.0 * (-dip_lat * dip_lat / 1600.0).exp()) / (fo_ratio - f2) + f3;
    1490.0 / (m3000 + delm) - 176.0
}

/// F1 critical frequency (MHz); zero beyond the critical zenith angle.
pub fn fo_f1(abs_dip_lat: f64, r: f64, zenith: f64) -> f64 {
    let dla = abs_dip_lat;
    let chi0 = 49.84733 + 0.349504 * dla;
    let chi100 = 38.96113 + 0.509932 * dla;
    let chim = chi0 + (chi100 - chi0) * r / 100.0;
    let cos_chi = zenith.to_radians().cos();
    if zenith > chim || cos_chi <= 0.0 {
        return 0.0;
    }
    let f0 = 4.35 + dla * (0.0058 - 1.2e-4 * dla);
    let f100 = 5.348 + dla * (0.011 - 2.3e-4 * dla);
    let fs = f0 + (f100 - f0) * r / 100.0;
    let xmue = 0.093 + dla * (0.0046 - 5.4e-5 * dla) + 3e-4 * r;
    fs * cos_chi.powf(xmue)
}

/// D-peak density; `NIGHT_NMD` once the sun is low enough.
pub fn nm_d(zenith: f64, r: f64) -> f64 {
    let y = 6.05e8 + 8.8e6 * r;
    let z = (-0.1 / (NIGHT_NMD / y).ln()).powf(0.3704).clamp(-1.0, 1.0);
    let cutoff = z.acos().max(1.0472);
    let x = zenith.to_radians();
    if x > cutoff {
        return NIGHT_NMD;
    }
    y * (-0.1 / x.cos().powf(2.7)).exp()
}

/// Tabulated bottomside thickness B0 (km).
pub fn b0_table(hour: f64, sun: SunCycle, season: u8, rg: f64, dela: f64) -> f64 {
    let s = usize::from(season.clamp(1, 4)) - 1;
    let mut by_activity = [0.0; 2];
    for (activity, slot) in by_activity.iter_mut().enumerate() {
        let mut by_modip = [0.0; 2];
        for (band, value) in by_modip.iter_mut().enumerate() {
            let i = 2 * s + 8 * activity + 16 * band;
            *value = hpol(hour, B0_TABLE[i], B0_TABLE[i + 1], sun);
        }
        *slot = by_modip[0] + (by_modip[1] - by_modip[0]) / dela;
    }
    by_activity[0] + (by_activity[1] - by_activity[0]) / 90.0 * (rg - 10.0)
}

/// Ratio of the half-density height to hmF2 by day (Gulyaeva).
pub fn half_density_ratio(seaday: u32, zenith: f64) -> f64 {
    let sx = 2.0 - (seaday as f64 * 0.017214206).cos();
    step_between(0.8, 0.6, 15.0, 20.0 * sx, zenith)
}

/// Night value of the half-density ratio.
pub fn night_half_density_ratio(hmf2: f64) -> f64 {
    0.91 - hmf2 / 4000.0
}

/// Topside shape parameters from the restricted flux, foF2 and the magnetic
/// latitude.
pub fn topside_shape(covg: f64, fof2: f64, mlat: f64, variant: TopsideVariant) -> TopsideShape {
    let cos2 = mlat.to_radians().cos().powi(2);
    let flu = (covg - 40.0) / 30.0;
    let eta1 = match variant {
        TopsideVariant::Iri79 => -0.0070305 * cos2,
        TopsideVariant::Iri90 => {
            let ex = (-mlat / 15.0).exp();
            -0.02 * 4.0 * ex / ((ex + 1.0) * (ex + 1.0))
        }
    };
    let eta = eta1
        + 0.058798
        + flu * (0.0069724 * cos2 - 0.014065)
        + (0.004281 * cos2 + 0.0024287 - 1.528e-4 * fof2) * fof2;
    let zeta = 0.078922 - 0.0046702 * cos2
        + flu * (0.0076545 * cos2 - 0.019132)
        + (0.006029 * cos2 + 0.0032513 - 2.0872e-4 * fof2) * fof2;
    let beta = 20.253 * cos2 - 128.03
        + flu * (-8.0755 - 0.65896 * cos2)
        + (0.71458 * cos2 + 0.44041 - 0.042966 * fof2) * fof2;

    let z = (94.45 / beta).exp();
    let z1 = z + 1.0;
    let z2 = z / (beta * z1 * z1);
    let estimate = (eta / z1 - zeta / 2.0) / (eta * z2 + zeta / 400.0);
    let delta = flat_peak_delta(eta, zeta, beta, estimate).unwrap_or_else(|| {
        log::debug!("topside delta kept at its linear estimate {estimate:.3}");
        estimate
    });
    TopsideShape { eta, zeta, beta, delta }
}

/// Offset that puts the topside density maximum exactly at HMF2.
///
/// The topside exponent has zero slope at `x0 = 300 - delta` when
/// `eta·S((x0 - 394.5)/beta) = zeta·(1 - S((x0 - 300)/100))`, `S` being the
/// logistic step. The linearized `estimate` seeds the bracket.
fn flat_peak_delta(eta: f64, zeta: f64, beta: f64, estimate: f64) -> Option<f64> {
    let slope = |delta: f64| {
        let x0 = 300.0 - delta;
        eta * step(x0, beta, 394.5) - zeta * (1.0 - step(x0, 100.0, 300.0))
    };
    let (lo, hi) = (estimate - DELTA_BRACKET, estimate + DELTA_BRACKET);
    find_root(lo, hi, slope(lo), slope(hi), 0.0, DELTA_TOLERANCE, slope)
}
