//! Derivation of the profile request from external scalar inputs.
//!
//! The field model, solar geometry and coefficient maps are not part of this
//! crate; their outputs (dip, modip, zenith angles, sunrise/sunset, foF2,
//! M3000) arrive as plain numbers. This module applies the empirical
//! formulas that turn them into peaks, shapes and valley inputs:
//!
//! - solar activity, season and day/night
//! - E, F2, F1 and D peaks (with direct overrides)
//! - bottomside thickness (table or Gulyaeva), topside shape, valley, D region

pub mod formulas;

use chrono::Datelike;
use serde::Serialize;

use crate::domain::{
    DRegionInputs, ExternalInputs, ModelOptions, PeakSet, ShapeInputs, Thickness, ThicknessModel,
    ValleyInputs, density_from_frequency, frequency_from_density,
};
use crate::error::AppError;
use crate::profile::ProfileRequest;

pub use formulas::*;

/// Valley depth (percent, before the dela division) per season.
const VALLEY_DEPTH_BY_SEASON: [f64; 4] = [5.0, 5.0, 5.0, 10.0];
/// Valley-top gradient (before the dela division) per season.
const VALLEY_GRADIENT_BY_SEASON: [f64; 4] = [0.016, 0.01, 0.016, 0.016];

/// Intermediate values of the derivation, reported alongside the profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DerivedParameters {
    pub day_of_year: u32,
    pub season: u8,
    pub night: bool,
    pub r: f64,
    pub cov: f64,
    pub dela: f64,
    pub dip_latitude: f64,
    pub fo_e: f64,
    pub fo_f2: f64,
    pub m3000: Option<f64>,
    pub fo_f1: f64,
    /// Half-density height over hmF2.
    pub half_density_ratio: f64,
}

/// A validated-ready request plus the values it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Derivation {
    pub request: ProfileRequest,
    pub parameters: DerivedParameters,
}

fn check_inputs(inputs: &ExternalInputs) -> Result<(), AppError> {
    let named = [
        ("hour", inputs.local_hour),
        ("lat", inputs.lat),
        ("mlat", inputs.mlat),
        ("dip", inputs.dip),
        ("modip", inputs.modip),
        ("zenith", inputs.zenith),
        ("noon-zenith", inputs.noon_zenith),
        ("rz12", inputs.rz12),
    ];
    if let Some((name, value)) = named.iter().find(|(_, v)| !v.is_finite()) {
        return Err(AppError::invalid_request(format!("{name} must be finite, got {value}")));
    }
    if !(0.0..=24.0).contains(&inputs.local_hour) {
        return Err(AppError::invalid_request(format!("hour must be within 0..24, got {}", inputs.local_hour)));
    }
    for (name, value) in [("lat", inputs.lat), ("mlat", inputs.mlat), ("dip", inputs.dip), ("modip", inputs.modip)] {
        if value.abs() > 90.0 {
            return Err(AppError::invalid_request(format!("{name} must be within -90..90, got {value}")));
        }
    }
    for (name, value) in [("zenith", inputs.zenith), ("noon-zenith", inputs.noon_zenith)] {
        if !(0.0..=180.0).contains(&value) {
            return Err(AppError::invalid_request(format!("{name} must be within 0..180, got {value}")));
        }
    }
    if inputs.rz12 < 0.0 && -inputs.rz12 < 60.0 {
        return Err(AppError::invalid_request(format!("F10.7 flux {} is below the model range", -inputs.rz12)));
    }
    Ok(())
}

/// Build the profile request for one place and time.
pub fn derive_request(inputs: &ExternalInputs, options: &ModelOptions) -> Result<Derivation, AppError> {
    check_inputs(inputs)?;
    let o = &inputs.overrides;
    let sun = inputs.sun;
    let hour = inputs.local_hour;

    let activity = SolarActivity::from_rz12(inputs.rz12);
    let day_of_year = inputs.date.ordinal();
    let (season, seaday) = season(day_of_year, inputs.lat);
    let night = is_night(hour, sun);
    let dela = dela(inputs.modip);
    let dip_lat = dip_latitude(inputs.dip);

    // E peak.
    let fo_e = match o.nme {
        Some(nme) => frequency_from_density(nme),
        None => fo_e(activity.cov, inputs.zenith, inputs.noon_zenith, inputs.lat.abs()),
    };
    let nme = o.nme.unwrap_or_else(|| density_from_frequency(fo_e));
    let hme = o.hme.unwrap_or(HME);

    // F2 peak.
    let fo_f2 = match (o.nmf2, inputs.fof2) {
        (Some(nmf2), _) => frequency_from_density(nmf2),
        (None, Some(fof2)) => fof2,
        (None, None) => return Err(AppError::input("either --fof2 or --nmf2 is required")),
    };
    let nmf2 = o.nmf2.unwrap_or_else(|| density_from_frequency(fo_f2));
    let hmf2 = match (o.hmf2, inputs.m3000) {
        (Some(hmf2), _) => hmf2,
        (None, Some(m3000)) => hm_f2(dip_lat, activity.rg, fo_f2 / fo_e, m3000),
        (None, None) => return Err(AppError::input("either --m3000 or --hmf2 is required")),
    };

    // F1 peak.
    let fo_f1 = if night || season == 4 { 0.0 } else { fo_f1(dip_lat.abs(), activity.r, inputs.zenith) };
    let nmf1 = match o.nmf1 {
        Some(nmf1) => nmf1,
        None if fo_f1 >= 0.001 => density_from_frequency(fo_f1),
        None => 0.0,
    };
    let hmf1 = o.hmf1.unwrap_or(0.6428 * inputs.zenith + 165.0);

    // D peak.
    let nmd = nm_d(inputs.zenith, activity.r);
    let hmd = hpol(hour, 81.0, 88.0, sun);
    let (day_d, night_d) = (DRegionInputs::day(dela), DRegionInputs::night());
    let d_region = DRegionInputs {
        factors: std::array::from_fn(|i| hpol(hour, day_d.factors[i], night_d.factors[i], sun)),
    };

    // Bottomside thickness.
    let half_density_ratio = if night { night_half_density_ratio(hmf2) } else { half_density_ratio(seaday, inputs.zenith) };
    let thickness = match (o.b0, options.thickness) {
        (Some(b0), _) => Thickness::Fixed { b0 },
        (None, ThicknessModel::Gulyaeva) => Thickness::Gulyaeva { half_thickness: hmf2 * (1.0 - half_density_ratio) },
        (None, ThicknessModel::Table) => Thickness::Fixed { b0: b0_table(hour, sun, season, activity.rg, dela) },
    };

    // Valley.
    let s = usize::from(season) - 1;
    let mut depth = hpol(hour, VALLEY_DEPTH_BY_SEASON[s] / dela, 81.0, sun);
    if depth >= 1.0 && night {
        depth = -depth;
    }
    let valley = ValleyInputs {
        deepest_offset: hpol(hour, 10.5 / dela, 28.0, sun),
        width: hpol(hour, 17.8 / dela, 22.0 / dela + 45.0, sun),
        depth,
        top_gradient: hpol(hour, VALLEY_GRADIENT_BY_SEASON[s] / dela, 0.06, sun),
    };

    let request = ProfileRequest {
        peaks: PeakSet { hmf2, nmf2, hmf1, nmf1, hme, nme, hmd, nmd },
        shape: ShapeInputs {
            thickness,
            c1: 0.11 / dela + 0.09,
            topside: topside_shape(activity.covg, fo_f2, inputs.mlat, options.topside),
            d_region,
            half_density_height: half_density_ratio * hmf2,
            night,
            model: options.model,
        },
        valley,
    };
    log::debug!("derived peaks {:?}", request.peaks);

    Ok(Derivation {
        request,
        parameters: DerivedParameters {
            day_of_year,
            season,
            night,
            r: activity.r,
            cov: activity.cov,
            dela,
            dip_latitude: dip_lat,
            fo_e,
            fo_f2,
            m3000: inputs.m3000,
            fo_f1,
            half_density_ratio,
        },
    })
}
