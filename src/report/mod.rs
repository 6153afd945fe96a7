//! Reporting utilities: evaluated grids and formatted terminal output.

pub mod format;

pub use format::*;

use serde::Serialize;

use crate::domain::{
    GridRow, LayerFunctionSet, ProfileContext, ProfileModel, ResolutionEvent, TemperatureAnchors,
};
use crate::error::AppError;
use crate::params::{Derivation, DerivedParameters};
use crate::profile::ResolvedProfile;

/// Evaluate the profile over `heights` and label every row.
///
/// Densities are computed in parallel; a non-finite density is an error.
pub fn evaluate_grid(profile: &ResolvedProfile, heights: &[f64]) -> Result<Vec<GridRow>, AppError> {
    let densities = profile.evaluate_many(heights);
    let mut out = Vec::with_capacity(heights.len());
    for (&height_km, ne_m3) in heights.iter().zip(densities) {
        if !ne_m3.is_finite() {
            return Err(AppError::non_finite(format!("Non-finite electron density at {height_km:.1} km.")));
        }
        out.push(GridRow {
            height_km,
            segment: profile.segment_at(height_km),
            ne_m3,
            valid: profile.is_valid_height(height_km),
        });
    }
    Ok(out)
}

/// Machine-readable view of a resolved profile (the `params` command).
#[derive(Debug, Clone, Serialize)]
pub struct ParamsReport<'a> {
    pub derived: &'a DerivedParameters,
    pub model: ProfileModel,
    pub context: &'a ProfileContext,
    pub layer: Option<&'a LayerFunctionSet>,
    pub temperature_anchors: TemperatureAnchors,
    pub valid_range_km: (f64, f64),
    pub events: &'a [ResolutionEvent],
}

pub fn params_report<'a>(derivation: &'a Derivation, profile: &'a ResolvedProfile) -> ParamsReport<'a> {
    ParamsReport {
        derived: &derivation.parameters,
        model: profile.model_in_use(),
        context: profile.context(),
        layer: profile.layer(),
        temperature_anchors: profile.temperature_anchors(),
        valid_range_km: profile.valid_range(),
        events: profile.events(),
    }
}
