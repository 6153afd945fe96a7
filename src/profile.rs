//! Profile evaluation.
//!
//! A [`ProfileRequest`] is resolved once into a [`ResolvedProfile`]; the
//! resolved profile then answers density queries at any height, one at a time
//! or for a whole grid in parallel. Resolution never fails: degraded searches
//! and fits show up in [`ResolvedProfile::events`].

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{
    LayerFunctionSet, LayerQuality, PeakSet, ProfileContext, ProfileModel, ResolutionEvent, Segment,
    ShapeInputs, TemperatureAnchors, Thickness, ValleyInputs,
};
use crate::error::AppError;
use crate::fit::{LayerAnchors, fit_layers, resolve_boundaries};
use crate::models::{layer, piecewise};

/// Lower edge of the model's validity window by day and by night (km).
pub const VALID_MIN_DAY: f64 = 65.0;
pub const VALID_MIN_NIGHT: f64 = 80.0;
/// Upper edge of the validity window (km).
pub const VALID_MAX: f64 = 2000.0;

/// Upper limit for hmF2 imposed by the topside formula (km).
const TOPSIDE_REFERENCE_HEIGHT: f64 = 1000.0;

/// Everything needed to build one profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileRequest {
    pub peaks: PeakSet,
    pub shape: ShapeInputs,
    pub valley: ValleyInputs,
}

impl ProfileRequest {
    /// Reject requests that cannot describe a physical profile.
    pub fn validate(&self) -> Result<(), AppError> {
        let p = &self.peaks;
        let s = &self.shape;
        let v = &self.valley;
        let numbers = [
            p.hmf2, p.nmf2, p.hmf1, p.nmf1, p.hme, p.nme, p.hmd, p.nmd, s.c1, s.half_density_height,
            s.topside.eta, s.topside.zeta, s.topside.beta, s.topside.delta, s.d_region.factors[0],
            s.d_region.factors[1], s.d_region.factors[2], v.deepest_offset, v.width, v.depth,
            v.top_gradient,
        ];
        if numbers.iter().any(|x| !x.is_finite()) {
            return Err(invalid("profile inputs must be finite"));
        }

        if !(p.hme > 0.0 && p.hme < p.hmf2) {
            return Err(invalid(format!("HME ({:.1} km) must lie below HMF2 ({:.1} km)", p.hme, p.hmf2)));
        }
        if p.hmf2 >= TOPSIDE_REFERENCE_HEIGHT {
            return Err(invalid(format!("HMF2 ({:.1} km) must lie below 1000 km", p.hmf2)));
        }
        if !(p.nme > 0.0 && p.nme < p.nmf2) {
            return Err(invalid(format!("NME ({:.3e}) must be positive and below NMF2 ({:.3e})", p.nme, p.nmf2)));
        }
        if p.nmf1 < 0.0 || (p.nmf1 > 0.0 && !(p.nmf1 > p.nme && p.nmf1 < p.nmf2)) {
            return Err(invalid(format!("NMF1 ({:.3e}) must be 0 or between NME and NMF2", p.nmf1)));
        }
        if !(p.nmd > 0.0 && p.nmd < p.nme) || p.hmd >= p.hme {
            return Err(invalid("the D peak must lie below the E peak in height and density"));
        }

        let b0 = match s.thickness {
            Thickness::Fixed { b0 } => b0,
            Thickness::Gulyaeva { half_thickness } => half_thickness,
        };
        if !(b0 > 0.0 && b0.is_finite()) {
            return Err(invalid(format!("bottomside thickness must be positive, got {b0}")));
        }
        if s.c1 < 0.0 {
            return Err(invalid("F1 shape coefficient must not be negative"));
        }
        if v.depth.abs() >= 100.0 || v.width < 0.0 || v.deepest_offset < 0.0 {
            return Err(invalid("valley depth must be within (-100, 100) and its extent non-negative"));
        }
        if p.hme + v.width.max(v.deepest_offset) >= p.hmf2 {
            return Err(invalid(format!(
                "valley top ({:.1} km) must lie below HMF2 ({:.1} km)",
                p.hme + v.width.max(v.deepest_offset),
                p.hmf2
            )));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> AppError {
    AppError::invalid_request(message)
}

/// Fully resolved profile, ready for density queries.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProfile {
    context: ProfileContext,
    layer: Option<LayerFunctionSet>,
    events: Vec<ResolutionEvent>,
}

impl ResolvedProfile {
    /// Resolve boundaries, and fit layer functions when requested.
    ///
    /// Expects a request that passed [`ProfileRequest::validate`].
    pub fn resolve(request: &ProfileRequest) -> Self {
        let resolution = resolve_boundaries(&request.peaks, &request.shape, &request.valley);
        let mut events = resolution.events;
        let context = resolution.context;

        let layer = match request.shape.model {
            ProfileModel::Piecewise => None,
            ProfileModel::Layer => {
                let anchors = LayerAnchors {
                    hmf1: request.peaks.hmf1,
                    hhalf: request.shape.half_density_height,
                    hv1: request.peaks.hme + context.valley.width,
                    hv2: request.peaks.hme + request.valley.deepest_offset,
                    vne: context.valley.base_density,
                };
                let set = fit_layers(&request.peaks, &anchors, request.shape.night);
                let event = match set.quality {
                    LayerQuality::Nominal => None,
                    LayerQuality::AlternateStart => Some(ResolutionEvent::LayerAlternateStart),
                    LayerQuality::NoSolution => Some(ResolutionEvent::LayerNoSolution),
                };
                if let Some(event) = event {
                    log::warn!("{event}");
                    events.push(event);
                }
                Some(set)
            }
        };

        let profile = Self { context, layer, events };
        log::debug!("profile resolved, {} model in use", profile.model_in_use().label());
        profile
    }

    /// The representation answering queries between the E and F2 peaks.
    pub fn model_in_use(&self) -> ProfileModel {
        match self.active_layer() {
            Some(_) => ProfileModel::Layer,
            None => ProfileModel::Piecewise,
        }
    }

    fn active_layer(&self) -> Option<&LayerFunctionSet> {
        self.layer.as_ref().filter(|set| set.quality != LayerQuality::NoSolution)
    }

    /// Electron density (m⁻³) at `height` km.
    pub fn evaluate(&self, height: f64) -> f64 {
        match self.active_layer() {
            Some(set) => layer::density(&self.context, set, height),
            None => piecewise::density(&self.context, height),
        }
    }

    /// Densities for a whole grid, evaluated in parallel.
    pub fn evaluate_many(&self, heights: &[f64]) -> Vec<f64> {
        heights.par_iter().map(|&h| self.evaluate(h)).collect()
    }

    /// Which formula answers a query at `height`.
    pub fn segment_at(&self, height: f64) -> Segment {
        match self.active_layer() {
            Some(_) => layer::segment_at(&self.context, height),
            None => piecewise::segment_at(&self.context, height),
        }
    }

    /// Heights handed to the temperature model.
    pub fn temperature_anchors(&self) -> TemperatureAnchors {
        TemperatureAnchors {
            hef: self.context.boundaries.hef,
            hz: self.context.boundaries.hz,
            hmf1: self.context.f1_floor(),
        }
    }

    /// Validity window `(min, max)` in km.
    pub fn valid_range(&self) -> (f64, f64) {
        valid_range(self.context.night)
    }

    pub fn is_valid_height(&self, height: f64) -> bool {
        let (lo, hi) = self.valid_range();
        (lo..=hi).contains(&height)
    }

    pub fn context(&self) -> &ProfileContext {
        &self.context
    }

    /// Layer-function fit, when the layer model was requested.
    pub fn layer(&self) -> Option<&LayerFunctionSet> {
        self.layer.as_ref()
    }

    pub fn events(&self) -> &[ResolutionEvent] {
        &self.events
    }
}

/// Validity window `(min, max)` in km.
pub fn valid_range(night: bool) -> (f64, f64) {
    (if night { VALID_MIN_NIGHT } else { VALID_MIN_DAY }, VALID_MAX)
}

/// Resolve a profile and evaluate it at `heights` in one call.
///
/// The inputs are taken as given; run [`ProfileRequest::validate`] first when
/// they come from outside.
pub fn resolve_and_evaluate(
    peaks: PeakSet,
    shape: ShapeInputs,
    valley: ValleyInputs,
    heights: &[f64],
) -> Vec<f64> {
    ResolvedProfile::resolve(&ProfileRequest { peaks, shape, valley }).evaluate_many(heights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DRegionInputs, TopsideVariant};
    use crate::params::topside_shape;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const DELA: f64 = 4.32;

    fn peaks() -> PeakSet {
        PeakSet {
            hmf2: 300.0,
            nmf2: 1e12,
            hmf1: 220.0,
            nmf1: 4e11,
            hme: 105.0,
            nme: 1.5e11,
            hmd: 81.0,
            nmd: 4e8,
        }
    }

    fn shape(b0: f64, model: ProfileModel) -> ShapeInputs {
        ShapeInputs {
            thickness: Thickness::Fixed { b0 },
            c1: 0.11 / DELA + 0.09,
            topside: topside_shape(100.0, (1e12f64 / 1.24e10).sqrt(), 45.0, TopsideVariant::Iri90),
            d_region: DRegionInputs::day(DELA),
            half_density_height: 225.0,
            night: false,
            model,
        }
    }

    fn day_valley(dela: f64) -> ValleyInputs {
        ValleyInputs {
            deepest_offset: 10.5 / dela,
            width: 17.8 / dela,
            depth: 5.0 / dela,
            top_gradient: 0.016 / dela,
        }
    }

    fn request(b0: f64, model: ProfileModel) -> ProfileRequest {
        ProfileRequest { peaks: peaks(), shape: shape(b0, model), valley: ValleyInputs::none() }
    }

    fn rel(a: f64, b: f64) -> f64 {
        (a - b).abs() / a.abs().max(b.abs())
    }

    #[test]
    fn reference_scenario_without_valley() {
        let heights = [300.0, 105.0, 150.0];
        let ne = resolve_and_evaluate(peaks(), shape(100.0, ProfileModel::Piecewise), ValleyInputs::none(), &heights);
        assert!(rel(ne[0], 1e12) < 1e-9);
        assert!(rel(ne[1], 1.5e11) < 1e-3);
        assert!(ne[2] > 1.5e11 && ne[2] < 4e11, "Ne(150)={}", ne[2]);
    }

    #[test]
    fn forced_b1_failure_removes_f1() {
        let req = request(400.0, ProfileModel::Piecewise);
        req.validate().unwrap();
        let profile = ResolvedProfile::resolve(&req);

        assert!(profile.events().contains(&ResolutionEvent::B1Relaxed { from: 3.0, to: 3.5 }));
        assert!(profile.events().contains(&ResolutionEvent::F1Removed));
        assert_eq!(profile.context().peaks.hmf1, 0.0);
        assert_eq!(profile.context().peaks.nmf1, 0.0);
        for h in [90.0, 120.0, 180.0, 250.0, 300.0, 600.0] {
            let v = profile.evaluate(h);
            assert!(v.is_finite() && v > 0.0);
        }
    }

    #[test]
    fn parallel_grid_matches_single_queries() {
        let profile = ResolvedProfile::resolve(&request(100.0, ProfileModel::Piecewise));
        let heights: Vec<f64> = (0..400).map(|i| 60.0 + 2.5 * i as f64).collect();
        let grid = profile.evaluate_many(&heights);
        for (h, v) in heights.iter().zip(&grid) {
            assert_eq!(*v, profile.evaluate(*h));
        }
    }

    #[test]
    fn temperature_anchors_follow_resolved_boundaries() {
        let profile = ResolvedProfile::resolve(&request(100.0, ProfileModel::Piecewise));
        let a = profile.temperature_anchors();
        assert_eq!(a.hef, 105.0);
        assert!((a.hz - 195.57).abs() < 0.05);
        assert!((a.hmf1 - 215.79).abs() < 0.05);

        let dropped = ResolvedProfile::resolve(&request(400.0, ProfileModel::Piecewise));
        assert_eq!(dropped.temperature_anchors().hmf1, dropped.temperature_anchors().hz);
    }

    #[test]
    fn layer_model_is_used_when_the_fit_succeeds() {
        let mut req = request(100.0, ProfileModel::Layer);
        req.peaks.hmf1 = 200.0;
        req.valley = day_valley(DELA);
        let profile = ResolvedProfile::resolve(&req);

        assert_eq!(profile.layer().map(|l| l.quality), Some(LayerQuality::Nominal));
        assert_eq!(profile.model_in_use(), ProfileModel::Layer);
        assert_eq!(profile.segment_at(200.0), Segment::LayerFunctions);
        assert!(rel(profile.evaluate(300.0), 1e12) < 1e-9);
        let mid = profile.evaluate(200.0);
        assert!(mid.is_finite() && mid > 1.5e11 && mid < 1e12, "{mid}");
    }

    #[test]
    fn unsolvable_layer_fit_falls_back_to_piecewise() {
        // Without a valley or F1 peak the anchors collapse onto HME and the
        // system is singular.
        let mut req = request(100.0, ProfileModel::Layer);
        req.peaks.nmf1 = 0.0;
        let profile = ResolvedProfile::resolve(&req);

        assert_eq!(profile.layer().map(|l| l.quality), Some(LayerQuality::NoSolution));
        assert_eq!(profile.events().last(), Some(&ResolutionEvent::LayerNoSolution));
        assert_eq!(profile.model_in_use(), ProfileModel::Piecewise);
        assert_ne!(profile.segment_at(150.0), Segment::LayerFunctions);
        assert_eq!(profile.evaluate(150.0), piecewise::density(profile.context(), 150.0));
    }

    #[test]
    fn runaway_layer_fit_falls_back_to_piecewise() {
        let mut req = request(100.0, ProfileModel::Layer);
        req.peaks = PeakSet { hmf2: 232.8, nmf2: 1.954e12, hmf1: 0.0, nmf1: 0.0, nme: 4.23e11, ..peaks() };
        req.shape.half_density_height = 132.8;
        req.valley = ValleyInputs { deepest_offset: 8.4, width: 14.5, depth: 37.9, top_gradient: 0.007 };
        req.validate().unwrap();
        let profile = ResolvedProfile::resolve(&req);

        assert!(!profile.events().contains(&ResolutionEvent::SpuriousValleyExtremum));
        assert_eq!(profile.events().last(), Some(&ResolutionEvent::LayerNoSolution));
        assert_eq!(profile.model_in_use(), ProfileModel::Piecewise);
        for h in [110.0, 130.0, 160.0, 200.0] {
            assert_eq!(profile.evaluate(h), piecewise::density(profile.context(), h));
        }
    }

    #[test]
    fn validity_window_depends_on_night() {
        assert_eq!(valid_range(false), (65.0, 2000.0));
        assert_eq!(valid_range(true), (80.0, 2000.0));
        let profile = ResolvedProfile::resolve(&request(100.0, ProfileModel::Piecewise));
        assert!(profile.is_valid_height(65.0));
        assert!(!profile.is_valid_height(64.9));
        assert!(!profile.is_valid_height(2000.5));
    }

    #[test]
    fn validation_rejects_unphysical_requests() {
        let ok = request(100.0, ProfileModel::Piecewise);
        assert!(ok.validate().is_ok());

        let mut r = ok;
        r.peaks.nme = 2e12;
        assert_eq!(r.validate().unwrap_err().exit_code(), 3);

        let mut r = ok;
        r.peaks.hme = 320.0;
        assert_eq!(r.validate().unwrap_err().exit_code(), 3);

        let mut r = ok;
        r.shape.thickness = Thickness::Fixed { b0: 0.0 };
        assert!(r.validate().is_err());

        let mut r = ok;
        r.peaks.nmf2 = f64::NAN;
        assert!(r.validate().is_err());

        let mut r = ok;
        r.valley.depth = -100.0;
        assert!(r.validate().is_err());
    }

    #[test]
    fn valley_reaching_the_f2_peak_is_rejected() {
        let mut r = request(100.0, ProfileModel::Piecewise);
        r.peaks.hmf2 = 139.66;
        r.peaks.hmf1 = 0.0;
        r.peaks.nmf1 = 0.0;
        r.shape.night = true;
        r.valley = ValleyInputs { deepest_offset: 28.0, width: 53.5, depth: -80.0, top_gradient: 0.06 };
        assert_eq!(r.validate().unwrap_err().exit_code(), 3);

        r.peaks.hmf2 = 180.0;
        assert!(r.validate().is_ok());
        let profile = ResolvedProfile::resolve(&r);
        let b = profile.context().boundaries;
        assert!(b.hef <= b.hz && b.hz <= r.peaks.hmf2, "{b:?}");
        let below = profile.evaluate(r.peaks.hmf2 - 1e-6);
        assert!(rel(below, r.peaks.nmf2) < 1e-6, "{below}");
    }

    #[test]
    fn random_profiles_are_continuous_at_every_boundary() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..300 {
            let night = rng.gen_bool(0.4);
            let dela: f64 = rng.gen_range(1.1..4.32);
            let hmf2: f64 = rng.gen_range(220.0..400.0);
            let nmf2: f64 = rng.gen_range(3e11..2e12);
            let nme = rng.gen_range(0.05..0.3) * nmf2;
            let nmf1 = if night || rng.gen_bool(0.5) { 0.0 } else { rng.gen_range(1.2 * nme..0.8 * nmf2) };
            let b0: f64 = rng.gen_range(60.0..200.0);

            let req = ProfileRequest {
                peaks: PeakSet {
                    hmf2,
                    nmf2,
                    hmf1: 0.0,
                    nmf1,
                    hme: 105.0,
                    nme,
                    hmd: if night { 88.0 } else { 81.0 },
                    nmd: 4e8,
                },
                shape: ShapeInputs {
                    thickness: Thickness::Fixed { b0 },
                    c1: 0.11 / dela + 0.09,
                    topside: topside_shape(100.0, (nmf2 / 1.24e10).sqrt(), 45.0, TopsideVariant::Iri90),
                    d_region: if night { DRegionInputs::night() } else { DRegionInputs::day(dela) },
                    half_density_height: 0.7 * hmf2,
                    night,
                    model: ProfileModel::Piecewise,
                },
                valley: if night {
                    ValleyInputs { deepest_offset: 28.0, width: 22.0 / dela + 45.0, depth: -81.0, top_gradient: 0.06 }
                } else {
                    day_valley(dela)
                },
            };
            req.validate().unwrap();
            let profile = ResolvedProfile::resolve(&req);
            let ctx = profile.context();
            for h in [ctx.peaks.hmf2, ctx.f1_floor(), ctx.boundaries.hz, ctx.boundaries.hef, ctx.peaks.hme] {
                let below = profile.evaluate(h - 1e-7);
                let above = profile.evaluate(h);
                assert!(below > 0.0 && below.is_finite());
                assert!(rel(below, above) < 1e-3, "jump at {h}: {below} vs {above} ({:?})", profile.events());
            }
        }
    }
}
