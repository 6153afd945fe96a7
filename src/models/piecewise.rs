//! Six-segment electron-density profile.
//!
//! Segments from the top down, selected purely by height:
//!
//! | range          | segment                                          |
//! |----------------|--------------------------------------------------|
//! | `h ≥ HMF2`     | topside (two Epstein transitions)                |
//! | `h ≥ HMF1`     | F2 bottomside Epstein layer / `cosh`             |
//! | `h ≥ HZ`       | F2 bottomside plus F1 square-root correction     |
//! | `h ≥ HEF`      | transition (root-based blend or linear)          |
//! | `h ≥ HME`      | E valley polynomial                              |
//! | below          | D region (two exponential branches)              |
//!
//! Without an F1 region the F2 bottomside reaches down to HZ.
//!
//! Every function here is total: exponent arguments are clipped at
//! [`ARG_MAX`] and square-root arguments at zero.

use crate::domain::{DRegionInputs, DRegionShape, PeakSet, ProfileContext, Segment, ValleyForm};
use crate::fit::valley::valley_polynomial;
use crate::math::epstein::{ARG_MAX, transition as epstein_transition};

/// Topside reference heights (km).
const TOPSIDE_TOP: f64 = 1000.0;
const TOPSIDE_SPAN: f64 = 700.0;
const TOPSIDE_BASE: f64 = 300.0;
const TOPSIDE_KNEE: f64 = 394.5;
const TOPSIDE_KNEE_SCALE: f64 = 100.0;

/// Which segment answers a query at `h`.
pub fn segment_at(ctx: &ProfileContext, h: f64) -> Segment {
    if h >= ctx.peaks.hmf2 {
        Segment::Topside
    } else if h >= ctx.f1_floor() {
        Segment::F2Bottomside
    } else if h >= ctx.boundaries.hz {
        Segment::F1Layer
    } else if h >= ctx.boundaries.hef {
        Segment::Transition
    } else if h >= ctx.peaks.hme {
        Segment::Valley
    } else {
        Segment::DRegion
    }
}

/// Electron density (m⁻³) at `h` km.
pub fn density(ctx: &ProfileContext, h: f64) -> f64 {
    match segment_at(ctx, h) {
        Segment::Topside => topside(ctx, h),
        Segment::F2Bottomside => f2_bottomside(ctx, h),
        Segment::F1Layer => f1_layer(ctx, h),
        Segment::Transition => transition(ctx, h),
        Segment::Valley => valley(ctx, h),
        Segment::DRegion | Segment::LayerFunctions => d_region(ctx, h),
    }
}

/// Bent-type topside above HMF2.
pub fn topside(ctx: &ProfileContext, h: f64) -> f64 {
    let p = &ctx.peaks;
    let s = &ctx.topside;
    let dxdh = (TOPSIDE_TOP - p.hmf2) / TOPSIDE_SPAN;
    let x0 = TOPSIDE_BASE - s.delta;
    let xmx0 = (h - p.hmf2) / dxdh;
    let x = xmx0 + x0;

    let knee = epstein_transition(x, s.beta, TOPSIDE_KNEE) - epstein_transition(x0, s.beta, TOPSIDE_KNEE);
    let base = epstein_transition(x, TOPSIDE_KNEE_SCALE, TOPSIDE_BASE)
        - epstein_transition(x0, TOPSIDE_KNEE_SCALE, TOPSIDE_BASE);
    let y = (s.beta * s.eta * knee + s.zeta * (TOPSIDE_KNEE_SCALE * base - xmx0)) * dxdh;

    p.nmf2 * (-y.clamp(-ARG_MAX, ARG_MAX)).exp()
}

/// F2 bottomside Epstein layer.
pub fn f2_bottomside(ctx: &ProfileContext, h: f64) -> f64 {
    let b = &ctx.bottomside;
    let x = ((ctx.peaks.hmf2 - h) / b.b0).max(0.0);
    let z = x.powf(b.b1).min(ARG_MAX);
    ctx.peaks.nmf2 * (-z).exp() / x.cosh()
}

/// F2 bottomside with the F1 correction term.
pub fn f1_layer(ctx: &ProfileContext, h: f64) -> f64 {
    let b = &ctx.bottomside;
    f2_bottomside(ctx, h) + ctx.peaks.nmf2 * b.c1 * ((ctx.peaks.hmf1 - h).abs() / b.b0).sqrt()
}

/// Intermediate region between the valley top and HZ.
pub fn transition(ctx: &ProfileContext, h: f64) -> f64 {
    let bd = &ctx.boundaries;
    if bd.is_linear() {
        return ctx.peaks.nme + bd.t * (h - bd.hef);
    }
    // Maps [HEF, HZ] onto [HST, HZ] and reuses the F1 curve there.
    let arg = (bd.t * (bd.hz - h + bd.t / 4.0)).max(0.0);
    f1_layer(ctx, bd.hz + bd.t / 2.0 - bd.t.signum() * arg.sqrt())
}

/// E peak and valley between HME and HEF.
pub fn valley(ctx: &ProfileContext, h: f64) -> f64 {
    let p = valley_polynomial(&ctx.valley.coefficients, h - ctx.peaks.hme);
    match ctx.valley.form {
        ValleyForm::Additive => ctx.peaks.nme * (1.0 + p),
        ValleyForm::Exponential => ctx.peaks.nme * p.clamp(-ARG_MAX, ARG_MAX).exp(),
    }
}

/// D region and lower E region below HME.
pub fn d_region(ctx: &ProfileContext, h: f64) -> f64 {
    let p = &ctx.peaks;
    let d = &ctx.d_region;
    if h > d.hdx {
        let depth = d.d1 * (p.hme - h).max(0.0).powf(d.xkk);
        return p.nme * (-depth.min(ARG_MAX)).exp();
    }
    let z = h - p.hmd;
    let fp3 = if z > 0.0 { d.fp30 } else { d.fp3u };
    let exponent = z * (d.fp1 + z * (d.fp2 + z * fp3));
    p.nmd * exponent.clamp(-ARG_MAX, ARG_MAX).exp()
}

/// Coefficients of the D-region segment.
///
/// Below the crossover height `HDX = HMD + f2` the density is a cubic
/// exponential around HMD; above it an exponential in `(HME - h)^xkk`
/// matched to value and slope at HDX and reaching NME at HME.
pub fn d_region_shape(peaks: &PeakSet, inputs: &DRegionInputs) -> DRegionShape {
    let [f1, f2, f3] = inputs.factors;
    let fp1 = f1;
    let fp2 = -fp1 * fp1 / 2.0;
    let fp30 = (-f2 * fp2 - fp1 + 1.0 / f2) / (f2 * f2);
    let fp3u = (-f3 * fp2 - fp1 - 1.0 / f3) / (f3 * f3);
    let hdx = peaks.hmd + f2;

    let x = hdx - peaks.hmd;
    let xdx = peaks.nmd * (x * (fp1 + x * (fp2 + x * fp30))).exp();
    let dxdx = xdx * (fp1 + x * (2.0 * fp2 + 3.0 * x * fp30));

    let x = peaks.hme - hdx;
    let xkk = -dxdx * x / (xdx * (xdx / peaks.nme).ln());
    let d1 = dxdx / (xdx * xkk * x.powf(xkk - 1.0));

    if x > 0.0 && xkk.is_finite() && xkk > 0.0 && d1.is_finite() {
        return DRegionShape { hdx, fp1, fp2, fp30, fp3u, xkk, d1 };
    }

    // Peaks too close (or NmD ≥ NmE): the cubic branch alone up to HME.
    log::debug!("D-region upper branch degenerate (x={x:.2}, xkk={xkk}), using cubic branch only");
    DRegionShape { hdx: peaks.hme, fp1, fp2, fp30, fp3u, xkk: 1.0, d1: 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        BottomsideShape, BoundaryHeights, LINEAR_TRANSITION_HST, TopsideShape, TopsideVariant,
        ValleyShape,
    };
    use crate::params::topside_shape;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn peaks() -> PeakSet {
        PeakSet {
            hmf2: 300.0,
            nmf2: 1e12,
            hmf1: 0.0,
            nmf1: 0.0,
            hme: 105.0,
            nme: 1.5e11,
            hmd: 81.0,
            nmd: 4e8,
        }
    }

    fn linear_ctx() -> ProfileContext {
        let peaks = peaks();
        ProfileContext {
            peaks,
            bottomside: BottomsideShape { b0: 100.0, b1: 3.0, c1: 0.0 },
            topside: topside_shape(100.0, 8.98, 45.0, TopsideVariant::Iri90),
            valley: ValleyShape {
                coefficients: [0.0; 4],
                form: ValleyForm::Additive,
                width: 0.0,
                base_density: peaks.nme,
            },
            boundaries: BoundaryHeights { hef: 105.0, hz: 160.0, hst: LINEAR_TRANSITION_HST, t: 1e9, d: 0.0 },
            d_region: d_region_shape(&peaks, &DRegionInputs::day(4.32)),
            night: false,
        }
    }

    fn rel(a: f64, b: f64) -> f64 {
        (a - b).abs() / a.abs().max(b.abs())
    }

    #[test]
    fn peaks_are_reproduced() {
        let ctx = linear_ctx();
        assert!(rel(density(&ctx, 300.0), 1e12) < 1e-12);
        assert!(rel(f2_bottomside(&ctx, 300.0), 1e12) < 1e-12);
        assert!(rel(d_region(&ctx, 105.0), 1.5e11) < 1e-12);
        assert!(rel(valley(&ctx, 105.0), 1.5e11) < 1e-12);
    }

    #[test]
    fn dispatch_without_f1_uses_hz_as_floor() {
        let ctx = linear_ctx();
        assert_eq!(segment_at(&ctx, 350.0), Segment::Topside);
        assert_eq!(segment_at(&ctx, 200.0), Segment::F2Bottomside);
        assert_eq!(segment_at(&ctx, 160.0), Segment::F2Bottomside);
        assert_eq!(segment_at(&ctx, 159.9), Segment::Transition);
        assert_eq!(segment_at(&ctx, 104.9), Segment::DRegion);
    }

    #[test]
    fn linear_transition_is_a_straight_line() {
        let ctx = linear_ctx();
        assert!(rel(transition(&ctx, 105.0), 1.5e11) < 1e-12);
        assert!(rel(transition(&ctx, 155.0), 1.5e11 + 50.0 * 1e9) < 1e-12);
    }

    #[test]
    fn d_region_branches_meet_at_crossover() {
        let ctx = linear_ctx();
        let hdx = ctx.d_region.hdx;
        assert!(hdx > 81.0 && hdx < 105.0);
        let below = d_region(&ctx, hdx - 1e-7);
        let above = d_region(&ctx, hdx + 1e-7);
        assert!(rel(below, above) < 1e-6);
        // Increasing from HMD up to HME.
        let mut prev = d_region(&ctx, 81.0);
        for i in 1..=24 {
            let v = d_region(&ctx, 81.0 + i as f64);
            assert!(v > prev);
            prev = v;
        }
    }

    #[test]
    fn degenerate_d_region_stays_finite() {
        let mut p = peaks();
        p.nmd = 2e11; // above NME
        let shape = d_region_shape(&p, &DRegionInputs::night());
        assert_eq!(shape.hdx, p.hme);
        let mut ctx = linear_ctx();
        ctx.peaks = p;
        ctx.d_region = shape;
        for h in [40.0, 60.0, 88.0, 104.0] {
            assert!(d_region(&ctx, h).is_finite());
        }
    }

    #[test]
    fn topside_decreases_for_regression_shapes() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..300 {
            let covg: f64 = rng.gen_range(60.0..193.0);
            let fof2: f64 = rng.gen_range(6.0..12.0);
            let mlat: f64 = rng.gen_range(10.0..60.0) * if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            let hmf2: f64 = rng.gen_range(220.0..420.0);

            let mut ctx = linear_ctx();
            ctx.peaks.hmf2 = hmf2;
            ctx.peaks.nmf2 = 1.24e10 * fof2 * fof2;
            ctx.topside = topside_shape(covg, fof2, mlat, TopsideVariant::Iri90);

            let mut h = hmf2;
            let mut prev = topside(&ctx, h);
            assert_eq!(prev, ctx.peaks.nmf2);
            while h < 2000.0 {
                h += if h < hmf2 + 20.0 { 0.5 } else { 5.0 };
                let v = topside(&ctx, h);
                assert!(v < prev, "covg={covg} fof2={fof2} mlat={mlat} hmf2={hmf2} h={h}");
                prev = v;
            }
        }
    }

    #[test]
    fn extreme_heights_are_finite() {
        let mut ctx = linear_ctx();
        ctx.topside = TopsideShape { eta: 0.05, zeta: 0.08, beta: -130.0, delta: -5.0 };
        for h in [-500.0, 0.0, 20.0, 5_000.0, 50_000.0] {
            let v = density(&ctx, h);
            assert!(v.is_finite() && v >= 0.0, "h={h} v={v}");
        }
    }
}
