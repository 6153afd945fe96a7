//! Layer-function representation between HME and HMF2.
//!
//! `N(h) = NmF2 · Π 10^(A_i · L_i(h))` where `L_i` is the layer basis
//! anchored at HMF2 ([`layer_value`]). Above HMF2 the topside and below HME
//! the D region of the piecewise model answer instead.

use crate::domain::{LayerFunctionSet, ProfileContext, Segment};
use crate::math::epstein::layer_value;
use crate::models::piecewise;

/// log10 of the largest factor the product may contribute.
const MAX_LOG10_FACTOR: f64 = 38.0;

pub fn segment_at(ctx: &ProfileContext, h: f64) -> Segment {
    if h >= ctx.peaks.hmf2 {
        Segment::Topside
    } else if h >= ctx.peaks.hme {
        Segment::LayerFunctions
    } else {
        Segment::DRegion
    }
}

/// Electron density (m⁻³) at `h` km.
pub fn density(ctx: &ProfileContext, set: &LayerFunctionSet, h: f64) -> f64 {
    match segment_at(ctx, h) {
        Segment::Topside => piecewise::topside(ctx, h),
        Segment::LayerFunctions => ctx.peaks.nmf2 * 10f64.powf(log10_ratio(ctx, set, h)),
        _ => piecewise::d_region(ctx, h),
    }
}

/// `log10(N / NmF2)` from the layer functions.
pub fn log10_ratio(ctx: &ProfileContext, set: &LayerFunctionSet, h: f64) -> f64 {
    let sum: f64 = (0..4)
        .map(|i| set.amplitudes[i] * layer_value(h, ctx.peaks.hmf2, set.scales[i], set.heights[i]))
        .sum();
    sum.clamp(-MAX_LOG10_FACTOR, MAX_LOG10_FACTOR)
}
