//! Least-squares fit of the four layer-function amplitudes.
//!
//! The profile between HME and HMF2 is written as
//! `log10(N/NmF2) = Σ A_i · L_i(h)` with fixed heights and scales; the
//! amplitudes come from weighted constraints on values and slopes:
//!
//! - values at the half-density height, the valley top and base, the E peak
//!   and a mirror point below it; by day also the F1 peak
//! - zero slopes at the valley base and the E peak
//!
//! The constraints form a small over-determined system solved through its
//! 4×4 normal equations. When the first layer's amplitude runs away (or the
//! system is singular) the fit is repeated once with an alternate first-layer
//! height.

use nalgebra::{Matrix4, Vector4};

use crate::domain::{LayerFunctionSet, LayerQuality, PeakSet};
use crate::math::epstein::{layer_slope, layer_value, step};
use crate::math::solve_pivoted;

/// Largest acceptable |amplitude| of the first layer function.
pub const MAX_FIRST_AMPLITUDE: f64 = 10.0;

/// Heights (km) and density (m⁻³) anchoring the fit besides the peaks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerAnchors {
    /// F1 anchor height (used by day).
    pub hmf1: f64,
    /// Height where the bottomside reaches NmF2/2.
    pub hhalf: f64,
    /// Valley top.
    pub hv1: f64,
    /// Valley base (deepest point).
    pub hv2: f64,
    /// Density at the valley base.
    pub vne: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConstraintKind {
    Value,
    Slope,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Constraint {
    kind: ConstraintKind,
    height: f64,
    target: f64,
    weight: f64,
}

impl Constraint {
    fn value(height: f64, target: f64, weight: f64) -> Self {
        Self { kind: ConstraintKind::Value, height, target, weight }
    }

    fn slope(height: f64, weight: f64) -> Self {
        Self { kind: ConstraintKind::Slope, height, target: 0.0, weight }
    }
}

/// Constraint set plus the layer geometry it is fitted with.
#[derive(Debug, Clone)]
struct LayerProblem {
    constraints: Vec<Constraint>,
    heights: [f64; 4],
    scales: [f64; 4],
    /// First-layer height for the second attempt.
    alternate_first_height: f64,
}

fn build_problem(peaks: &PeakSet, anchors: &LayerAnchors, night: bool) -> LayerProblem {
    let LayerAnchors { hmf1, hhalf, hv1, hv2, vne } = *anchors;
    let (hmf2, hme) = (peaks.hmf2, peaks.hme);
    let log_nmf2 = peaks.nmf2.log10();
    let e_ratio = peaks.nme.log10() - log_nmf2;
    let valley_ratio = vne.log10() - log_nmf2;
    let half_density = peaks.nmf2 / 2.0;
    let half_ratio = -(2f64.log10());

    let first_scale = ((hmf2 - hhalf) * 0.216 + 56.8) * 0.7;
    let scales = [0.8 * first_scale, 10.0, 9.0, 6.0];

    let mut valley_base_weight = 2.0;
    let (heights, alternate_first_height, half_weight, reference, tail) = if night {
        valley_base_weight = 3.0;
        (
            [hhalf, (hmf2 + hv1) / 2.0, hv2, hme],
            0.4 * hmf2 + 30.0,
            1.0,
            (hhalf, half_density),
            vec![
                Constraint::value(hme - (hv2 - hme), valley_ratio, 0.5),
                Constraint::slope(hv2, 50.0),
                Constraint::slope(hme, 500.0),
            ],
        )
    } else {
        let f1 = peaks.has_f1();
        let f1_ratio = if f1 { peaks.nmf1.log10() - log_nmf2 } else { 0.0 };
        let half_weight = if !f1 {
            1.0
        } else if (peaks.nmf1 - half_density) * (hmf1 - hhalf) < 0.0 {
            0.5
        } else {
            step(half_ratio - f1_ratio, 0.1, 0.15)
        };
        let reference = if f1 && hhalf > hmf1 { (hmf1, peaks.nmf1) } else { (hhalf, half_density) };
        (
            [0.9 * hmf2, if f1 { hmf1 } else { (hmf2 + hhalf) / 2.0 }, hv2, hme - scales[3]],
            hhalf,
            half_weight,
            reference,
            vec![
                Constraint::value(hme - (hv2 - hme), valley_ratio, 1.0),
                Constraint::value(hmf1, f1_ratio, if f1 { 3.0 } else { 0.0 }),
                Constraint::slope(hv2, 50.0),
                Constraint::slope(hme, 500.0),
            ],
        )
    };

    let mut valley_top_weight = 1.0;
    if (hv1 - reference.0) * (peaks.nme - reference.1) < 0.0 || hv1 <= hv2 + 5.0 {
        valley_top_weight = 0.5;
    }

    let mut constraints = vec![
        Constraint::value(hhalf, half_ratio, half_weight),
        Constraint::value(hv1, e_ratio, valley_top_weight),
        Constraint::value(hv2, valley_ratio, valley_base_weight),
        Constraint::value(hme, e_ratio, 5.0),
    ];
    constraints.extend(tail);

    LayerProblem { constraints, heights, scales, alternate_first_height }
}

fn solve_problem(problem: &LayerProblem, hmf2: f64) -> Option<[f64; 4]> {
    let mut normal = Matrix4::<f64>::zeros();
    let mut rhs = Vector4::<f64>::zeros();

    for c in problem.constraints.iter().filter(|c| c.weight != 0.0) {
        let row = Vector4::from_fn(|i, _| {
            let (scale, center) = (problem.scales[i], problem.heights[i]);
            match c.kind {
                ConstraintKind::Value => layer_value(c.height, hmf2, scale, center),
                ConstraintKind::Slope => layer_slope(c.height, hmf2, scale, center),
            }
        });
        normal += c.weight * row * row.transpose();
        rhs += c.weight * c.target * row;
    }

    let amplitudes = solve_pivoted(&normal, &rhs)?;
    Some([amplitudes[0], amplitudes[1], amplitudes[2], amplitudes[3]])
}

/// Fit the layer functions for one profile.
///
/// Never fails: an unsolvable system, or a first amplitude that still runs
/// away with the alternate height, yields zero amplitudes and
/// [`LayerQuality::NoSolution`].
pub fn fit_layers(peaks: &PeakSet, anchors: &LayerAnchors, night: bool) -> LayerFunctionSet {
    let mut problem = build_problem(peaks, anchors, night);

    if let Some(amplitudes) = solve_problem(&problem, peaks.hmf2) {
        if amplitudes[0].abs() <= MAX_FIRST_AMPLITUDE {
            return LayerFunctionSet {
                heights: problem.heights,
                scales: problem.scales,
                amplitudes,
                quality: LayerQuality::Nominal,
            };
        }
    }

    log::debug!(
        "layer fit retried with first height {:.1} km",
        problem.alternate_first_height
    );
    problem.heights[0] = problem.alternate_first_height;
    match solve_problem(&problem, peaks.hmf2) {
        Some(amplitudes) if amplitudes[0].abs() <= MAX_FIRST_AMPLITUDE => LayerFunctionSet {
            heights: problem.heights,
            scales: problem.scales,
            amplitudes,
            quality: LayerQuality::AlternateStart,
        },
        retry => {
            if let Some(amplitudes) = retry {
                log::debug!("layer fit rejected, first amplitude {:.2} after retry", amplitudes[0]);
            }
            LayerFunctionSet {
                heights: problem.heights,
                scales: problem.scales,
                amplitudes: [0.0; 4],
                quality: LayerQuality::NoSolution,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peaks(hmf2: f64, nmf2: f64, nmf1: f64, nme: f64) -> PeakSet {
        PeakSet { hmf2, nmf2, hmf1: 0.0, nmf1, hme: 105.0, nme, hmd: 81.0, nmd: 4e8 }
    }

    fn log_ratio(set: &LayerFunctionSet, hmf2: f64, h: f64) -> f64 {
        (0..4)
            .map(|i| set.amplitudes[i] * layer_value(h, hmf2, set.scales[i], set.heights[i]))
            .sum()
    }

    #[test]
    fn daytime_fit_with_f1_is_nominal() {
        let dela = 4.32;
        let p = peaks(300.0, 1e12, 4e11, 1.5e11);
        let anchors = LayerAnchors {
            hmf1: 200.0,
            hhalf: 225.0,
            hv1: 105.0 + 17.8 / dela,
            hv2: 105.0 + 10.5 / dela,
            vne: 1.5e11 * (1.0 - 5.0 / dela / 100.0),
        };
        let set = fit_layers(&p, &anchors, false);

        assert_eq!(set.quality, LayerQuality::Nominal);
        assert_eq!(set.heights, [270.0, 200.0, anchors.hv2, 99.0]);
        assert!((set.amplitudes[0] + 0.6257).abs() < 1e-3, "{:?}", set.amplitudes);
        assert!(set.amplitudes.iter().all(|a| a.is_finite()));
        // Half density is matched to within a tenth of a decade.
        assert!((log_ratio(&set, 300.0, 225.0) + 2f64.log10()).abs() < 0.1);
    }

    #[test]
    fn nighttime_fit_is_nominal() {
        let p = peaks(320.0, 3e11, 0.0, 3e9);
        let anchors = LayerAnchors {
            hmf1: 0.0,
            hhalf: 250.0,
            hv1: 105.0 + 22.0 / 4.32 + 45.0,
            hv2: 133.0,
            vne: 3e9 * 0.19,
        };
        let set = fit_layers(&p, &anchors, true);

        assert_eq!(set.quality, LayerQuality::Nominal);
        assert_eq!(set.heights[0], 250.0);
        assert!((set.amplitudes[0] + 0.9202).abs() < 1e-3, "{:?}", set.amplitudes);
        assert!((set.amplitudes[2] - 0.6959).abs() < 1e-3);
    }

    #[test]
    fn runaway_first_amplitude_uses_alternate_height() {
        let p = peaks(324.0, 7.7e11, 0.0, 8.5e10);
        let anchors = LayerAnchors { hmf1: 187.0, hhalf: 170.2, hv1: 106.1, hv2: 105.9, vne: 5.5e10 };
        let set = fit_layers(&p, &anchors, false);

        assert_eq!(set.quality, LayerQuality::AlternateStart);
        assert_eq!(set.heights[0], 170.2);
        assert!((set.amplitudes[0] + 3.878).abs() < 1e-2, "{:?}", set.amplitudes);
    }

    #[test]
    fn runaway_after_retry_has_no_solution() {
        let p = peaks(249.3, 1.49e12, 0.0, 1.09e11);
        let anchors = LayerAnchors { hmf1: 187.0, hhalf: 141.1, hv1: 125.8, hv2: 112.2, vne: 8.4e10 };
        let set = fit_layers(&p, &anchors, false);

        assert_eq!(set.quality, LayerQuality::NoSolution);
        assert_eq!(set.amplitudes, [0.0; 4]);
    }

    #[test]
    fn coincident_anchors_have_no_solution() {
        let mut p = peaks(150.0, 1e12, 0.0, 1.5e11);
        p.hme = 150.0;
        let anchors = LayerAnchors { hmf1: 150.0, hhalf: 150.0, hv1: 150.0, hv2: 150.0, vne: 1.5e11 };
        let set = fit_layers(&p, &anchors, false);

        assert_eq!(set.quality, LayerQuality::NoSolution);
        assert_eq!(set.amplitudes, [0.0; 4]);
    }
}
