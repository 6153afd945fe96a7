//! Closed-form valley fit above the E peak.
//!
//! With `x = h - HME` the relative density in the valley is
//!
//! ```text
//! additive:     N/NmE = 1 + p(x)
//! exponential:  N/NmE = exp(p(x))
//! p(x) = x² (c1 + c2 x + c3 x² + c4 x³)
//! ```
//!
//! so `N(HME) = NmE` and `N'(HME) = 0` hold for any coefficients. The four
//! coefficients follow from four conditions:
//!
//! - `p(a)  = z1` (depth at the deepest point `a`)
//! - `p'(a) = 0`
//! - `p(b)  = 0`  (back at NmE at the valley top `b`)
//! - `p'(b) = s`  (prescribed gradient at the valley top)
//!
//! where `z1 = -depth/100` in the additive form and `ln(1 - depth/100)` in the
//! exponential form (selected by a negative depth).
//!
//! `p'` has the factor `x` and the quartic `5c4 x³ + 4c3 x² + 3c2 x + 2c1`;
//! dividing out the known root `x = a` leaves a quadratic whose roots are the
//! only other candidates for an extremum. A root strictly inside `(0, b)` is a
//! spurious extremum and the caller removes the valley.

use crate::domain::{ValleyForm, ValleyInputs, ValleyShape};

/// Valleys shallower than this (percent) are not modeled.
pub const MIN_DEPTH_PERCENT: f64 = 1.0;

/// Result of [`fit_valley`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValleyFit {
    pub coefficients: [f64; 4],
    pub form: ValleyForm,
    pub spurious_extremum: bool,
}

impl ValleyFit {
    /// `p(x)` for `x = h - HME`.
    pub fn polynomial(&self, x: f64) -> f64 {
        valley_polynomial(&self.coefficients, x)
    }

    /// `N/NmE` at `x = h - HME`.
    pub fn relative_density(&self, x: f64) -> f64 {
        let p = self.polynomial(x);
        match self.form {
            ValleyForm::Additive => 1.0 + p,
            ValleyForm::Exponential => p.exp(),
        }
    }
}

/// `x² (c1 + x (c2 + x (c3 + x c4)))`.
pub fn valley_polynomial(c: &[f64; 4], x: f64) -> f64 {
    x * x * (c[0] + x * (c[1] + x * (c[2] + x * c[3])))
}

/// Fit the valley polynomial.
///
/// `a` is the deepest point and `b` the valley top, both above HME (km);
/// requires `0 < a < b` and `|depth| < 100`.
pub fn fit_valley(a: f64, depth: f64, b: f64, slope: f64) -> ValleyFit {
    let (z1, form) = if depth > 0.0 {
        (-depth / (100.0 * a * a), ValleyForm::Additive)
    } else {
        ((1.0 - depth.abs() / 100.0).ln() / (a * a), ValleyForm::Exponential)
    };

    let z3 = slope / (2.0 * b);
    let z4 = a - b;
    let c4 = 2.0 * (z1 * (b - 2.0 * a) * b + z3 * z4 * a) / (a * b * z4 * z4 * z4);
    let c3 = z1 * (2.0 * b - 3.0 * a) / (a * z4 * z4) - (2.0 * a + b) * c4;
    let c2 = -2.0 * z1 / a - 2.0 * a * c3 - 3.0 * a * a * c4;
    let c1 = z1 - a * (c2 + a * (c3 + a * c4));
    let coefficients = [c1, c2, c3, c4];

    ValleyFit {
        coefficients,
        form,
        spurious_extremum: has_interior_extremum(&coefficients, a, b),
    }
}

fn has_interior_extremum(c: &[f64; 4], a: f64, b: f64) -> bool {
    let [c1, _, c3, c4] = *c;
    if c4 == 0.0 {
        return false;
    }
    // Quadratic factor x² + B x + C of p'(x) / (5 c4 x (x - a)).
    let bq = 4.0 * c3 / (5.0 * c4) + a;
    let cq = -2.0 * c1 / (5.0 * c4 * a);
    let disc = bq * bq / 4.0 - cq;
    if disc < 0.0 {
        return false;
    }

    let inside = |x: f64| x > 0.0 && x < b;
    let root = disc.sqrt();
    let first = -bq / 2.0 + root;
    if inside(first) {
        return true;
    }
    let second = if root.abs() <= 1e-15 {
        // Double root: recover the partner from the product of the roots.
        if first == 0.0 {
            return false;
        }
        cq / first
    } else {
        -bq / 2.0 - root
    };
    inside(second)
}

/// Turn valley inputs into the valley used by the profile.
///
/// Returns the shape and whether a spurious extremum forced its removal.
/// Shallow or geometrically impossible valleys are dropped silently.
pub fn shape_valley(inputs: &ValleyInputs, nme: f64) -> (ValleyShape, bool) {
    let base_density = (1.0 - inputs.depth.abs().min(100.0) / 100.0) * nme;
    let flat = ValleyShape {
        coefficients: [0.0; 4],
        form: if inputs.depth < 0.0 { ValleyForm::Exponential } else { ValleyForm::Additive },
        width: 0.0,
        base_density,
    };

    let usable = inputs.depth.abs() >= MIN_DEPTH_PERCENT
        && inputs.depth.abs() < 100.0
        && inputs.deepest_offset > 0.0
        && inputs.width > inputs.deepest_offset;
    if !usable {
        return (flat, false);
    }

    let fit = fit_valley(inputs.deepest_offset, inputs.depth, inputs.width, inputs.top_gradient);
    let finite = fit.coefficients.iter().all(|c| c.is_finite());
    if fit.spurious_extremum || !finite {
        return (flat, fit.spurious_extremum);
    }

    (
        ValleyShape {
            coefficients: fit.coefficients,
            form: fit.form,
            width: inputs.width,
            base_density,
        },
        false,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn derivative(fit: &ValleyFit, x: f64) -> f64 {
        let h = 1e-6;
        (fit.polynomial(x + h) - fit.polynomial(x - h)) / (2.0 * h)
    }

    #[test]
    fn day_valley_meets_its_conditions() {
        let dela = 4.32;
        let (a, depth, b, s) = (10.5 / dela, 5.0 / dela, 17.8 / dela, 0.016 / dela);
        let fit = fit_valley(a, depth, b, s);

        assert_eq!(fit.form, ValleyForm::Additive);
        assert!(!fit.spurious_extremum);
        assert_eq!(fit.relative_density(0.0), 1.0);
        assert!((fit.relative_density(a) - (1.0 - depth / 100.0)).abs() < 1e-6);
        assert!(derivative(&fit, a).abs() < 1e-6);
        assert!(fit.polynomial(b).abs() < 1e-9);
        assert!((derivative(&fit, b) - s).abs() < 1e-6);
    }

    #[test]
    fn night_valley_uses_exponential_form() {
        let dela = 4.32;
        let (a, depth, b, s) = (28.0, -81.0, 22.0 / dela + 45.0, 0.06);
        let fit = fit_valley(a, depth, b, s);

        assert_eq!(fit.form, ValleyForm::Exponential);
        assert!(!fit.spurious_extremum);
        assert_eq!(fit.relative_density(0.0), 1.0);
        assert!((fit.relative_density(a) - 0.19).abs() < 1e-6);
        assert!(fit.polynomial(b).abs() < 1e-9);
        // Positive everywhere in the span.
        for i in 0..=50 {
            let x = b * i as f64 / 50.0;
            assert!(fit.relative_density(x) > 0.0);
        }
    }

    #[test]
    fn deep_point_low_in_wide_valley_is_spurious() {
        // Deepest point near the bottom of a wide valley: the curve has to
        // overshoot NmE before it comes back down to the top.
        let fit = fit_valley(5.0, 10.0, 20.0, -0.5);
        assert!(fit.spurious_extremum);

        let inputs = ValleyInputs { deepest_offset: 5.0, width: 20.0, depth: 10.0, top_gradient: -0.5 };
        let (shape, spurious) = shape_valley(&inputs, 1e11);
        assert!(spurious);
        assert_eq!(shape.width, 0.0);
    }

    #[test]
    fn shallow_valley_is_not_modeled() {
        let inputs = ValleyInputs { deepest_offset: 5.0, width: 10.0, depth: 0.5, top_gradient: 0.01 };
        let (shape, spurious) = shape_valley(&inputs, 1e11);
        assert!(!spurious);
        assert_eq!(shape.width, 0.0);
        assert!((shape.base_density - 0.995e11).abs() < 1.0);
    }

    #[test]
    fn impossible_geometry_is_dropped() {
        let inputs = ValleyInputs { deepest_offset: 12.0, width: 10.0, depth: 20.0, top_gradient: 0.01 };
        let (shape, spurious) = shape_valley(&inputs, 1e11);
        assert!(!spurious);
        assert_eq!(shape.width, 0.0);
    }
}
