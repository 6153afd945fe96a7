//! Epstein family of smoothing functions.
//!
//! Every function takes the same triple `(x, scale, center)` and works on the
//! normalized argument `d = (x - center) / scale`:
//!
//! - `transition`: `ln(1 + e^d)`, a smoothed ramp that tends to `0` and `d`
//! - `step`: `1 / (1 + e^-d)`, a smoothed 0 → 1 sigmoid
//! - `peak`: `e^d / (1 + e^d)^2`, a bell curve (derivative of `step` in `d`)
//!
//! Numerical notes:
//! - When `|d|` reaches [`ARG_MAX`] the exponential is never evaluated and the
//!   asymptotic value is returned instead. This keeps every function total.
//! - The layer helpers (`layer_value`, `layer_slope`) are
//!   the basis functions of the layer-function profile representation; each is
//!   anchored at a reference height `xm` (the F2 peak) where `layer_value`
//!   vanishes together with its first derivative.

/// Overflow guard on the normalized argument (natural-log units).
pub const ARG_MAX: f64 = 88.0;

/// Smoothed ramp: `ln(1 + exp((x - center) / scale))`.
pub fn transition(x: f64, scale: f64, center: f64) -> f64 {
    let d = (x - center) / scale;
    if d.abs() >= ARG_MAX {
        return if d > 0.0 { d } else { 0.0 };
    }
    d.exp().ln_1p()
}

/// Smoothed step from 0 to 1 centered on `center`.
pub fn step(x: f64, scale: f64, center: f64) -> f64 {
    let d = (x - center) / scale;
    if d.abs() >= ARG_MAX {
        return if d > 0.0 { 1.0 } else { 0.0 };
    }
    1.0 / ((-d).exp() + 1.0)
}

/// Bell-shaped peak, the derivative of [`step`] with respect to `d`.
pub fn peak(x: f64, scale: f64, center: f64) -> f64 {
    let d = (x - center) / scale;
    if d.abs() >= ARG_MAX {
        return 0.0;
    }
    let e = d.exp();
    e / ((e + 1.0) * (e + 1.0))
}

/// Blend from `below` to `above` with a [`step`] at `center`.
pub fn step_between(above: f64, below: f64, scale: f64, center: f64, x: f64) -> f64 {
    below + (above - below) * step(x, scale, center)
}

/// Layer basis value, normalized so that it and its slope vanish at `xm`.
pub fn layer_value(x: f64, xm: f64, scale: f64, center: f64) -> f64 {
    transition(x, scale, center)
        - transition(xm, scale, center)
        - (x - xm) * step(xm, scale, center) / scale
}

/// First derivative of [`layer_value`] with respect to `x`.
pub fn layer_slope(x: f64, xm: f64, scale: f64, center: f64) -> f64 {
    (step(x, scale, center) - step(xm, scale, center)) / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saturates_beyond_the_guard() {
        assert_eq!(transition(1000.0, 1.0, 0.0), 1000.0);
        assert_eq!(transition(-1000.0, 1.0, 0.0), 0.0);
        assert_eq!(step(500.0, 2.0, 0.0), 1.0);
        assert_eq!(step(-500.0, 2.0, 0.0), 0.0);
        assert_eq!(peak(500.0, 2.0, 0.0), 0.0);
        assert_eq!(peak(-500.0, 2.0, 0.0), 0.0);
    }

    #[test]
    fn central_values() {
        assert!((transition(5.0, 3.0, 5.0) - 2f64.ln()).abs() < 1e-15);
        assert!((step(5.0, 3.0, 5.0) - 0.5).abs() < 1e-15);
        assert!((peak(5.0, 3.0, 5.0) - 0.25).abs() < 1e-15);
    }

    #[test]
    fn continuous_across_the_guard() {
        // Just inside vs. exactly on the guard.
        let inside = transition(87.999, 1.0, 0.0);
        let outside = transition(88.0, 1.0, 0.0);
        assert!((inside - outside).abs() < 1e-2);
        assert!((step(-87.999, 1.0, 0.0) - step(-88.0, 1.0, 0.0)).abs() < 1e-30);
    }

    #[test]
    fn step_is_derivative_of_transition() {
        let (sc, hx) = (7.0, 150.0);
        for &x in &[100.0, 140.0, 150.0, 163.0, 220.0] {
            let h = 1e-4;
            let numeric = (transition(x + h, sc, hx) - transition(x - h, sc, hx)) / (2.0 * h);
            assert!((numeric - step(x, sc, hx) / sc).abs() < 1e-8, "x={x}");
        }
    }

    #[test]
    fn step_between_interpolates() {
        assert!((step_between(10.0, 2.0, 1.0, 0.0, 0.0) - 6.0).abs() < 1e-12);
        assert!((step_between(10.0, 2.0, 1.0, 0.0, 200.0) - 10.0).abs() < 1e-12);
        assert!((step_between(10.0, 2.0, 1.0, 0.0, -200.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn layer_value_is_anchored_at_reference_height() {
        let (xm, sc, hx) = (300.0, 40.0, 270.0);
        assert!(layer_value(xm, xm, sc, hx).abs() < 1e-12);
        assert!(layer_slope(xm, xm, sc, hx).abs() < 1e-12);
    }

    #[test]
    fn layer_derivatives_match_finite_differences() {
        let (xm, sc, hx) = (300.0, 10.0, 180.0);
        let h = 1e-3;
        for &x in &[110.0, 150.0, 180.0, 200.0, 260.0] {
            let d1 = (layer_value(x + h, xm, sc, hx) - layer_value(x - h, xm, sc, hx)) / (2.0 * h);
            assert!((d1 - layer_slope(x, xm, sc, hx)).abs() < 1e-7, "slope at {x}");
            let d2 = (layer_slope(x + h, xm, sc, hx) - layer_slope(x - h, xm, sc, hx)) / (2.0 * h);
            assert!((d2 - peak(x, sc, hx) / (sc * sc)).abs() < 1e-7, "curvature at {x}");
        }
    }
}
