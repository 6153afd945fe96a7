//! Modified false-position root finder.
//!
//! Solves `f(x) = target` on a bracket `[x1, x2]` whose end values are already
//! known (the callers always have them at hand, so they are passed in rather
//! than recomputed).
//!
//! The iteration alternates two kinds of step:
//!
//! - a false-position (secant through the bracket ends) step
//! - a partition step that splits the bracket at `1/ng` or `(ng-1)/ng`
//!
//! `ng` doubles whenever the false-position step retained a different end than
//! the preceding partition step, which keeps one end from getting stuck the way
//! plain false position does on convex functions.
//!
//! Termination is guaranteed: the bracket tolerance is relaxed ×10 after every
//! [`RELAX_EVERY`] evaluations without convergence, and the total number of
//! evaluations is capped at [`MAX_EVALUATIONS`].

/// Evaluations between tolerance relaxations.
pub const RELAX_EVERY: usize = 20;

/// Hard ceiling on function evaluations.
pub const MAX_EVALUATIONS: usize = 400;

/// Find `x` in `[x1, x2]` with `f(x) = target`.
///
/// Returns `None` when the seeds do not bracket the target (same sign), when
/// `f` produces a non-finite value, or when the evaluation ceiling is hit.
pub fn find_root<F>(
    x1: f64,
    x2: f64,
    fx1: f64,
    fx2: f64,
    target: f64,
    tolerance: f64,
    mut f: F,
) -> Option<f64>
where
    F: FnMut(f64) -> f64,
{
    let (mut x1, mut x2) = (x1, x2);
    let mut f1 = fx1 - target;
    let mut f2 = fx2 - target;

    if !(f1.is_finite() && f2.is_finite()) || f1 * f2 > 0.0 {
        return None;
    }
    if f1 == 0.0 {
        return Some(x1);
    }
    if f2 == 0.0 {
        return Some(x2);
    }

    let mut tolerance = tolerance;
    let mut ng = 2.0;
    let mut since_relax = 0;
    let mut partition = false;
    let mut partition_kept_lower = false;
    let mut x = (x1 * f2 - x2 * f1) / (f2 - f1);

    for _ in 0..MAX_EVALUATIONS {
        let fx = f(x) - target;
        if !fx.is_finite() {
            return None;
        }
        if fx == 0.0 {
            return Some(x);
        }

        since_relax += 1;
        if since_relax > RELAX_EVERY {
            tolerance *= 10.0;
            since_relax = 0;
        }

        // Same sign as the x1 end: the root lies between x and x2.
        let replaces_x1 = f1 * fx > 0.0;
        partition = !partition;
        if replaces_x1 {
            x1 = x;
            f1 = fx;
        } else {
            x2 = x;
            f2 = fx;
        }

        if (x2 - x1).abs() <= tolerance {
            return Some(x);
        }

        if partition {
            partition_kept_lower = replaces_x1;
            let mut dx = (x2 - x1) / ng;
            if !replaces_x1 {
                dx *= ng - 1.0;
            }
            x = x1 + dx;
        } else {
            if replaces_x1 != partition_kept_lower {
                ng *= 2.0;
            }
            x = (x1 * f2 - x2 * f1) / (f2 - f1);
        }
    }

    None
}
