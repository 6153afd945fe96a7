//! Small dense linear solver for the layer-function normal equations.
//!
//! The systems are 4×4 and built from weighted sums of basis products, so the
//! conditioning is dominated by the constraint weights (0.5 … 500). We use
//! Gaussian elimination with row partial pivoting and treat a pivot below
//! [`PIVOT_EPS`] (relative to the largest matrix entry, floored at 1) as a
//! singular system.
//!
//! Nalgebra's LU would also do the job, but it does not expose a pivot
//! threshold and happily returns huge garbage amplitudes for rank-deficient
//! systems, which is exactly the case we have to detect.

use nalgebra::{Matrix4, Vector4};

/// Smallest acceptable pivot magnitude (scaled by `max(1, max |a_ij|)`).
pub const PIVOT_EPS: f64 = 1e-10;

/// Solve `a · x = b`; `None` if the system is singular or the solution is not finite.
pub fn solve_pivoted(a: &Matrix4<f64>, b: &Vector4<f64>) -> Option<Vector4<f64>> {
    let mut a = *a;
    let mut b = *b;
    let n = 4;

    let scale = a.iter().fold(1.0_f64, |m, v| m.max(v.abs()));
    let guard = PIVOT_EPS * scale;

    for col in 0..n {
        // Largest remaining entry in this column becomes the pivot row.
        let mut pivot_row = col;
        for row in (col + 1)..n {
            if a[(row, col)].abs() > a[(pivot_row, col)].abs() {
                pivot_row = row;
            }
        }
        if !(a[(pivot_row, col)].abs() >= guard) {
            return None;
        }
        if pivot_row != col {
            a.swap_rows(col, pivot_row);
            b.swap_rows(col, pivot_row);
        }

        let pivot = a[(col, col)];
        for row in (col + 1)..n {
            let factor = a[(row, col)] / pivot;
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[(row, k)] -= factor * a[(col, k)];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = Vector4::zeros();
    for row in (0..n).rev() {
        let mut acc = b[row];
        for k in (row + 1)..n {
            acc -= a[(row, k)] * x[k];
        }
        x[row] = acc / a[(row, row)];
    }

    x.iter().all(|v| v.is_finite()).then_some(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_well_conditioned_system() {
        let a = Matrix4::new(
            4.0, 1.0, 0.0, 0.0, //
            1.0, 3.0, 1.0, 0.0, //
            0.0, 1.0, 2.0, 1.0, //
            0.0, 0.0, 1.0, 5.0,
        );
        let expected = Vector4::new(1.0, -2.0, 3.0, 0.5);
        let b = a * expected;
        let x = solve_pivoted(&a, &b).unwrap();
        assert!((x - expected).amax() < 1e-12);
    }

    #[test]
    fn needs_row_swap_for_zero_leading_entry() {
        let a = Matrix4::new(
            0.0, 2.0, 0.0, 1.0, //
            3.0, 0.0, 1.0, 0.0, //
            0.0, 1.0, 4.0, 0.0, //
            1.0, 0.0, 0.0, 2.0,
        );
        let expected = Vector4::new(0.25, 1.0, -1.0, 2.0);
        let b = a * expected;
        let x = solve_pivoted(&a, &b).unwrap();
        assert!((x - expected).amax() < 1e-12);
    }

    #[test]
    fn rank_deficient_system_is_singular() {
        let v = Vector4::new(1.0, 2.0, 3.0, 4.0);
        let u = Vector4::new(0.5, -1.0, 0.25, 2.0);
        let a = v * v.transpose() * 500.0 + u * u.transpose() * 3.0;
        let b = v * 7.0;
        assert!(solve_pivoted(&a, &b).is_none());
    }

    #[test]
    fn pivot_guard_scales_with_the_largest_entry() {
        let b = Vector4::new(1.0, 1.0, 1.0, 1.0);
        let small = Matrix4::from_diagonal(&Vector4::new(1.0, 1.0, 1.0, 1e-9));
        let x = solve_pivoted(&small, &b).unwrap();
        assert!((x[3] - 1e9).abs() < 1e-3);

        let large = Matrix4::from_diagonal(&Vector4::new(1e12, 1e12, 1e12, 1e-3));
        assert!(solve_pivoted(&large, &b).is_none());
    }

    #[test]
    fn zero_matrix_is_singular() {
        assert!(solve_pivoted(&Matrix4::zeros(), &Vector4::new(1.0, 0.0, 0.0, 0.0)).is_none());
    }
}
