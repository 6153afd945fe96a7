//! Numerical building blocks: Epstein functions, root finding, small linear solves.

pub mod epstein;
pub mod linsolve;
pub mod regula_falsi;

pub use linsolve::solve_pivoted;
pub use regula_falsi::find_root;
