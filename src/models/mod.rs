//! Density models between the D region and the topside.
//!
//! - `piecewise`: six stitched analytic segments
//! - `layer`: a least-squares combination of four layer functions

pub mod layer;
pub mod piecewise;
