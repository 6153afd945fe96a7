//! Profile fitting.
//!
//! Responsibilities:
//!
//! - fit the E-valley polynomial (and reject fits with spurious extrema)
//! - resolve the region boundaries, relaxing B1 or dropping the F1 region
//!   when a root search fails
//! - fit the layer-function amplitudes for the alternative representation

pub mod boundary;
pub mod layer_fit;
pub mod valley;

pub use boundary::{Resolution, resolve_boundaries};
pub use layer_fit::{LayerAnchors, fit_layers};
pub use valley::shape_valley;
