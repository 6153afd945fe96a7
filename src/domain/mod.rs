//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - configuration enums (`ProfileModel`, `ThicknessModel`, `TopsideVariant`)
//! - the profile inputs (`PeakSet`, `ShapeInputs`, `ValleyInputs`)
//! - the resolved state (`ProfileContext`, `LayerFunctionSet`) and its diagnostics
//! - the saved profile file (`ProfileFile`)

pub mod types;

pub use types::*;
