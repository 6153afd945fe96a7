//! Input/output helpers.
//!
//! - evaluated-grid CSV export (`export`)
//! - profile JSON read/write (`profile_file`)

pub mod export;
pub mod profile_file;

pub use export::*;
pub use profile_file::*;
