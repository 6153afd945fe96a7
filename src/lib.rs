//! `iri-profile` library crate.
//!
//! Vertical electron-density profiles of the ionosphere (60 to 2000 km) in
//! the IRI-90 manner. The binary (`iri`) is a thin wrapper around this library
//! so that:
//!
//! - the profile core is testable without spawning processes
//! - other programs (ray tracers, temperature models) can embed the evaluator
//! - code stays easy to navigate as the project grows
//!
//! Quick use:
//!
//! ```no_run
//! use iri_profile::profile::{ProfileRequest, ResolvedProfile};
//! # fn request() -> ProfileRequest { unimplemented!() }
//! let profile = ResolvedProfile::resolve(&request());
//! let ne = profile.evaluate_many(&[100.0, 200.0, 300.0]);
//! ```

pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod params;
pub mod plot;
pub mod profile;
pub mod report;
