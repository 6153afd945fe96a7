//! Command-line parsing for the ionospheric profile tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the profile and parameter code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::{ProfileModel, ThicknessModel, TopsideVariant};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "iri", version, about = "Ionospheric electron density profile (IRI-90 style)")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build a profile, print the summary, density table and plot, and optionally export.
    Profile(ProfileArgs),
    /// Print the resolved parameters and events as JSON (useful for scripting).
    Params(ProfileArgs),
    /// Plot a previously exported profile JSON.
    Plot(PlotArgs),
}

/// Place, time and solar/geomagnetic scalars for one profile.
#[derive(Debug, Args, Clone)]
pub struct ProfileArgs {
    /// Date (YYYY-MM-DD).
    #[arg(long)]
    pub date: NaiveDate,

    /// Local time (hours, 0..24).
    #[arg(long)]
    pub hour: f64,

    /// Geographic latitude (deg).
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    /// Magnetic latitude (deg).
    #[arg(long, allow_negative_numbers = true)]
    pub mlat: f64,

    /// Magnetic dip (deg).
    #[arg(long, allow_negative_numbers = true)]
    pub dip: f64,

    /// Modified dip latitude (deg).
    #[arg(long, allow_negative_numbers = true)]
    pub modip: f64,

    /// Solar zenith angle (deg).
    #[arg(long)]
    pub zenith: f64,

    /// Solar zenith angle at local noon (deg).
    #[arg(long = "noon-zenith")]
    pub noon_zenith: f64,

    /// Local sunrise (hours); beyond ±25 means polar day (+) or polar night (-).
    #[arg(long, allow_negative_numbers = true, default_value_t = 6.0)]
    pub sunrise: f64,

    /// Local sunset (hours).
    #[arg(long, allow_negative_numbers = true, default_value_t = 18.0)]
    pub sunset: f64,

    /// 12-month running sunspot number, or -F10.7 when negative.
    #[arg(long, allow_negative_numbers = true)]
    pub rz12: f64,

    /// F2 critical frequency (MHz).
    #[arg(long)]
    pub fof2: Option<f64>,

    /// Propagation factor M(3000)F2.
    #[arg(long)]
    pub m3000: Option<f64>,

    /// Override: F2 peak density (m-3).
    #[arg(long)]
    pub nmf2: Option<f64>,

    /// Override: F2 peak height (km).
    #[arg(long)]
    pub hmf2: Option<f64>,

    /// Override: F1 peak density (m-3); 0 removes the F1 region.
    #[arg(long)]
    pub nmf1: Option<f64>,

    /// Override: F1 anchor height for the layer fit (km).
    #[arg(long)]
    pub hmf1: Option<f64>,

    /// Override: E peak density (m-3).
    #[arg(long)]
    pub nme: Option<f64>,

    /// Override: E peak height (km).
    #[arg(long)]
    pub hme: Option<f64>,

    /// Override: F2 bottomside thickness B0 (km).
    #[arg(long)]
    pub b0: Option<f64>,

    /// Representation between the E and F2 peaks.
    #[arg(long, value_enum, default_value_t = ProfileModel::Piecewise)]
    pub model: ProfileModel,

    /// Source of the bottomside thickness B0.
    #[arg(long, value_enum, default_value_t = ThicknessModel::Table)]
    pub thickness: ThicknessModel,

    /// Topside regression variant.
    #[arg(long, value_enum, default_value_t = TopsideVariant::Iri90)]
    pub topside: TopsideVariant,

    /// Lowest output height (km).
    #[arg(long, default_value_t = 60.0)]
    pub hmin: f64,

    /// Highest output height (km).
    #[arg(long, default_value_t = 1000.0)]
    pub hmax: f64,

    /// Output height step (km).
    #[arg(long, default_value_t = 10.0)]
    pub step: f64,

    /// Render an ASCII plot in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 30)]
    pub height: usize,

    /// Export the evaluated grid to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the profile (resolved state + evaluated grid) to JSON.
    #[arg(long = "export-profile")]
    pub export_profile: Option<PathBuf>,
}

/// Options for plotting a saved profile.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Profile JSON file produced by `iri profile --export-profile`.
    #[arg(long, value_name = "JSON")]
    pub profile: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 30)]
    pub height: usize,
}
