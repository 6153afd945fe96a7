//! Shared domain types.
//!
//! These types are plain data, serializable so they can be:
//!
//! - passed between the resolver, the fit engine and the evaluator
//! - exported to JSON next to an evaluated height grid
//! - reloaded later for plotting

use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Conversion factor between plasma frequency squared (MHz²) and density (m⁻³).
pub const DENSITY_PER_MHZ2: f64 = 1.24e10;

/// Plasma frequency (MHz) to electron density (m⁻³).
pub fn density_from_frequency(fo_mhz: f64) -> f64 {
    DENSITY_PER_MHZ2 * fo_mhz * fo_mhz
}

/// Electron density (m⁻³) to plasma frequency (MHz).
pub fn frequency_from_density(n: f64) -> f64 {
    (n.max(0.0) / DENSITY_PER_MHZ2).sqrt()
}

/// Which representation answers density queries between the E and F2 peaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProfileModel {
    /// Six stitched analytic segments.
    Piecewise,
    /// One least-squares fit of four layer functions from E peak to F2 peak.
    Layer,
}

impl ProfileModel {
    pub fn label(self) -> &'static str {
        match self {
            ProfileModel::Piecewise => "piecewise",
            ProfileModel::Layer => "layer",
        }
    }
}

/// Source of the F2 bottomside thickness B0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ThicknessModel {
    /// Tabulated by season, latitude band, solar activity and local time.
    Table,
    /// Derived from the half-density height ratio (depends on B1).
    Gulyaeva,
}

/// Topside regression variant (only the eta term differs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TopsideVariant {
    Iri90,
    Iri79,
}

/// Peak heights (km) and densities (m⁻³) of the F2, F1, E and D regions.
///
/// `nmf1 == 0` means there is no F1 region. `hmf1` is the F1 anchor height used
/// by the layer-function fit; the piecewise model solves its own F1 height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakSet {
    pub hmf2: f64,
    pub nmf2: f64,
    pub hmf1: f64,
    pub nmf1: f64,
    pub hme: f64,
    pub nme: f64,
    pub hmd: f64,
    pub nmd: f64,
}

impl PeakSet {
    pub fn has_f1(&self) -> bool {
        self.nmf1 > 0.0
    }
}

/// Normalizing factors for the Gulyaeva thickness at B1 = 3.0, 3.5, … 5.0.
pub const GULYAEVA_B0_FACTORS: [f64; 5] = [0.755566, 0.778596, 0.797332, 0.812928, 0.826146];

/// How B0 is obtained for a given B1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum Thickness {
    /// B0 independent of B1.
    Fixed { b0: f64 },
    /// `B0 = (hmF2 - h0.5) / k(B1)` where `half_thickness = hmF2 - h0.5`.
    Gulyaeva { half_thickness: f64 },
}

impl Thickness {
    /// B0 (km) for the given shape exponent.
    pub fn b0_for(&self, b1: f64) -> f64 {
        match *self {
            Thickness::Fixed { b0 } => b0,
            Thickness::Gulyaeva { half_thickness } => {
                let idx = ((b1 - 3.0) * 2.0).round().clamp(0.0, 4.0) as usize;
                half_thickness / GULYAEVA_B0_FACTORS[idx]
            }
        }
    }
}

/// F2 bottomside Epstein-layer shape plus the F1 correction coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BottomsideShape {
    pub b0: f64,
    pub b1: f64,
    pub c1: f64,
}

/// Topside shape parameters (from solar-flux and magnetic-latitude regressions).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopsideShape {
    pub eta: f64,
    pub zeta: f64,
    pub beta: f64,
    pub delta: f64,
}

/// D-region shape factors `[f1, f2, f3]` (curvature, upper and lower reach).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DRegionInputs {
    pub factors: [f64; 3],
}

impl DRegionInputs {
    pub fn day(dela: f64) -> Self {
        Self { factors: [0.03 / dela + 0.02, 4.6, -11.5] }
    }

    pub fn night() -> Self {
        Self { factors: [0.05, 4.5, -4.0] }
    }
}

/// Everything besides the peaks that shapes the profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeInputs {
    pub thickness: Thickness,
    /// F1 correction coefficient (ignored when there is no F1 region).
    pub c1: f64,
    pub topside: TopsideShape,
    pub d_region: DRegionInputs,
    /// Height where the bottomside falls to half the F2 peak density (km).
    pub half_density_height: f64,
    pub night: bool,
    pub model: ProfileModel,
}

/// Valley description above the E peak.
///
/// A negative `depth` selects the exponential (night) form of the valley fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValleyInputs {
    /// Deepest point above HME (km).
    pub deepest_offset: f64,
    /// Valley width above HME (km); the valley top is `HME + width`.
    pub width: f64,
    /// Depth in percent of NME.
    pub depth: f64,
    /// Density gradient `d(N/NmE)/dh` at the valley top (1/km).
    pub top_gradient: f64,
}

impl ValleyInputs {
    /// No valley: E peak joins the transition segment directly.
    pub fn none() -> Self {
        Self { deepest_offset: 0.0, width: 0.0, depth: 0.0, top_gradient: 0.0 }
    }
}

/// Combination rule for the valley polynomial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValleyForm {
    /// `N = NmE · (1 + p(x))`
    Additive,
    /// `N = NmE · exp(p(x))`
    Exponential,
}

/// Fitted valley between HME and HEF: `p(x) = x²(c1 + c2 x + c3 x² + c4 x³)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValleyShape {
    pub coefficients: [f64; 4],
    pub form: ValleyForm,
    /// Width actually used (0 when the valley was removed).
    pub width: f64,
    /// Density at the valley base (m⁻³).
    pub base_density: f64,
}

/// HST value marking the linear transition fallback.
pub const LINEAR_TRANSITION_HST: f64 = -333.0;

/// Region boundaries between the valley top and the F1 region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryHeights {
    /// Valley top (km).
    pub hef: f64,
    /// Upper end of the transition segment (km).
    pub hz: f64,
    /// Height where the F1 segment reaches NME, or [`LINEAR_TRANSITION_HST`].
    pub hst: f64,
    /// Curvature term (root form) or slope in m⁻³/km (linear form).
    pub t: f64,
    /// Half-width term `HZ - HST` (0 in linear form).
    pub d: f64,
}

impl BoundaryHeights {
    pub fn is_linear(&self) -> bool {
        self.hst < 0.0
    }
}

/// D-region coefficients derived from peaks and [`DRegionInputs`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DRegionShape {
    pub hdx: f64,
    pub fp1: f64,
    pub fp2: f64,
    pub fp30: f64,
    pub fp3u: f64,
    pub xkk: f64,
    pub d1: f64,
}

/// Quality of a layer-function fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerQuality {
    Nominal,
    AlternateStart,
    NoSolution,
}

impl LayerQuality {
    /// Numeric code 0/1/2.
    pub fn code(self) -> u8 {
        match self {
            LayerQuality::Nominal => 0,
            LayerQuality::AlternateStart => 1,
            LayerQuality::NoSolution => 2,
        }
    }
}

/// Four layer functions (height, scale, amplitude) plus fit quality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerFunctionSet {
    pub heights: [f64; 4],
    pub scales: [f64; 4],
    pub amplitudes: [f64; 4],
    pub quality: LayerQuality,
}

/// Resolved parameter state of one profile request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileContext {
    /// Peaks after resolution (F1 removed or re-solved as needed).
    pub peaks: PeakSet,
    pub bottomside: BottomsideShape,
    pub topside: TopsideShape,
    pub valley: ValleyShape,
    pub boundaries: BoundaryHeights,
    pub d_region: DRegionShape,
    pub night: bool,
}

impl ProfileContext {
    /// Lower edge of the F2-bottomside segment: HMF1, or HZ without F1.
    pub fn f1_floor(&self) -> f64 {
        if self.peaks.has_f1() { self.peaks.hmf1 } else { self.boundaries.hz }
    }
}

/// Boundary heights handed to the temperature model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureAnchors {
    pub hef: f64,
    pub hz: f64,
    pub hmf1: f64,
}

/// Which formula produced a density.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    Topside,
    F2Bottomside,
    F1Layer,
    Transition,
    Valley,
    DRegion,
    LayerFunctions,
}

impl Segment {
    pub fn label(self) -> &'static str {
        match self {
            Segment::Topside => "topside",
            Segment::F2Bottomside => "f2-bottom",
            Segment::F1Layer => "f1",
            Segment::Transition => "transition",
            Segment::Valley => "e-valley",
            Segment::DRegion => "d",
            Segment::LayerFunctions => "layer",
        }
    }
}

/// One evaluated height of the output grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridRow {
    pub height_km: f64,
    pub segment: Segment,
    pub ne_m3: f64,
    /// Inside the model's validity window.
    pub valid: bool,
}

/// Degradation steps taken while resolving a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ResolutionEvent {
    SpuriousValleyExtremum,
    F1RootMissing { b1: f64 },
    B1Relaxed { from: f64, to: f64 },
    F1Removed,
    ValleyRootMissing { min_ratio: f64 },
    LinearTransition { hz: f64, hef: f64 },
    LayerAlternateStart,
    LayerNoSolution,
}

impl fmt::Display for ResolutionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionEvent::SpuriousValleyExtremum => {
                write!(f, "valley fit has a spurious extremum, valley removed")
            }
            ResolutionEvent::F1RootMissing { b1 } => {
                write!(f, "no F1-top solution with B1={b1:.1}")
            }
            ResolutionEvent::B1Relaxed { from, to } => write!(f, "B1 relaxed {from:.1} -> {to:.1}"),
            ResolutionEvent::F1Removed => write!(f, "F1 region removed"),
            ResolutionEvent::ValleyRootMissing { min_ratio } => {
                write!(f, "no HST solution (min N/NmE={min_ratio:.3})")
            }
            ResolutionEvent::LinearTransition { hz, hef } => {
                write!(f, "linear transition between HEF={hef:.1} km and HZ={hz:.1} km")
            }
            ResolutionEvent::LayerAlternateStart => {
                write!(f, "layer fit used the alternate first-layer height")
            }
            ResolutionEvent::LayerNoSolution => {
                write!(f, "layer fit has no solution, piecewise profile used")
            }
        }
    }
}

/// Sunrise/sunset situation at the requested place and day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SunCycle {
    Regular { sunrise: f64, sunset: f64 },
    PolarDay,
    PolarNight,
}

impl SunCycle {
    /// Build from local sunrise/sunset hours; `|sunrise| > 25` encodes the
    /// polar cases (positive: sun never sets, negative: never rises).
    pub fn from_hours(sunrise: f64, sunset: f64) -> Self {
        if sunrise.abs() > 25.0 {
            if sunrise > 0.0 { SunCycle::PolarDay } else { SunCycle::PolarNight }
        } else {
            SunCycle::Regular { sunrise, sunset }
        }
    }
}

/// Direct replacements for derived characteristics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PeakOverrides {
    pub nmf2: Option<f64>,
    pub hmf2: Option<f64>,
    pub nmf1: Option<f64>,
    pub hmf1: Option<f64>,
    pub nme: Option<f64>,
    pub hme: Option<f64>,
    pub b0: Option<f64>,
}

/// Scalar outputs of the external collaborators (field model, solar
/// geometry, coefficient maps) for one place and time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExternalInputs {
    pub date: NaiveDate,
    /// Local time (hours).
    pub local_hour: f64,
    /// Geographic latitude (deg).
    pub lat: f64,
    /// Magnetic latitude (deg).
    pub mlat: f64,
    /// Magnetic dip (deg).
    pub dip: f64,
    /// Modified dip latitude (deg).
    pub modip: f64,
    /// Solar zenith angle now and at local noon (deg).
    pub zenith: f64,
    pub noon_zenith: f64,
    pub sun: SunCycle,
    /// 12-month running sunspot number, or `-F10.7` when negative.
    pub rz12: f64,
    /// F2 critical frequency (MHz) and propagation factor.
    pub fof2: Option<f64>,
    pub m3000: Option<f64>,
    pub overrides: PeakOverrides,
}

/// Model switches that are not physical inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOptions {
    pub model: ProfileModel,
    pub thickness: ThicknessModel,
    pub topside: TopsideVariant,
}

/// Output height grid (km).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeightGrid {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl HeightGrid {
    /// Heights from `min` to `max` inclusive (within half a step).
    pub fn heights(&self) -> Vec<f64> {
        let mut out = Vec::new();
        if !(self.step > 0.0) || self.max < self.min {
            return out;
        }
        let n = ((self.max - self.min) / self.step + 0.5).floor() as usize;
        for i in 0..=n {
            out.push(self.min + i as f64 * self.step);
        }
        out
    }
}

/// A full run's configuration as understood by the pipeline.
#[derive(Debug, Clone)]
pub struct ProfileConfig {
    pub inputs: ExternalInputs,
    pub options: ModelOptions,
    pub grid: HeightGrid,
    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
    pub export_csv: Option<PathBuf>,
    pub export_profile: Option<PathBuf>,
}

/// A saved profile file (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileFile {
    pub tool: String,
    pub date: NaiveDate,
    pub local_hour: f64,
    pub model: ProfileModel,
    pub context: ProfileContext,
    pub layer: Option<LayerFunctionSet>,
    pub events: Vec<ResolutionEvent>,
    pub grid: ProfileGrid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileGrid {
    pub height_km: Vec<f64>,
    pub ne_m3: Vec<f64>,
    pub valid: Vec<bool>,
}
