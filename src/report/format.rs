//! Formatted terminal output: run summary, density table, parameter JSON.
//!
//! We keep formatting code in one place so:
//! - the profile code stays free of presentation concerns
//! - output changes are localized (and easy to snapshot in tests)

use crate::domain::{ExternalInputs, GridRow, LayerFunctionSet, frequency_from_density};
use crate::error::AppError;
use crate::params::DerivedParameters;
use crate::profile::ResolvedProfile;
use crate::report::ParamsReport;

/// Format the full run summary (inputs, peaks, shapes, boundaries, events).
pub fn format_run_summary(inputs: &ExternalInputs, derived: &DerivedParameters, profile: &ResolvedProfile) -> String {
    let ctx = profile.context();
    let p = &ctx.peaks;
    let mut out = String::new();

    out.push_str("=== iri - Ionospheric Electron Density Profile ===\n");
    out.push_str(&format!(
        "Date: {} (day {}, season {}) | LT={:.2}h | {}\n",
        inputs.date,
        derived.day_of_year,
        derived.season,
        inputs.local_hour,
        if derived.night { "night" } else { "day" },
    ));
    out.push_str(&format!(
        "Location: lat={:.2} mlat={:.2} dip={:.2} modip={:.2} (dela={:.3})\n",
        inputs.lat, inputs.mlat, inputs.dip, inputs.modip, derived.dela,
    ));
    out.push_str(&format!(
        "Sun: zenith={:.2} noon={:.2} | R12={:.1} cov={:.1}\n",
        inputs.zenith, inputs.noon_zenith, derived.r, derived.cov,
    ));

    out.push_str("\nPeaks:\n");
    out.push_str(&format!("{:<4} {:>10} {:>12} {:>8}\n", "", "h [km]", "N [m-3]", "fo [MHz]"));
    out.push_str(&peak_line("F2", p.hmf2, p.nmf2));
    if p.has_f1() {
        out.push_str(&peak_line("F1", p.hmf1, p.nmf1));
    } else {
        out.push_str("F1   (absent)\n");
    }
    out.push_str(&peak_line("E", p.hme, p.nme));
    out.push_str(&peak_line("D", p.hmd, p.nmd));

    let b = &ctx.bottomside;
    let t = &ctx.topside;
    out.push_str("\nShape:\n");
    out.push_str(&format!("- bottomside: B0={:.2} km B1={:.1} C1={:.4}\n", b.b0, b.b1, b.c1));
    out.push_str(&format!(
        "- topside  : eta={:.5} zeta={:.5} beta={:.2} delta={:.3}\n",
        t.eta, t.zeta, t.beta, t.delta,
    ));
    out.push_str(&format!(
        "- valley   : width={:.2} km base={:.3e} m-3 ({:?})\n",
        ctx.valley.width,
        ctx.valley.base_density,
        ctx.valley.form,
    ));

    let bd = &ctx.boundaries;
    out.push_str("\nBoundaries:\n");
    if bd.is_linear() {
        out.push_str(&format!(
            "- HEF={:.2} km HZ={:.2} km (linear, slope={:.4e} m-3/km)\n",
            bd.hef, bd.hz, bd.t,
        ));
    } else {
        out.push_str(&format!(
            "- HEF={:.2} km HZ={:.2} km HST={:.2} km T={:.3}\n",
            bd.hef, bd.hz, bd.hst, bd.t,
        ));
    }
    let (lo, hi) = profile.valid_range();
    out.push_str(&format!("- valid heights: {lo:.0}..{hi:.0} km\n"));

    out.push_str(&format!("\nModel: {}\n", profile.model_in_use().label()));
    if let Some(set) = profile.layer() {
        out.push_str(&format_layer(set));
    }

    out.push_str("\nEvents:\n");
    if profile.events().is_empty() {
        out.push_str("(none)\n");
    }
    for event in profile.events() {
        out.push_str(&format!("- {event}\n"));
    }

    out
}

fn peak_line(name: &str, h: f64, n: f64) -> String {
    format!("{name:<4} {h:>10.2} {n:>12.4e} {:>8.3}\n", frequency_from_density(n))
}

fn format_layer(set: &LayerFunctionSet) -> String {
    format!(
        "- layer fit: quality={} heights={} amplitudes={}\n",
        set.quality.code(),
        fmt_vec(&set.heights, 2),
        fmt_vec(&set.amplitudes, 5),
    )
}

/// Format the density table for an evaluated grid.
///
/// Rows outside the validity window are marked with `*`.
pub fn format_density_table(rows: &[GridRow]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:>10} {:<10} {:>12} {:>12} {:>9}", "h [km]", "segment", "Ne [m-3]", "Ne [cm-3]", "fo [MHz]"));
    out.push('\n');
    out.push_str(&format!("{:-<10} {:-<10} {:-<12} {:-<12} {:-<9}", "", "", "", "", ""));
    out.push('\n');

    for r in rows {
        let line = format!(
            "{:>10.1} {:<10} {:>12.4e} {:>12.4e} {:>9.3}{}",
            r.height_km,
            r.segment.label(),
            r.ne_m3,
            r.ne_m3 * 1e-6,
            frequency_from_density(r.ne_m3),
            if r.valid { "" } else { " *" },
        );
        out.push_str(line.trim_end());
        out.push('\n');
    }

    if rows.iter().any(|r| !r.valid) {
        out.push_str("* outside the model's validity window\n");
    }
    out
}

/// Pretty JSON for the `params` command.
pub fn format_params_json(report: &ParamsReport<'_>) -> Result<String, AppError> {
    serde_json::to_string_pretty(report).map_err(|e| AppError::input(format!("Failed to encode parameters: {e}")))
}

fn fmt_vec(v: &[f64], decimals: usize) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.decimals$}")).collect();
    format!("[{}]", parts.join(", "))
}
