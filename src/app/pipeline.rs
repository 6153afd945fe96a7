//! Shared profile pipeline used by the `profile` and `params` commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! external inputs -> derived request -> validation -> resolution -> evaluated grid
//!
//! The commands can then focus on presentation (summary, JSON, plot, exports).

use crate::domain::{ExternalInputs, GridRow, HeightGrid, ModelOptions, ProfileConfig};
use crate::error::AppError;
use crate::params::{Derivation, derive_request};
use crate::profile::ResolvedProfile;

/// Largest height grid a single run will evaluate.
pub const MAX_GRID_POINTS: usize = 100_000;

/// All computed outputs of a single `iri profile` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub derivation: Derivation,
    pub profile: ResolvedProfile,
    pub rows: Vec<GridRow>,
}

/// Derive, validate and resolve the profile without evaluating a grid.
pub fn resolve_inputs(
    inputs: &ExternalInputs,
    options: &ModelOptions,
) -> Result<(Derivation, ResolvedProfile), AppError> {
    let derivation = derive_request(inputs, options)?;
    derivation.request.validate()?;
    let profile = ResolvedProfile::resolve(&derivation.request);
    Ok((derivation, profile))
}

/// Execute the full pipeline and return the computed outputs.
pub fn run_profile(config: &ProfileConfig) -> Result<RunOutput, AppError> {
    // 1) Check the grid before doing any work.
    let heights = grid_heights(&config.grid)?;

    // 2) Derive and resolve.
    let (derivation, profile) = resolve_inputs(&config.inputs, &config.options)?;

    // 3) Evaluate.
    let rows = crate::report::evaluate_grid(&profile, &heights)?;
    log::info!("evaluated {} heights with the {} model", rows.len(), profile.model_in_use().label());

    Ok(RunOutput { derivation, profile, rows })
}

fn grid_heights(grid: &HeightGrid) -> Result<Vec<f64>, AppError> {
    if !(grid.min.is_finite() && grid.max.is_finite() && grid.step.is_finite()) {
        return Err(AppError::input("Height grid bounds must be finite."));
    }
    if grid.step <= 0.0 {
        return Err(AppError::input(format!("--step must be positive, got {}", grid.step)));
    }
    if grid.max < grid.min {
        return Err(AppError::input(format!("--hmax ({}) is below --hmin ({})", grid.max, grid.min)));
    }
    if (grid.max - grid.min) / grid.step >= MAX_GRID_POINTS as f64 {
        return Err(AppError::input(format!("Height grid exceeds {MAX_GRID_POINTS} points.")));
    }
    Ok(grid.heights())
}
