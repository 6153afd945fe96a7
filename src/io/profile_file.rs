//! Read/write profile JSON files.
//!
//! A profile file is the portable record of one run:
//! - date, local time and the model that answered the queries
//! - the resolved profile state (peaks, shapes, boundaries) and the layer fit
//! - the degradation events
//! - the evaluated grid, so `plot` works without recomputing
//!
//! The schema is defined by `domain::ProfileFile`.

use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;

use crate::domain::{GridRow, ProfileFile, ProfileGrid};
use crate::error::AppError;
use crate::profile::ResolvedProfile;

/// Tool name stamped into saved files.
pub const TOOL_NAME: &str = "iri";

/// Assemble the saved form of a resolved, evaluated profile.
pub fn build_profile_file(
    date: NaiveDate,
    local_hour: f64,
    profile: &ResolvedProfile,
    rows: &[GridRow],
) -> ProfileFile {
    ProfileFile {
        tool: TOOL_NAME.to_string(),
        date,
        local_hour,
        model: profile.model_in_use(),
        context: *profile.context(),
        layer: profile.layer().copied(),
        events: profile.events().to_vec(),
        grid: ProfileGrid {
            height_km: rows.iter().map(|r| r.height_km).collect(),
            ne_m3: rows.iter().map(|r| r.ne_m3).collect(),
            valid: rows.iter().map(|r| r.valid).collect(),
        },
    }
}

/// Write a profile JSON file.
pub fn write_profile_json(path: &Path, profile: &ProfileFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create profile JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, profile)
        .map_err(|e| AppError::input(format!("Failed to write profile JSON: {e}")))?;
    Ok(())
}

/// Read a profile JSON file.
pub fn read_profile_json(path: &Path) -> Result<ProfileFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open profile JSON '{}': {e}", path.display())))?;
    let profile: ProfileFile =
        serde_json::from_reader(file).map_err(|e| AppError::input(format!("Invalid profile JSON: {e}")))?;

    let n = profile.grid.height_km.len();
    if profile.grid.ne_m3.len() != n || profile.grid.valid.len() != n {
        return Err(AppError::input("Invalid profile JSON: grid columns differ in length"));
    }
    Ok(profile)
}
