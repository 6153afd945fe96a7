//! Export an evaluated height grid to CSV.
//!
//! One row per height, in grid order, so the file can go straight into a
//! spreadsheet or plotting script.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::GridRow;
use crate::error::AppError;

/// Write the evaluated grid to a CSV file.
pub fn write_profile_csv(path: &Path, rows: &[GridRow]) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_rows(&mut file, rows)
}

fn write_rows(out: &mut impl Write, rows: &[GridRow]) -> Result<(), AppError> {
    writeln!(out, "height_km,segment,ne_m3,ne_cm3,valid")
        .map_err(|e| AppError::input(format!("Failed to write export CSV header: {e}")))?;

    for r in rows {
        writeln!(
            out,
            "{:.3},{},{:.6e},{:.6e},{}",
            r.height_km,
            r.segment.label(),
            r.ne_m3,
            r.ne_m3 * 1e-6,
            r.valid,
        )
        .map_err(|e| AppError::input(format!("Failed to write export CSV row: {e}")))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Segment;

    #[test]
    fn rows_follow_header() {
        let rows = [
            GridRow { height_km: 60.0, segment: Segment::DRegion, ne_m3: 1.5e8, valid: false },
            GridRow { height_km: 300.0, segment: Segment::Topside, ne_m3: 1e12, valid: true },
        ];
        let mut buf = Vec::new();
        write_rows(&mut buf, &rows).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "height_km,segment,ne_m3,ne_cm3,valid\n\
             60.000,d,1.500000e8,1.500000e2,false\n\
             300.000,topside,1.000000e12,1.000000e6,true\n"
        );
    }

    #[test]
    fn csv_lands_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.csv");
        let rows = [GridRow { height_km: 100.0, segment: Segment::Valley, ne_m3: 1e11, valid: true }];
        write_profile_csv(&path, &rows).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().nth(1).unwrap().starts_with("100.000,e-valley,"));
    }

    #[test]
    fn unwritable_path_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("grid.csv");
        let err = write_profile_csv(&path, &[]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
