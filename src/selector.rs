//! Nearest-sample selection from per-lap telemetry
//!
//! Given a resolved lap and an in-lap offset, picks the recorded sample closest in time
//! and extracts the published attribute set through typed coercions.
//!
//! Missing telemetry is a *partial* result, not an error: the lap and offset are known,
//! only the motion data is absent. Missing `Time`/`X`/`Y` columns, on the other hand, is
//! a schema problem and surfaces as [`ReplayError::SchemaMismatch`].

use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::provider::Provider;
use crate::resolver::Resolution;
use crate::types::telemetry::{
    BRAKE, DISTANCE, DRS, GEAR, POS_X, POS_Y, RPM, SPEED, THROTTLE, TIME,
};
use crate::types::value::{coerce_brake, coerce_drs, coerce_f64, coerce_i64, parse_seconds};
use crate::types::{SessionKey, TelemetrySample, TelemetryTable};
use crate::{ReplayError, Result};

/// Telemetry of one lap as far as the selector is concerned.
#[derive(Debug, Clone)]
pub enum LapTelemetry {
    Loaded(Arc<TelemetryTable>),
    /// Telemetry could not be loaded or was empty; carries the reason
    Unavailable(String),
}

/// Outcome of sampling one lap.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Selected(TelemetrySample),
    /// Lap context is known but there is no motion sample to report
    PartialNoTelemetry { lap_number: u32, in_lap_offset: f64, reason: String },
}

/// Load telemetry for the lap of a resolution.
///
/// Load failures and empty tables are folded into [`LapTelemetry::Unavailable`].
pub async fn load_lap_telemetry(
    provider: &dyn Provider,
    key: &SessionKey,
    subject: &str,
    lap_number: u32,
) -> LapTelemetry {
    match provider.load_lap_telemetry(key, subject, lap_number).await {
        Ok(table) if table.is_empty() => {
            warn!(subject, lap_number, session = %key, "Telemetry table is empty");
            LapTelemetry::Unavailable(format!(
                "Telemetry data frame is empty for Lap {lap_number}."
            ))
        }
        Ok(table) => {
            debug!(subject, lap_number, rows = table.len(), "Telemetry loaded");
            LapTelemetry::Loaded(Arc::new(table))
        }
        Err(e) => {
            warn!(subject, lap_number, session = %key, error = %e, "Could not load telemetry");
            LapTelemetry::Unavailable(format!(
                "Telemetry data not available for Lap {lap_number}: {e}"
            ))
        }
    }
}

/// Select the sample nearest to the resolution's in-lap offset.
///
/// # Errors
///
/// Returns [`ReplayError::SchemaMismatch`] when the table lacks a time or position column.
pub fn select(telemetry: &LapTelemetry, resolution: &Resolution) -> Result<Selection> {
    let lap_number = resolution.lap.lap_number;
    let offset = resolution.in_lap_offset;
    let partial = |reason: String| Selection::PartialNoTelemetry {
        lap_number,
        in_lap_offset: offset,
        reason,
    };

    let table = match telemetry {
        LapTelemetry::Loaded(table) if !table.is_empty() => table,
        LapTelemetry::Loaded(_) => {
            return Ok(partial(format!("Telemetry data frame is empty for Lap {lap_number}.")));
        }
        LapTelemetry::Unavailable(reason) => return Ok(partial(reason.clone())),
    };

    let missing = table.missing_required();
    if !missing.is_empty() {
        let available = table.column_names();
        error!(lap_number, ?missing, ?available, "Telemetry is missing required columns");
        return Err(ReplayError::SchemaMismatch { missing, available });
    }

    match nearest_row(table, offset) {
        Some((row, time)) => Ok(Selection::Selected(extract_sample(table, row, time))),
        None => Ok(partial(format!("No usable timestamps in telemetry for Lap {lap_number}."))),
    }
}

/// Row whose timestamp is closest to `offset`; ties go to the earliest row.
fn nearest_row(table: &TelemetryTable, offset: f64) -> Option<(usize, f64)> {
    let times = table.column(TIME)?;
    let mut best: Option<(usize, f64, f64)> = None;

    for (row, cell) in times.iter().enumerate() {
        let Some(time) = parse_seconds(cell) else { continue };
        let distance = (time - offset).abs();
        if best.is_none_or(|(_, _, best_distance)| distance < best_distance) {
            best = Some((row, time, distance));
        }
    }

    best.map(|(row, time, _)| (row, time))
}

fn extract_sample(table: &TelemetryTable, row: usize, time: f64) -> TelemetrySample {
    let cell = |name: &str| table.cell(name, row);
    TelemetrySample {
        time,
        x: coerce_f64(cell(POS_X)),
        y: coerce_f64(cell(POS_Y)),
        speed: coerce_f64(cell(SPEED)),
        throttle: coerce_i64(cell(THROTTLE)),
        gear: coerce_i64(cell(GEAR)),
        rpm: coerce_i64(cell(RPM)),
        brake: coerce_brake(cell(BRAKE)),
        drs: coerce_drs(cell(DRS)),
        distance: coerce_f64(cell(DISTANCE)),
    }
}
