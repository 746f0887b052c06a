//! Synthetic session fixtures for tests and benchmarks
//!
//! Lap tables and telemetry are generated rather than read from disk so tests are
//! hermetic and the numbers in assertions can be worked out by hand.

#![cfg(any(test, feature = "benchmark"))]

use serde_yaml_ng::Value;

use crate::resolver::Resolution;
use crate::types::telemetry::{
    BRAKE, DISTANCE, DRS, GEAR, POS_X, POS_Y, RPM, SPEED, THROTTLE, TIME,
};
use crate::types::{LapRecord, LapRow, LapTable, ResolveStatus, SessionKey, TelemetryTable};

/// Session key used throughout the fixtures.
pub fn monza_key() -> SessionKey {
    SessionKey::new(2023, "Monza", "R")
}

fn row(driver: &str, lap_number: u32, start: f64, lap_time: f64) -> LapRow {
    LapRow {
        driver: driver.to_string(),
        lap_number,
        lap_start_time: Some(start),
        lap_time: Some(lap_time),
    }
}

/// Two laps for `subject`: lap 1 over `[0, 90)` and lap 2 over `[90, 185)`.
pub fn two_lap_table(subject: &str) -> LapTable {
    LapTable {
        event_name: "Italian Grand Prix".to_string(),
        timing_support: true,
        laps: vec![row(subject, 1, 0.0, 90.0), row(subject, 2, 90.0, 95.0)],
    }
}

/// `count` contiguous laps of `lap_time` seconds for `subject`, starting at `first_start`.
pub fn race_table(subject: &str, count: u32, first_start: f64, lap_time: f64) -> LapTable {
    let laps = (0..count)
        .map(|i| row(subject, i + 1, first_start + f64::from(i) * lap_time, lap_time))
        .collect();
    LapTable { event_name: "Italian Grand Prix".to_string(), timing_support: true, laps }
}

/// Telemetry with one sample per second, `Time` running `0..rows`.
///
/// Every other column is a simple function of the row so any sample can be predicted:
/// speed `200 + t`, x `10 t`, y `-5 t`, distance `80 t`, gear `1 + t % 8`, DRS open on
/// even seconds, brake applied every tenth second.
pub fn lap_table_every_second(rows: usize) -> TelemetryTable {
    let column = |f: fn(f64) -> Value| (0..rows).map(|t| f(t as f64)).collect::<Vec<_>>();
    fn every(t: f64, n: i64) -> bool {
        t as i64 % n == 0
    }

    let mut table = TelemetryTable::default();
    table.insert_column(TIME, column(Value::from));
    table.insert_column(POS_X, column(|t| Value::from(10.0 * t)));
    table.insert_column(POS_Y, column(|t| Value::from(-5.0 * t)));
    table.insert_column(SPEED, column(|t| Value::from(200.0 + t)));
    table.insert_column(THROTTLE, column(|t| Value::from(if every(t, 10) { 0 } else { 99 })));
    table.insert_column(GEAR, column(|t| Value::from(1 + t as i64 % 8)));
    table.insert_column(RPM, column(|t| Value::from(10_000 + t as i64)));
    table.insert_column(BRAKE, column(|t| Value::from(every(t, 10))));
    table.insert_column(DRS, column(|t| Value::from(if every(t, 2) { 12 } else { 0 })));
    table.insert_column(DISTANCE, column(|t| Value::from(80.0 * t)));
    table
}

/// A plain in-lap resolution of `lap` at `offset`.
pub fn resolution_at(lap: LapRecord, offset: f64) -> Resolution {
    Resolution {
        lap,
        in_lap_offset: offset,
        status: ResolveStatus::Resolved,
        target: lap.start + offset,
    }
}
