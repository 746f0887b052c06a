//! Per-lap telemetry tables and extracted samples

use serde::{Deserialize, Serialize};
use serde_yaml_ng::Value;
use std::collections::BTreeMap;

/// Column holding the lap-relative timestamp.
pub const TIME: &str = "Time";
/// Column holding the X position.
pub const POS_X: &str = "X";
/// Column holding the Y position.
pub const POS_Y: &str = "Y";
pub const SPEED: &str = "Speed";
pub const THROTTLE: &str = "Throttle";
pub const GEAR: &str = "nGear";
pub const RPM: &str = "RPM";
pub const BRAKE: &str = "Brake";
pub const DRS: &str = "DRS";
pub const DISTANCE: &str = "Distance";

/// Columns that must be present for a table to be sampled at all.
pub const REQUIRED_COLUMNS: [&str; 3] = [TIME, POS_X, POS_Y];

/// Columnar telemetry for a single lap, as delivered by a provider.
///
/// Cells stay untyped until a sample is extracted; see [`crate::types::value`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TelemetryTable {
    columns: BTreeMap<String, Vec<Value>>,
}

impl TelemetryTable {
    pub fn new(columns: BTreeMap<String, Vec<Value>>) -> Self {
        Self { columns }
    }

    /// Number of rows (the length of the longest column).
    pub fn len(&self) -> usize {
        self.columns.values().map(Vec::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Cell at `row` of `name`, if both exist.
    pub fn cell(&self, name: &str, row: usize) -> Option<&Value> {
        self.columns.get(name).and_then(|col| col.get(row))
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.keys().cloned().collect()
    }

    /// Required columns absent from this table.
    pub fn missing_required(&self) -> Vec<String> {
        REQUIRED_COLUMNS.iter().filter(|c| !self.has_column(c)).map(|c| c.to_string()).collect()
    }

    /// Insert or replace a column.
    pub fn insert_column(&mut self, name: impl Into<String>, values: Vec<Value>) {
        self.columns.insert(name.into(), values);
    }
}

/// One telemetry sample with typed attributes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Lap-relative time in seconds
    pub time: f64,
    pub x: f64,
    pub y: f64,
    /// Speed in km/h
    pub speed: f64,
    /// Throttle position, 0-100
    pub throttle: i64,
    pub gear: i64,
    pub rpm: i64,
    /// Brake applied, 0 or 1
    pub brake: u8,
    pub drs: bool,
    /// Cumulative distance in metres
    pub distance: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_deserializes_from_column_mapping() {
        let yaml = "Time: [0.0, 0.5, 1.0]\nX: [1, 2, 3]\nY: [4, 5]\n";
        let table: TelemetryTable = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(table.len(), 3);
        assert!(table.missing_required().is_empty());
        assert!(table.cell(POS_Y, 2).is_none());
        assert_eq!(table.column_names(), vec!["Time", "X", "Y"]);
    }

    #[test]
    fn missing_required_columns_are_listed() {
        let yaml = "Time: [0.0]\nSpeed: [100]\n";
        let table: TelemetryTable = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(table.missing_required(), vec!["X".to_string(), "Y".to_string()]);
    }

    #[test]
    fn empty_table() {
        let table = TelemetryTable::default();
        assert!(table.is_empty());
        assert_eq!(table.missing_required().len(), 3);
    }
}
