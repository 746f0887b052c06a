//! Session identity and lap timing records

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a recorded session: year, event and session code (`R`, `Q`, `FP1`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub year: u16,
    pub event: String,
    pub session: String,
}

impl SessionKey {
    pub fn new(year: u16, event: impl Into<String>, session: impl Into<String>) -> Self {
        Self { year, event: event.into(), session: session.into() }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.year, self.event, self.session)
    }
}

/// One row of a provider lap table.
///
/// Start and lap time are optional because recorded sessions routinely contain laps
/// without timing (pit in/out laps, red flags, retirements).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapRow {
    /// Subject (driver) code, e.g. `VER`
    pub driver: String,
    /// Lap number within the session
    pub lap_number: u32,
    /// Lap start offset in seconds since session start
    #[serde(default)]
    pub lap_start_time: Option<f64>,
    /// Lap duration in seconds
    #[serde(default)]
    pub lap_time: Option<f64>,
}

/// Lap table as returned by a provider for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapTable {
    /// Human readable event name (e.g. `Italian Grand Prix`)
    #[serde(default)]
    pub event_name: String,
    /// Whether the session carries live/official timing support
    #[serde(default = "default_timing_support")]
    pub timing_support: bool,
    /// All lap rows, for every subject
    #[serde(default)]
    pub laps: Vec<LapRow>,
}

impl Default for LapTable {
    fn default() -> Self {
        Self { event_name: String::new(), timing_support: true, laps: Vec::new() }
    }
}

pub(crate) fn default_timing_support() -> bool {
    true
}

/// A lap with usable timing, expressed as a half-open window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LapRecord {
    pub lap_number: u32,
    pub start: f64,
    pub end: f64,
    pub duration: f64,
}

impl LapRecord {
    /// Build a record from a provider row.
    ///
    /// Returns `None` for rows missing a start or a positive, finite lap time.
    pub fn from_row(row: &LapRow) -> Option<Self> {
        let start = row.lap_start_time.filter(|s| s.is_finite())?;
        let duration = row.lap_time.filter(|d| d.is_finite() && *d > 0.0)?;
        if row.lap_number == 0 {
            return None;
        }
        Some(Self { lap_number: row.lap_number, start, end: start + duration, duration })
    }

    /// Whether `target` lies inside `[start, end)`.
    pub fn contains(&self, target: f64) -> bool {
        self.start <= target && target < self.end
    }
}
