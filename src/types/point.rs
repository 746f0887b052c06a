//! Resolution status and fully resolved replay points

use serde::{Deserialize, Serialize};
use std::fmt;

use super::TelemetrySample;

/// How confidently a simulated time was mapped onto the lap windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolveStatus {
    /// Target time lies inside a recorded lap
    Resolved,
    /// Simulation is at (or before) the start of the first lap
    BeforeStart,
    /// Simulation has run past the end of the last lap
    AfterFinish,
}

impl ResolveStatus {
    /// Human readable status line used in query reports.
    pub fn message(self) -> &'static str {
        match self {
            ResolveStatus::Resolved => "Data found",
            ResolveStatus::BeforeStart => "Simulation at historical race start (Lap 1, Time 0).",
            ResolveStatus::AfterFinish => "Simulated time is after the historical race finish.",
        }
    }
}

impl fmt::Display for ResolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            ResolveStatus::Resolved => "resolved",
            ResolveStatus::BeforeStart => "beforeStart",
            ResolveStatus::AfterFinish => "afterFinish",
        };
        f.write_str(tag)
    }
}

/// A simulated time mapped onto a lap, together with the nearest recorded sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPoint {
    /// Simulation clock reading the point was resolved for, in seconds
    pub simulated_elapsed: f64,
    pub lap_number: u32,
    /// Offset into the lap in seconds, within `[0, lap duration]`
    pub in_lap_offset: f64,
    pub status: ResolveStatus,
    pub sample: TelemetrySample,
}

/// Source session descriptor carried into entities and reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSession {
    pub year: u16,
    /// Event name as reported by the dataset (falls back to the requested event)
    pub gp: String,
    pub session: String,
}
