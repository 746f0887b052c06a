//! Simulated time to lap resolution
//!
//! Maps "seconds since the simulation started" onto the recorded lap windows of one
//! subject. Simulated t = 0 corresponds to the start of the subject's first lap.
//!
//! ```text
//!   firstStart                                         lastEnd
//!      |---- lap 1 ----|----- lap 2 -----|-- lap 3 --|
//!      ^ t=0           ^ t=90                        ^ t >= 185: AfterFinish
//!      BeforeStart
//! ```
//!
//! Resolution is pure: it never touches the dataset cache, and its failures are scoped
//! to the tick or request that triggered them.

use tracing::{error, trace};

use crate::clock::clamp_elapsed;
use crate::lap_index::LapWindowIndex;
use crate::types::{LapRecord, ResolveStatus, ResolvedPoint, TelemetrySample};
use crate::{ReplayError, Result};

/// Distance kept from the end of the last lap when the simulation ran past it.
pub const FINISH_EPSILON: f64 = 0.001;

/// Overlaps and gaps between consecutive laps up to this size are absorbed.
pub const WINDOW_TOLERANCE: f64 = 0.001;

/// A simulated time mapped onto one lap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub lap: LapRecord,
    /// Offset into the lap in seconds, within `[0, lap.duration]`
    pub in_lap_offset: f64,
    pub status: ResolveStatus,
    /// Historical session offset the simulated time mapped to
    pub target: f64,
}

impl Resolution {
    fn new(lap: LapRecord, offset: f64, status: ResolveStatus, target: f64) -> Self {
        let in_lap_offset = if offset.is_nan() { 0.0 } else { offset.clamp(0.0, lap.duration) };
        Self { lap, in_lap_offset, status, target }
    }

    /// Attach the sampled telemetry, producing a publishable point.
    pub fn with_sample(&self, simulated_elapsed: f64, sample: TelemetrySample) -> ResolvedPoint {
        ResolvedPoint {
            simulated_elapsed: clamp_elapsed(simulated_elapsed),
            lap_number: self.lap.lap_number,
            in_lap_offset: self.in_lap_offset,
            status: self.status,
            sample,
        }
    }
}

/// Resolve a simulated elapsed time against a subject's lap windows.
///
/// # Errors
///
/// Returns [`ReplayError::Unresolvable`] when the target falls into a gap between two laps
/// that is wider than [`WINDOW_TOLERANCE`]. Gaps are never interpolated.
pub fn resolve(index: &LapWindowIndex, simulated_elapsed: f64) -> Result<Resolution> {
    let elapsed = clamp_elapsed(simulated_elapsed);
    let first = *index.first();
    let target = first.start + elapsed;

    if elapsed == 0.0 || target < first.start {
        trace!(subject = index.subject(), lap = first.lap_number, "Simulation at race start");
        return Ok(Resolution::new(first, 0.0, ResolveStatus::BeforeStart, target));
    }

    if let Some(lap) = index.laps().iter().find(|lap| lap.contains(target)) {
        trace!(subject = index.subject(), lap = lap.lap_number, target, "Resolved lap");
        return Ok(Resolution::new(*lap, target - lap.start, ResolveStatus::Resolved, target));
    }

    if target >= index.last_end() {
        let latest = *index.latest();
        let offset = (latest.duration - FINISH_EPSILON).max(0.0);
        trace!(subject = index.subject(), lap = latest.lap_number, "Simulation after finish");
        return Ok(Resolution::new(latest, offset, ResolveStatus::AfterFinish, target));
    }

    let tolerant = index.laps().iter().find(|lap| {
        lap.start - WINDOW_TOLERANCE <= target && target < lap.end + WINDOW_TOLERANCE
    });
    if let Some(lap) = tolerant {
        trace!(
            subject = index.subject(),
            lap = lap.lap_number,
            target,
            "Resolved within tolerance"
        );
        return Ok(Resolution::new(*lap, target - lap.start, ResolveStatus::Resolved, target));
    }

    error!(
        subject = index.subject(),
        target,
        elapsed,
        "Could not map historical time to any lap; lap windows have a gap"
    );
    Err(ReplayError::Unresolvable { subject: index.subject().to_string(), target })
}
