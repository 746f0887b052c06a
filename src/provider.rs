//! Provider trait for historical data sources

use crate::Result;
use crate::types::{LapTable, SessionKey, TelemetryTable};

/// Trait for historical telemetry archives
///
/// Providers abstract over where recorded sessions live (an on-disk archive, an in-memory
/// fixture, a remote service). Lap tables are cheap and loaded per session; telemetry is
/// expensive and loaded per lap, on demand.
#[async_trait::async_trait]
pub trait Provider: Send + Sync + 'static {
    /// Load the lap table of a session (no telemetry)
    ///
    /// Returns:
    /// - `Ok(table)` - Lap rows for every subject in the session
    /// - `Err(e)` - Archive unreachable or session malformed
    async fn load_laps(&self, key: &SessionKey) -> Result<LapTable>;

    /// Report whether the session still carries live/official timing support
    ///
    /// Called on every cache hit so a dataset that lost support is never served stale.
    async fn timing_support(&self, key: &SessionKey) -> Result<bool>;

    /// Load the telemetry of one lap of one subject
    ///
    /// Returns:
    /// - `Ok(table)` - Columnar telemetry, possibly empty
    /// - `Err(e)` - Telemetry could not be loaded for this lap
    async fn load_lap_telemetry(
        &self,
        key: &SessionKey,
        subject: &str,
        lap_number: u32,
    ) -> Result<TelemetryTable>;
}
