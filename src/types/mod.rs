//! Core types for replay data representation.
//!
//! This module provides the data structures shared by the replay pipeline: session
//! identity, lap timing records, columnar per-lap telemetry, and resolved replay points.
//!
//! ## Architecture
//!
//! - [`SessionKey`] identifies a recorded session (year, event, session code)
//! - [`LapRow`] / [`LapTable`] are the provider's raw lap table, timing optional
//! - [`LapRecord`] is a lap with usable timing as a half-open `[start, end)` window
//! - [`TelemetryTable`] holds untyped per-lap telemetry columns
//! - [`TelemetrySample`] is one typed sample extracted through [`value`] coercions
//! - [`ResolvedPoint`] ties a simulated time to a lap, an offset and a sample
//!
//! ## Usage Example
//!
//! ```rust
//! use lapreplay::types::{LapRecord, LapRow};
//!
//! let row = LapRow {
//!     driver: "VER".to_string(),
//!     lap_number: 1,
//!     lap_start_time: Some(3600.0),
//!     lap_time: Some(92.5),
//! };
//! let lap = LapRecord::from_row(&row).expect("lap has timing");
//! assert_eq!(lap.end, 3692.5);
//! assert!(lap.contains(3650.0));
//! ```

mod point;
pub(crate) mod session;
pub mod telemetry;
pub mod value;

pub use point::{ResolveStatus, ResolvedPoint, SourceSession};
pub use session::{LapRecord, LapRow, LapTable, SessionKey};
pub use telemetry::{TelemetrySample, TelemetryTable};
