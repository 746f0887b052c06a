//! Replays recorded race telemetry on a simulated clock.
//!
//! lapreplay maps "seconds since the service started" onto the lap windows of a historical
//! session, picks the nearest recorded telemetry sample for one driver and publishes it to
//! an NGSI-v2 context broker as if it were happening live.
//!
//! # Architecture
//!
//! - **Providers** ([`provider::Provider`]) supply lap tables and per-lap telemetry
//! - **Resolver** ([`resolver::resolve`]) maps simulated time to a lap and in-lap offset
//! - **Selector** ([`selector::select`]) picks the nearest sample within that lap
//! - **Entity formatter** ([`entity::format_entity`]) shapes the broker record
//! - **Scheduler** ([`scheduler::CycleScheduler`]) runs one generation cycle per tick,
//!   never two at once, against a cache only it can reach
//! - **Facade** ([`facade::QueryFacade`]) answers one-off queries without touching that cache
//!
//! # Example
//!
//! ```rust,no_run
//! use lapreplay::{LapWindowIndex, SessionDataset, SessionKey, resolve};
//! use lapreplay::providers::FileProvider;
//! use lapreplay::provider::Provider;
//!
//! # #[tokio::main]
//! # async fn main() -> lapreplay::Result<()> {
//! let provider = FileProvider::new("./replay_data");
//! let key = SessionKey::new(2023, "Monza", "R");
//! let dataset = SessionDataset::new(key.clone(), provider.load_laps(&key).await?);
//! let index = LapWindowIndex::build(&dataset, "VER")?;
//!
//! let resolution = resolve(&index, 600.0)?;
//! println!("lap {} at {:.3}s", resolution.lap.lap_number, resolution.in_lap_offset);
//! # Ok(())
//! # }
//! ```

mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Data access
pub mod cache;
pub mod dataset;
pub mod lap_index;
pub mod provider;
pub mod providers;

// Replay pipeline
pub mod clock;
pub mod entity;
pub mod resolver;
pub mod selector;

// Publishing and serving
pub mod config;
pub mod cycle;
pub mod facade;
pub mod scheduler;
pub mod server;
pub mod sink;

// Core exports
pub use error::*;
pub use types::*;

pub use cache::CacheState;
pub use clock::SimulationClock;
pub use cycle::{CycleOutcome, GenerationCycle};
pub use dataset::SessionDataset;
pub use entity::{Entity, EntityContext, format_entity};
pub use facade::{QueryFacade, QueryOutcome};
pub use lap_index::LapWindowIndex;
pub use resolver::{Resolution, resolve};
pub use scheduler::{CycleScheduler, SchedulerHandle, SchedulerState};
pub use selector::{LapTelemetry, Selection};
pub use sink::{OrionSink, Sink, SinkError, SinkStatus};
