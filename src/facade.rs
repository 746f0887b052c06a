//! On-demand query path
//!
//! Serves one-off lookups for any subject and session. Every request loads its own dataset
//! and lap index; the generator's cache is never read or written from here, so a slow or
//! failing query cannot disturb the publishing cycle.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::cache::load_dataset;
use crate::clock::clamp_elapsed;
use crate::entity::{Entity, EntityContext, format_entity, round_to};
use crate::lap_index::LapWindowIndex;
use crate::provider::Provider;
use crate::resolver::resolve;
use crate::selector::{Selection, load_lap_telemetry, select};
use crate::types::{ResolvedPoint, SessionKey, SourceSession};
use crate::Result;

/// Full answer to a query: lap context plus the nearest recorded sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryReport {
    pub status: String,
    pub simulated_elapsed_race_time_seconds: f64,
    pub driver_code: String,
    pub year: u16,
    pub gp: String,
    pub session: String,
    pub target_lap_number: u32,
    pub calculated_time_within_lap_seconds: f64,
    pub closest_actual_second_in_lap: f64,
    pub distance: f64,
    pub speed: f64,
    pub drs: bool,
    pub gear: i64,
    pub rpm: i64,
    pub brake: u8,
    pub throttle: i64,
    pub x: f64,
    pub y: f64,
}

impl TelemetryReport {
    fn new(point: &ResolvedPoint, subject: &str, source: &SourceSession) -> Self {
        let sample = &point.sample;
        Self {
            status: point.status.message().to_string(),
            simulated_elapsed_race_time_seconds: round_to(point.simulated_elapsed, 3),
            driver_code: subject.to_string(),
            year: source.year,
            gp: source.gp.clone(),
            session: source.session.clone(),
            target_lap_number: point.lap_number,
            calculated_time_within_lap_seconds: round_to(point.in_lap_offset, 3),
            closest_actual_second_in_lap: round_to(sample.time, 3),
            distance: round_to(sample.distance, 1),
            speed: round_to(sample.speed, 1),
            drs: sample.drs,
            gear: sample.gear,
            rpm: sample.rpm,
            brake: sample.brake,
            throttle: sample.throttle,
            x: round_to(sample.x, 2),
            y: round_to(sample.y, 2),
        }
    }
}

/// Lap context without motion data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartialReport {
    pub status: &'static str,
    pub message: String,
    pub simulated_elapsed_race_time_seconds: f64,
    pub driver_code: String,
    pub year: u16,
    pub gp: String,
    pub session: String,
    pub target_lap_number: u32,
    pub calculated_time_within_lap_seconds: f64,
}

/// Result of an on-demand query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Data(TelemetryReport),
    Partial(PartialReport),
    /// Session, subject or timing data does not exist
    NotFound(String),
    /// Data exists but could not be mapped
    Failed(String),
}

/// Result of the debug lookup for the generator's subject.
#[derive(Debug, Clone, PartialEq)]
pub enum DebugOutcome {
    Entity(Box<Entity>),
    /// No data, or only partial data, at the requested time
    Unavailable(String),
    FormatFailed,
}

enum Sampled {
    Point { point: ResolvedPoint, source: SourceSession },
    Partial(PartialReport),
}

/// Stateless query service over a provider
#[derive(Clone)]
pub struct QueryFacade {
    provider: Arc<dyn Provider>,
}

impl QueryFacade {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    /// Look up what `subject` was doing `elapsed` simulated seconds into session `key`.
    pub async fn query(&self, subject: &str, key: &SessionKey, elapsed: f64) -> QueryOutcome {
        info!(subject, session = %key, elapsed, "Live simulation request");
        match self.sample(subject, key, elapsed).await {
            Ok(Sampled::Point { point, source }) => {
                QueryOutcome::Data(TelemetryReport::new(&point, subject, &source))
            }
            Ok(Sampled::Partial(report)) => QueryOutcome::Partial(report),
            Err(e) if e.is_not_found() => {
                warn!(subject, session = %key, error = %e, "No data for query");
                QueryOutcome::NotFound(e.to_string())
            }
            Err(e) => {
                error!(subject, session = %key, elapsed, error = %e, "Query failed");
                QueryOutcome::Failed(e.to_string())
            }
        }
    }

    /// Produce the entity the generator would publish at an explicit simulated time.
    pub async fn debug_point(
        &self,
        subject: &str,
        key: &SessionKey,
        elapsed: f64,
        ctx: &EntityContext,
        observed_at: DateTime<Utc>,
    ) -> DebugOutcome {
        match self.sample(subject, key, elapsed).await {
            Ok(Sampled::Point { point, source }) => {
                match format_entity(&point, subject, &source, ctx, observed_at) {
                    Some(entity) => DebugOutcome::Entity(Box::new(entity)),
                    None => DebugOutcome::FormatFailed,
                }
            }
            Ok(Sampled::Partial(report)) => DebugOutcome::Unavailable(report.message),
            Err(e) => DebugOutcome::Unavailable(e.to_string()),
        }
    }

    async fn sample(&self, subject: &str, key: &SessionKey, elapsed: f64) -> Result<Sampled> {
        let elapsed = clamp_elapsed(elapsed);
        let dataset = load_dataset(self.provider.as_ref(), key).await?;
        let index = LapWindowIndex::build(&dataset, subject)?;
        let resolution = resolve(&index, elapsed)?;
        let source = dataset.source_session();

        let telemetry =
            load_lap_telemetry(self.provider.as_ref(), key, subject, resolution.lap.lap_number)
                .await;

        match select(&telemetry, &resolution)? {
            Selection::Selected(sample) => {
                Ok(Sampled::Point { point: resolution.with_sample(elapsed, sample), source })
            }
            Selection::PartialNoTelemetry { lap_number, in_lap_offset, reason } => {
                Ok(Sampled::Partial(PartialReport {
                    status: "partial_no_telemetry",
                    message: reason,
                    simulated_elapsed_race_time_seconds: round_to(elapsed, 3),
                    driver_code: subject.to_string(),
                    year: source.year,
                    gp: source.gp,
                    session: source.session,
                    target_lap_number: lap_number,
                    calculated_time_within_lap_seconds: round_to(in_lap_offset, 3),
                }))
            }
        }
    }
}
