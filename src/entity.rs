//! NGSI-v2 entity formatting
//!
//! Turns a [`ResolvedPoint`] into the `Car` entity pushed to the context broker. Every
//! attribute is wrapped as `{"type": ..., "value": ..., "metadata": ...}`; field order is
//! fixed by the struct layout, so identical inputs serialize to identical bytes.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::{ResolvedPoint, SourceSession};

/// Entity type of published records.
pub const ENTITY_KIND: &str = "Car";

const URN_PREFIX: &str = "urn:ngsi-v2";

/// Run-level values stamped onto every entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityContext {
    /// Identifier of this simulation run
    pub session_key: i64,
}

impl EntityContext {
    pub fn new(session_key: i64) -> Self {
        Self { session_key }
    }

    /// Id of the simulated race session record entities refer back to
    pub fn race_session_id(&self) -> String {
        format!("{URN_PREFIX}:RaceSession:{}", self.session_key)
    }

    pub fn entity_id(&self, subject: &str) -> String {
        format!("{URN_PREFIX}:{ENTITY_KIND}:{subject}:{}", self.session_key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitCode {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(rename = "unitCode")]
    pub unit_code: UnitCode,
}

/// A typed NGSI-v2 attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute<T> {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl<T> Attribute<T> {
    fn new(kind: &str, value: T) -> Self {
        Self { kind: kind.to_string(), value, metadata: None }
    }

    fn with_unit(kind: &str, value: T, unit: &str) -> Self {
        Self {
            kind: kind.to_string(),
            value,
            metadata: Some(Metadata { unit_code: UnitCode { value: unit.to_string() } }),
        }
    }
}

/// The car entity published once per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub speed: Attribute<f64>,
    pub rpm: Attribute<i64>,
    pub gear: Attribute<i64>,
    pub throttle: Attribute<i64>,
    pub brake: Attribute<bool>,
    pub drs: Attribute<bool>,
    pub distance: Attribute<f64>,
    pub driver_code: Attribute<String>,
    pub lap_number: Attribute<u32>,
    pub time_within_lap: Attribute<f64>,
    pub simulated_elapsed_time: Attribute<f64>,
    pub x: Attribute<f64>,
    pub y: Attribute<f64>,
    pub source_session: Attribute<SourceSession>,
    pub date_observed: Attribute<String>,
    pub simulation_session_key: Attribute<i64>,
    pub ref_race_session: Attribute<String>,
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// UTC timestamp with millisecond precision and a `Z` suffix.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Format a resolved point as a car entity.
///
/// Returns `None` when the subject code is empty or a numeric input is not finite.
pub fn format_entity(
    point: &ResolvedPoint,
    subject: &str,
    source: &SourceSession,
    ctx: &EntityContext,
    observed_at: DateTime<Utc>,
) -> Option<Entity> {
    let sample = &point.sample;
    let numbers = [
        point.simulated_elapsed,
        point.in_lap_offset,
        sample.speed,
        sample.distance,
        sample.x,
        sample.y,
    ];
    if subject.trim().is_empty() || numbers.iter().any(|n| !n.is_finite()) {
        warn!(subject, lap = point.lap_number, "Cannot format entity from incomplete point");
        return None;
    }

    Some(Entity {
        id: ctx.entity_id(subject),
        kind: ENTITY_KIND.to_string(),
        speed: Attribute::new("Number", round_to(sample.speed, 3)),
        rpm: Attribute::new("Number", sample.rpm),
        gear: Attribute::new("Number", sample.gear),
        throttle: Attribute::new("Number", sample.throttle),
        brake: Attribute::new("Boolean", sample.brake != 0),
        drs: Attribute::new("Boolean", sample.drs),
        distance: Attribute::with_unit("Number", round_to(sample.distance, 1), "MTR"),
        driver_code: Attribute::new("Text", subject.to_string()),
        lap_number: Attribute::new("Number", point.lap_number),
        time_within_lap: Attribute::with_unit("Number", round_to(point.in_lap_offset, 3), "SEC"),
        simulated_elapsed_time: Attribute::with_unit(
            "Number",
            round_to(point.simulated_elapsed, 3),
            "SEC",
        ),
        x: Attribute::with_unit("Number", round_to(sample.x, 2), "MTR"),
        y: Attribute::with_unit("Number", round_to(sample.y, 2), "MTR"),
        source_session: Attribute::new("StructuredValue", source.clone()),
        date_observed: Attribute::new("DateTime", format_timestamp(observed_at)),
        simulation_session_key: Attribute::new("Number", ctx.session_key),
        ref_race_session: Attribute::new("Relationship", ctx.race_session_id()),
    })
}
