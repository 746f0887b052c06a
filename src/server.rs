//! HTTP surface: live query, debug point, health and service info

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Config;
use crate::entity::format_timestamp;
use crate::facade::{DebugOutcome, QueryFacade, QueryOutcome};
use crate::scheduler::SchedulerHandle;
use crate::types::SessionKey;

/// Default simulated time of the debug endpoint, in seconds.
pub const DEBUG_DEFAULT_SIMULATED_TIME: f64 = 600.0;

const MIN_YEAR: u16 = 1950;

/// Generator settings echoed by the service info endpoint
#[derive(Debug, Clone, Serialize)]
pub struct GeneratorInfo {
    pub source_year: u16,
    pub source_gp: String,
    pub source_session: String,
    pub interval_seconds: u64,
    pub target_driver: String,
    pub simulation_session_key: i64,
}

impl From<&Config> for GeneratorInfo {
    fn from(config: &Config) -> Self {
        Self {
            source_year: config.generator_year,
            source_gp: config.generator_gp.clone(),
            source_session: config.generator_session.clone(),
            interval_seconds: config.schedule_interval_seconds,
            target_driver: config.target_driver_code.clone(),
            simulation_session_key: config.session_key,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    facade: QueryFacade,
    scheduler: Arc<SchedulerHandle>,
    generator: Arc<GeneratorInfo>,
}

impl AppState {
    pub fn new(
        facade: QueryFacade,
        scheduler: Arc<SchedulerHandle>,
        generator: GeneratorInfo,
    ) -> Self {
        Self { facade, scheduler, generator: Arc::new(generator) }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health))
        .route("/live_race_simulation", get(live_race_simulation))
        .route("/api/v1/f1data/debug_single_point", get(debug_single_point))
        .with_state(state)
}

fn detail(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "detail": message.into() }))).into_response()
}

#[derive(Debug, Deserialize)]
struct LiveQuery {
    driver: Option<String>,
    year: Option<String>,
    gp: Option<String>,
    session: Option<String>,
}

struct ValidQuery {
    driver: String,
    key: SessionKey,
}

impl LiveQuery {
    fn validate(self) -> Result<ValidQuery, String> {
        let driver = self.driver.ok_or("query parameter 'driver' is required")?;
        let driver = driver.trim().to_uppercase();
        if driver.chars().count() != 3 {
            return Err("driver must be a 3 letter code".to_string());
        }

        let year = self.year.ok_or("query parameter 'year' is required")?;
        let year: u16 =
            year.trim().parse().map_err(|_| format!("year '{year}' is not a valid integer"))?;
        if year < MIN_YEAR {
            return Err(format!("year must be greater than or equal to {MIN_YEAR}"));
        }

        let gp =
            self.gp.filter(|gp| !gp.trim().is_empty()).ok_or("query parameter 'gp' is required")?;
        let session = self
            .session
            .filter(|s| !s.trim().is_empty())
            .ok_or("query parameter 'session' is required")?;

        Ok(ValidQuery { driver, key: SessionKey::new(year, gp.trim(), session.trim()) })
    }
}

async fn live_race_simulation(
    State(state): State<AppState>,
    Query(query): Query<LiveQuery>,
) -> Response {
    let query = match query.validate() {
        Ok(query) => query,
        Err(message) => return detail(StatusCode::UNPROCESSABLE_ENTITY, message),
    };

    let elapsed = state.scheduler.clock().elapsed();
    info!(driver = %query.driver, session = %query.key, elapsed, "Live simulation request");

    match state.facade.query(&query.driver, &query.key, elapsed).await {
        QueryOutcome::Data(report) => (StatusCode::OK, Json(report)).into_response(),
        QueryOutcome::Partial(report) => {
            (StatusCode::PARTIAL_CONTENT, Json(report)).into_response()
        }
        QueryOutcome::NotFound(message) => detail(StatusCode::NOT_FOUND, message),
        QueryOutcome::Failed(message) => detail(StatusCode::INTERNAL_SERVER_ERROR, message),
    }
}

#[derive(Debug, Deserialize)]
struct DebugQuery {
    simulated_time: Option<f64>,
}

async fn debug_single_point(
    State(state): State<AppState>,
    Query(query): Query<DebugQuery>,
) -> Response {
    let elapsed = query.simulated_time.unwrap_or(DEBUG_DEFAULT_SIMULATED_TIME);
    let cycle = state.scheduler.cycle();
    debug!(subject = cycle.subject(), elapsed, "Generating debug data point");

    let outcome = state
        .facade
        .debug_point(cycle.subject(), cycle.key(), elapsed, cycle.context(), Utc::now())
        .await;

    match outcome {
        DebugOutcome::Entity(entity) => (StatusCode::OK, Json(entity)).into_response(),
        DebugOutcome::Unavailable(message) => detail(StatusCode::NOT_FOUND, message),
        DebugOutcome::FormatFailed => detail(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to format generated data into NGSI-v2.",
        ),
    }
}

async fn health(State(state): State<AppState>) -> Response {
    let orion_status = state.scheduler.cycle().sink().probe().await;
    Json(json!({
        "status": "ok",
        "scheduler_running": state.scheduler.is_running(),
        "scheduler_state": state.scheduler.state().as_str(),
        "orion_status": orion_status,
    }))
    .into_response()
}

async fn service_info(State(state): State<AppState>) -> Response {
    let mut generator = serde_json::to_value(state.generator.as_ref()).unwrap_or_default();
    if let Some(fields) = generator.as_object_mut() {
        fields.insert("base_session_data_loaded".into(), state.scheduler.has_dataset().into());
    }

    Json(json!({
        "service": "Lap replay telemetry generator (single driver)",
        "status": "running",
        "generator_config": generator,
        "scheduler_running": state.scheduler.is_running(),
        "simulation_time_origin_utc": format_timestamp(state.scheduler.clock().origin_utc()),
    }))
    .into_response()
}
