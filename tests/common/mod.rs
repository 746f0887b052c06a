#![allow(dead_code)] // Test helpers appear unused when compiled independently

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde_json::Value;
use serde_yaml_ng::Value as YamlValue;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;

use lapreplay::providers::MemoryProvider;
use lapreplay::types::{LapRow, LapTable, SessionKey, TelemetryTable};

#[derive(Clone)]
struct BrokerState {
    updates: Arc<Mutex<Vec<Value>>>,
    status: Arc<AtomicU16>,
}

/// In-process stand-in for the context broker
pub struct MockBroker {
    pub base_url: String,
    state: BrokerState,
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl MockBroker {
    /// Answer every request with `status` from now on
    pub fn respond_with(&self, status: u16) {
        self.state.status.store(status, Ordering::SeqCst);
    }

    /// Bodies of every batch update received so far
    pub async fn updates(&self) -> Vec<Value> {
        self.state.updates.lock().await.clone()
    }

    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.handle.await;
    }
}

/// Spawn a broker on an ephemeral loopback port answering with `status`.
pub async fn spawn_mock_broker(status: u16) -> MockBroker {
    let state =
        BrokerState { updates: Arc::new(Mutex::new(Vec::new())), status: Arc::new(status.into()) };

    let app = Router::new()
        .route("/v2/op/update", post(update))
        .route("/version", get(version))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("failed to bind mock broker");
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .unwrap();
    });

    MockBroker { base_url, state, shutdown_tx, handle }
}

fn status_of(state: &BrokerState) -> StatusCode {
    StatusCode::from_u16(state.status.load(Ordering::SeqCst)).unwrap_or(StatusCode::OK)
}

async fn update(State(state): State<BrokerState>, Json(body): Json<Value>) -> StatusCode {
    state.updates.lock().await.push(body);
    match status_of(&state) {
        StatusCode::OK => StatusCode::NO_CONTENT,
        other => other,
    }
}

async fn version(State(state): State<BrokerState>) -> (StatusCode, Json<Value>) {
    (status_of(&state), Json(serde_json::json!({ "orion": { "version": "3.10.1" } })))
}

pub fn monza() -> SessionKey {
    SessionKey::new(2023, "Monza", "R")
}

/// Two laps for `driver`: `[0, 90)` and `[90, 185)`; telemetry only for lap 1.
pub fn provider_for(driver: &str) -> MemoryProvider {
    let laps = LapTable {
        event_name: "Italian Grand Prix".to_string(),
        timing_support: true,
        laps: vec![
            LapRow {
                driver: driver.to_string(),
                lap_number: 1,
                lap_start_time: Some(0.0),
                lap_time: Some(90.0),
            },
            LapRow {
                driver: driver.to_string(),
                lap_number: 2,
                lap_start_time: Some(90.0),
                lap_time: Some(95.0),
            },
        ],
    };
    MemoryProvider::new().with_session(monza(), laps).with_telemetry(
        monza(),
        driver,
        1,
        telemetry(90),
    )
}

/// One sample per second with speed `200 + t` and x `10 t`.
pub fn telemetry(rows: usize) -> TelemetryTable {
    let column = |f: fn(f64) -> YamlValue| (0..rows).map(|t| f(t as f64)).collect::<Vec<_>>();

    let mut columns = BTreeMap::new();
    columns.insert("Time".to_string(), column(YamlValue::from));
    columns.insert("X".to_string(), column(|t| YamlValue::from(10.0 * t)));
    columns.insert("Y".to_string(), column(|t| YamlValue::from(-5.0 * t)));
    columns.insert("Speed".to_string(), column(|t| YamlValue::from(200.0 + t)));
    columns.insert("nGear".to_string(), column(|_| YamlValue::from(7)));
    columns.insert("DRS".to_string(), column(|_| YamlValue::from(12)));
    TelemetryTable::new(columns)
}
