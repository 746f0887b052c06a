//! Generation cache lifecycle
//!
//! The generation cycle keeps one session dataset, the lap window indexes built from it,
//! and the telemetry of the most recently sampled lap. The state has a single owner: the
//! scheduler's execution slot. The on-demand query path never sees it.
//!
//! Lifecycle:
//!
//! ```text
//!   empty ──load ok──► populated ──hit (still supported)──► populated
//!     ▲                    │
//!     └── load error ──────┤
//!     └── support lost ────┘
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::dataset::SessionDataset;
use crate::lap_index::LapWindowIndex;
use crate::provider::Provider;
use crate::selector::{LapTelemetry, load_lap_telemetry};
use crate::types::SessionKey;
use crate::{ReplayError, Result};

/// Telemetry of one lap kept resident between ticks
#[derive(Debug, Clone)]
struct ResidentLap {
    subject: String,
    lap_number: u32,
    telemetry: LapTelemetry,
}

/// Cached dataset and derived indexes of the generation cycle
#[derive(Debug, Default)]
pub struct CacheState {
    dataset: Option<Arc<SessionDataset>>,
    lap_indexes: HashMap<String, Arc<LapWindowIndex>>,
    resident: Option<ResidentLap>,
}

impl CacheState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.is_none()
    }

    /// Currently cached dataset, if any
    pub fn dataset(&self) -> Option<&Arc<SessionDataset>> {
        self.dataset.as_ref()
    }

    /// Number of subjects with a cached lap index
    pub fn indexed_subjects(&self) -> usize {
        self.lap_indexes.len()
    }

    /// Drop everything: dataset, indexes and resident telemetry.
    pub fn reset(&mut self) {
        self.dataset = None;
        self.lap_indexes.clear();
        self.resident = None;
    }

    /// Return the cached dataset for `key`, loading it on a miss.
    ///
    /// # Errors
    ///
    /// - [`ReplayError::Load`] when the provider fails or the session has no timing
    ///   support; the cache is left empty
    /// - [`ReplayError::TimingSupportLost`] when a cached session stopped reporting timing
    ///   support; the cache is reset and the next call reloads
    pub async fn ensure_loaded(
        &mut self,
        provider: &dyn Provider,
        key: &SessionKey,
    ) -> Result<Arc<SessionDataset>> {
        if let Some(dataset) = self.dataset.clone() {
            if dataset.key() == key {
                return self.revalidate(provider, dataset).await;
            }
            info!(cached = %dataset.key(), requested = %key, "Cached session replaced");
            self.reset();
        }

        info!(session = %key, "Generator cache empty. Loading session lap data");
        match load_dataset(provider, key).await {
            Ok(dataset) => {
                let dataset = Arc::new(dataset);
                info!(
                    session = %key,
                    event = dataset.event_name(),
                    laps = dataset.laps().len(),
                    "Session laps loaded into generator cache"
                );
                self.dataset = Some(Arc::clone(&dataset));
                Ok(dataset)
            }
            Err(e) => {
                error!(session = %key, error = %e, "Failed to load generator session data");
                self.reset();
                Err(e)
            }
        }
    }

    async fn revalidate(
        &mut self,
        provider: &dyn Provider,
        dataset: Arc<SessionDataset>,
    ) -> Result<Arc<SessionDataset>> {
        let key = dataset.key().clone();
        match provider.timing_support(&key).await {
            Ok(true) => {
                debug!(session = %key, "Using cached session");
                Ok(dataset)
            }
            Ok(false) => {
                warn!(
                    session = %key,
                    "Cached session reports no timing support. Reloading next tick"
                );
                self.reset();
                Err(ReplayError::TimingSupportLost { key })
            }
            Err(e) => {
                error!(session = %key, error = %e, "Could not revalidate cached session");
                self.reset();
                Err(ReplayError::load_failed_with_source(
                    key,
                    "timing support check failed",
                    Box::new(e),
                ))
            }
        }
    }

    /// Return the lap index of `subject`, building it from `dataset` on first use.
    pub fn ensure_lap_index(
        &mut self,
        dataset: &SessionDataset,
        subject: &str,
    ) -> Result<Arc<LapWindowIndex>> {
        if let Some(index) = self.lap_indexes.get(subject) {
            return Ok(Arc::clone(index));
        }

        let index = Arc::new(LapWindowIndex::build(dataset, subject)?);
        debug!(subject, "Caching lap index");
        self.lap_indexes.insert(subject.to_string(), Arc::clone(&index));
        Ok(index)
    }

    /// Telemetry of one lap, reusing the resident lap when it matches.
    ///
    /// Only the most recent lap is kept, bounding memory to one lap of telemetry.
    /// Unavailable telemetry is not retained so the next tick tries again.
    pub async fn lap_telemetry(
        &mut self,
        provider: &dyn Provider,
        key: &SessionKey,
        subject: &str,
        lap_number: u32,
    ) -> LapTelemetry {
        if let Some(resident) = &self.resident {
            if resident.subject == subject && resident.lap_number == lap_number {
                return resident.telemetry.clone();
            }
        }

        let telemetry = load_lap_telemetry(provider, key, subject, lap_number).await;
        self.resident = match &telemetry {
            LapTelemetry::Loaded(_) => Some(ResidentLap {
                subject: subject.to_string(),
                lap_number,
                telemetry: telemetry.clone(),
            }),
            LapTelemetry::Unavailable(_) => None,
        };
        telemetry
    }
}

/// Load a fresh dataset, without touching any cache.
///
/// Provider failures are wrapped as [`ReplayError::Load`]; sessions without timing support
/// are rejected.
pub async fn load_dataset(provider: &dyn Provider, key: &SessionKey) -> Result<SessionDataset> {
    let table = match provider.load_laps(key).await {
        Ok(table) => table,
        Err(e @ ReplayError::Load { .. }) => return Err(e),
        Err(e) => {
            return Err(ReplayError::load_failed_with_source(
                key.clone(),
                format!("Session data not available: {e}"),
                Box::new(e),
            ));
        }
    };

    let dataset = SessionDataset::new(key.clone(), table);
    if !dataset.timing_support() {
        return Err(ReplayError::load_failed(key.clone(), "session has no live timing support"));
    }
    Ok(dataset)
}
