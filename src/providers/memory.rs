//! In-memory provider for fixtures, benchmarks and demos

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::provider::Provider;
use crate::types::{LapTable, SessionKey, TelemetryTable};
use crate::{ReplayError, Result};

type TelemetryKey = (SessionKey, String, u32);

/// Provider serving sessions held in memory
///
/// Supports switching timing support at runtime and injecting lap-table load failures,
/// which is how cache invalidation paths are exercised.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    sessions: RwLock<HashMap<SessionKey, LapTable>>,
    telemetry: RwLock<HashMap<TelemetryKey, TelemetryTable>>,
    pending_failures: AtomicUsize,
    lap_loads: AtomicUsize,
    telemetry_loads: AtomicUsize,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session lap table
    pub fn with_session(self, key: SessionKey, table: LapTable) -> Self {
        write(&self.sessions).insert(key, table);
        self
    }

    /// Register telemetry for one lap of one subject
    pub fn with_telemetry(
        self,
        key: SessionKey,
        subject: impl Into<String>,
        lap_number: u32,
        table: TelemetryTable,
    ) -> Self {
        write(&self.telemetry).insert((key, subject.into(), lap_number), table);
        self
    }

    /// Change the timing support flag reported for a session
    pub fn set_timing_support(&self, key: &SessionKey, supported: bool) {
        if let Some(table) = write(&self.sessions).get_mut(key) {
            table.timing_support = supported;
        }
    }

    /// Make the next `count` lap-table loads fail
    pub fn fail_next_loads(&self, count: usize) {
        self.pending_failures.store(count, Ordering::SeqCst);
    }

    /// Number of lap-table loads served so far (including failed ones)
    pub fn lap_loads(&self) -> usize {
        self.lap_loads.load(Ordering::SeqCst)
    }

    /// Number of telemetry loads served so far
    pub fn telemetry_loads(&self) -> usize {
        self.telemetry_loads.load(Ordering::SeqCst)
    }

    fn take_failure(&self) -> bool {
        self.pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn not_found(what: String) -> ReplayError {
    ReplayError::file_error(
        "<memory>".into(),
        std::io::Error::new(std::io::ErrorKind::NotFound, what),
    )
}

#[async_trait::async_trait]
impl Provider for MemoryProvider {
    async fn load_laps(&self, key: &SessionKey) -> Result<LapTable> {
        self.lap_loads.fetch_add(1, Ordering::SeqCst);
        if self.take_failure() {
            return Err(ReplayError::load_failed(key.clone(), "injected load failure"));
        }
        read(&self.sessions).get(key).cloned().ok_or_else(|| not_found(format!("session {key}")))
    }

    async fn timing_support(&self, key: &SessionKey) -> Result<bool> {
        read(&self.sessions)
            .get(key)
            .map(|table| table.timing_support)
            .ok_or_else(|| not_found(format!("session {key}")))
    }

    async fn load_lap_telemetry(
        &self,
        key: &SessionKey,
        subject: &str,
        lap_number: u32,
    ) -> Result<TelemetryTable> {
        self.telemetry_loads.fetch_add(1, Ordering::SeqCst);
        read(&self.telemetry)
            .get(&(key.clone(), subject.to_string(), lap_number))
            .cloned()
            .ok_or_else(|| not_found(format!("telemetry {key} {subject} lap {lap_number}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn injected_failures_are_consumed_in_order() {
        let key = SessionKey::new(2023, "Monza", "R");
        let provider = MemoryProvider::new().with_session(key.clone(), LapTable::default());

        provider.fail_next_loads(1);
        assert!(provider.load_laps(&key).await.is_err());
        assert!(provider.load_laps(&key).await.is_ok());
        assert_eq!(provider.lap_loads(), 2);
    }

    #[tokio::test]
    async fn timing_support_can_be_revoked() {
        let key = SessionKey::new(2023, "Monza", "R");
        let provider = MemoryProvider::new().with_session(key.clone(), LapTable::default());

        assert!(provider.timing_support(&key).await.unwrap());
        provider.set_timing_support(&key, false);
        assert!(!provider.timing_support(&key).await.unwrap());
    }
}
