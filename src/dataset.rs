//! Loaded session datasets

use std::sync::Arc;

use crate::types::{LapRow, LapTable, SessionKey, SourceSession};

/// Lap table of one recorded session, immutable once loaded.
///
/// Shared behind [`Arc`]; a reload builds a new dataset instead of patching this one.
/// Telemetry is not part of the dataset and is fetched per lap.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionDataset {
    key: SessionKey,
    event_name: String,
    timing_support: bool,
    laps: Arc<[LapRow]>,
}

impl SessionDataset {
    pub fn new(key: SessionKey, table: LapTable) -> Self {
        let event_name =
            if table.event_name.trim().is_empty() { key.event.clone() } else { table.event_name };
        Self { key, event_name, timing_support: table.timing_support, laps: table.laps.into() }
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// Event name reported by the archive (e.g. `Italian Grand Prix`)
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// Timing support flag at load time
    pub fn timing_support(&self) -> bool {
        self.timing_support
    }

    /// All lap rows of the session
    pub fn laps(&self) -> &[LapRow] {
        &self.laps
    }

    /// Lap rows of one subject, matched case-insensitively
    pub fn laps_for<'a>(&'a self, subject: &'a str) -> impl Iterator<Item = &'a LapRow> + 'a {
        self.laps.iter().filter(move |row| row.driver.eq_ignore_ascii_case(subject))
    }

    /// Descriptor published alongside every entity
    pub fn source_session(&self) -> SourceSession {
        SourceSession {
            year: self.key.year,
            gp: self.event_name.clone(),
            session: self.key.session.clone(),
        }
    }
}
