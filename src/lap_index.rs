//! Per-subject lap window index

use tracing::debug;

use crate::dataset::SessionDataset;
use crate::types::LapRecord;
use crate::{ReplayError, Result};

/// Sorted lap windows of one subject.
///
/// Only laps with both a start offset and a positive lap time are indexed. The index is
/// never empty: building it for a subject without usable laps fails instead.
#[derive(Debug, Clone, PartialEq)]
pub struct LapWindowIndex {
    subject: String,
    laps: Vec<LapRecord>,
    latest: usize,
}

impl LapWindowIndex {
    /// Build the index for `subject` from a loaded dataset.
    ///
    /// # Errors
    ///
    /// - [`ReplayError::NoLapsForSubject`] when the subject has no lap rows at all
    /// - [`ReplayError::NoValidTiming`] when none of its laps carries usable timing
    pub fn build(dataset: &SessionDataset, subject: &str) -> Result<Self> {
        let mut rows = 0usize;
        let laps: Vec<LapRecord> = dataset
            .laps_for(subject)
            .inspect(|_| rows += 1)
            .filter_map(LapRecord::from_row)
            .collect();

        if rows == 0 {
            return Err(ReplayError::NoLapsForSubject { subject: subject.to_string() });
        }

        let index = Self::from_records(subject, laps)?;
        debug!(
            subject,
            session = %dataset.key(),
            rows,
            usable = index.laps.len(),
            "Built lap window index"
        );
        Ok(index)
    }

    /// Build the index from already validated lap records.
    pub fn from_records(subject: &str, mut laps: Vec<LapRecord>) -> Result<Self> {
        if laps.is_empty() {
            return Err(ReplayError::NoValidTiming { subject: subject.to_string() });
        }

        laps.sort_by(|a, b| a.start.total_cmp(&b.start).then(a.lap_number.cmp(&b.lap_number)));

        // Latest lap is the one that ends last; ties go to the later start.
        let latest = laps
            .iter()
            .enumerate()
            .max_by(|(ia, a), (ib, b)| a.end.total_cmp(&b.end).then(ia.cmp(ib)))
            .map(|(i, _)| i)
            .unwrap_or(laps.len() - 1);

        Ok(Self { subject: subject.to_string(), laps, latest })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Laps in start order
    pub fn laps(&self) -> &[LapRecord] {
        &self.laps
    }

    /// Earliest lap by start offset
    pub fn first(&self) -> &LapRecord {
        &self.laps[0]
    }

    /// Lap owning the latest end offset
    pub fn latest(&self) -> &LapRecord {
        &self.laps[self.latest]
    }

    pub fn first_start(&self) -> f64 {
        self.first().start
    }

    pub fn last_end(&self) -> f64 {
        self.latest().end
    }
}
