//! Error types for replay processing.
//!
//! This module provides the error taxonomy for the lapreplay engine. All errors implement
//! the `std::error::Error` trait and carry enough structured context (subject, dataset,
//! simulated time) to diagnose a failed tick from the log line alone.
//!
//! ## Error Categories
//!
//! - **Load Errors**: Provider unreachable, malformed archive, or missing timing support
//! - **Subject Errors**: No laps or no usable lap timing for the requested subject
//! - **Mapping Errors**: Simulated time falls into a gap between lap windows
//! - **Schema Errors**: Required telemetry columns are absent
//! - **File/Parse Errors**: Archive files that cannot be read or deserialized
//!
//! Telemetry that is simply missing for a lap is *not* an error; it is reported as
//! [`Selection::PartialNoTelemetry`](crate::selector::Selection::PartialNoTelemetry).
//!
//! ## Cache Invalidation
//!
//! Only dataset-level failures reset the generation cache:
//!
//! ```rust
//! use lapreplay::{ReplayError, SessionKey};
//!
//! let key = SessionKey::new(2023, "Monza", "R");
//! let error = ReplayError::load_failed(key, "archive offline");
//! assert!(error.invalidates_cache());
//!
//! let error = ReplayError::NoLapsForSubject { subject: "NOR".to_string() };
//! assert!(!error.invalidates_cache());
//! assert!(error.is_not_found());
//! ```

use std::path::PathBuf;
use thiserror::Error;

use crate::types::SessionKey;

/// Result type alias for replay operations.
pub type Result<T, E = ReplayError> = std::result::Result<T, E>;

/// Main error type for replay operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ReplayError {
    #[error("Failed to load session {key}: {reason}")]
    Load {
        key: SessionKey,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Session {key} no longer reports live timing support")]
    TimingSupportLost { key: SessionKey },

    #[error("No laps found for driver '{subject}' in this session")]
    NoLapsForSubject { subject: String },

    #[error("No laps with valid timing found for driver '{subject}'")]
    NoValidTiming { subject: String },

    #[error("Could not map historical time {target:.3}s to any lap of driver '{subject}'")]
    Unresolvable { subject: String, target: f64 },

    #[error("Missing telemetry columns {missing:?} (available: {available:?})")]
    SchemaMismatch { missing: Vec<String>, available: Vec<String> },

    #[error("Archive file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Invalid configuration: {details}")]
    Config { details: String },
}

impl ReplayError {
    /// Returns whether this error means the cached dataset must be discarded.
    ///
    /// Per-tick data problems (resolution, schema, missing subject) leave the cache intact
    /// since the same dataset may serve other subjects or other simulated times.
    pub fn invalidates_cache(&self) -> bool {
        match self {
            ReplayError::Load { .. } => true,
            ReplayError::TimingSupportLost { .. } => true,
            ReplayError::File { .. } => true,
            ReplayError::Parse { .. } => true,
            ReplayError::NoLapsForSubject { .. } => false,
            ReplayError::NoValidTiming { .. } => false,
            ReplayError::Unresolvable { .. } => false,
            ReplayError::SchemaMismatch { .. } => false,
            ReplayError::Config { .. } => false,
        }
    }

    /// Returns whether this error means "no data" rather than a fault.
    ///
    /// The query endpoint answers these with 404 and everything else with 500.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ReplayError::Load { .. }
                | ReplayError::TimingSupportLost { .. }
                | ReplayError::NoLapsForSubject { .. }
                | ReplayError::NoValidTiming { .. }
        )
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            ReplayError::Load { .. } => vec![
                "Check the archive directory is mounted and readable",
                "Verify year, event and session code exist in the archive",
                "The next tick retries the load automatically",
            ],
            ReplayError::TimingSupportLost { .. } => vec![
                "Confirm the session still has official timing data",
                "The dataset is reloaded on the next tick",
            ],
            ReplayError::NoLapsForSubject { .. } => vec![
                "Check the driver code spelling (three letters, e.g. VER)",
                "Verify the driver took part in this session",
            ],
            ReplayError::NoValidTiming { .. } => vec![
                "Laps without start time or lap time are excluded",
                "Try a different session for this driver",
            ],
            ReplayError::Unresolvable { .. } => vec![
                "Inspect lap start and lap times for a gap between laps",
                "Report the dataset; gaps are not interpolated",
            ],
            ReplayError::SchemaMismatch { .. } => vec![
                "Check telemetry files contain Time, X and Y columns",
                "Compare the available columns in the log line",
            ],
            ReplayError::File { .. } => vec![
                "Check file exists and is readable",
                "Check file permissions",
            ],
            ReplayError::Parse { .. } => vec![
                "Check archive file format",
                "Verify source data integrity",
            ],
            ReplayError::Config { .. } => vec![
                "Check environment variables and command line flags",
                "Run with --help for the list of options",
            ],
        }
    }

    /// Helper constructor for load failures without an underlying source.
    pub fn load_failed(key: SessionKey, reason: impl Into<String>) -> Self {
        ReplayError::Load { key, reason: reason.into(), source: None }
    }

    /// Helper constructor for load failures wrapping the provider error.
    pub fn load_failed_with_source(
        key: SessionKey,
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        ReplayError::Load { key, reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        ReplayError::File { path, source }
    }

    /// Helper constructor for parse errors.
    pub fn parse_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        ReplayError::Parse { context: context.into(), details: details.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config_error(details: impl Into<String>) -> Self {
        ReplayError::Config { details: details.into() }
    }
}

impl From<std::io::Error> for ReplayError {
    fn from(err: std::io::Error) -> Self {
        ReplayError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn error_messages_carry_their_context(
                subject in "[A-Z]{3}",
                reason in ".*",
                target in 0.0f64..10_000.0,
            ) {
                let key = SessionKey::new(2023, "Monza", "R");
                let load = ReplayError::load_failed(key, reason.clone());
                prop_assert!(load.to_string().contains(&reason));
                prop_assert!(load.to_string().contains("2023 Monza R"));

                let no_laps = ReplayError::NoLapsForSubject { subject: subject.clone() };
                prop_assert!(no_laps.to_string().contains(&subject));

                let gap = ReplayError::Unresolvable { subject: subject.clone(), target };
                let expected = format!("{target:.3}");
                prop_assert!(gap.to_string().contains(&expected));
            }

            #[test]
            fn source_chain_is_preserved(base in ".*") {
                let key = SessionKey::new(2021, "Spa", "Q");
                let err = ReplayError::load_failed_with_source(
                    key,
                    "provider failed",
                    Box::new(std::io::Error::other(base.clone())),
                );
                let source = std::error::Error::source(&err).expect("source present");
                prop_assert_eq!(source.to_string(), base);
            }
        }
    }

    #[test]
    fn only_dataset_failures_invalidate_the_cache() {
        let key = SessionKey::new(2023, "Monza", "R");
        assert!(ReplayError::load_failed(key.clone(), "x").invalidates_cache());
        assert!(ReplayError::TimingSupportLost { key }.invalidates_cache());

        assert!(!ReplayError::NoValidTiming { subject: "HAM".into() }.invalidates_cache());
        assert!(
            !ReplayError::Unresolvable { subject: "HAM".into(), target: 1.0 }.invalidates_cache()
        );
        assert!(
            !ReplayError::SchemaMismatch { missing: vec!["X".into()], available: vec![] }
                .invalidates_cache()
        );
    }

    #[test]
    fn not_found_classification() {
        assert!(ReplayError::NoValidTiming { subject: "LEC".into() }.is_not_found());
        assert!(!ReplayError::Unresolvable { subject: "LEC".into(), target: 5.0 }.is_not_found());
        assert!(
            !ReplayError::SchemaMismatch { missing: vec![], available: vec![] }.is_not_found()
        );
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<ReplayError>();

        let error = ReplayError::config_error("missing driver");
        let _: &dyn std::error::Error = &error;
        assert!(!error.recovery_suggestions().is_empty());
    }

    #[test]
    fn from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "session.yaml");
        let err: ReplayError = io_err.into();
        match err {
            ReplayError::File { source, .. } => assert_eq!(source.to_string(), "session.yaml"),
            _ => panic!("Expected File error variant"),
        }
    }
}
