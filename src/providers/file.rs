//! Archive provider reading recorded sessions from disk
//!
//! Archive layout:
//!
//! ```text
//! <root>/<year>/<event>/<session>/session.yaml
//! <root>/<year>/<event>/<session>/telemetry/<DRIVER>/<lap>.yaml
//! ```
//!
//! `session.yaml` deserializes into a [`LapTable`]; each telemetry file is a mapping from
//! column name to a list of cells (see [`TelemetryTable`]). JSON files are accepted too
//! since the YAML parser reads JSON documents. Event and session directories are matched
//! case-insensitively so `monza` finds `Monza`.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

use crate::provider::Provider;
use crate::types::session::default_timing_support;
use crate::types::{LapTable, SessionKey, TelemetryTable};
use crate::{ReplayError, Result};

const SESSION_FILE: &str = "session.yaml";
const TELEMETRY_DIR: &str = "telemetry";

/// Header of `session.yaml`; the lap list is skipped, not parsed.
#[derive(Debug, Deserialize)]
struct SupportFlag {
    #[serde(default = "default_timing_support")]
    timing_support: bool,
}

/// Provider backed by an on-disk archive directory
#[derive(Debug, Clone)]
pub struct FileProvider {
    root: PathBuf,
}

impl FileProvider {
    /// Create a provider rooted at `root`
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        info!("Using replay archive at {}", root.display());
        Self { root }
    }

    async fn session_dir(&self, key: &SessionKey) -> Result<PathBuf> {
        let year_dir = self.root.join(key.year.to_string());
        let event_dir = find_entry(&year_dir, &key.event).await?;
        find_entry(&event_dir, &key.session).await
    }

    async fn read_session_raw(&self, key: &SessionKey) -> Result<(PathBuf, String)> {
        let path = self.session_dir(key).await?.join(SESSION_FILE);
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ReplayError::file_error(path.clone(), e))?;
        Ok((path, raw))
    }

    async fn read_session_file(&self, key: &SessionKey) -> Result<LapTable> {
        let (path, raw) = self.read_session_raw(key).await?;
        let mut table: LapTable = serde_yaml_ng::from_str(&raw).map_err(|e| {
            ReplayError::parse_error(format!("lap table {}", path.display()), e.to_string())
        })?;
        if table.event_name.trim().is_empty() {
            table.event_name = key.event.clone();
        }
        Ok(table)
    }
}

#[async_trait::async_trait]
impl Provider for FileProvider {
    async fn load_laps(&self, key: &SessionKey) -> Result<LapTable> {
        let table = self.read_session_file(key).await?;
        debug!(session = %key, laps = table.laps.len(), "Loaded lap table from archive");
        Ok(table)
    }

    async fn timing_support(&self, key: &SessionKey) -> Result<bool> {
        let (path, raw) = self.read_session_raw(key).await?;
        let flag: SupportFlag = serde_yaml_ng::from_str(&raw).map_err(|e| {
            ReplayError::parse_error(format!("session header {}", path.display()), e.to_string())
        })?;
        Ok(flag.timing_support)
    }

    async fn load_lap_telemetry(
        &self,
        key: &SessionKey,
        subject: &str,
        lap_number: u32,
    ) -> Result<TelemetryTable> {
        check_component(subject)?;
        let driver_dir =
            find_entry(&self.session_dir(key).await?.join(TELEMETRY_DIR), subject).await?;
        let path = driver_dir.join(format!("{lap_number}.yaml"));

        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ReplayError::file_error(path.clone(), e))?;
        let table: TelemetryTable = serde_yaml_ng::from_str(&raw).map_err(|e| {
            ReplayError::parse_error(format!("telemetry {}", path.display()), e.to_string())
        })?;

        trace!(session = %key, subject, lap_number, rows = table.len(), "Loaded lap telemetry");
        Ok(table)
    }
}

/// Reject names that could escape the archive root.
fn check_component(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0');
    if invalid {
        return Err(ReplayError::parse_error("archive path", format!("invalid name '{name}'")));
    }
    Ok(())
}

/// Find `name` under `parent`, falling back to a case-insensitive match.
async fn find_entry(parent: &Path, name: &str) -> Result<PathBuf> {
    check_component(name)?;

    let exact = parent.join(name);
    if tokio::fs::try_exists(&exact).await.unwrap_or(false) {
        return Ok(exact);
    }

    let mut entries = tokio::fs::read_dir(parent)
        .await
        .map_err(|e| ReplayError::file_error(parent.to_path_buf(), e))?;
    while let Some(entry) =
        entries.next_entry().await.map_err(|e| ReplayError::file_error(parent.to_path_buf(), e))?
    {
        if entry.file_name().to_string_lossy().eq_ignore_ascii_case(name) {
            return Ok(entry.path());
        }
    }

    Err(ReplayError::file_error(
        exact,
        std::io::Error::new(std::io::ErrorKind::NotFound, format!("'{name}' not in archive")),
    ))
}
