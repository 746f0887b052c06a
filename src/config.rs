//! Service configuration from command line flags and environment variables

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::types::SessionKey;
use crate::{ReplayError, Result};

/// Replays a historical race session as live telemetry for one driver.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Context broker base URL
    #[arg(long, env = "ORION_URL", default_value = "http://localhost:1026")]
    pub orion_url: String,

    /// Identifier of this simulation run, stamped onto every entity
    #[arg(long, env = "SESSION_KEY", default_value_t = 12345)]
    pub session_key: i64,

    /// Seconds between generation cycles
    #[arg(long = "interval", env = "SCHEDULE_INTERVAL_SECONDS", default_value_t = 10)]
    pub schedule_interval_seconds: u64,

    #[arg(long = "year", env = "GENERATOR_YEAR", default_value_t = 2023)]
    pub generator_year: u16,

    /// Grand Prix of the replayed session
    #[arg(long = "gp", env = "GENERATOR_GP", default_value = "Monza")]
    pub generator_gp: String,

    /// Session code (R, Q, FP1, ...)
    #[arg(long = "session", env = "GENERATOR_SESSION", default_value = "R")]
    pub generator_session: String,

    /// Three letter code of the driver to replay
    #[arg(long = "driver", env = "TARGET_DRIVER_CODE", value_parser = parse_driver_code)]
    pub target_driver_code: String,

    /// Root of the on-disk session archive
    #[arg(long, env = "DATA_DIR", default_value = "./replay_data")]
    pub data_dir: PathBuf,

    #[arg(long = "host", env = "APP_HOST", default_value = "127.0.0.1")]
    pub app_host: String,

    #[arg(long = "port", env = "APP_PORT", default_value_t = 8000)]
    pub app_port: u16,

    /// Default tracing filter when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Upper bound on one publish request
    #[arg(long = "sink-timeout", env = "SINK_TIMEOUT_SECONDS", default_value_t = 10)]
    pub sink_timeout_seconds: u64,
}

fn parse_driver_code(raw: &str) -> std::result::Result<String, String> {
    let code = raw.trim().to_uppercase();
    if code.is_empty() {
        return Err("driver code must not be empty".to_string());
    }
    Ok(code)
}

impl Config {
    /// Reject settings that parse but cannot run.
    pub fn validate(&self) -> Result<()> {
        if self.target_driver_code.trim().is_empty() {
            return Err(ReplayError::config_error("TARGET_DRIVER_CODE is not set"));
        }
        if self.schedule_interval_seconds == 0 {
            return Err(ReplayError::config_error("SCHEDULE_INTERVAL_SECONDS must be positive"));
        }
        if self.sink_timeout_seconds == 0 {
            return Err(ReplayError::config_error("SINK_TIMEOUT_SECONDS must be positive"));
        }
        if self.generator_gp.trim().is_empty() || self.generator_session.trim().is_empty() {
            return Err(ReplayError::config_error(
                "GENERATOR_GP and GENERATOR_SESSION are required",
            ));
        }
        self.listen_addr()?;
        Ok(())
    }

    pub fn session(&self) -> SessionKey {
        SessionKey::new(self.generator_year, &self.generator_gp, &self.generator_session)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.schedule_interval_seconds)
    }

    pub fn sink_timeout(&self) -> Duration {
        Duration::from_secs(self.sink_timeout_seconds)
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.app_host, self.app_port).parse().map_err(|e| {
            ReplayError::config_error(format!(
                "invalid listen address {}:{}: {e}",
                self.app_host, self.app_port
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> std::result::Result<Config, clap::Error> {
        Config::try_parse_from(std::iter::once("lapreplay").chain(args.iter().copied()))
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse(&["--driver", "nor", "--gp", "Spa", "--interval", "5"]).unwrap();
        assert_eq!(config.target_driver_code, "NOR");
        assert_eq!(config.session(), SessionKey::new(2023, "Spa", "R"));
        assert_eq!(config.interval(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let config = parse(&["--driver", "VER", "--interval", "0"]).unwrap();
        assert!(matches!(config.validate(), Err(ReplayError::Config { .. })));
    }

    #[test]
    fn blank_driver_is_rejected() {
        assert!(parse(&["--driver", "  "]).is_err());
    }

    #[test]
    fn bad_host_is_rejected() {
        let config = parse(&["--driver", "VER", "--host", "not a host"]).unwrap();
        assert!(config.validate().is_err());
    }
}
