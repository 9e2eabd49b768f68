use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use invoice_core::DEFAULT_LOG_LIMIT;
use invoice_engine::{ApiSettings, PollSettings, DEFAULT_BASE_URL};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cli::Cli;
use crate::logging::LogDestination;

const DEFAULT_CONFIG_FILE: &str = "invoice_watch.ron";
const API_URL_ENV: &str = "INVOICE_API_URL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub poll_interval_ms: u64,
    /// Cadence of simulated-progress ticks in the watch loop.
    pub tick_interval_ms: u64,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub log_entries: usize,
    pub log_destination: LogDestination,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval_ms: 2_000,
            tick_interval_ms: 100,
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            log_entries: DEFAULT_LOG_LIMIT,
            log_destination: LogDestination::Terminal,
        }
    }
}

impl AppConfig {
    /// Resolves the effective config: CLI flag, then environment, then file,
    /// then defaults.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let mut config = match config_path(cli.config.as_deref()) {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(cli, std::env::var(API_URL_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        ron::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    fn apply_overrides(&mut self, cli: &Cli, env_url: Option<String>) {
        if let Some(url) = env_url.filter(|url| !url.trim().is_empty()) {
            self.api_base_url = url;
        }
        if let Some(url) = &cli.api_url {
            self.api_base_url = url.clone();
        }
        if let Some(ms) = cli.poll_interval_ms {
            self.poll_interval_ms = ms;
        }
        if let Some(entries) = cli.log_entries {
            self.log_entries = entries;
        }
        if let Some(destination) = cli.log_destination {
            self.log_destination = destination;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.api_base_url)
            .with_context(|| format!("invalid api_base_url {:?}", self.api_base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("api_base_url must be http or https, got {}", url.scheme());
        }
        if self.poll_interval_ms == 0 {
            bail!("poll_interval_ms must be greater than 0");
        }
        if self.tick_interval_ms == 0 {
            bail!("tick_interval_ms must be greater than 0");
        }
        Ok(())
    }

    pub fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            base_url: self.api_base_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_millis(self.poll_interval_ms),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
            fallback.is_file().then_some(fallback)
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use tempfile::TempDir;

    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["invoice-watch"];
        argv.extend_from_slice(args);
        argv.extend_from_slice(&["list"]);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cfg.ron");
        fs::write(
            &path,
            "(api_base_url: \"http://files:7000\", poll_interval_ms: 5000)",
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.api_base_url, "http://files:7000");
        assert_eq!(config.poll_interval_ms, 5000);
        assert_eq!(config.tick_interval_ms, 100);
        assert_eq!(config.log_entries, DEFAULT_LOG_LIMIT);
    }

    #[test]
    fn cli_beats_env_beats_file() {
        let mut config = AppConfig {
            api_base_url: "http://file:1".to_string(),
            ..AppConfig::default()
        };
        config.apply_overrides(&cli(&[]), Some("http://env:2".to_string()));
        assert_eq!(config.api_base_url, "http://env:2");

        config.apply_overrides(
            &cli(&["--api-url", "http://flag:3", "--poll-interval-ms", "750"]),
            Some("http://env:2".to_string()),
        );
        assert_eq!(config.api_base_url, "http://flag:3");
        assert_eq!(config.poll_interval_ms, 750);
    }

    #[test]
    fn blank_env_is_ignored() {
        let mut config = AppConfig::default();
        config.apply_overrides(&cli(&[]), Some("  ".to_string()));
        assert_eq!(config.api_base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let bad_scheme = AppConfig {
            api_base_url: "ftp://x".to_string(),
            ..AppConfig::default()
        };
        assert!(bad_scheme.validate().is_err());

        let zero_poll = AppConfig {
            poll_interval_ms: 0,
            ..AppConfig::default()
        };
        assert!(zero_poll.validate().is_err());

        assert!(AppConfig::default().validate().is_ok());
    }
}
