//! Configuration loading and validation.
//!
//! The effective configuration is merged from three layers:
//! CLI flags > config file (YAML/JSON/TOML) > built-in defaults.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::cli::Args;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 9216;
pub const DEFAULT_STALE_AFTER_SECS: u64 = 5;
pub const DEFAULT_LISTING_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_TITLE: &str = "proc-status-page";

/// Placeholder replaced by the resolved user name in `listing_command`.
pub const USER_PLACEHOLDER: &str = "{user}";

/// Default process listing: batch mode, one iteration, secure mode,
/// cumulative times, filtered to the current user.
pub fn default_listing_command() -> Vec<String> {
    ["top", "-b", "-n1", "-s", "-S", "-u", USER_PLACEHOLDER]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Effective configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,

    // Status page
    pub title: Option<String>,
    #[serde(alias = "stale-after-secs")]
    pub stale_after_secs: Option<u64>,

    // Process listing
    #[serde(alias = "listing-command")]
    pub listing_command: Option<Vec<String>>,
    #[serde(alias = "listing-timeout-secs")]
    pub listing_timeout_secs: Option<u64>,
    /// Overrides the user name resolved from the OS.
    pub user: Option<String>,

    // Logging
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: Some(DEFAULT_PORT),
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            title: Some(DEFAULT_TITLE.to_string()),
            stale_after_secs: Some(DEFAULT_STALE_AFTER_SECS),
            listing_command: Some(default_listing_command()),
            listing_timeout_secs: Some(DEFAULT_LISTING_TIMEOUT_SECS),
            user: None,
            log_level: Some("info".into()),
        }
    }
}

impl Config {
    pub fn bind_addr(&self) -> &str {
        self.bind.as_deref().unwrap_or(DEFAULT_BIND_ADDR)
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// Listen address from `bind` and `port`; IPv6 binds such as `::` work too.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .bind_addr()
            .parse()
            .with_context(|| format!("Invalid bind address '{}'", self.bind_addr()))?;
        Ok(SocketAddr::new(ip, self.port()))
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(DEFAULT_TITLE)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs.unwrap_or(DEFAULT_STALE_AFTER_SECS))
    }

    pub fn listing_timeout(&self) -> Duration {
        Duration::from_secs(
            self.listing_timeout_secs
                .unwrap_or(DEFAULT_LISTING_TIMEOUT_SECS),
        )
    }

    pub fn listing_command(&self) -> Vec<String> {
        self.listing_command
            .clone()
            .unwrap_or_else(default_listing_command)
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<()> {
    if let Some(cmd) = &cfg.listing_command {
        match cmd.first() {
            None => bail!("listing_command must not be empty"),
            Some(program) if program.trim().is_empty() => {
                bail!("listing_command program must not be blank")
            }
            _ => {}
        }
    }

    if cfg.listing_timeout_secs == Some(0) {
        bail!("listing_timeout_secs must be greater than 0");
    }

    if let Some(bind) = cfg.bind.as_deref() {
        bind.parse::<IpAddr>()
            .with_context(|| format!("Invalid bind address '{bind}'"))?;
    }

    Ok(())
}

/// Merge CLI overrides on top of the loaded (or default) configuration.
pub fn resolve_config(args: &Args) -> Result<Config> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }
    if let Some(port) = args.port {
        config.port = Some(port);
    }
    if let Some(secs) = args.stale_after_secs {
        config.stale_after_secs = Some(secs);
    }
    if let Some(secs) = args.listing_timeout_secs {
        config.listing_timeout_secs = Some(secs);
    }
    if let Some(user) = &args.user {
        config.user = Some(user.clone());
    }
    if let Some(title) = &args.title {
        config.title = Some(title.clone());
    }

    Ok(config)
}

/// Loads a config file by extension, or the first existing default location.
///
/// Missing files yield the default configuration.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let defaults = [
                "/etc/proc-status-page/config.yaml",
                "/etc/proc-status-page/config.yml",
                "/etc/proc-status-page/config.json",
                "./proc-status-page.yaml",
                "./proc-status-page.yml",
                "./proc-status-page.json",
                "./proc-status-page.toml",
            ];

            match defaults.iter().find(|p| Path::new(p).exists()) {
                Some(p) => PathBuf::from(p),
                None => return Ok(Config::default()),
            }
        }
    };

    if !path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let config = parse_config(&content, path.extension().and_then(|s| s.to_str()))
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}

fn parse_config(content: &str, extension: Option<&str>) -> Result<Config> {
    let config = match extension {
        Some("json") => serde_json::from_str(content)?,
        Some("toml") => toml::from_str(content)?,
        // Default to YAML
        _ => serde_yaml::from_str(content)?,
    };
    Ok(config)
}
