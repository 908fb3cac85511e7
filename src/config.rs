use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

/// Environment variable naming the config file to load.
const CONFIG_ENV: &str = "HEARTH_CONFIG";
/// Default config file; missing file means built-in defaults.
const CONFIG_FILE: &str = "hearth.yaml";

/// Startup configuration, deserialized from YAML. Every field has a default,
/// so a partial (or absent) file is fine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// TCP port to listen on, 1024-65535.
    pub port: u16,
    /// Trigger-mode selector, 0-3: level/level, edge connections,
    /// edge listener, edge/edge.
    pub trigger_mode: u8,
    /// Reserved: per-connection idle timeout in milliseconds. Parsed and kept
    /// so existing config files stay valid; stalled-connection eviction is
    /// not implemented.
    pub timeout_ms: u64,
    /// Close the listening socket gracefully (SO_LINGER, one second drain).
    pub linger: bool,
    /// Worker threads in the pool.
    pub workers: usize,
    /// Ceiling on concurrently open client connections; clients above it get
    /// a busy notice and are closed immediately.
    pub max_connections: usize,
    /// Directory the static resources are served from.
    pub resource_root: PathBuf,
    /// Answer keep-alive-eligible requests with `Connection: keep-alive`
    /// instead of the default unconditional `close`.
    pub keep_alive_responses: bool,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub enabled: bool,
    /// One of `debug`, `info`, `warn`, `error`.
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            trigger_mode: 3,
            timeout_ms: 0,
            linger: false,
            workers: num_cpus::get(),
            max_connections: 65536,
            resource_root: PathBuf::from("./resources"),
            keep_alive_responses: false,
            log: LogConfig::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Loads the file named by `HEARTH_CONFIG` (default `hearth.yaml`),
    /// falling back to defaults when no file exists.
    pub fn load() -> Result<Self> {
        let path = env::var(CONFIG_ENV).unwrap_or_else(|_| CONFIG_FILE.to_string());
        match fs::read_to_string(&path) {
            Ok(text) => {
                serde_yaml::from_str(&text).with_context(|| format!("parse config {}", path))
            }
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.port < 1024 {
            bail!("port {} out of range (1024-65535)", self.port);
        }
        if self.trigger_mode > 3 {
            bail!("trigger mode {} out of range (0-3)", self.trigger_mode);
        }
        if self.workers == 0 {
            bail!("worker count must be positive");
        }
        if self.max_connections == 0 {
            bail!("connection ceiling must be positive");
        }
        Ok(())
    }
}
