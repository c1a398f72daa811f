use std::io::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use serde_derive::Deserialize;
use serde_json;

use crate::error::{Error, Result};
use crate::logging::Priority;

pub const DEFAULT_CONFIG_PATH: &'static str = "./dfu-monitor.json";

fn check_file_exists(path: &str) -> Result<()> {
    let p = std::path::Path::new(path);
    if !std::path::Path::is_file(p) {
        return Err(Error::Config(format!("{} does not exist or it is not a file", path)));
    }
    Ok(())
}

fn check_not_blank(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Config(format!("{} must not be blank", name)));
    }
    Ok(())
}

fn check_not_zero(value: u64, name: &str) -> Result<()> {
    if value == 0 {
        return Err(Error::Config(format!("{} must be greater than zero", name)));
    }
    Ok(())
}

fn read_config(path: &str) -> Result<String> {
    let mut s = String::new();
    let fh = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(fh);
    reader.read_to_string(&mut s)?;

    Ok(s)
}

#[derive(Clone, Debug, Deserialize)]
pub struct ConnectionConfig {
    pub dfuplus_command: String,
    pub server: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub source_ip: Option<String>,
    #[serde(default)]
    pub transfer_buffer_size: Option<u32>,
    #[serde(default)]
    pub throttle: Option<u32>,
    #[serde(default)]
    pub replicate: Option<bool>,
    #[serde(default)]
    pub no_recover: Option<bool>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub poll_ceiling_ms: u64,
    pub max_wait_ms: u64,
    pub exec_timeout_ms: u64,
    pub worker_threads: usize,
}

impl Default for MonitorConfig {
    fn default() -> MonitorConfig {
        MonitorConfig {
            poll_ceiling_ms: 30_000,
            max_wait_ms: 60 * 60 * 1000,
            exec_timeout_ms: 5 * 60 * 1000,
            worker_threads: 1,
        }
    }
}

impl MonitorConfig {
    pub fn poll_ceiling(&self) -> Duration {
        Duration::from_millis(self.poll_ceiling_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    pub fn exec_timeout(&self) -> Duration {
        Duration::from_millis(self.exec_timeout_ms)
    }
}

fn default_log_level() -> Priority {
    Priority::Info
}

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default = "default_log_level")]
    pub log_level: Priority,
}

impl Config {
    pub fn parse(raw: &str) -> Result<Config> {
        let cfg: Config = serde_json::from_str(raw)?;
        cfg.validate()?;

        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        check_not_blank(&self.connection.server, "server")?;
        check_not_blank(&self.connection.dfuplus_command, "dfuplus_command")?;
        check_file_exists(self.connection.dfuplus_command.as_str())?;

        check_not_zero(self.monitor.poll_ceiling_ms, "poll_ceiling_ms")?;
        check_not_zero(self.monitor.max_wait_ms, "max_wait_ms")?;
        check_not_zero(self.monitor.exec_timeout_ms, "exec_timeout_ms")?;
        check_not_zero(self.monitor.worker_threads as u64, "worker_threads")?;

        Ok(())
    }
}

pub fn load(cfg_path: &str) -> Result<Arc<Config>> {
    let raw = read_config(cfg_path)?;
    Ok(Arc::from(Config::parse(raw.as_str())?))
}
