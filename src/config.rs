//! Runtime configuration
//!
//! Defaults match the public protocol: port 8081, 60s idle read timeout,
//! 5s write timeout, one monster step every 4 seconds.

use std::env;
use std::time::Duration;

use crate::error::ConfigError;
use crate::game::DEFAULT_TICK_INTERVAL;
use crate::handler::Timeouts;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8081;

const HOST_VAR: &str = "WIC_HOST";
const PORT_VAR: &str = "WIC_PORT";

#[derive(Debug, Clone)]
pub struct Config {
    /// Address the listener binds to
    pub addr: String,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    /// Time between two monster steps
    pub tick_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: format!("{}:{}", DEFAULT_HOST, DEFAULT_PORT),
            read_timeout: Duration::from_secs(60),
            write_timeout: Duration::from_secs(5),
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

impl Config {
    /// Load configuration from `WIC_HOST` and `WIC_PORT`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup(HOST_VAR).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match lookup(PORT_VAR) {
            Some(value) => value
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidValue {
                    name: PORT_VAR,
                    value,
                })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            addr: format!("{}:{}", host, port),
            ..Self::default()
        })
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            read: self.read_timeout,
            write: self.write_timeout,
        }
    }
}
