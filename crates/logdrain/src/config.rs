// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::auth::Credentials;
use crate::constants::{
    DEFAULT_LANES, DEFAULT_PORT, HASH_RING_REPLICATION, MAX_REQUEST_CONTENT_LENGTH,
    POINT_CHANNEL_CAPACITY, RECYCLE_INTERVAL, SAMPLE_INTERVAL, SINK_TIMEOUT,
};
use crate::errors::ConfigError;

/// Drain configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen port
    pub port: u16,
    /// Logs every unclassified line at debug level
    pub debug: bool,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Basic auth credentials; `None` disables authentication
    pub credentials: Option<Credentials>,
    /// Riemann `host:port`
    pub riemann_address: String,
    /// Prepended to every Riemann event host
    pub riemann_prefix: String,
    /// Number of channel groups, each with its own forwarder and connection
    pub lanes: usize,
    pub channel_capacity: usize,
    pub hash_ring_replicas: usize,
    /// How long a request may wait on a full queue; `None` waits indefinitely
    pub enqueue_timeout: Option<Duration>,
    pub sink_timeout: Duration,
    pub recycle_interval: Duration,
    pub sample_interval: Duration,
    pub max_request_content_length: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            debug: false,
            log_level: "info".to_string(),
            credentials: None,
            riemann_address: "127.0.0.1:5555".to_string(),
            riemann_prefix: String::new(),
            lanes: DEFAULT_LANES,
            channel_capacity: POINT_CHANNEL_CAPACITY,
            hash_ring_replicas: HASH_RING_REPLICATION,
            enqueue_timeout: None,
            sink_timeout: SINK_TIMEOUT,
            recycle_interval: RECYCLE_INTERVAL,
            sample_interval: SAMPLE_INTERVAL,
            max_request_content_length: MAX_REQUEST_CONTENT_LENGTH,
        }
    }
}

/// Value of `name`, `None` when unset or blank.
fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|val| !val.trim().is_empty())
}

fn parse<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match var(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|_| {
            ConfigError::InvalidConfig(format!("{name} has an invalid value '{raw}'"))
        }),
    }
}

fn parse_millis(name: &str) -> Result<Option<Duration>, ConfigError> {
    if var(name).is_none() {
        return Ok(None);
    }
    parse::<u64>(name, 0).map(|millis| Some(Duration::from_millis(millis)))
}

impl Config {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let riemann_address = var("RIEMANN_ADDRESS").ok_or(ConfigError::Missing("RIEMANN_ADDRESS"))?;
        let debug = var("DEBUG").is_some_and(|val| val.eq_ignore_ascii_case("true"));
        let log_level = var("LOG_LEVEL")
            .map(|val| val.to_lowercase())
            .unwrap_or(defaults.log_level);

        let config = Self {
            port: parse("PORT", defaults.port)?,
            debug,
            log_level,
            credentials: Credentials::new(var("USER"), var("PASSWORD")),
            riemann_address,
            riemann_prefix: var("RIEMANN_PREFIX").unwrap_or_default(),
            lanes: parse("LANES", defaults.lanes)?,
            channel_capacity: parse("CHANNEL_CAPACITY", defaults.channel_capacity)?,
            hash_ring_replicas: parse("HASH_RING_REPLICAS", defaults.hash_ring_replicas)?,
            enqueue_timeout: parse_millis("ENQUEUE_TIMEOUT_MS")?,
            sink_timeout: parse_millis("SINK_TIMEOUT_MS")?.unwrap_or(defaults.sink_timeout),
            recycle_interval: parse("RECYCLE_INTERVAL_SECS", defaults.recycle_interval.as_secs())
                .map(Duration::from_secs)?,
            sample_interval: parse("SAMPLE_INTERVAL_SECS", defaults.sample_interval.as_secs())
                .map(Duration::from_secs)?,
            max_request_content_length: parse(
                "MAX_REQUEST_CONTENT_LENGTH",
                defaults.max_request_content_length,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.riemann_address.trim().is_empty() {
            return Err(ConfigError::Missing("RIEMANN_ADDRESS"));
        }

        let positive = [
            ("LANES", self.lanes),
            ("CHANNEL_CAPACITY", self.channel_capacity),
            ("HASH_RING_REPLICAS", self.hash_ring_replicas),
            ("MAX_REQUEST_CONTENT_LENGTH", self.max_request_content_length),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidConfig(format!(
                    "{name} must be greater than 0"
                )));
            }
        }

        let intervals = [
            ("SINK_TIMEOUT_MS", self.sink_timeout),
            ("RECYCLE_INTERVAL_SECS", self.recycle_interval),
            ("SAMPLE_INTERVAL_SECS", self.sample_interval),
        ];
        for (name, value) in intervals {
            if value.is_zero() {
                return Err(ConfigError::InvalidConfig(format!(
                    "{name} must be greater than 0"
                )));
            }
        }
        if self.enqueue_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(ConfigError::InvalidConfig(
                "ENQUEUE_TIMEOUT_MS must be greater than 0 when set".to_string(),
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(ConfigError::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }
}
