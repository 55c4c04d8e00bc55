//! Runtime settings read from the environment.
//!
//! A `.env` file is honoured when present. Every value has a default, so
//! an empty environment yields a working local setup.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use log::warn;

use crate::game::clock::TimeControl;

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("ignoring unparsable {key}={raw}");
            default
        }),
        Err(_) => default,
    }
}

fn env_millis(key: &str, default: Duration) -> Duration {
    Duration::from_millis(env_or(key, default.as_millis() as u64))
}

/// Load `.env` once; a missing file is fine.
pub fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            warn!("failed to read .env: {e}");
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Used when a new game request names no time control.
    pub default_time_control: TimeControl,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            default_time_control: TimeControl::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: env_or("LIGACHESS_BIND", defaults.bind_addr),
            default_time_control: env::var("LIGACHESS_TIME_CONTROL")
                .map(|raw| TimeControl::parse_or_default(&raw))
                .unwrap_or(defaults.default_time_control),
        }
    }
}

/// Client-side timings for polling, heartbeats and rematch offers.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub api_base: String,
    pub poll_fast: Duration,
    pub poll_slow: Duration,
    pub failure_threshold: u32,
    pub heartbeat_interval: Duration,
    pub pong_timeout: Duration,
    pub rematch_window: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_base: "http://127.0.0.1:8080".to_string(),
            poll_fast: Duration::from_millis(1500),
            poll_slow: Duration::from_secs(30),
            failure_threshold: 4,
            heartbeat_interval: Duration::from_secs(3),
            pong_timeout: Duration::from_secs(8),
            rematch_window: Duration::from_secs(10),
        }
    }
}

impl SyncConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            api_base: env_or("LIGACHESS_API_BASE", d.api_base),
            poll_fast: env_millis("LIGACHESS_POLL_FAST_MS", d.poll_fast),
            poll_slow: env_millis("LIGACHESS_POLL_SLOW_MS", d.poll_slow),
            failure_threshold: env_or("LIGACHESS_FAILURE_THRESHOLD", d.failure_threshold),
            heartbeat_interval: env_millis("LIGACHESS_HEARTBEAT_MS", d.heartbeat_interval),
            pong_timeout: env_millis("LIGACHESS_PONG_TIMEOUT_MS", d.pong_timeout),
            rematch_window: env_millis("LIGACHESS_REMATCH_WINDOW_MS", d.rematch_window),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_protocol_constants() {
        let sync = SyncConfig::default();
        assert_eq!(sync.failure_threshold, 4);
        assert_eq!(sync.heartbeat_interval, Duration::from_secs(3));
        assert_eq!(sync.pong_timeout, Duration::from_secs(8));
        assert_eq!(sync.rematch_window, Duration::from_secs(10));
        assert_eq!(ServerConfig::default().bind_addr, "127.0.0.1:8080");
    }

    #[test]
    fn test_unset_value_uses_default() {
        assert_eq!(env_or("LIGACHESS_TEST_UNSET_VALUE", 7u32), 7);
    }
}
