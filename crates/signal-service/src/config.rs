//! Signaling service configuration.
//!
//! Configuration is loaded from environment variables. Every variable is
//! optional; malformed values are rejected rather than silently defaulted.

use crate::signaling::RelayScope;
use axum::http::HeaderValue;
use std::collections::HashMap;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP + WebSocket bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:5000";

/// Default per-connection outbound mailbox size.
pub const DEFAULT_CONNECTION_BUFFER: usize = 256;

/// Default maximum inbound WebSocket message size (64 KiB).
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 64 * 1024;

/// Default drain window between cancelling sockets and exiting.
pub const DEFAULT_SHUTDOWN_GRACE_SECONDS: u64 = 5;

/// Signaling service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP + WebSocket bind address (default: "0.0.0.0:5000").
    pub bind_address: SocketAddr,

    /// Allowed CORS origin. `None` allows any origin.
    pub allowed_origin: Option<String>,

    /// Outbound mailbox size per socket (default: 256).
    pub connection_buffer: usize,

    /// Largest accepted inbound WebSocket message (default: 65536).
    pub max_message_bytes: usize,

    /// Drop relays whose target is not in the sender's room (default: false).
    pub enforce_room_scope: bool,

    /// Drain window on shutdown (default: 5s).
    pub shutdown_grace: Duration,

    /// Emit logs as JSON lines (default: false).
    pub log_json: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = parse_or(vars, "SIGNAL_BIND_ADDRESS", || {
            SocketAddr::from_str(DEFAULT_BIND_ADDRESS)
                .map_err(|e| ConfigError::InvalidValue(format!("default bind address: {e}")))
        })?;

        let allowed_origin = vars
            .get("SIGNAL_ALLOWED_ORIGIN")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty() && s != "*");
        if let Some(origin) = &allowed_origin {
            HeaderValue::from_str(origin).map_err(|e| {
                ConfigError::InvalidValue(format!("SIGNAL_ALLOWED_ORIGIN={origin}: {e}"))
            })?;
        }

        let connection_buffer = parse_or(vars, "SIGNAL_CONNECTION_BUFFER", || {
            Ok(DEFAULT_CONNECTION_BUFFER)
        })?;
        if connection_buffer == 0 {
            return Err(ConfigError::InvalidValue(
                "SIGNAL_CONNECTION_BUFFER must be greater than zero".to_string(),
            ));
        }

        let max_message_bytes = parse_or(vars, "SIGNAL_MAX_MESSAGE_BYTES", || {
            Ok(DEFAULT_MAX_MESSAGE_BYTES)
        })?;
        if max_message_bytes == 0 {
            return Err(ConfigError::InvalidValue(
                "SIGNAL_MAX_MESSAGE_BYTES must be greater than zero".to_string(),
            ));
        }

        let enforce_room_scope = parse_bool(vars, "SIGNAL_ENFORCE_ROOM_SCOPE")?;

        let shutdown_grace_seconds: u64 = parse_or(vars, "SIGNAL_SHUTDOWN_GRACE_SECONDS", || {
            Ok(DEFAULT_SHUTDOWN_GRACE_SECONDS)
        })?;

        let log_json = parse_bool(vars, "SIGNAL_LOG_JSON")?;

        Ok(Config {
            bind_address,
            allowed_origin,
            connection_buffer,
            max_message_bytes,
            enforce_room_scope,
            shutdown_grace: Duration::from_secs(shutdown_grace_seconds),
            log_json,
        })
    }

    /// Relay policy implied by `enforce_room_scope`.
    #[must_use]
    pub fn relay_scope(&self) -> RelayScope {
        if self.enforce_room_scope {
            RelayScope::SameRoom
        } else {
            RelayScope::Open
        }
    }
}

fn parse_or<T>(
    vars: &HashMap<String, String>,
    key: &str,
    default: impl FnOnce() -> Result<T, ConfigError>,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match vars.get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::InvalidValue(format!("{key}={raw}: {e}"))),
        None => default(),
    }
}

fn parse_bool(vars: &HashMap<String, String>, key: &str) -> Result<bool, ConfigError> {
    let Some(raw) = vars.get(key) else {
        return Ok(false);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue(format!(
            "{key}={raw}: expected true or false"
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_from_vars_defaults() {
        let config = Config::from_vars(&HashMap::new()).expect("Config should load");

        assert_eq!(config.bind_address.to_string(), DEFAULT_BIND_ADDRESS);
        assert_eq!(config.allowed_origin, None);
        assert_eq!(config.connection_buffer, DEFAULT_CONNECTION_BUFFER);
        assert_eq!(config.max_message_bytes, DEFAULT_MAX_MESSAGE_BYTES);
        assert!(!config.enforce_room_scope);
        assert_eq!(config.relay_scope(), RelayScope::Open);
        assert_eq!(
            config.shutdown_grace,
            Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECONDS)
        );
        assert!(!config.log_json);
    }

    #[test]
    fn test_from_vars_custom_values() {
        let config = Config::from_vars(&vars(&[
            ("SIGNAL_BIND_ADDRESS", "127.0.0.1:7000"),
            ("SIGNAL_ALLOWED_ORIGIN", "https://meet.example.com"),
            ("SIGNAL_CONNECTION_BUFFER", "16"),
            ("SIGNAL_MAX_MESSAGE_BYTES", "1024"),
            ("SIGNAL_ENFORCE_ROOM_SCOPE", "true"),
            ("SIGNAL_SHUTDOWN_GRACE_SECONDS", "0"),
            ("SIGNAL_LOG_JSON", "1"),
        ]))
        .expect("Config should load");

        assert_eq!(config.bind_address.port(), 7000);
        assert_eq!(
            config.allowed_origin.as_deref(),
            Some("https://meet.example.com")
        );
        assert_eq!(config.connection_buffer, 16);
        assert_eq!(config.max_message_bytes, 1024);
        assert_eq!(config.relay_scope(), RelayScope::SameRoom);
        assert_eq!(config.shutdown_grace, Duration::ZERO);
        assert!(config.log_json);
    }

    #[test]
    fn test_wildcard_origin_means_any() {
        let config = Config::from_vars(&vars(&[("SIGNAL_ALLOWED_ORIGIN", "*")])).unwrap();
        assert_eq!(config.allowed_origin, None);
    }

    #[test]
    fn test_origin_must_be_a_header_value() {
        let err = Config::from_vars(&vars(&[("SIGNAL_ALLOWED_ORIGIN", "https://a\nb")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn test_invalid_bind_address() {
        let err = Config::from_vars(&vars(&[("SIGNAL_BIND_ADDRESS", "not-an-address")]))
            .unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue(msg) if msg.contains("SIGNAL_BIND_ADDRESS"))
        );
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        assert!(Config::from_vars(&vars(&[("SIGNAL_CONNECTION_BUFFER", "lots")])).is_err());
        assert!(Config::from_vars(&vars(&[("SIGNAL_CONNECTION_BUFFER", "0")])).is_err());
        assert!(Config::from_vars(&vars(&[("SIGNAL_MAX_MESSAGE_BYTES", "-1")])).is_err());
        assert!(Config::from_vars(&vars(&[("SIGNAL_SHUTDOWN_GRACE_SECONDS", "soon")])).is_err());
    }

    #[test]
    fn test_invalid_bool_is_rejected() {
        let err = Config::from_vars(&vars(&[("SIGNAL_ENFORCE_ROOM_SCOPE", "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }
}
