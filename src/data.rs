//! Data models shared by the event channel and the REST facade

use crate::error::SdkError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Connection state of an event channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

/// Category of an inbound event. The string forms are the wire names used
/// by the venue's socket and are case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Connect,
    Joined,
    Error,
    Disconnect,
    Order,
    Trade,
    Position,
    Logout,
}

impl EventKind {
    pub const ALL: [EventKind; 8] = [
        EventKind::Connect,
        EventKind::Joined,
        EventKind::Error,
        EventKind::Disconnect,
        EventKind::Order,
        EventKind::Trade,
        EventKind::Position,
        EventKind::Logout,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Connect => "connect",
            EventKind::Joined => "joined",
            EventKind::Error => "error",
            EventKind::Disconnect => "disconnect",
            EventKind::Order => "order",
            EventKind::Trade => "trade",
            EventKind::Position => "position",
            EventKind::Logout => "logout",
        }
    }

    /// Order, trade and position events arrive as JSON text that has to be
    /// decoded before delivery; the rest are forwarded untouched.
    pub fn carries_json_body(&self) -> bool {
        matches!(self, EventKind::Order | EventKind::Trade | EventKind::Position)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| SdkError::decode(format!("Unknown event kind: {}", s)))
    }
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    /// Venue root, e.g. `https://trading.example.com`
    pub url: String,
    pub socket_path: String,
    /// Channel-type tag sent on every (re)connect
    pub api_type: String,
    pub retry_interval_ms: u64,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub engine_io_version: u8,
    pub log_enabled: bool,
    pub log_dir: String,
}

impl ClientConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), SdkError> {
        if self.url.is_empty() {
            return Err(SdkError::misuse("Url cannot be empty"));
        }

        let scheme_ok = ["http://", "https://", "ws://", "wss://"]
            .iter()
            .any(|prefix| self.url.starts_with(prefix));
        if !scheme_ok {
            return Err(SdkError::misuse(format!(
                "Url must use http(s) or ws(s): {}",
                self.url
            )));
        }

        if !self.socket_path.starts_with('/') {
            return Err(SdkError::misuse("Socket path must start with '/'"));
        }

        if self.api_type.is_empty() {
            return Err(SdkError::misuse("Api type cannot be empty"));
        }

        if self.retry_interval_ms == 0 {
            return Err(SdkError::misuse("Retry interval must be greater than 0"));
        }

        if self.connect_timeout_ms == 0 || self.request_timeout_ms == 0 {
            return Err(SdkError::misuse("Timeouts must be greater than 0"));
        }

        if !matches!(self.engine_io_version, 3 | 4) {
            return Err(SdkError::misuse(format!(
                "Unsupported Engine.IO version: {}",
                self.engine_io_version
            )));
        }

        Ok(())
    }

    /// Load from a JSON file; absent keys keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SdkError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            SdkError::misuse(format!("Cannot read config {}: {}", path.display(), e))
        })?;
        let config: ClientConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the process environment (and a `.env` file if present)
    ///
    /// Looks for `INTERACTIVE_API_URL`, `INTERACTIVE_RETRY_INTERVAL_MS`
    /// and `INTERACTIVE_LOG_DIR`.
    pub fn from_env() -> Result<Self, SdkError> {
        let _ = dotenvy::dotenv();

        let mut config = ClientConfig::default();
        config.url = std::env::var("INTERACTIVE_API_URL")
            .map_err(|_| SdkError::misuse("INTERACTIVE_API_URL not set"))?;

        if let Ok(raw) = std::env::var("INTERACTIVE_RETRY_INTERVAL_MS") {
            config.retry_interval_ms = raw.parse().map_err(|_| {
                SdkError::misuse(format!("Invalid INTERACTIVE_RETRY_INTERVAL_MS: {}", raw))
            })?;
        }
        if let Ok(dir) = std::env::var("INTERACTIVE_LOG_DIR") {
            config.log_enabled = true;
            config.log_dir = dir;
        }

        config.validate()?;
        Ok(config)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "https://localhost:3000".to_string(),
            socket_path: "/interactive/socket.io".to_string(),
            api_type: "INTERACTIVE".to_string(),
            retry_interval_ms: 5000,
            connect_timeout_ms: 30_000,
            request_timeout_ms: 30_000,
            engine_io_version: 3,
            log_enabled: false,
            log_dir: "logs".to_string(),
        }
    }
}

/// Parameters for one connect instruction handed to a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub endpoint: String,
    pub path: String,
    pub token: String,
    pub user_id: String,
    pub api_type: String,
}

impl ConnectRequest {
    /// Query parameters attached to the socket handshake
    pub fn query_pairs(&self) -> [(&'static str, &str); 3] {
        [
            ("token", self.token.as_str()),
            ("userID", self.user_id.as_str()),
            ("apiType", self.api_type.as_str()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_round_trips_wire_names() {
        for kind in EventKind::ALL {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_event_kind_is_case_sensitive() {
        assert!("Order".parse::<EventKind>().is_err());
        assert!("ORDER".parse::<EventKind>().is_err());
    }

    #[test]
    fn test_only_order_trade_position_carry_json() {
        let json_kinds: Vec<_> = EventKind::ALL
            .iter()
            .filter(|k| k.carries_json_body())
            .collect();
        assert_eq!(json_kinds, vec![&EventKind::Order, &EventKind::Trade, &EventKind::Position]);
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retry_interval(), Duration::from_millis(5000));
        assert_eq!(config.api_type, "INTERACTIVE");
    }

    #[test]
    fn test_config_rejects_bad_values() {
        let mut config = ClientConfig::default();
        config.url = "ftp://venue".to_string();
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.retry_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.engine_io_version = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_partial_json_keeps_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"url":"https://venue.test","retryIntervalMs":250}"#).unwrap();
        assert_eq!(config.url, "https://venue.test");
        assert_eq!(config.retry_interval_ms, 250);
        assert_eq!(config.socket_path, "/interactive/socket.io");
    }

    #[test]
    fn test_connect_request_query_order() {
        let request = ConnectRequest {
            endpoint: "https://venue.test".to_string(),
            path: "/interactive/socket.io".to_string(),
            token: "T1".to_string(),
            user_id: "U1".to_string(),
            api_type: "INTERACTIVE".to_string(),
        };
        assert_eq!(
            request.query_pairs(),
            [("token", "T1"), ("userID", "U1"), ("apiType", "INTERACTIVE")]
        );
    }
}
