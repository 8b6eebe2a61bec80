use serde::Deserialize;
use std::time::Duration;

/// Top-level configuration settings for the application.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Settings {
    pub server: ServerSettings,
    pub multiplexer: MultiplexerSettings,
    pub hub: HubSettings,
    pub logging: LoggingSettings,
}

/// Configuration settings for the WebSocket gateway.
///
/// Defines the bind address and how many sessions may be connected at once.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub max_connections: usize,
}

/// Deadlines applied to a factory's `open` and `close` calls.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct MultiplexerSettings {
    pub open_timeout_ms: u64,
    pub close_timeout_ms: u64,
}

impl MultiplexerSettings {
    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }
}

/// Configuration for the in-process realtime hub.
///
/// `channel_capacity` bounds each channel's broadcast buffer; slow listeners
/// that fall further behind lose the oldest messages.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct HubSettings {
    pub channel_capacity: usize,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Missing values are filled in from `Settings::default()`.
#[derive(Debug, Deserialize, Default)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub multiplexer: Option<PartialMultiplexerSettings>,
    pub hub: Option<PartialHubSettings>,
    pub logging: Option<PartialLoggingSettings>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub max_connections: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialMultiplexerSettings {
    pub open_timeout_ms: Option<u64>,
    pub close_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialHubSettings {
    pub channel_capacity: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
                max_connections: 1000,
            },
            multiplexer: MultiplexerSettings {
                open_timeout_ms: 10_000,
                close_timeout_ms: 5_000,
            },
            hub: HubSettings {
                channel_capacity: 256,
            },
            logging: LoggingSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl PartialSettings {
    /// Overlays whatever was provided on top of `defaults`.
    pub fn merge_over(self, defaults: Settings) -> Settings {
        let server = self.server.unwrap_or_default();
        let multiplexer = self.multiplexer.unwrap_or_default();
        let hub = self.hub.unwrap_or_default();
        let logging = self.logging.unwrap_or_default();

        Settings {
            server: ServerSettings {
                host: server.host.unwrap_or(defaults.server.host),
                port: server.port.unwrap_or(defaults.server.port),
                max_connections: server
                    .max_connections
                    .unwrap_or(defaults.server.max_connections),
            },
            multiplexer: MultiplexerSettings {
                open_timeout_ms: multiplexer
                    .open_timeout_ms
                    .unwrap_or(defaults.multiplexer.open_timeout_ms),
                close_timeout_ms: multiplexer
                    .close_timeout_ms
                    .unwrap_or(defaults.multiplexer.close_timeout_ms),
            },
            hub: HubSettings {
                channel_capacity: hub
                    .channel_capacity
                    .unwrap_or(defaults.hub.channel_capacity),
            },
            logging: LoggingSettings {
                level: logging.level.unwrap_or(defaults.logging.level),
            },
        }
    }
}
