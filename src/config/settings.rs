use serde::Deserialize;

/// Top-level configuration settings for the application.
///
/// Includes settings for the WebSocket server, the upstream MQTT session,
/// and the bridge itself.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub mqtt: MqttSettings,
    pub bridge: BridgeSettings,
}

/// Configuration settings for the WebSocket server.
///
/// Defines the host and port the server will bind to.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Configuration settings for the upstream MQTT session.
#[derive(Debug, Deserialize, Clone)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive_secs: u64,
    pub reconnect_secs: u64,
    /// QoS used for upstream subscriptions and publishes (0, 1 or 2).
    pub qos: u8,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Configuration settings for the bridge.
///
/// Controls the client connection limit and the per-client outbound buffer
/// that absorbs fan-out bursts.
#[derive(Debug, Deserialize, Clone)]
pub struct BridgeSettings {
    pub max_connections: usize,
    pub client_buffer: usize,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub mqtt: Option<PartialMqttSettings>,
    pub bridge: Option<PartialBridgeSettings>,
}

/// Partial server settings.
///
/// Used when loading server configuration from external sources with optional values.
#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Partial MQTT settings.
///
/// Used when loading MQTT configuration from external sources with optional values.
#[derive(Debug, Deserialize)]
pub struct PartialMqttSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub client_id: Option<String>,
    pub keep_alive_secs: Option<u64>,
    pub reconnect_secs: Option<u64>,
    pub qos: Option<u8>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Partial bridge settings.
///
/// Used for bridge configuration from external sources with optional values.
#[derive(Debug, Deserialize)]
pub struct PartialBridgeSettings {
    pub max_connections: Option<usize>,
    pub client_buffer: Option<usize>,
}

/// Provides default values for `Settings`.
///
/// Ensures the application has sensible defaults if no configuration is
/// provided. The WebSocket port and the broker address mirror the classic
/// pusher setup: socket port 5000, broker on localhost:1883.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 5000,
            },
            mqtt: MqttSettings {
                host: "127.0.0.1".to_string(),
                port: 1883,
                client_id: "mqpush".to_string(),
                keep_alive_secs: 30,
                reconnect_secs: 5,
                qos: 0,
                username: None,
                password: None,
            },
            bridge: BridgeSettings {
                max_connections: 1000,
                client_buffer: 64,
            },
        }
    }
}
