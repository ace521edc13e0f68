mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{BridgeSettings, MqttSettings, ServerSettings, Settings};

/// Loads the configuration from the default file and environment variables.
/// Merges the configuration with default values.
/// Returns a `Settings` struct containing the server, MQTT, and bridge
/// configurations. Environment keys use `__` as the section separator
/// (e.g. `MQTT__HOST`, `SERVER__PORT`).
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(Environment::default().separator("__").try_parsing(true));

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    // Merge with defaults
    let default = Settings::default();

    Ok(Settings {
        server: ServerSettings {
            host: partial
                .server
                .as_ref()
                .and_then(|s| s.host.clone())
                .unwrap_or(default.server.host),
            port: partial
                .server
                .as_ref()
                .and_then(|s| s.port)
                .unwrap_or(default.server.port),
        },
        mqtt: MqttSettings {
            host: partial
                .mqtt
                .as_ref()
                .and_then(|m| m.host.clone())
                .unwrap_or(default.mqtt.host),
            port: partial
                .mqtt
                .as_ref()
                .and_then(|m| m.port)
                .unwrap_or(default.mqtt.port),
            client_id: partial
                .mqtt
                .as_ref()
                .and_then(|m| m.client_id.clone())
                .unwrap_or(default.mqtt.client_id),
            keep_alive_secs: partial
                .mqtt
                .as_ref()
                .and_then(|m| m.keep_alive_secs)
                .unwrap_or(default.mqtt.keep_alive_secs),
            reconnect_secs: partial
                .mqtt
                .as_ref()
                .and_then(|m| m.reconnect_secs)
                .unwrap_or(default.mqtt.reconnect_secs),
            qos: partial
                .mqtt
                .as_ref()
                .and_then(|m| m.qos)
                .unwrap_or(default.mqtt.qos),
            username: partial
                .mqtt
                .as_ref()
                .and_then(|m| m.username.clone())
                .or(default.mqtt.username),
            password: partial
                .mqtt
                .as_ref()
                .and_then(|m| m.password.clone())
                .or(default.mqtt.password),
        },
        bridge: BridgeSettings {
            max_connections: partial
                .bridge
                .as_ref()
                .and_then(|b| b.max_connections)
                .unwrap_or(default.bridge.max_connections),
            client_buffer: partial
                .bridge
                .as_ref()
                .and_then(|b| b.client_buffer)
                .unwrap_or(default.bridge.client_buffer),
        },
    })
}
