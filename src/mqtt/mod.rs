//! The `mqtt` module owns the single upstream MQTT session.
//!
//! One [`link::MqttLink`] worker holds the rumqttc client and event loop,
//! applies subscription commands coming from the WebSocket side, and fans
//! incoming publishes out through the bridge. Subscriptions are replayed
//! after every reconnect.

pub mod link;

pub use link::{LinkCommand, MqttLink};
