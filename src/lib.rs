//! # mqpush
//!
//! `mqpush` is a push bridge between an MQTT broker and browser clients.
//! It holds a single upstream MQTT session, subscribes to topic filters on
//! behalf of connected WebSocket clients, and republishes incoming MQTT
//! messages to exactly the clients whose filters match.
//!
//! ## Core Modules
//!
//! The library is structured into several modules, each with a distinct responsibility:
//!
//! - `bridge`: the fan-out registry that tracks clients and topic filters and routes messages.
//! - `client`: represents a connected WebSocket client.
//! - `config`: handles loading and managing the bridge configuration.
//! - `mqtt`: the worker owning the upstream MQTT session (rumqttc).
//! - `transport`: the WebSocket server and the JSON wire protocol.
//! - `utils`: shared utilities such as error handling and logging setup.

pub mod bridge;
pub mod client;
pub mod config;
pub mod mqtt;
pub mod transport;
pub mod utils;

#[cfg(test)]
mod tests;
