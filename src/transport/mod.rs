//! The `transport` module is responsible for handling network communication
//! with browser clients over WebSockets.
//!
//! It defines the JSON messaging protocol used between clients and the
//! bridge, and implements the WebSocket server itself, managing connections,
//! message parsing, and forwarding client requests to the bridge and the
//! upstream MQTT session.

pub mod message;
pub mod websocket;
