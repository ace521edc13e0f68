//! The `error` module defines the error type used throughout `mqpush`.
//!
//! All fallible paths in the bridge surface as a [`BridgeError`] so that
//! callers can propagate failures with `?` and log them uniformly.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid topic filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: &'static str },

    #[error("mqtt client error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("mqtt command channel closed")]
    ChannelClosed,
}
