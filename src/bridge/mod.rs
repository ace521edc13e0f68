use std::sync::{Arc, Mutex};

pub mod engine;
pub mod message;
pub mod topic;

pub use engine::Bridge;

/// The bridge as shared between the WebSocket handlers and the MQTT worker.
pub type SharedBridge = Arc<Mutex<Bridge>>;

#[cfg(test)]
mod tests;
