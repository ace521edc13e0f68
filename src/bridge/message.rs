use serde::{Deserialize, Serialize};

/// A message received from the MQTT broker, ready for republication.
///
/// The topic is the concrete topic the broker delivered the publish on
/// (never a filter), the payload is the broker payload decoded as UTF-8
/// (lossily, so binary payloads are still forwarded), and the timestamp
/// is stamped by the bridge at receipt time, in Unix milliseconds.
///
/// # Example
///
/// ```rust
/// use mqpush::bridge::message::Message;
///
/// let msg = Message {
///     topic: "sensors/gsm90/temp".to_string(),
///     payload: "{\"temp\":25}".to_string(),
///     timestamp: 1_725_000_000_000,
/// };
/// assert_eq!(msg.topic, "sensors/gsm90/temp");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub topic: String,
    pub payload: String,
    pub timestamp: i64,
}
