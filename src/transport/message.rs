use serde::{Deserialize, Serialize};

use crate::bridge::message::Message;

/// Control messages sent by a browser client.
///
/// `subscribe`/`unsubscribe` carry an MQTT topic filter (wildcards allowed);
/// `publish` carries a concrete topic and is forwarded to the broker.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "subscribe")]
    Subscribe { topic: String },

    #[serde(rename = "unsubscribe")]
    Unsubscribe { topic: String },

    #[serde(rename = "publish")]
    Publish { topic: String, payload: String },
}

/// Frames pushed to a browser client.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// A republished MQTT message.
    #[serde(rename = "mqtt")]
    Mqtt {
        topic: String,
        payload: String,
        timestamp: i64,
    },

    #[serde(rename = "subscribed")]
    Subscribed { topic: String },

    #[serde(rename = "unsubscribed")]
    Unsubscribed { topic: String },

    #[serde(rename = "error")]
    Error { message: String },
}

impl From<Message> for ServerMessage {
    fn from(msg: Message) -> Self {
        Self::Mqtt {
            topic: msg.topic,
            payload: msg.payload,
            timestamp: msg.timestamp,
        }
    }
}
