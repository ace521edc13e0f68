use tokio::sync::mpsc::Sender;
use tungstenite::protocol::Message as WsMessage;

/// A connected WebSocket client.
///
/// The sender is the bounded outbound channel drained by the connection's
/// writer task. Fan-out never awaits on it; when the buffer is full the
/// message is dropped for this client.
#[derive(Debug)]
pub struct Client {
    pub id: String,
    pub sender: Sender<WsMessage>,
}

impl Client {
    pub fn new(sender: Sender<WsMessage>) -> Self {
        Self {
            id: format!("client-{}", uuid::Uuid::new_v4()),
            sender,
        }
    }
}
