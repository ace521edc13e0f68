use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tracing::{debug, error, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::bridge::engine::SubscriptionChange;
use crate::bridge::topic::{self, TopicFilter};
use crate::bridge::SharedBridge;
use crate::client::Client;
use crate::config::BridgeSettings;
use crate::mqtt::link::LinkCommand;
use crate::transport::message::{ClientMessage, ServerMessage};
use crate::utils::error::BridgeError;

/// Accepts WebSocket connections and serves clients until the process stops.
///
/// Each accepted connection gets its own task; the shared bridge holds the
/// cross-connection state. Connections beyond `max_connections` are refused
/// before the WebSocket handshake.
pub async fn start_websocket_server(
    addr: String,
    bridge: SharedBridge,
    commands: mpsc::Sender<LinkCommand>,
    settings: BridgeSettings,
) -> Result<(), BridgeError> {
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "websocket server listening");

    loop {
        let (stream, peer) = listener.accept().await?;

        let connected = bridge.lock().unwrap().client_count();
        if connected >= settings.max_connections {
            warn!(%peer, connected, "connection limit reached, refusing client");
            continue;
        }

        let bridge = bridge.clone();
        let commands = commands.clone();
        let client_buffer = settings.client_buffer;
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, bridge, commands, client_buffer).await {
                warn!(%peer, error = %e, "connection ended with error");
            }
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    bridge: SharedBridge,
    commands: mpsc::Sender<LinkCommand>,
    client_buffer: usize,
) -> Result<(), BridgeError> {
    let ws_stream = accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Bounded outbound channel; fan-out drops messages when it fills up.
    let (tx, mut rx) = mpsc::channel::<WsMessage>(client_buffer);

    let client = Client::new(tx.clone());
    let client_id = client.id.clone();

    bridge.lock().unwrap().register_client(client);
    info!(client = %client_id, "client connected");

    // Writer task: drain the outbound channel into the socket.
    let writer_id = client_id.clone();
    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = ws_sender.send(msg).await {
                debug!(client = %writer_id, error = %e, "send loop closed");
                break;
            }
        }
    });

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(WsMessage::Text(text)) => {
                handle_client_message(text.as_str(), &client_id, &tx, &bridge, &commands).await;
            }
            Ok(WsMessage::Binary(_)) => {
                warn!(client = %client_id, "ignoring binary frame");
            }
            Ok(WsMessage::Close(_)) => break,
            // Ping/pong frames are answered by tungstenite itself.
            Ok(_) => {}
            Err(e) => {
                warn!(client = %client_id, error = %e, "websocket receive error");
                break;
            }
        }
    }

    info!(client = %client_id, "client disconnected");
    writer.abort();

    // Drop subscriptions this client held alone.
    let emptied = bridge.lock().unwrap().cleanup_client(&client_id);
    for filter in emptied {
        commands
            .send(LinkCommand::Unsubscribe(filter))
            .await
            .map_err(|_| BridgeError::ChannelClosed)?;
    }

    Ok(())
}

/// Applies one parsed client frame to the bridge.
///
/// Replies go through the client's own outbound channel so the writer task
/// stays the only socket writer. Upstream commands are only emitted on
/// subscription refcount edges.
pub(crate) async fn handle_client_message(
    text: &str,
    client_id: &str,
    replies: &mpsc::Sender<WsMessage>,
    bridge: &SharedBridge,
    commands: &mpsc::Sender<LinkCommand>,
) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Subscribe { topic }) => {
            let filter = match TopicFilter::parse(&topic) {
                Ok(filter) => filter,
                Err(e) => {
                    warn!(client = %client_id, topic = %topic, error = %e, "rejected subscribe");
                    reply(replies, &ServerMessage::Error {
                        message: e.to_string(),
                    })
                    .await;
                    return;
                }
            };

            let change = bridge
                .lock()
                .unwrap()
                .subscribe(&filter, client_id.to_string());
            if change == SubscriptionChange::UpstreamRequired
                && commands
                    .send(LinkCommand::Subscribe(topic.clone()))
                    .await
                    .is_err()
            {
                error!(topic = %topic, "mqtt command channel closed");
                reply(replies, &ServerMessage::Error {
                    message: "bridge is shutting down".to_string(),
                })
                .await;
                return;
            }

            info!(client = %client_id, topic = %topic, "subscribed");
            reply(replies, &ServerMessage::Subscribed { topic }).await;
        }

        Ok(ClientMessage::Unsubscribe { topic }) => {
            let change = bridge
                .lock()
                .unwrap()
                .unsubscribe(&topic, &client_id.to_string());
            if change == SubscriptionChange::UpstreamRequired
                && commands
                    .send(LinkCommand::Unsubscribe(topic.clone()))
                    .await
                    .is_err()
            {
                error!(topic = %topic, "mqtt command channel closed");
            }

            info!(client = %client_id, topic = %topic, "unsubscribed");
            reply(replies, &ServerMessage::Unsubscribed { topic }).await;
        }

        Ok(ClientMessage::Publish { topic, payload }) => {
            if !topic::is_concrete(&topic) {
                warn!(client = %client_id, topic = %topic, "rejected publish to wildcard topic");
                reply(replies, &ServerMessage::Error {
                    message: format!("cannot publish to '{topic}': topic must be concrete"),
                })
                .await;
                return;
            }

            if commands
                .send(LinkCommand::Publish { topic: topic.clone(), payload })
                .await
                .is_err()
            {
                error!(topic = %topic, "mqtt command channel closed");
                reply(replies, &ServerMessage::Error {
                    message: "bridge is shutting down".to_string(),
                })
                .await;
                return;
            }

            debug!(client = %client_id, topic = %topic, "published");
        }

        Err(e) => {
            warn!(client = %client_id, error = %e, "invalid client message");
            reply(replies, &ServerMessage::Error {
                message: format!("invalid message: {e}"),
            })
            .await;
        }
    }
}

async fn reply(sender: &mpsc::Sender<WsMessage>, msg: &ServerMessage) {
    match serde_json::to_string(msg) {
        Ok(json) => {
            if sender.send(WsMessage::text(json)).await.is_err() {
                debug!("reply channel closed");
            }
        }
        Err(e) => error!(error = %e, "failed to serialize server message"),
    }
}
