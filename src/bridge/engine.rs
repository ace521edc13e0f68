use std::collections::{HashMap, HashSet};

use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::bridge::message::Message;
use crate::bridge::topic::{ClientId, Subscription, TopicFilter};
use crate::client::Client;
use crate::transport::message::ServerMessage;

/// Outcome of a subscription change, as seen by the upstream MQTT session.
///
/// The bridge keeps one upstream subscription per filter, shared by all
/// clients that asked for it. Only the refcount edges (first subscriber in,
/// last subscriber out) require talking to the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionChange {
    /// The broker must be sent a SUBSCRIBE/UNSUBSCRIBE for this filter.
    UpstreamRequired,
    /// Other clients still hold the filter (or already held it); the
    /// upstream session stays as it is.
    NoUpstreamChange,
}

/// The fan-out registry at the center of the bridge.
///
/// The `Bridge` tracks every connected WebSocket client and every active
/// topic filter, and routes messages arriving from the MQTT session to
/// exactly the clients whose filters match. It is shared behind a mutex
/// between the WebSocket connection handlers (which mutate subscriptions)
/// and the MQTT worker (which fans incoming publishes out).
#[derive(Debug, Default)]
pub struct Bridge {
    pub(crate) clients: HashMap<ClientId, Client>,
    pub(crate) subscriptions: HashMap<String, Subscription>,
}

impl Bridge {
    /// Creates a new bridge with no clients and no subscriptions.
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
            subscriptions: HashMap::new(),
        }
    }

    /// Registers a newly connected client.
    ///
    /// The client's sender half is what `fanout` pushes matched messages
    /// into; registration must happen before the first subscribe so no
    /// delivery can race a missing client entry.
    pub fn register_client(&mut self, client: Client) {
        self.clients.insert(client.id.clone(), client);
    }

    /// Removes a client without touching its subscriptions.
    ///
    /// Use `cleanup_client` on disconnect; this exists for the rare case
    /// where the caller manages subscriptions itself.
    pub fn remove_client(&mut self, client_id: &ClientId) {
        self.clients.remove(client_id);
    }

    /// Number of currently registered clients.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Subscribes a client to a topic filter.
    ///
    /// Creates the subscription entry if this is the first client asking
    /// for the filter, in which case the caller must forward a SUBSCRIBE
    /// to the broker. Re-subscribing an already subscribed client is a
    /// no-op.
    pub fn subscribe(&mut self, filter: &TopicFilter, client_id: ClientId) -> SubscriptionChange {
        match self.subscriptions.get_mut(filter.as_str()) {
            Some(sub) => {
                sub.add(client_id);
                SubscriptionChange::NoUpstreamChange
            }
            None => {
                let mut sub = Subscription::new(filter.clone());
                sub.add(client_id);
                self.subscriptions.insert(filter.as_str().to_string(), sub);
                SubscriptionChange::UpstreamRequired
            }
        }
    }

    /// Unsubscribes a client from a topic filter.
    ///
    /// Drops the subscription entry when the last subscriber leaves, in
    /// which case the caller must forward an UNSUBSCRIBE to the broker.
    /// Unknown filters and non-subscribed clients are ignored.
    pub fn unsubscribe(&mut self, filter: &str, client_id: &ClientId) -> SubscriptionChange {
        let Some(sub) = self.subscriptions.get_mut(filter) else {
            return SubscriptionChange::NoUpstreamChange;
        };
        sub.remove(client_id);
        if sub.is_empty() {
            self.subscriptions.remove(filter);
            SubscriptionChange::UpstreamRequired
        } else {
            SubscriptionChange::NoUpstreamChange
        }
    }

    /// All filters that still have at least one subscriber.
    ///
    /// The MQTT worker replays these after a reconnect so that client
    /// subscriptions survive broker restarts.
    pub fn active_filters(&self) -> Vec<String> {
        self.subscriptions.keys().cloned().collect()
    }

    /// Delivers a message to every client with a matching filter.
    ///
    /// Each client receives the message at most once per fan-out, even if
    /// several of its filters match the topic. Delivery is non-blocking:
    /// a client whose outbound buffer is full has this message dropped and
    /// keeps its subscriptions.
    pub fn fanout(&self, msg: &Message) {
        let frame = match serde_json::to_string(&ServerMessage::from(msg.clone())) {
            Ok(json) => json,
            Err(e) => {
                error!(topic = %msg.topic, error = %e, "failed to serialize message");
                return;
            }
        };
        let ws_msg = WsMessage::text(frame);

        let mut delivered: HashSet<&ClientId> = HashSet::new();
        for sub in self.subscriptions.values() {
            if !sub.filter.matches(&msg.topic) {
                continue;
            }
            for client_id in &sub.subscribers {
                if !delivered.insert(client_id) {
                    continue;
                }
                let Some(client) = self.clients.get(client_id) else {
                    warn!(client = %client_id, "subscription refers to unknown client");
                    continue;
                };
                match client.sender.try_send(ws_msg.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        warn!(client = %client_id, topic = %msg.topic, "client buffer full, dropping message");
                    }
                    Err(TrySendError::Closed(_)) => {
                        warn!(client = %client_id, "client channel closed, dropping message");
                    }
                }
            }
        }

        if delivered.is_empty() {
            debug!(topic = %msg.topic, "no subscribers matched topic");
        }
    }

    /// Removes a client and strips it from every subscription.
    ///
    /// Returns the filters that lost their last subscriber so the caller
    /// can unsubscribe them upstream.
    pub fn cleanup_client(&mut self, client_id: &ClientId) -> Vec<String> {
        self.remove_client(client_id);

        let mut emptied = Vec::new();
        for (filter, sub) in self.subscriptions.iter_mut() {
            sub.remove(client_id);
            if sub.is_empty() {
                emptied.push(filter.clone());
            }
        }
        for filter in &emptied {
            self.subscriptions.remove(filter);
        }

        debug!(client = %client_id, "cleaned up client");
        emptied
    }
}
