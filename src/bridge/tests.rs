use super::Bridge;
use super::engine::SubscriptionChange;
use super::message::Message;
use super::topic::{self, Subscription, TopicFilter};
use crate::client::Client;
use crate::transport::message::ServerMessage;
use tokio::sync::mpsc;
use tungstenite::protocol::Message as WsMessage;

fn filter(raw: &str) -> TopicFilter {
    TopicFilter::parse(raw).expect("valid filter")
}

#[test]
fn test_filter_parse_valid() {
    for raw in ["a", "a/b/c", "+", "+/b", "a/+/c", "#", "a/#", "a/+/#", "$SYS/#"] {
        assert!(TopicFilter::parse(raw).is_ok(), "expected '{raw}' to parse");
    }
}

#[test]
fn test_filter_parse_invalid() {
    for raw in ["", "a+/b", "a/b+", "a#", "#/b", "a/#/b", "a/b\0c"] {
        assert!(
            TopicFilter::parse(raw).is_err(),
            "expected '{raw}' to be rejected"
        );
    }
}

#[test]
fn test_filter_matches_exact_and_plus() {
    assert!(filter("a/b").matches("a/b"));
    assert!(!filter("a/b").matches("a/c"));
    assert!(!filter("a/b").matches("a"));
    assert!(!filter("a/b").matches("a/b/c"));

    assert!(filter("a/+/c").matches("a/b/c"));
    assert!(filter("a/+/c").matches("a/x/c"));
    assert!(!filter("a/+/c").matches("a/c"));
    assert!(!filter("a/+").matches("a"));
    assert!(filter("+").matches("a"));
}

#[test]
fn test_filter_matches_hash() {
    assert!(filter("a/#").matches("a/b"));
    assert!(filter("a/#").matches("a/b/c/d"));
    // '#' also matches the parent level
    assert!(filter("a/#").matches("a"));
    assert!(filter("#").matches("a/b/c"));
    assert!(!filter("a/#").matches("b/a"));
}

#[test]
fn test_filter_wildcards_skip_dollar_topics() {
    assert!(!filter("#").matches("$SYS/broker/uptime"));
    assert!(!filter("+/broker/uptime").matches("$SYS/broker/uptime"));
    // An explicit $-filter still matches
    assert!(filter("$SYS/#").matches("$SYS/broker/uptime"));
}

#[test]
fn test_is_concrete() {
    assert!(topic::is_concrete("a/b/c"));
    assert!(!topic::is_concrete("a/+/c"));
    assert!(!topic::is_concrete("a/#"));
    assert!(!topic::is_concrete(""));
}

#[test]
fn test_subscription_add_remove() {
    let mut sub = Subscription::new(filter("sensors/#"));
    assert!(sub.is_empty());
    sub.add("client1".to_string());
    assert!(sub.subscribers.contains("client1"));
    sub.remove(&"client1".to_string());
    assert!(sub.is_empty());
}

fn new_client() -> (Client, mpsc::Receiver<WsMessage>) {
    let (tx, rx) = mpsc::channel::<WsMessage>(8);
    (Client::new(tx), rx)
}

#[test]
fn test_bridge_register_and_remove_client() {
    let mut bridge = Bridge::default();
    let (client, _rx) = new_client();
    let client_id = client.id.clone();

    bridge.register_client(client);
    assert_eq!(bridge.client_count(), 1);

    bridge.remove_client(&client_id);
    assert_eq!(bridge.client_count(), 0);
}

#[test]
fn test_subscribe_refcount_edges() {
    let mut bridge = Bridge::default();

    // First subscriber triggers an upstream SUBSCRIBE
    let change = bridge.subscribe(&filter("sensors/#"), "a".to_string());
    assert_eq!(change, SubscriptionChange::UpstreamRequired);

    // Second client on the same filter shares the upstream subscription
    let change = bridge.subscribe(&filter("sensors/#"), "b".to_string());
    assert_eq!(change, SubscriptionChange::NoUpstreamChange);

    // Re-subscribing is idempotent
    let change = bridge.subscribe(&filter("sensors/#"), "a".to_string());
    assert_eq!(change, SubscriptionChange::NoUpstreamChange);

    // Only the last unsubscribe reaches upstream
    let change = bridge.unsubscribe("sensors/#", &"a".to_string());
    assert_eq!(change, SubscriptionChange::NoUpstreamChange);
    let change = bridge.unsubscribe("sensors/#", &"b".to_string());
    assert_eq!(change, SubscriptionChange::UpstreamRequired);
    assert!(bridge.subscriptions.is_empty());
}

#[test]
fn test_unsubscribe_unknown_filter() {
    let mut bridge = Bridge::default();
    let change = bridge.unsubscribe("nope", &"a".to_string());
    assert_eq!(change, SubscriptionChange::NoUpstreamChange);
}

#[test]
fn test_active_filters() {
    let mut bridge = Bridge::default();
    bridge.subscribe(&filter("a/#"), "a".to_string());
    bridge.subscribe(&filter("b/+"), "a".to_string());

    let mut filters = bridge.active_filters();
    filters.sort();
    assert_eq!(filters, vec!["a/#".to_string(), "b/+".to_string()]);
}

fn sample(topic: &str) -> Message {
    Message {
        topic: topic.to_string(),
        payload: "hello".to_string(),
        timestamp: 0,
    }
}

fn expect_mqtt_frame(msg: WsMessage) -> (String, String) {
    let WsMessage::Text(text) = msg else {
        panic!("expected a text frame");
    };
    let parsed: ServerMessage = serde_json::from_str(text.as_str()).unwrap();
    match parsed {
        ServerMessage::Mqtt { topic, payload, .. } => (topic, payload),
        other => panic!("expected an mqtt frame, got {other:?}"),
    }
}

#[test]
fn test_fanout_routes_to_matching_clients_only() {
    let mut bridge = Bridge::default();
    let (subscriber, mut sub_rx) = new_client();
    let (bystander, mut by_rx) = new_client();
    let sub_id = subscriber.id.clone();
    let by_id = bystander.id.clone();
    bridge.register_client(subscriber);
    bridge.register_client(bystander);

    bridge.subscribe(&filter("sensors/#"), sub_id);
    bridge.subscribe(&filter("actuators/#"), by_id);

    bridge.fanout(&sample("sensors/gsm90/f"));

    let (topic, payload) = expect_mqtt_frame(sub_rx.try_recv().unwrap());
    assert_eq!(topic, "sensors/gsm90/f");
    assert_eq!(payload, "hello");

    assert!(by_rx.try_recv().is_err());
}

#[test]
fn test_fanout_delivers_once_per_client() {
    let mut bridge = Bridge::default();
    let (client, mut rx) = new_client();
    let client_id = client.id.clone();
    bridge.register_client(client);

    // Two overlapping filters held by the same client
    bridge.subscribe(&filter("sensors/#"), client_id.clone());
    bridge.subscribe(&filter("sensors/gsm90/+"), client_id);

    bridge.fanout(&sample("sensors/gsm90/f"));

    assert!(rx.try_recv().is_ok());
    assert!(rx.try_recv().is_err(), "message was delivered twice");
}

#[test]
fn test_fanout_drops_when_client_buffer_full() {
    let mut bridge = Bridge::default();
    let (tx, mut rx) = mpsc::channel::<WsMessage>(1);
    let client = Client::new(tx);
    let client_id = client.id.clone();
    bridge.register_client(client);
    bridge.subscribe(&filter("sensors/#"), client_id);

    bridge.fanout(&sample("sensors/a"));
    bridge.fanout(&sample("sensors/b"));

    // The second message was dropped, not queued
    let (topic, _) = expect_mqtt_frame(rx.try_recv().unwrap());
    assert_eq!(topic, "sensors/a");
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_fanout_survives_closed_channel() {
    let mut bridge = Bridge::default();
    let (client, rx) = new_client();
    let client_id = client.id.clone();
    bridge.register_client(client);
    bridge.subscribe(&filter("sensors/#"), client_id);

    drop(rx);
    // No panic, the message is just dropped
    bridge.fanout(&sample("sensors/a"));
}

#[test]
fn test_fanout_without_subscribers() {
    let bridge = Bridge::default();
    // No assertion, just checking for no panics
    bridge.fanout(&sample("sensors/a"));
}

#[test]
fn test_cleanup_client_returns_emptied_filters() {
    let mut bridge = Bridge::default();
    let (a, _a_rx) = new_client();
    let (b, _b_rx) = new_client();
    let a_id = a.id.clone();
    let b_id = b.id.clone();
    bridge.register_client(a);
    bridge.register_client(b);

    bridge.subscribe(&filter("shared/#"), a_id.clone());
    bridge.subscribe(&filter("shared/#"), b_id);
    bridge.subscribe(&filter("own/a"), a_id.clone());

    let emptied = bridge.cleanup_client(&a_id);
    assert_eq!(emptied, vec!["own/a".to_string()]);
    assert_eq!(bridge.client_count(), 1);
    // The shared filter stays alive for the other client
    assert!(bridge.subscriptions.contains_key("shared/#"));
    assert!(!bridge.subscriptions.contains_key("own/a"));
}
