use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use crate::bridge::message::Message;
use crate::bridge::SharedBridge;
use crate::config::MqttSettings;
use crate::utils::error::BridgeError;

/// Capacity of the rumqttc request queue and of the command channel.
const COMMAND_BUFFER: usize = 100;

/// A request from the WebSocket side to the upstream MQTT session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkCommand {
    /// Subscribe to a topic filter (first browser subscriber appeared).
    Subscribe(String),
    /// Unsubscribe from a topic filter (last browser subscriber left).
    Unsubscribe(String),
    /// Publish a payload on a concrete topic on behalf of a browser.
    Publish { topic: String, payload: String },
}

/// The worker that owns the upstream MQTT session.
///
/// Connection handling is left to rumqttc: polling the event loop drives
/// keep-alives and re-dials after failures. The link's own job is to keep
/// the broker's view of subscriptions in sync with the bridge and to fan
/// incoming publishes out to browsers.
pub struct MqttLink {
    client: AsyncClient,
    eventloop: EventLoop,
    bridge: SharedBridge,
    commands: mpsc::Receiver<LinkCommand>,
    broker: (String, u16),
    qos: QoS,
    reconnect: Duration,
}

impl MqttLink {
    /// Creates the MQTT session and hands back the command sender used by
    /// the WebSocket side.
    ///
    /// The session is not established here; the connection is dialed once
    /// `run` starts polling.
    pub fn connect(settings: &MqttSettings, bridge: SharedBridge) -> (Self, mpsc::Sender<LinkCommand>) {
        let options = mqtt_options(settings);
        let (client, eventloop) = AsyncClient::new(options, COMMAND_BUFFER);
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);

        let link = Self {
            client,
            eventloop,
            bridge,
            commands: rx,
            broker: (settings.host.clone(), settings.port),
            qos: qos_from(settings.qos),
            reconnect: Duration::from_secs(settings.reconnect_secs),
        };
        (link, tx)
    }

    /// Runs the session until the command channel closes.
    ///
    /// Should be spawned as a task alongside the WebSocket server.
    pub async fn run(mut self) {
        info!(host = %self.broker.0, port = self.broker.1, "starting mqtt link");

        loop {
            tokio::select! {
                event = self.eventloop.poll() => match event {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("connected to mqtt broker");
                        self.resubscribe().await;
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let msg = Message {
                            topic: publish.topic.clone(),
                            payload: String::from_utf8_lossy(&publish.payload).into_owned(),
                            timestamp: chrono::Utc::now().timestamp_millis(),
                        };
                        debug!(topic = %msg.topic, "mqtt message received");
                        self.bridge.lock().unwrap().fanout(&msg);
                    }
                    Ok(event) => trace!(?event, "mqtt event"),
                    Err(e) => {
                        error!(error = %e, "mqtt connection error, retrying");
                        tokio::time::sleep(self.reconnect).await;
                    }
                },

                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => {
                        if let Err(e) = self.apply(cmd).await {
                            error!(error = %e, "failed to apply mqtt command");
                        }
                    }
                    None => {
                        info!("command channel closed, stopping mqtt link");
                        break;
                    }
                },
            }
        }
    }

    async fn apply(&mut self, cmd: LinkCommand) -> Result<(), BridgeError> {
        match cmd {
            LinkCommand::Subscribe(filter) => {
                info!(filter = %filter, "subscribing upstream");
                self.client.subscribe(filter, self.qos).await?;
            }
            LinkCommand::Unsubscribe(filter) => {
                info!(filter = %filter, "unsubscribing upstream");
                self.client.unsubscribe(filter).await?;
            }
            LinkCommand::Publish { topic, payload } => {
                debug!(topic = %topic, "publishing upstream");
                self.client.publish(topic, self.qos, false, payload).await?;
            }
        }
        Ok(())
    }

    /// Replays every active filter after a (re)connect so that browser
    /// subscriptions survive broker restarts.
    async fn resubscribe(&mut self) {
        let filters = self.bridge.lock().unwrap().active_filters();
        for filter in filters {
            match self.client.subscribe(&filter, self.qos).await {
                Ok(()) => info!(filter = %filter, "resubscribed"),
                Err(e) => warn!(filter = %filter, error = %e, "failed to resubscribe"),
            }
        }
    }
}

fn mqtt_options(settings: &MqttSettings) -> MqttOptions {
    let mut options = MqttOptions::new(&settings.client_id, &settings.host, settings.port);
    options.set_keep_alive(Duration::from_secs(settings.keep_alive_secs));
    if let (Some(user), Some(pass)) = (&settings.username, &settings.password) {
        options.set_credentials(user, pass);
    }
    options
}

fn qos_from(level: u8) -> QoS {
    match level {
        0 => QoS::AtMostOnce,
        1 => QoS::AtLeastOnce,
        _ => QoS::ExactlyOnce,
    }
}
