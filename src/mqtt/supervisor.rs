//! The MQTT supervisor task.
//!
//! Owns one rumqttc client + event loop on the tokio runtime and drives
//! it alongside a command channel from the UI, an optional heartbeat
//! timer and the debounce ticker. Everything the application needs to
//! know flows out as [`LinkEvent`]s; everything it wants done flows in
//! as [`Command`]s. No call blocks the UI thread.

use std::time::Duration;

use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, MqttOptions, Packet, QoS, Transport,
};
use serde_json::json;
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio::time::{interval_at, sleep, Instant, Interval};
use tracing::{debug, info, warn};

use crate::config::{ConnectionConfig, DEFAULT_BROKER_URL, FALLBACK_BROKER_URL};
use crate::data::now_ms;
use crate::mqtt::link::{DropAction, LinkState, LinkStatus};
use crate::source::{EventSource, LinkEvent, NoticeLevel};

/// Delay between reconnect attempts after a dropped connection.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Cadence of the internal timer driving the debounce deadline.
const TICK_PERIOD: Duration = Duration::from_millis(200);

/// Errors that prevent a connection attempt from even starting.
///
/// Anything that happens after the transport is up is reported through
/// the event stream instead, so the UI stays interactive.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("unsupported broker URL '{0}' (supported schemes: ws://, tcp://, mqtt://)")]
    UnsupportedScheme(String),
    #[error("malformed broker URL '{0}'")]
    InvalidUrl(String),
}

/// Body of an outbound publish. Structured payloads are serialized to
/// text right before hitting the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum PublishBody {
    Text(String),
    Json(serde_json::Value),
}

impl PublishBody {
    fn into_text(self) -> String {
        match self {
            PublishBody::Text(text) => text,
            PublishBody::Json(value) => value.to_string(),
        }
    }
}

/// Commands the application sends to the supervisor task.
#[derive(Debug)]
enum Command {
    Publish { topic: String, body: PublishBody },
    Subscribe { topic: String },
    Unsubscribe { topic: String },
    StartHeartbeat { interval_secs: u64, topic: String },
    StopHeartbeat,
    Disconnect,
}

/// Cloneable handle for sending commands to a running supervisor.
///
/// Every method is fire-and-forget: the boolean only reports whether the
/// supervisor was still alive to receive the command.
#[derive(Debug, Clone)]
pub struct MqttHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl MqttHandle {
    pub fn publish(&self, topic: &str, body: PublishBody) -> bool {
        self.commands
            .send(Command::Publish { topic: topic.to_string(), body })
            .is_ok()
    }

    pub fn subscribe(&self, topic: &str) -> bool {
        self.commands.send(Command::Subscribe { topic: topic.to_string() }).is_ok()
    }

    pub fn unsubscribe(&self, topic: &str) -> bool {
        self.commands.send(Command::Unsubscribe { topic: topic.to_string() }).is_ok()
    }

    /// Start the recurring heartbeat publish. Implicitly replaces any
    /// heartbeat already running.
    pub fn start_heartbeat(&self, interval_secs: u64, topic: &str) -> bool {
        self.commands
            .send(Command::StartHeartbeat { interval_secs, topic: topic.to_string() })
            .is_ok()
    }

    pub fn stop_heartbeat(&self) -> bool {
        self.commands.send(Command::StopHeartbeat).is_ok()
    }

    /// Ask for an orderly shutdown of the link.
    pub fn disconnect(&self) -> bool {
        self.commands.send(Command::Disconnect).is_ok()
    }
}

/// Event source backed by a running supervisor task.
#[derive(Debug)]
pub struct MqttSource {
    receiver: mpsc::UnboundedReceiver<LinkEvent>,
    description: String,
}

impl EventSource for MqttSource {
    fn poll(&mut self) -> Option<LinkEvent> {
        self.receiver.try_recv().ok()
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Spawns and owns the connection lifecycle.
pub struct MqttSupervisor;

impl MqttSupervisor {
    /// Validate the configuration and spawn the supervisor task.
    ///
    /// Must be called from within a tokio runtime. Fails only when no
    /// transport can be constructed from the broker URL; everything past
    /// that point is reported through the returned source.
    pub fn spawn(config: ConnectionConfig) -> Result<(MqttHandle, MqttSource), LinkError> {
        parse_broker_url(&config.broker_url)?;

        let client_id = if config.client_id.trim().is_empty() {
            ConnectionConfig::random_client_id()
        } else {
            config.client_id.trim().to_string()
        };

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let description = format!("mqtt: {}", config.broker_url);

        info!("starting supervisor for {} as {}", config.broker_url, client_id);
        tokio::spawn(run(config, client_id, cmd_rx, event_tx));

        Ok((
            MqttHandle { commands: cmd_tx },
            MqttSource { receiver: event_rx, description },
        ))
    }
}

/// Broker address with the transport decided.
#[derive(Debug, Clone, PartialEq, Eq)]
enum BrokerAddr {
    /// Websocket endpoint; rumqttc takes the full URL.
    Ws { url: String },
    Tcp { host: String, port: u16 },
}

/// Parse a broker URL into a transport address.
fn parse_broker_url(url: &str) -> Result<BrokerAddr, LinkError> {
    let url = url.trim();
    if let Some(rest) = url.strip_prefix("ws://") {
        if rest.is_empty() {
            return Err(LinkError::InvalidUrl(url.to_string()));
        }
        return Ok(BrokerAddr::Ws { url: url.to_string() });
    }

    let rest = url
        .strip_prefix("tcp://")
        .or_else(|| url.strip_prefix("mqtt://"))
        .ok_or_else(|| LinkError::UnsupportedScheme(url.to_string()))?;
    if rest.is_empty() {
        return Err(LinkError::InvalidUrl(url.to_string()));
    }

    match rest.split_once(':') {
        Some((host, port)) => {
            let port = port.parse().map_err(|_| LinkError::InvalidUrl(url.to_string()))?;
            Ok(BrokerAddr::Tcp { host: host.to_string(), port })
        }
        None => Ok(BrokerAddr::Tcp { host: rest.to_string(), port: 1883 }),
    }
}

fn build_options(addr: &BrokerAddr, config: &ConnectionConfig, client_id: &str) -> MqttOptions {
    let mut options = match addr {
        BrokerAddr::Ws { url } => {
            let mut options = MqttOptions::new(client_id, url.clone(), 80);
            options.set_transport(Transport::Ws);
            options
        }
        BrokerAddr::Tcp { host, port } => MqttOptions::new(client_id, host.clone(), *port),
    };
    options.set_keep_alive(Duration::from_secs(30));
    options.set_clean_session(true);
    if !config.username.trim().is_empty() {
        options.set_credentials(config.username.trim(), config.password.clone());
    }
    options
}

/// The liveness message published on each heartbeat tick.
fn heartbeat_payload(client_id: &str) -> serde_json::Value {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    json!({
        "timestamp": timestamp,
        "clientId": client_id,
        "status": "alive",
    })
}

/// Resolve the next heartbeat tick, or park forever when none is armed.
async fn heartbeat_due(heartbeat: &mut Option<(Interval, String)>) {
    match heartbeat {
        Some((interval, _)) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// The supervisor task body.
async fn run(
    config: ConnectionConfig,
    client_id: String,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<LinkEvent>,
) {
    let mut state = LinkState::default();
    let mut current_url = config.broker_url.clone();
    let mut heartbeat: Option<(Interval, String)> = None;
    let mut ticker = tokio::time::interval(TICK_PERIOD);

    'session: loop {
        let addr = match parse_broker_url(&current_url) {
            Ok(addr) => addr,
            Err(e) => {
                let _ = events.send(LinkEvent::notice(NoticeLevel::Error, e.to_string()));
                let _ = events.send(LinkEvent::Disconnected { requested: false });
                return;
            }
        };
        let options = build_options(&addr, &config, &client_id);
        let (client, mut eventloop) = AsyncClient::new(options, 10);
        let _ = events.send(LinkEvent::notice(
            NoticeLevel::Info,
            format!("connecting to {}", current_url),
        ));

        loop {
            tokio::select! {
                event = eventloop.poll() => match event {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        state.on_connack();
                        info!("connected to {}", current_url);
                        let _ = events.send(LinkEvent::Connected);
                        let _ = events.send(LinkEvent::notice(
                            NoticeLevel::Success,
                            format!("connected to {}", current_url),
                        ));
                        if !config.subscribe_topic.trim().is_empty() {
                            subscribe(&client, &events, config.subscribe_topic.trim()).await;
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        debug!("message on {} ({} bytes)", publish.topic, publish.payload.len());
                        let _ = events.send(LinkEvent::Message {
                            topic: publish.topic.clone(),
                            payload: publish.payload.to_vec(),
                        });
                    }
                    Ok(_) => {}
                    Err(e) => {
                        let auth_failure = matches!(
                            &e,
                            ConnectionError::ConnectionRefused(
                                ConnectReturnCode::BadUserNamePassword
                                    | ConnectReturnCode::NotAuthorized
                            )
                        );
                        // Only ever fail over away from the known public
                        // default broker.
                        let failover_available = current_url == DEFAULT_BROKER_URL;
                        match state.on_drop(now_ms(), auth_failure, failover_available) {
                            DropAction::Finalize { requested } => {
                                if !requested {
                                    let _ = events.send(LinkEvent::notice(
                                        NoticeLevel::Error,
                                        format!("connection failed: {}", e),
                                    ));
                                }
                                let _ = events.send(LinkEvent::Disconnected { requested });
                                return;
                            }
                            DropAction::Failover => {
                                warn!("authorization refused by {}, failing over", current_url);
                                let _ = events.send(LinkEvent::notice(
                                    NoticeLevel::Warning,
                                    format!(
                                        "authorization refused by {}, trying fallback {}",
                                        current_url, FALLBACK_BROKER_URL
                                    ),
                                ));
                                current_url = FALLBACK_BROKER_URL.to_string();
                                continue 'session;
                            }
                            DropAction::Debounce => {
                                warn!("link lost: {}", e);
                                let _ = events.send(LinkEvent::Reconnecting);
                                let _ = events.send(LinkEvent::notice(
                                    NoticeLevel::Warning,
                                    format!("link lost ({}), retrying", e),
                                ));
                                sleep(RECONNECT_DELAY).await;
                            }
                            DropAction::KeepTrying => {
                                sleep(RECONNECT_DELAY).await;
                            }
                        }
                    }
                },

                command = commands.recv() => match command {
                    Some(Command::Publish { topic, body }) => {
                        publish_message(&client, &state, &events, &topic, body).await;
                    }
                    Some(Command::Subscribe { topic }) => {
                        subscribe(&client, &events, &topic).await;
                    }
                    Some(Command::Unsubscribe { topic }) => {
                        match client.unsubscribe(&topic).await {
                            Ok(()) => {
                                let _ = events.send(LinkEvent::notice(
                                    NoticeLevel::Info,
                                    format!("unsubscribed from {}", topic),
                                ));
                            }
                            Err(e) => {
                                let _ = events.send(LinkEvent::notice(
                                    NoticeLevel::Error,
                                    format!("unsubscribe from {} failed: {}", topic, e),
                                ));
                            }
                        }
                    }
                    Some(Command::StartHeartbeat { interval_secs, topic }) => {
                        let period = Duration::from_secs(interval_secs.max(1));
                        // Replacing the slot drops any previous timer.
                        heartbeat = Some((interval_at(Instant::now() + period, period), topic));
                        let _ = events.send(LinkEvent::notice(
                            NoticeLevel::Info,
                            format!("heartbeat started, interval {}s", interval_secs.max(1)),
                        ));
                    }
                    Some(Command::StopHeartbeat) => {
                        if heartbeat.take().is_some() {
                            let _ = events.send(LinkEvent::notice(
                                NoticeLevel::Info,
                                "heartbeat stopped",
                            ));
                        }
                    }
                    Some(Command::Disconnect) => {
                        state.on_disconnect_requested();
                        let _ = client.disconnect().await;
                        info!("disconnected on user request");
                        let _ = events.send(LinkEvent::Disconnected { requested: true });
                        return;
                    }
                    // Every handle dropped: shut the link down quietly.
                    None => {
                        let _ = client.disconnect().await;
                        return;
                    }
                },

                _ = heartbeat_due(&mut heartbeat) => {
                    let topic = heartbeat.as_ref().map(|(_, t)| t.clone()).unwrap_or_default();
                    let body = PublishBody::Json(heartbeat_payload(&client_id));
                    publish_message(&client, &state, &events, &topic, body).await;
                }

                _ = ticker.tick() => {
                    if state.tick(now_ms()) {
                        warn!("link did not recover within the debounce window");
                        let _ = events.send(LinkEvent::notice(
                            NoticeLevel::Warning,
                            "link did not recover, marking disconnected",
                        ));
                        let _ = events.send(LinkEvent::Disconnected { requested: false });
                    }
                }
            }
        }
    }
}

async fn subscribe(
    client: &AsyncClient,
    events: &mpsc::UnboundedSender<LinkEvent>,
    topic: &str,
) {
    match client.subscribe(topic, QoS::AtMostOnce).await {
        Ok(()) => {
            let _ = events.send(LinkEvent::notice(
                NoticeLevel::Success,
                format!("subscribed to {}", topic),
            ));
        }
        Err(e) => {
            let _ = events.send(LinkEvent::notice(
                NoticeLevel::Error,
                format!("subscribe to {} failed: {}", topic, e),
            ));
        }
    }
}

/// Publish one message, or reject it locally when the link is down.
async fn publish_message(
    client: &AsyncClient,
    state: &LinkState,
    events: &mpsc::UnboundedSender<LinkEvent>,
    topic: &str,
    body: PublishBody,
) {
    if state.status() != LinkStatus::Connected {
        let _ = events.send(LinkEvent::notice(
            NoticeLevel::Error,
            format!("not connected, message to {} dropped", topic),
        ));
        return;
    }
    let text = body.into_text();
    match client.publish(topic, QoS::AtMostOnce, false, text.clone()).await {
        Ok(()) => {
            let _ = events.send(LinkEvent::notice(
                NoticeLevel::Sent,
                format!("[{}] {}", topic, text),
            ));
        }
        Err(e) => {
            let _ = events.send(LinkEvent::notice(
                NoticeLevel::Error,
                format!("publish to {} failed: {}", topic, e),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_websocket_url() {
        assert_eq!(
            parse_broker_url("ws://broker.emqx.io:8083/mqtt").unwrap(),
            BrokerAddr::Ws { url: "ws://broker.emqx.io:8083/mqtt".to_string() }
        );
    }

    #[test]
    fn test_parse_tcp_url_with_port() {
        assert_eq!(
            parse_broker_url("tcp://localhost:1884").unwrap(),
            BrokerAddr::Tcp { host: "localhost".to_string(), port: 1884 }
        );
    }

    #[test]
    fn test_parse_mqtt_url_default_port() {
        assert_eq!(
            parse_broker_url("mqtt://broker.local").unwrap(),
            BrokerAddr::Tcp { host: "broker.local".to_string(), port: 1883 }
        );
    }

    #[test]
    fn test_parse_unsupported_scheme() {
        assert!(matches!(
            parse_broker_url("wss://secure.example"),
            Err(LinkError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            parse_broker_url("broker.local"),
            Err(LinkError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn test_parse_malformed_urls() {
        assert!(matches!(parse_broker_url("ws://"), Err(LinkError::InvalidUrl(_))));
        assert!(matches!(
            parse_broker_url("tcp://host:notaport"),
            Err(LinkError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_heartbeat_payload_shape() {
        let payload = heartbeat_payload("client-1");
        assert_eq!(payload["clientId"], "client-1");
        assert_eq!(payload["status"], "alive");
        assert!(payload["timestamp"].as_str().is_some_and(|t| !t.is_empty()));
    }

    #[test]
    fn test_publish_body_serialization() {
        assert_eq!(PublishBody::Text("raw".to_string()).into_text(), "raw");
        assert_eq!(
            PublishBody::Json(json!({"command": "led", "value": "on"})).into_text(),
            r#"{"command":"led","value":"on"}"#
        );
    }
}
