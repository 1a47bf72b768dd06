//! MQTT transport: broker connection, telemetry publishing, and forwarding
//! of inbound control-channel traffic.
//!
//! The broker address comes from the environment like the rest of the
//! deployment wiring (`MQTT_SERVER`, `MQTT_CLIENT_ID`). An unreachable
//! broker is not fatal: the monitor keeps classifying and displaying, the
//! connection driver retries in the background, and telemetry resumes when
//! the broker comes back.

use std::{env, thread, time::Duration};

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender, bounded};
use rumqttc::{Client, Connection, Event, Incoming, MqttOptions, QoS};
use tracing::{debug, info, warn};

use crate::shutdown::Shutdown;

/// Topic carrying the periodic defect status.
pub const TELEMETRY_TOPIC: &str = "defects/counter";
/// Topic watched for inbound control traffic.
pub const CONTROL_TOPIC: &str = "defects/control";

/// Inbound message forwarded from the broker connection.
pub struct ControlMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Handle used by the telemetry publisher to emit messages.
#[derive(Clone)]
pub struct MqttTransport {
    client: Client,
}

impl MqttTransport {
    /// Fire-and-forget publish at QoS 0. Errors are for the caller to log;
    /// the connection driver keeps its retry loop running either way.
    pub fn publish(&self, topic: &str, payload: &[u8]) -> Result<()> {
        self.client
            .try_publish(topic, QoS::AtMostOnce, false, payload)
            .with_context(|| format!("failed to publish to {topic}"))
    }
}

/// A live broker link: the publish handle, the inbound message channel,
/// and the connection driver thread.
pub struct MqttLink {
    pub transport: MqttTransport,
    pub control: Receiver<ControlMessage>,
    driver: thread::JoinHandle<()>,
}

impl MqttLink {
    /// Start the transport against the broker named by the environment.
    /// The connection itself is established lazily by the driver thread,
    /// so only a malformed address or a dead command queue fails here.
    pub fn connect(shutdown: &Shutdown) -> Result<Self> {
        let server = env::var("MQTT_SERVER").unwrap_or_else(|_| "localhost:1883".into());
        let client_id = env::var("MQTT_CLIENT_ID").unwrap_or_else(|_| "linewatch".into());
        let (host, port) = split_server(&server)?;

        let mut options = MqttOptions::new(client_id, host, port);
        options.set_keep_alive(Duration::from_secs(30));
        let (client, connection) = Client::new(options, 10);
        client
            .subscribe(CONTROL_TOPIC, QoS::AtMostOnce)
            .context("failed to queue control-channel subscription")?;

        let (tx, rx) = bounded(32);
        let driver_shutdown = shutdown.clone();
        let driver = thread::Builder::new()
            .name("mqtt-connection".into())
            .spawn(move || drive_connection(connection, tx, driver_shutdown))
            .expect("failed to spawn mqtt connection thread");

        info!("MQTT transport started against {server}");
        Ok(Self {
            transport: MqttTransport { client },
            control: rx,
            driver,
        })
    }

    /// Disconnect from the broker and wait for the driver to wind down.
    pub fn close(self) {
        if let Err(err) = self.transport.client.disconnect() {
            debug!("MQTT disconnect failed: {err}");
        }
        let _ = self.driver.join();
    }
}

fn drive_connection(mut connection: Connection, tx: Sender<ControlMessage>, shutdown: Shutdown) {
    for event in connection.iter() {
        if shutdown.is_triggered() {
            break;
        }
        match event {
            Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                info!("connected to MQTT broker");
            }
            Ok(Event::Incoming(Incoming::Publish(publish))) => {
                let message = ControlMessage {
                    topic: publish.topic.clone(),
                    payload: publish.payload.to_vec(),
                };
                if tx.send(message).is_err() {
                    break;
                }
            }
            Ok(_) => {}
            Err(err) => {
                warn!("MQTT connection error: {err}; retrying");
                thread::sleep(Duration::from_secs(1));
            }
        }
    }
    debug!("MQTT connection thread stopped");
}

fn split_server(server: &str) -> Result<(String, u16)> {
    let trimmed = server.strip_prefix("tcp://").unwrap_or(server);
    match trimmed.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse()
                .with_context(|| format!("invalid MQTT port in {server:?}"))?;
            Ok((host.to_string(), port))
        }
        None => Ok((trimmed.to_string(), 1883)),
    }
}
