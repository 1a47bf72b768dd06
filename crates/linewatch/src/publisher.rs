//! Periodic telemetry updates to the MQTT channel.
//!
//! One tick per interval: read the current decision, encode it, publish it.
//! Delivery is at-most-once and best-effort; a failed publish is logged and
//! the next tick retries unconditionally.

use std::{sync::Arc, thread, time::Duration};

use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    mqtt::{MqttTransport, TELEMETRY_TOPIC},
    shutdown::Shutdown,
    status::StatusStore,
};

/// Wire form of one telemetry tick.
#[derive(Serialize)]
struct DefectReport {
    #[serde(rename = "Defect")]
    defect: &'static str,
}

impl DefectReport {
    /// The published value is the sustained verdict for the part currently
    /// in view, not the one-frame confirmation edge.
    fn new(defective: bool) -> Self {
        Self {
            defect: if defective { "true" } else { "false" },
        }
    }
}

/// Spawn the worker that publishes the current decision every `rate`
/// seconds until shutdown.
pub fn spawn_publisher(
    status: Arc<StatusStore>,
    transport: Option<MqttTransport>,
    rate: u64,
    shutdown: Shutdown,
) -> thread::JoinHandle<()> {
    thread::Builder::new()
        .name("telemetry".into())
        .spawn(move || {
            let interval = Duration::from_secs(rate);
            loop {
                if shutdown.is_triggered() {
                    break;
                }

                let (info, _totals) = status.read();
                match &transport {
                    Some(transport) => publish_report(transport, info.show),
                    None => debug!("no MQTT transport, skipping telemetry tick"),
                }

                if !shutdown.sleep(interval) {
                    break;
                }
            }
            debug!("telemetry thread stopped");
        })
        .expect("failed to spawn telemetry thread")
}

fn publish_report(transport: &MqttTransport, defective: bool) {
    let report = DefectReport::new(defective);
    let payload = match serde_json::to_vec(&report) {
        Ok(payload) => payload,
        Err(err) => {
            warn!("telemetry encoding failed: {err}");
            return;
        }
    };
    match transport.publish(TELEMETRY_TOPIC, &payload) {
        Ok(()) => debug!(
            "published to {TELEMETRY_TOPIC}: {}",
            String::from_utf8_lossy(&payload)
        ),
        Err(err) => warn!("telemetry publish failed: {err:#}"),
    }
}
