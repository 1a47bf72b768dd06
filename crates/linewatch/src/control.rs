//! Inbound control-channel listener.
//!
//! Purely observational for now: every message is logged and dropped. The
//! channel hand-off keeps the transport decoupled from whatever future
//! control behavior ends up acting on these messages.

use std::{thread, time::Duration};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::{debug, info};

use crate::{mqtt::ControlMessage, shutdown::Shutdown};

pub fn spawn_control_listener(
    rx: Receiver<ControlMessage>,
    shutdown: Shutdown,
) -> thread::JoinHandle<()> {
    thread::Builder::new()
        .name("control-listener".into())
        .spawn(move || {
            while !shutdown.is_triggered() {
                match rx.recv_timeout(Duration::from_millis(500)) {
                    Ok(message) => {
                        info!(
                            "control message received on {}: {}",
                            message.topic,
                            String::from_utf8_lossy(&message.payload)
                        );
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!("control listener stopped");
        })
        .expect("failed to spawn control listener thread")
}
