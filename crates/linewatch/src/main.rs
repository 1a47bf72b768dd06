//! Assembly-line object size monitor.
//!
//! Watches a video feed of parts moving down an assembly line, measures the
//! silhouette of each passing part, and flags parts whose area falls outside
//! the configured range. The current decision is published to an MQTT channel
//! once per interval for operators and downstream automation.
//!
//! The binary is split into focused modules:
//! - `config`: CLI flags and the JSON source manifest.
//! - `data`: shared structs passed between stages.
//! - `relay`: single-slot frame hand-off between capture and detection.
//! - `segment`: silhouette extraction for one frame.
//! - `classify`: hysteresis state machine turning noisy per-frame
//!   measurements into stable part/defect decisions.
//! - `status`: shared latest-decision record and running totals.
//! - `publisher`: periodic telemetry updates.
//! - `mqtt`: broker connection and inbound message forwarding.
//! - `control`: inbound control-channel listener.
//! - `overlay`: operator display.
//! - `shutdown`: cooperative stop flag and signal handling.
//! - `pipeline`: thread wiring and the acquisition loop.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod classify;
mod config;
mod control;
mod data;
mod mqtt;
mod overlay;
mod pipeline;
mod publisher;
mod relay;
mod segment;
mod shutdown;
mod status;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let args = config::MonitorArgs::parse();
    let config = config::MonitorConfig::load(args)?;
    pipeline::run(config)
}
