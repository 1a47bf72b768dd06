//! Thread wiring and the acquisition/display loop.
//!
//! The main thread owns acquisition dispatch and the operator display; the
//! detection worker, the telemetry worker, the control listener, and the
//! MQTT connection driver each run on their own thread and poll the shared
//! stop flag every iteration. No lock is held across segmentation, display,
//! or publish work.

use std::{sync::Arc, thread, time::Duration};

use anyhow::{Context, Result};
use crossbeam_channel::RecvTimeoutError;
use frame_source::{Frame, VideoSource};
use tracing::{debug, error, info, warn};

use crate::{
    classify::{Classifier, Measurement},
    config::MonitorConfig,
    control::spawn_control_listener,
    mqtt::MqttLink,
    overlay,
    publisher::spawn_publisher,
    relay::{FrameOutlet, Take, frame_relay},
    segment::Segmenter,
    shutdown::Shutdown,
    status::StatusStore,
};

/// Frames are scaled to this size before segmentation and display.
const WORKING_SIZE: (i32, i32) = (960, 540);
/// Display delay when the source does not report a frame rate.
const FALLBACK_DELAY_MS: i32 = 5;
/// How long blocking waits may run before a worker re-checks the stop flag.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub fn run(config: MonitorConfig) -> Result<()> {
    // A source that cannot be opened is fatal before any thread starts.
    let source = VideoSource::open(&config.video)
        .with_context(|| format!("unable to open video source {:?}", config.video))?;
    // Match playback speed to the source frame rate where it reports one.
    let delay_ms = source
        .fps()
        .map(|fps| (1000.0 / fps) as i32)
        .filter(|delay| *delay > 0)
        .unwrap_or(FALLBACK_DELAY_MS);

    let shutdown = Shutdown::new();
    shutdown.install_signal_handler();

    let link = match MqttLink::connect(&shutdown) {
        Ok(link) => Some(link),
        Err(err) => {
            warn!("MQTT transport not started: {err:#}");
            None
        }
    };

    let status = Arc::new(StatusStore::new());
    let (relay, outlet) = frame_relay();

    let segmenter = Segmenter::new().context("failed to initialise segmentation")?;
    let detection = spawn_detection_worker(
        outlet,
        status.clone(),
        Classifier::new(config.min_area, config.max_area),
        move |frame| segmenter.measure(frame),
        shutdown.clone(),
    );
    let publisher = spawn_publisher(
        status.clone(),
        link.as_ref().map(|link| link.transport.clone()),
        config.rate,
        shutdown.clone(),
    );
    let control = link
        .as_ref()
        .map(|link| spawn_control_listener(link.control.clone(), shutdown.clone()));

    let frames = source.stream(WORKING_SIZE);
    let mut dropped: u64 = 0;

    while !shutdown.is_triggered() {
        let frame = match frames.recv_timeout(POLL_INTERVAL) {
            Ok(Ok(frame)) => frame,
            Ok(Err(err)) => {
                error!("capture failed: {err}");
                break;
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                info!("video stream ended");
                break;
            }
        };

        if !relay.offer(frame.clone()) {
            dropped = dropped.wrapping_add(1);
            debug!("detection busy, frame dropped (total dropped: {dropped})");
        }

        let (info, totals) = status.read();
        match overlay::present(&frame, &info, &totals, &config, delay_ms) {
            Ok(true) => {
                info!("stop requested from display");
                break;
            }
            Ok(false) => {}
            Err(err) => warn!("display failed: {err:#}"),
        }
    }

    info!("stopping worker threads");
    shutdown.trigger();
    drop(relay);
    drop(frames);

    if detection.join().is_err() {
        error!("detection worker panicked");
    }
    if publisher.join().is_err() {
        error!("telemetry worker panicked");
    }
    if let Some(control) = control {
        let _ = control.join();
    }
    if let Some(link) = link {
        link.close();
    }
    overlay::close();

    let (_, totals) = status.read();
    info!(
        "monitor stopped: {} parts seen, {} defective",
        totals.total_parts, totals.total_defects
    );
    Ok(())
}

/// Spawn the detection worker: drain the relay, measure each frame, fold
/// the measurement through the classifier, and push the result into the
/// status store. Measurement is injected so the worker can be exercised
/// without a camera.
fn spawn_detection_worker<M>(
    outlet: FrameOutlet,
    status: Arc<StatusStore>,
    mut classifier: Classifier,
    mut measure: M,
    shutdown: Shutdown,
) -> thread::JoinHandle<()>
where
    M: FnMut(&Frame) -> Result<Measurement> + Send + 'static,
{
    thread::Builder::new()
        .name("detection".into())
        .spawn(move || {
            while !shutdown.is_triggered() {
                let frame = match outlet.take(POLL_INTERVAL) {
                    Take::Frame(frame) => frame,
                    Take::Empty => continue,
                    Take::Closed => {
                        // Nothing is being observed any more; clear the
                        // stale record but keep the totals.
                        status.reset();
                        break;
                    }
                };

                let measurement = match measure(&frame) {
                    Ok(measurement) => measurement,
                    Err(err) => {
                        warn!("segmentation failed, skipping frame: {err:#}");
                        continue;
                    }
                };

                status.update(classifier.observe(measurement));
            }
            debug!("detection worker stopped");
        })
        .expect("failed to spawn detection worker")
}
