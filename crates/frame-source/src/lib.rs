//! Video acquisition for the assembly-line monitor.
//!
//! Wraps an OpenCV `VideoCapture` and streams resized BGR frames over a
//! bounded channel from a background thread. Opening the source happens
//! synchronously so a bad camera index or file path surfaces as a startup
//! error before any worker thread is spawned.

use std::thread;

use anyhow::Result;
use chrono::Utc;
use crossbeam_channel::{Receiver, Sender, bounded};
use opencv::{
    core::{self, Mat, MatTraitConstManual},
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Raw BGR frame captured from the video source.
#[derive(Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: i32,
    pub height: i32,
    pub timestamp_ms: i64,
}

impl Frame {
    /// Rebuild an owned OpenCV matrix from the raw BGR bytes.
    pub fn to_mat(&self) -> Result<Mat> {
        let flat = Mat::from_slice(&self.data)?;
        let bgr = flat.reshape(3, self.height)?;
        Ok(bgr.try_clone()?)
    }
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to open video source {uri:?}")]
    Open { uri: String },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// An opened video source, not yet streaming.
pub struct VideoSource {
    cap: VideoCapture,
    uri: String,
}

impl VideoSource {
    /// Open a capture device. A short all-digit `uri` selects a local
    /// camera index, anything else is treated as a file path or stream URI.
    pub fn open(uri: &str) -> Result<Self, CaptureError> {
        let cap = open_video_capture(uri)?;
        info!("opened video source {uri}");
        Ok(Self {
            cap,
            uri: uri.to_string(),
        })
    }

    /// Frames per second reported by the source, when it knows one.
    pub fn fps(&self) -> Option<f64> {
        match self.cap.get(videoio::CAP_PROP_FPS) {
            Ok(fps) if fps.is_finite() && fps > 0.0 => Some(fps),
            _ => None,
        }
    }

    /// Start streaming frames resized to `target_size` (width, height) from
    /// a background thread. The channel is intentionally small so the reader
    /// backs off when the consumer falls behind. The sender is dropped at
    /// end of stream, which the consumer observes as a disconnect.
    pub fn stream(self, target_size: (i32, i32)) -> Receiver<Result<Frame, CaptureError>> {
        let (tx, rx) = bounded(2);
        let uri = self.uri;
        let mut cap = self.cap;

        thread::Builder::new()
            .name("frame-source".into())
            .spawn(move || {
                if let Err(err) = capture_loop(&mut cap, target_size, &tx) {
                    let _ = tx.send(Err(err));
                }
                debug!("capture thread for {uri} exiting");
            })
            .expect("failed to spawn capture thread");

        rx
    }
}

fn capture_loop(
    cap: &mut VideoCapture,
    target_size: (i32, i32),
    tx: &Sender<Result<Frame, CaptureError>>,
) -> Result<(), CaptureError> {
    let (target_w, target_h) = target_size;
    let mut frame = Mat::default();
    let mut scratch = Mat::default();

    loop {
        let grabbed = cap.read(&mut frame).map_err(to_capture_err)?;
        let size = frame.size().map_err(to_capture_err)?;
        if !grabbed || size.width <= 0 {
            // End of stream for file playback, or the device went away.
            return Ok(());
        }

        let working = if size.width != target_w || size.height != target_h {
            imgproc::resize(
                &frame,
                &mut scratch,
                core::Size {
                    width: target_w,
                    height: target_h,
                },
                0.0,
                0.0,
                imgproc::INTER_LINEAR,
            )
            .map_err(to_capture_err)?;
            &scratch
        } else {
            &frame
        };

        let data = working.data_bytes().map_err(to_capture_err)?.to_vec();

        let packet = Frame {
            data,
            width: target_w,
            height: target_h,
            timestamp_ms: Utc::now().timestamp_millis(),
        };
        if tx.send(Ok(packet)).is_err() {
            // Consumer hung up, nothing left to capture for.
            return Ok(());
        }
    }
}

/// Interpret a short all-digit string as a local camera index.
pub fn parse_device_index(uri: &str) -> Option<i32> {
    if uri.is_empty() || uri.len() > 2 || !uri.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    uri.parse().ok()
}

fn open_video_capture(uri: &str) -> Result<VideoCapture, CaptureError> {
    if let Some(index) = parse_device_index(uri) {
        for backend in [videoio::CAP_V4L, videoio::CAP_ANY] {
            match VideoCapture::new(index, backend) {
                Ok(cap) => {
                    if cap.is_opened().map_err(to_capture_err)? {
                        return Ok(cap);
                    }
                }
                Err(err) => {
                    warn!("failed to open camera #{index} with backend {backend}: {err}");
                }
            }
        }
        return Err(CaptureError::Open {
            uri: uri.to_string(),
        });
    }

    match VideoCapture::from_file(uri, videoio::CAP_ANY) {
        Ok(cap) => {
            if cap.is_opened().map_err(to_capture_err)? {
                return Ok(cap);
            }
        }
        Err(err) => {
            warn!("failed to open {uri}: {err}");
        }
    }

    Err(CaptureError::Open {
        uri: uri.to_string(),
    })
}

fn to_capture_err(err: opencv::Error) -> CaptureError {
    CaptureError::Other(err.into())
}
