//! Silhouette extraction for a single frame.
//!
//! Produces the geometric candidates the classifier measures: grayscale,
//! blur, an open/close/open morphology pass to knock out noise, a binary
//! threshold to lift the part off the belt, then external contours and
//! their bounding boxes. Deterministic for identical pixel input.

use anyhow::Result;
use frame_source::Frame;
use opencv::{
    core::{Mat, Point, Size, Vector},
    imgproc,
};

use crate::{classify::Measurement, data::PartRect};

/// Pixel intensity separating the lit part from the belt background.
const THRESHOLD: f64 = 200.0;

pub struct Segmenter {
    kernel: Mat,
}

impl Segmenter {
    pub fn new() -> Result<Self> {
        let kernel = imgproc::get_structuring_element_def(imgproc::MORPH_ELLIPSE, Size::new(3, 3))?;
        Ok(Self { kernel })
    }

    /// Extract silhouette candidates from `frame` and select the per-frame
    /// measurement.
    pub fn measure(&self, frame: &Frame) -> Result<Measurement> {
        let candidates = self.segment(frame)?;
        Ok(Measurement::select(&candidates, frame.width))
    }

    /// Bounding boxes of all foreground regions in the frame.
    fn segment(&self, frame: &Frame) -> Result<Vec<PartRect>> {
        let bgr = frame.to_mat()?;
        let mut gray = Mat::default();
        imgproc::cvt_color_def(&bgr, &mut gray, imgproc::COLOR_BGR2GRAY)?;

        let mut blurred = Mat::default();
        imgproc::gaussian_blur_def(&gray, &mut blurred, Size::new(3, 3), 0.0)?;

        // OPEN removes speckle, CLOSE fills holes in the foreground, the
        // final OPEN cleans up what the closing re-joined.
        let mut worked = Mat::default();
        imgproc::morphology_ex_def(&blurred, &mut worked, imgproc::MORPH_OPEN, &self.kernel)?;
        let mut scratch = Mat::default();
        imgproc::morphology_ex_def(&worked, &mut scratch, imgproc::MORPH_CLOSE, &self.kernel)?;
        imgproc::morphology_ex_def(&scratch, &mut worked, imgproc::MORPH_OPEN, &self.kernel)?;

        let mut binary = Mat::default();
        imgproc::threshold(&worked, &mut binary, THRESHOLD, 255.0, imgproc::THRESH_BINARY)?;

        let mut contours: Vector<Vector<Point>> = Vector::new();
        imgproc::find_contours_def(
            &binary,
            &mut contours,
            imgproc::RETR_EXTERNAL,
            imgproc::CHAIN_APPROX_NONE,
        )?;

        let mut rects = Vec::with_capacity(contours.len());
        for contour in contours.iter() {
            let rect = imgproc::bounding_rect(&contour)?;
            rects.push(PartRect::new(rect.x, rect.y, rect.width, rect.height));
        }
        Ok(rects)
    }
}
