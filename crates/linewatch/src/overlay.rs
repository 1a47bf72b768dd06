//! Operator display: the latest camera frame annotated with the current
//! measurement, the configured range, and the running totals.

use anyhow::Result;
use frame_source::Frame;
use opencv::{
    core::{Mat, Point, Rect, Scalar},
    highgui, imgproc,
};

use crate::{
    config::MonitorConfig,
    data::{AssemblyInfo, Counters},
};

const WINDOW: &str = "Assembly Line Monitor";

/// Draw the HUD and the part outline onto `frame` and present it. Returns
/// true when the operator pressed a key, requesting shutdown.
pub fn present(
    frame: &Frame,
    info: &AssemblyInfo,
    totals: &Counters,
    config: &MonitorConfig,
    delay_ms: i32,
) -> Result<bool> {
    let mut canvas = frame.to_mat()?;

    let label = format!(
        "Measurement: {} Expected range: [{} - {}] Defect: {}",
        info.area,
        config.min_area,
        config.max_area,
        if info.defect { "TRUE" } else { "FALSE" },
    );
    draw_label(&mut canvas, &label, 15)?;

    let label = format!(
        "Total parts: {} Total defects: {}",
        totals.total_parts, totals.total_defects
    );
    draw_label(&mut canvas, &label, 40)?;

    let rect = Rect::new(info.rect.x, info.rect.y, info.rect.width, info.rect.height);
    let color = if info.show {
        // Confirmed defective part: outline in blue.
        Scalar::new(255.0, 0.0, 0.0, 0.0)
    } else {
        Scalar::new(0.0, 255.0, 0.0, 0.0)
    };
    imgproc::rectangle_def(&mut canvas, rect, color)?;

    highgui::imshow(WINDOW, &canvas)?;
    Ok(highgui::wait_key(delay_ms)? >= 0)
}

fn draw_label(canvas: &mut Mat, text: &str, y: i32) -> Result<()> {
    imgproc::put_text_def(
        canvas,
        text,
        Point::new(0, y),
        imgproc::FONT_HERSHEY_SIMPLEX,
        0.5,
        Scalar::new(0.0, 255.0, 0.0, 0.0),
    )?;
    Ok(())
}

/// Tear the preview window down on shutdown.
pub fn close() {
    let _ = highgui::destroy_all_windows();
}
