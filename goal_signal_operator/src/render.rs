use opencv::{
    core::{self, Mat, Point, Rect, Scalar},
    imgproc,
};

use goal_signal::core_modules::layout::{Bgr, BOX_BORDER, CONNECTED_BORDER, HIGHLIGHT_COLOR};
use goal_signal::{CanvasLayout, Decision, Region};

fn scalar(color: Bgr) -> Scalar {
    Scalar::new(color[0] as f64, color[1] as f64, color[2] as f64, 0.0)
}

/// OpenCV rectangles are drawn corner to corner, both corners included.
fn draw_region(canvas: &mut Mat, region: &Region, color: Bgr, thickness: i32) -> opencv::Result<()> {
    imgproc::rectangle_points(
        canvas,
        Point::new(region.upper_left.x as i32, region.upper_left.y as i32),
        Point::new(region.lower_right.x as i32, region.lower_right.y as i32),
        scalar(color),
        thickness,
        imgproc::LINE_8,
        0,
    )
}

/// Places the camera frame centered on a black canvas and draws the sampling boxes
/// and the connection border.
pub fn draw_static(frame: &Mat, layout: &CanvasLayout, connected: bool) -> opencv::Result<Mat> {
    let left_pad = layout.x_offset as i32;
    let right_pad = (layout.canvas_width - layout.frame_width - layout.x_offset) as i32;
    let mut canvas = Mat::default();
    core::copy_make_border(
        frame,
        &mut canvas,
        0,
        0,
        left_pad,
        right_pad,
        core::BORDER_CONSTANT,
        Scalar::all(0.0),
    )?;

    for (name, region) in layout.regions() {
        draw_region(&mut canvas, &region, layout.box_color(name), BOX_BORDER)?;
    }

    let (width, height) = layout.canvas_size();
    imgproc::rectangle(
        &mut canvas,
        Rect::new(0, 0, width as i32, height as i32),
        scalar(layout.border_color(connected)),
        CONNECTED_BORDER,
        imgproc::LINE_8,
        0,
    )?;

    Ok(canvas)
}

/// Fills the indicator panel of every side that is on.
pub fn draw_decision(canvas: &mut Mat, layout: &CanvasLayout, decision: Decision) -> opencv::Result<()> {
    for panel in layout.highlights(decision.left_on, decision.right_on) {
        draw_region(canvas, &panel, HIGHLIGHT_COLOR, imgproc::FILLED)?;
    }
    Ok(())
}
