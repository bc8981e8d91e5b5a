// THEORY:
// The operator canvas is wider than the camera frame: the frame sits centered, and
// the empty bands on either side become the left/right indicator panels. All drawn
// geometry is fixed at startup and derived from three numbers (canvas width, frame
// width, frame height). The same rectangles are used for drawing and for sampling,
// which is why sampling ignores the box border.

use crate::core_modules::region::{Point, Region};
use crate::error::{Result, SignalError};

/// Thickness of the three sampling boxes.
pub const BOX_BORDER: i32 = 3;
/// Thickness of the connection border around the whole canvas.
pub const CONNECTED_BORDER: i32 = 15;
/// Inset of the indicator panels from the canvas edge.
pub const PANEL_INSET: u32 = (CONNECTED_BORDER - 5) as u32;

/// BGR triple, the channel order of the render target.
pub type Bgr = [u8; 3];

pub const CALIBRATION_BOX_COLOR: Bgr = [255, 255, 255];
pub const SIDE_BOX_COLOR: Bgr = [0, 255, 255];
pub const HIGHLIGHT_COLOR: Bgr = [0, 255, 255];
pub const CONNECTED_COLOR: Bgr = [0, 255, 0];
pub const DISCONNECTED_COLOR: Bgr = [0, 0, 255];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionName {
    Calibration,
    Left,
    Right,
}

impl RegionName {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegionName::Calibration => "calibration",
            RegionName::Left => "left",
            RegionName::Right => "right",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanvasLayout {
    pub canvas_width: u32,
    pub frame_width: u32,
    pub frame_height: u32,
    /// Column where the camera frame starts.
    pub x_offset: u32,
    pub calibration: Region,
    pub left: Region,
    pub right: Region,
    pub left_panel: Region,
    pub right_panel: Region,
}

impl CanvasLayout {
    pub fn new(canvas_width: u32, frame_width: u32, frame_height: u32) -> Result<Self> {
        if canvas_width < frame_width {
            return Err(SignalError::InvalidLayout(format!(
                "canvas width {canvas_width} is narrower than frame width {frame_width}"
            )));
        }
        // Side boxes sit 240..310 px in from the frame edges and 60..110 px up from the bottom.
        if frame_width < 320 || frame_height < 120 {
            return Err(SignalError::InvalidLayout(format!(
                "frame {frame_width}x{frame_height} is too small for the sampling boxes"
            )));
        }

        let x_offset = (canvas_width - frame_width) / 2;
        let center_x = x_offset + frame_width / 2;
        let center_y = frame_height / 2;
        let side_top = frame_height - 110;
        let side_bottom = frame_height - 60;

        let layout = Self {
            canvas_width,
            frame_width,
            frame_height,
            x_offset,
            calibration: Region::new(
                Point::new(center_x - 20, center_y),
                Point::new(center_x + 20, center_y + 40),
            ),
            left: Region::new(
                Point::new(x_offset + 240, side_top),
                Point::new(x_offset + 310, side_bottom),
            ),
            right: Region::new(
                Point::new(x_offset + frame_width - 310, side_top),
                Point::new(x_offset + frame_width - 240, side_bottom),
            ),
            left_panel: Region::new(
                Point::new(PANEL_INSET, PANEL_INSET),
                Point::new(x_offset.saturating_sub(PANEL_INSET), frame_height - PANEL_INSET),
            ),
            right_panel: Region::new(
                Point::new(x_offset + frame_width + PANEL_INSET, PANEL_INSET),
                Point::new(canvas_width.saturating_sub(PANEL_INSET), frame_height - PANEL_INSET),
            ),
        };
        layout.validate()?;
        Ok(layout)
    }

    /// Every sampling region must leave a non-empty interior inside the canvas.
    pub fn validate(&self) -> Result<()> {
        for (name, region) in self.regions() {
            region.validate(name.as_str(), self.canvas_width, self.frame_height)?;
        }
        Ok(())
    }

    pub fn regions(&self) -> [(RegionName, Region); 3] {
        [
            (RegionName::Calibration, self.calibration),
            (RegionName::Left, self.left),
            (RegionName::Right, self.right),
        ]
    }

    pub fn region(&self, name: RegionName) -> &Region {
        match name {
            RegionName::Calibration => &self.calibration,
            RegionName::Left => &self.left,
            RegionName::Right => &self.right,
        }
    }

    /// Canvas size, `(width, height)`.
    pub fn canvas_size(&self) -> (u32, u32) {
        (self.canvas_width, self.frame_height)
    }

    pub fn border_color(&self, connected: bool) -> Bgr {
        if connected { CONNECTED_COLOR } else { DISCONNECTED_COLOR }
    }

    pub fn box_color(&self, name: RegionName) -> Bgr {
        match name {
            RegionName::Calibration => CALIBRATION_BOX_COLOR,
            RegionName::Left | RegionName::Right => SIDE_BOX_COLOR,
        }
    }

    /// Panels to fill for a decision, left first.
    pub fn highlights(&self, left_on: bool, right_on: bool) -> Vec<Region> {
        let mut panels = Vec::with_capacity(2);
        if left_on {
            panels.push(self.left_panel);
        }
        if right_on {
            panels.push(self.right_panel);
        }
        panels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::region::SAMPLE_INSET;

    fn default_layout() -> CanvasLayout {
        CanvasLayout::new(1000, 640, 360).expect("default layout")
    }

    fn rect(x0: u32, y0: u32, x1: u32, y1: u32) -> Region {
        Region::new(Point::new(x0, y0), Point::new(x1, y1))
    }

    #[test]
    fn default_geometry() {
        let layout = default_layout();
        assert_eq!(layout.x_offset, 180);
        assert_eq!(layout.calibration, rect(480, 180, 520, 220));
        assert_eq!(layout.left, rect(420, 250, 490, 300));
        assert_eq!(layout.right, rect(510, 250, 580, 300));
        assert_eq!(layout.left_panel, rect(10, 10, 170, 350));
        assert_eq!(layout.right_panel, rect(830, 10, 990, 350));
        assert_eq!(layout.canvas_size(), (1000, 360));
    }

    #[test]
    fn rejects_narrow_canvas() {
        assert!(matches!(
            CanvasLayout::new(600, 640, 360),
            Err(SignalError::InvalidLayout(_))
        ));
    }

    #[test]
    fn rejects_tiny_frames() {
        assert!(CanvasLayout::new(400, 300, 360).is_err());
        assert!(CanvasLayout::new(1000, 640, 100).is_err());
    }

    #[test]
    fn canvas_equal_to_frame_is_allowed() {
        let layout = CanvasLayout::new(640, 640, 360).expect("layout");
        assert_eq!(layout.x_offset, 0);
        assert_eq!(layout.left, rect(240, 250, 310, 300));
    }

    #[test]
    fn highlights_follow_the_decision() {
        let layout = default_layout();
        assert!(layout.highlights(false, false).is_empty());
        assert_eq!(layout.highlights(true, false), vec![layout.left_panel]);
        assert_eq!(layout.highlights(false, true), vec![layout.right_panel]);
        assert_eq!(layout.highlights(true, true).len(), 2);
    }

    #[test]
    fn border_color_tracks_connection() {
        let layout = default_layout();
        assert_eq!(layout.border_color(true), CONNECTED_COLOR);
        assert_eq!(layout.border_color(false), DISCONNECTED_COLOR);
        assert_ne!(CONNECTED_COLOR, DISCONNECTED_COLOR);
    }

    #[test]
    fn sampling_regions_fit_the_inset() {
        let layout = default_layout();
        for (_, region) in layout.regions() {
            assert!(region.inset(SAMPLE_INSET).is_some());
        }
    }
}
