// THEORY:
// A `Region` is a fixed rectangle of the operator canvas, and `sample` turns the
// pixels inside it into a single mean `Color`. This is the spatial pooling step of
// the detector: averaging over a few thousand pixels cancels sensor noise so the
// comparison downstream only reacts to what the operator holds in the box.
//
// Regions are drawn on the canvas with a 3px border, so sampling ignores a 3px
// margin on every side. The margin is applied before validation; a region whose
// shrunk interior is empty or leaves the frame is a configuration error, caught by
// `validate` long before the first frame is processed.

use image::{GenericImageView, ImageBuffer, Rgb};

use crate::core_modules::color::color::Color;
use crate::error::{Result, SignalError};

/// An image whose three 8-bit channels hold (hue, saturation, value).
pub type HsvImage = ImageBuffer<Rgb<u8>, Vec<u8>>;

/// Pixels ignored on each side of a region when sampling.
pub const SAMPLE_INSET: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle given by its upper-left and lower-right corners.
/// The lower-right corner is exclusive when sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub upper_left: Point,
    pub lower_right: Point,
}

/// The interior of a region after the sampling inset, as `(x, y, width, height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleWindow {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub const fn new(upper_left: Point, lower_right: Point) -> Self {
        Self {
            upper_left,
            lower_right,
        }
    }

    pub fn width(&self) -> u32 {
        self.lower_right.x.saturating_sub(self.upper_left.x)
    }

    pub fn height(&self) -> u32 {
        self.lower_right.y.saturating_sub(self.upper_left.y)
    }

    /// Shrinks the region by `inset` on every side. `None` when nothing is left.
    pub fn inset(&self, inset: u32) -> Option<SampleWindow> {
        let width = self.width().checked_sub(inset * 2).filter(|w| *w > 0)?;
        let height = self.height().checked_sub(inset * 2).filter(|h| *h > 0)?;
        Some(SampleWindow {
            x: self.upper_left.x + inset,
            y: self.upper_left.y + inset,
            width,
            height,
        })
    }

    /// Checks that the sampled interior is non-empty and lies inside a frame.
    pub fn validate(&self, name: &'static str, frame_width: u32, frame_height: u32) -> Result<SampleWindow> {
        let window = self.inset(SAMPLE_INSET).ok_or(SignalError::EmptyRegion {
            name,
            region: *self,
            inset: SAMPLE_INSET,
        })?;
        if window.x + window.width > frame_width || window.y + window.height > frame_height {
            return Err(SignalError::RegionOutOfBounds {
                name,
                region: *self,
                width: frame_width,
                height: frame_height,
            });
        }
        Ok(window)
    }
}

/// Mean HSV color of the pixels inside `region`, excluding the border inset.
pub fn sample(image: &HsvImage, name: &'static str, region: &Region) -> Result<Color> {
    let window = region.validate(name, image.width(), image.height())?;
    let view = image.view(window.x, window.y, window.width, window.height);

    let mut sum_h = 0u64;
    let mut sum_s = 0u64;
    let mut sum_v = 0u64;
    for (_, _, Rgb([h, s, v])) in view.pixels() {
        sum_h += h as u64;
        sum_s += s as u64;
        sum_v += v as u64;
    }

    let count = (window.width as u64 * window.height as u64) as f64;
    Ok(Color::new(
        sum_h as f64 / count,
        sum_s as f64 / count,
        sum_v as f64 / count,
    ))
}
