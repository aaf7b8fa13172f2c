//! Red-weighted centroid of a frame.
//!
//! Every pixel whose red channel exceeds [`RED_THRESHOLD`] contributes
//! its red value as weight at its `(column, row)` position. The
//! result is the weighted mean position, or `None` when nothing
//! qualifies.

use crate::message::Fixed3;
use crate::vision::frame::{CHANNELS, PixelFrame};

/// Red values at or below this are treated as background noise.
pub const RED_THRESHOLD: u8 = 5;

/// Weighted centre of the bright region, in pixel coordinates of the
/// sampled frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Centroid {
    pub x: f64,
    pub y: f64,
}

impl Centroid {
    /// Coordinates rounded to the three fractional digits sent on the
    /// wire.
    pub fn to_fixed(self) -> (Fixed3, Fixed3) {
        (Fixed3::from_f64(self.x), Fixed3::from_f64(self.y))
    }
}

/// Single pass over `frame`; no allocation, no state between calls.
pub fn detect_centroid(frame: &PixelFrame) -> Option<Centroid> {
    let width = frame.width() as usize;
    if width == 0 {
        return None;
    }

    let mut sum_x: u64 = 0;
    let mut sum_y: u64 = 0;
    let mut total: u64 = 0;

    for (row, line) in frame.data().chunks_exact(width * CHANNELS).enumerate() {
        let mut row_weight: u64 = 0;
        for (col, px) in line.chunks_exact(CHANNELS).enumerate() {
            let r = px[0];
            if r > RED_THRESHOLD {
                let r = u64::from(r);
                sum_x += col as u64 * r;
                row_weight += r;
            }
        }
        sum_y += row as u64 * row_weight;
        total += row_weight;
    }

    if total == 0 {
        return None;
    }
    Some(Centroid {
        x: sum_x as f64 / total as f64,
        y: sum_y as f64 / total as f64,
    })
}
