//! Frame sampling and centroid detection.
//!
//! | Module     | Purpose                                              |
//! |------------|------------------------------------------------------|
//! | `frame`    | RGBA8 raster shared by every stage                   |
//! | `sampler`  | Display-surface trait and the per-tick frame reader  |
//! | `centroid` | Red-weighted centroid of one frame                   |

pub mod centroid;
pub mod frame;
pub mod sampler;

pub use centroid::{Centroid, RED_THRESHOLD, detect_centroid};
pub use frame::PixelFrame;
pub use sampler::{DisplaySurface, FrameSampler};
