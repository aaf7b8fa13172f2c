//! RGBA pixel buffer shared by the sampler, detector and simulator.

use crate::error::CarvizError;

/// Bytes per pixel: Red, Green, Blue, Alpha.
pub const CHANNELS: usize = 4;

/// A tightly packed RGBA8 raster, `width * height * 4` bytes, rows top
/// to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelFrame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelFrame {
    /// A fully transparent black frame.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * CHANNELS],
        }
    }

    /// Wrap an existing RGBA buffer, checking its length.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, CarvizError> {
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(CarvizError::InvalidFrame {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the RGBA bytes at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let offset = self.offset(x, y)?;
        let mut px = [0u8; 4];
        px.copy_from_slice(&self.data[offset..offset + CHANNELS]);
        Some(px)
    }

    /// Overwrite the pixel at `(x, y)`. Out-of-bounds writes are ignored.
    pub fn put_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if let Some(offset) = self.offset(x, y) {
            self.data[offset..offset + CHANNELS].copy_from_slice(&rgba);
        }
    }

    /// Set every pixel to `rgba`.
    pub fn fill(&mut self, rgba: [u8; 4]) {
        for px in self.data.chunks_exact_mut(CHANNELS) {
            px.copy_from_slice(&rgba);
        }
    }

    /// Nearest-neighbour resample of `self` into `dst`, overwriting all
    /// of `dst`.
    pub fn scale_into(&self, dst: &mut PixelFrame) {
        if self.is_empty() {
            dst.fill([0, 0, 0, 0]);
            return;
        }
        let (sw, sh) = (self.width as usize, self.height as usize);
        let (dw, dh) = (dst.width as usize, dst.height as usize);
        if (sw, sh) == (dw, dh) {
            dst.data.copy_from_slice(&self.data);
            return;
        }
        for dy in 0..dh {
            let sy = dy * sh / dh;
            let src_row = &self.data[sy * sw * CHANNELS..(sy + 1) * sw * CHANNELS];
            let dst_row = &mut dst.data[dy * dw * CHANNELS..(dy + 1) * dw * CHANNELS];
            for (dx, out) in dst_row.chunks_exact_mut(CHANNELS).enumerate() {
                let sx = dx * sw / dw;
                out.copy_from_slice(&src_row[sx * CHANNELS..(sx + 1) * CHANNELS]);
            }
        }
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * CHANNELS)
    }
}
