//! Pulls the currently displayed image into a fixed-size buffer.

use crate::vision::frame::PixelFrame;

/// Something that shows video: the remote feed as rendered locally.
///
/// Implementations draw their current content scaled into `target`
/// and must not change what they display while doing so.
pub trait DisplaySurface: Send + Sync {
    /// Returns `false` when nothing is showing yet; `target` is then
    /// left untouched.
    fn draw_into(&self, target: &mut PixelFrame) -> bool;
}

impl<S: DisplaySurface + ?Sized> DisplaySurface for std::sync::Arc<S> {
    fn draw_into(&self, target: &mut PixelFrame) -> bool {
        (**self).draw_into(target)
    }
}

/// Samples a surface at a resolution fixed for the whole session.
///
/// The same buffer is overwritten on every call.
#[derive(Debug)]
pub struct FrameSampler {
    frame: PixelFrame,
}

impl FrameSampler {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            frame: PixelFrame::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.frame.width()
    }

    pub fn height(&self) -> u32 {
        self.frame.height()
    }

    /// Read the surface into the internal buffer.
    ///
    /// `None` means the surface had no content and the tick should be
    /// skipped.
    pub fn sample<S: DisplaySurface + ?Sized>(&mut self, surface: &S) -> Option<&PixelFrame> {
        if surface.draw_into(&mut self.frame) {
            Some(&self.frame)
        } else {
            None
        }
    }
}
