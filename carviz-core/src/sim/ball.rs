//! Bouncing-ball physics.
//!
//! Units: positions in pixels, velocities in px/s, gravity in px/s²,
//! `dt` in seconds. One pixel stands for one centimetre, so the
//! default radius of 12 is roughly a size-7 basketball.

use crate::vision::PixelFrame;

/// Colour of the rendered ball (RGBA).
pub const BALL_COLOR: [u8; 4] = [255, 120, 0, 255];

#[derive(Debug, Clone, PartialEq)]
pub struct Ball {
    pub radius: f64,
    pub width: f64,
    pub height: f64,
    pub gravity: f64,
    pub pos: [f64; 2],
    pub vel: [f64; 2],
}

impl Default for Ball {
    fn default() -> Self {
        Self::new(12.0, 640, 480, 980.0, [1000.0, 1000.0])
    }
}

impl Ball {
    /// A ball at the centre of a `width × height` window.
    pub fn new(radius: f64, width: u32, height: u32, gravity: f64, velocity: [f64; 2]) -> Self {
        let (w, h) = (f64::from(width), f64::from(height));
        Self {
            radius,
            width: w,
            height: h,
            gravity,
            pos: [w / 2.0, h / 2.0],
            vel: velocity,
        }
    }

    /// Advance by `dt`, bouncing off the walls.
    ///
    /// `restitution` scales the reflected velocity component; 1.0 is a
    /// perfectly elastic bounce.
    pub fn update(&mut self, dt: f64, restitution: f64) {
        self.vel[1] += self.gravity * dt;
        self.pos[0] += self.vel[0] * dt;
        self.pos[1] += self.vel[1] * dt;

        if self.pos[1] - self.radius < 0.0 {
            self.pos[1] = self.radius;
            self.vel[1] *= -restitution;
        } else if self.pos[1] + self.radius > self.height {
            self.pos[1] = self.height - self.radius;
            self.vel[1] *= -restitution;
        }

        if self.pos[0] - self.radius < 0.0 {
            self.pos[0] = self.radius;
            self.vel[0] *= -restitution;
        } else if self.pos[0] + self.radius > self.width {
            self.pos[0] = self.width - self.radius;
            self.vel[0] *= -restitution;
        }
    }

    /// Integer centre as drawn on screen.
    pub fn center(&self) -> (i32, i32) {
        (self.pos[0].round() as i32, self.pos[1].round() as i32)
    }

    /// Draw a filled disc at the ball's position and return its centre.
    pub fn draw(&self, frame: &mut PixelFrame) -> (i32, i32) {
        let (cx, cy) = self.center();
        let (x0, y0) = (i64::from(cx), i64::from(cy));
        // |d| <= r <= i32::MAX keeps dx² + dy² inside i64
        let r = self.radius.round().clamp(0.0, f64::from(i32::MAX)) as i64;
        let r2 = r * r;

        let rows = (y0 - r).max(0)..=(y0 + r).min(i64::from(frame.height()) - 1);
        let cols = (x0 - r).max(0)..=(x0 + r).min(i64::from(frame.width()) - 1);
        for y in rows {
            let dy = y - y0;
            for x in cols.clone() {
                let dx = x - x0;
                if dx * dx + dy * dy <= r2 {
                    frame.put_pixel(x as u32, y as u32, BALL_COLOR);
                }
            }
        }
        (cx, cy)
    }
}
