use std::fmt::Display as FmtDisplay;

use crate::config::{Palette, Rgba};
use crate::{SCREEN_HEIGHT, SCREEN_WIDTH};

pub const SPRITE_WIDTH: usize = 8;

pub type FrameBuffer = [[u8; SCREEN_WIDTH]; SCREEN_HEIGHT];

pub struct Display {
    /// One byte per pixel, each either on (1) or off (0)
    pub(crate) fb: FrameBuffer,
    /// Row-major colours regenerated from `fb` after every mutation
    frame: [Rgba; SCREEN_WIDTH * SCREEN_HEIGHT],
    palette: Palette,
    wrap_width: usize,
    pub(crate) dirty: bool,
}

impl Display {
    pub fn new(palette: Palette) -> Self {
        Self {
            fb: [[0; SCREEN_WIDTH]; SCREEN_HEIGHT],
            frame: [palette.off; SCREEN_WIDTH * SCREEN_HEIGHT],
            palette,
            wrap_width: SCREEN_WIDTH,
            dirty: false,
        }
    }

    /// Wrap sprites horizontally at `SCREEN_WIDTH - 1` columns instead of `SCREEN_WIDTH`
    pub fn set_legacy_wrap(&mut self, value: bool) {
        self.wrap_width = if value { SCREEN_WIDTH - 1 } else { SCREEN_WIDTH };
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.palette = palette;
        self.present();
    }

    pub fn fb(&self) -> &FrameBuffer {
        &self.fb
    }

    /// The presentation buffer, one colour per pixel in row-major order
    pub fn frame(&self) -> &[Rgba] {
        &self.frame
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Return the dirty flag and reset it, called by the driver once it has redrawn
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    pub fn is_set(&self, x: usize, y: usize) -> bool {
        self.fb[y % SCREEN_HEIGHT][x % SCREEN_WIDTH] == 1
    }

    /// XOR a sprite onto the frame buffer with its top-left corner at (x, y).
    ///
    /// Each byte of `sprite` is one 8 pixel row, most significant bit leftmost.
    /// Coordinates wrap around both edges. Returns true if any lit pixel was
    /// turned off.
    pub fn draw_sprite(&mut self, x: usize, y: usize, sprite: &[u8]) -> bool {
        let mut collision = false;
        for (row, byte) in sprite.iter().enumerate() {
            let py = (y + row) % SCREEN_HEIGHT;
            for col in 0..SPRITE_WIDTH {
                if (byte >> (SPRITE_WIDTH - 1 - col)) & 0x1 == 0 {
                    continue;
                }
                let px = (x + col) % self.wrap_width;
                collision |= self.toggle(px, py);
            }
        }
        self.dirty = true;
        self.present();
        collision
    }

    /// Clear the display contents by zeroing out the framebuffer
    /// This function marks the display as dirty, causing it to be re-rendered on the next update
    pub fn clear(&mut self) {
        self.dirty = true;
        for row in self.fb.iter_mut() {
            row.fill(0);
        }
        self.present();
    }

    /// Toggle the pixel at the coordinates and return true if it was already on
    fn toggle(&mut self, x: usize, y: usize) -> bool {
        let prev = self.fb[y][x];
        self.fb[y][x] ^= 1;
        prev == 1
    }

    fn present(&mut self) {
        let Palette { on, off } = self.palette;
        for (pixel, value) in self.frame.iter_mut().zip(self.fb.iter().flatten()) {
            *pixel = if *value == 1 { on } else { off };
        }
    }
}

impl FmtDisplay for Display {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in self.fb.iter() {
            for pixel in row {
                write!(f, "{}", pixel)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
