//! Off-screen 1 bit per pixel mirror of the PCD8544 display RAM.
//!
//! The layout matches the controller's horizontal addressing mode: the buffer
//! is split into 8-row banks, each byte holds one column of a bank and bit 0 is
//! the topmost row of that bank. Flushing is therefore a straight copy.

use core::convert::Infallible;

use embedded_graphics_core::Pixel;
use embedded_graphics_core::draw_target::DrawTarget;
use embedded_graphics_core::geometry::{OriginDimensions, Size};
use embedded_graphics_core::pixelcolor::BinaryColor;

/// Display width in pixels
pub const WIDTH: usize = 84;
/// Display height in pixels
pub const HEIGHT: usize = 48;
/// Number of 8-row banks
pub const BANKS: usize = HEIGHT / 8;
/// Size of the packed buffer in bytes
pub const BUFFER_SIZE: usize = WIDTH * BANKS;

/// A pixel coordinate outside the display was passed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutOfBounds {
    pub x: u8,
    pub y: u8,
}

#[derive(Clone)]
pub struct Framebuffer {
    buf: [u8; BUFFER_SIZE],
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Framebuffer {
    pub const fn new() -> Self {
        Self {
            buf: [0; BUFFER_SIZE],
        }
    }

    /// Byte index and bit mask for (x, y)
    fn locate(x: u8, y: u8) -> Result<(usize, u8), OutOfBounds> {
        let (col, row) = (x as usize, y as usize);
        if col >= WIDTH || row >= HEIGHT {
            return Err(OutOfBounds { x, y });
        }
        Ok((WIDTH * (row / 8) + col, 1 << (row % 8)))
    }

    /// Turn the pixel at column `x`, row `y` on.
    pub fn set_pixel(&mut self, x: u8, y: u8) -> Result<(), OutOfBounds> {
        let (index, mask) = Self::locate(x, y)?;
        self.buf[index] |= mask;
        Ok(())
    }

    /// Turn the pixel at column `x`, row `y` off.
    pub fn clear_pixel(&mut self, x: u8, y: u8) -> Result<(), OutOfBounds> {
        let (index, mask) = Self::locate(x, y)?;
        self.buf[index] &= !mask;
        Ok(())
    }

    /// Returns `false` for coordinates outside the display.
    pub fn is_on(&self, x: u8, y: u8) -> bool {
        match Self::locate(x, y) {
            Ok((index, mask)) => self.buf[index] & mask != 0,
            Err(_) => false,
        }
    }

    pub fn clear_all(&mut self) {
        self.buf.fill(0);
    }

    pub fn as_bytes(&self) -> &[u8; BUFFER_SIZE] {
        &self.buf
    }

    /// Raw write used by the compositor, which has already clipped the
    /// coordinates.
    pub(crate) fn write_masked(&mut self, index: usize, mask: u8, on: bool) {
        if on {
            self.buf[index] |= mask;
        } else {
            self.buf[index] &= !mask;
        }
    }
}

impl OriginDimensions for Framebuffer {
    fn size(&self) -> Size {
        Size::new(WIDTH as u32, HEIGHT as u32)
    }
}

impl DrawTarget for Framebuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            let (Ok(x), Ok(y)) = (u8::try_from(point.x), u8::try_from(point.y)) else {
                continue;
            };
            // Off-screen pixels are dropped
            let _ = match color {
                BinaryColor::On => self.set_pixel(x, y),
                BinaryColor::Off => self.clear_pixel(x, y),
            };
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.buf.fill(if color.is_on() { 0xFF } else { 0x00 });
        Ok(())
    }
}
