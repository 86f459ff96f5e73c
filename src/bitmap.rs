//! 4-bit grayscale bitmap resources and the compositor that binarizes them
//! into the [`Framebuffer`].
//!
//! Resources are BMP-style: rows are stored bottom-to-top, two pixels per byte
//! (high nibble on the left) and every row is padded to a 4-byte boundary.

use crate::framebuffer::{Framebuffer, HEIGHT, WIDTH};

/// Header byte holding the offset of the pixel data
pub const DATA_OFFSET_FIELD: usize = 10;
/// Header byte holding the width in pixels
pub const WIDTH_FIELD: usize = 18;
/// Header byte holding the height in pixels
pub const HEIGHT_FIELD: usize = 22;

/// Nibbles above this are always on, so a larger threshold would blank
/// even fully lit pixels.
pub const MAX_THRESHOLD: u8 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitmapError {
    /// Slice ends before the height field
    TooShort,
    /// Header describes pixel rows past the end of the slice
    Truncated,
}

/// Why a blit was skipped. The framebuffer is untouched in every case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Clip {
    EmptyHeight,
    OddWidth,
    PastRightEdge,
    PastTopEdge,
    PastBottomEdge,
}

#[derive(Debug, Clone, Copy)]
pub struct Bitmap<'a> {
    bytes: &'a [u8],
    offset: usize,
    width: u8,
    height: u8,
}

impl<'a> Bitmap<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self, BitmapError> {
        if bytes.len() <= HEIGHT_FIELD {
            return Err(BitmapError::TooShort);
        }
        let bitmap = Self {
            bytes,
            offset: bytes[DATA_OFFSET_FIELD] as usize,
            width: bytes[WIDTH_FIELD],
            height: bytes[HEIGHT_FIELD],
        };

        // The last row does not need its padding
        let needed = match bitmap.height {
            0 => bitmap.offset,
            h => bitmap.offset + bitmap.stride() * (h as usize - 1) + bitmap.row_bytes(),
        };
        if needed > bytes.len() {
            return Err(BitmapError::Truncated);
        }
        Ok(bitmap)
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    /// Bytes of pixel data per row, excluding padding
    pub fn row_bytes(&self) -> usize {
        self.width as usize / 2
    }

    /// Padding bytes after each row to reach a 4-byte boundary
    pub fn padding(&self) -> usize {
        (4 - self.row_bytes() % 4) % 4
    }

    fn stride(&self) -> usize {
        self.row_bytes() + self.padding()
    }

    /// Pixel rows in storage order, i.e. the bottom row first.
    pub fn rows(&self) -> impl Iterator<Item = &'a [u8]> + 'a {
        let (bytes, offset, stride, len) = (self.bytes, self.offset, self.stride(), self.row_bytes());
        (0..self.height as usize).map(move |row| {
            let start = offset + row * stride;
            &bytes[start..start + len]
        })
    }
}

impl Framebuffer {
    /// Composite `bitmap` with its bottom-left corner at (`x`, `y`).
    ///
    /// Every covered pixel is written: on when its nibble is above
    /// `threshold` (clamped to [`MAX_THRESHOLD`]), off otherwise. The bitmap
    /// must fit entirely on screen; otherwise nothing is drawn and the reason
    /// is returned.
    pub fn blit(&mut self, x: u8, y: u8, bitmap: &Bitmap<'_>, threshold: u8) -> Result<(), Clip> {
        let (width, height) = (bitmap.width() as usize, bitmap.height() as usize);
        let (x, y) = (x as usize, y as usize);

        let clip = if height == 0 {
            Some(Clip::EmptyHeight)
        } else if width % 2 != 0 {
            Some(Clip::OddWidth)
        } else if x + width > WIDTH {
            Some(Clip::PastRightEdge)
        } else if y < height - 1 {
            Some(Clip::PastTopEdge)
        } else if y >= HEIGHT {
            Some(Clip::PastBottomEdge)
        } else {
            None
        };
        if let Some(clip) = clip {
            trace!("blit skipped at ({}, {}): {}", x, y, clip);
            return Err(clip);
        }

        let threshold = threshold.min(MAX_THRESHOLD);
        let mut bank = y / 8;
        let mut mask = 1u8 << (y % 8);

        for (i, row) in bitmap.rows().enumerate() {
            if i > 0 {
                // One screen row up
                if mask > 0x01 {
                    mask >>= 1;
                } else {
                    mask = 0x80;
                    bank -= 1;
                }
            }

            let mut index = WIDTH * bank + x;
            for &pair in row {
                self.write_masked(index, mask, pair >> 4 > threshold);
                self.write_masked(index + 1, mask, pair & 0x0F > threshold);
                index += 2;
            }
        }
        Ok(())
    }
}
