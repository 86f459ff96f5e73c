//! Cursor-addressed text output.
//!
//! Text is streamed straight into display RAM and never touches the
//! framebuffer, so a later flush overwrites it.

use core::convert::Infallible;

use embedded_hal::digital::OutputPin;

use crate::font::{self, GLYPH_WIDTH};
use crate::transport::Transport;
use crate::{CELL_WIDTH, Error, Pcd8544, TEXT_COLUMNS, TEXT_ROWS, Timer, cmd};

/// Digits of an unsigned decimal field
const FIELD_WIDTH: usize = 5;

/// Glyph columns framed by one blank column on each side.
fn cell(columns: &[u8; GLYPH_WIDTH]) -> [u8; CELL_WIDTH as usize] {
    let mut cell = [0; CELL_WIDTH as usize];
    cell[1..=GLYPH_WIDTH].copy_from_slice(columns);
    cell
}

/// ASCII digits of `n` right-aligned in a five byte field, with the number
/// of significant digits.
fn decimal_digits(mut n: u16) -> ([u8; FIELD_WIDTH], usize) {
    let mut digits = [b' '; FIELD_WIDTH];
    let mut len = 0;
    loop {
        digits[FIELD_WIDTH - 1 - len] = b'0' + (n % 10) as u8;
        len += 1;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    (digits, len)
}

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), self = "Pcd8544",),
    async(feature = "async", keep_self)
)]
impl<T, RST, E, TIMER> Pcd8544<T, RST, TIMER>
where
    T: Transport<CommError = E>,
    RST: OutputPin<Error = Infallible>,
    TIMER: Timer,
{
    /// Move to text cell (`col`, `row`). Cells outside the 12x6 grid are
    /// ignored and nothing is sent.
    pub async fn set_cursor(&mut self, col: u8, row: u8) -> Result<(), Error<E>> {
        if col >= TEXT_COLUMNS || row >= TEXT_ROWS {
            trace!("cursor ({}, {}) out of range", col, row);
            return Ok(());
        }
        let x = col * CELL_WIDTH;
        self.command(cmd::SET_X_ADDRESS | x).await?;
        self.command(cmd::SET_Y_ADDRESS | row).await?;
        self.address = crate::Address { x, bank: row };
        Ok(())
    }

    /// Write one character cell at the cursor. Characters without a glyph
    /// render blank.
    pub async fn put_char(&mut self, c: char) -> Result<(), Error<E>> {
        self.write_ram(&cell(font::glyph(c))).await
    }

    /// Write `s` cell by cell; the controller wraps at the end of a row.
    pub async fn put_str(&mut self, s: &str) -> Result<(), Error<E>> {
        for c in s.chars() {
            self.put_char(c).await?;
        }
        Ok(())
    }

    /// Like [`put_char`](Self::put_char) but mirrored left/right and
    /// flipped top/bottom.
    pub async fn put_char_mirrored(&mut self, c: char) -> Result<(), Error<E>> {
        self.write_ram(&cell(&font::mirrored(font::glyph(c))))
            .await
    }

    /// Mirrored characters in reverse order, so the string reads correctly
    /// on a panel mounted upside down.
    pub async fn put_str_mirrored(&mut self, s: &str) -> Result<(), Error<E>> {
        for c in s.chars().rev() {
            self.put_char_mirrored(c).await?;
        }
        Ok(())
    }

    /// Fixed five cell field, right-justified and padded with blanks.
    pub async fn put_unsigned_decimal(&mut self, n: u16) -> Result<(), Error<E>> {
        let (digits, _) = decimal_digits(n);
        for digit in digits {
            self.put_char(digit as char).await?;
        }
        Ok(())
    }

    /// Significant digits only, one to five cells.
    pub async fn put_decimal(&mut self, n: u16) -> Result<(), Error<E>> {
        let (digits, len) = decimal_digits(n);
        for &digit in &digits[FIELD_WIDTH - len..] {
            self.put_char(digit as char).await?;
        }
        Ok(())
    }

    /// Write a caller supplied five column symbol as a padded cell.
    pub async fn put_symbol(&mut self, columns: &[u8; GLYPH_WIDTH]) -> Result<(), Error<E>> {
        self.write_ram(&cell(columns)).await
    }

    /// Glyph columns without the blank padding.
    pub async fn draw_char(&mut self, c: char) -> Result<(), Error<E>> {
        self.write_ram(font::glyph(c)).await
    }

    pub async fn draw_symbol(&mut self, columns: &[u8; GLYPH_WIDTH]) -> Result<(), Error<E>> {
        self.write_ram(columns).await
    }

    /// Stack four 2-bit high symbols into two columns, first symbol on top
    /// of the byte (bits 7..6).
    pub async fn draw_mix(&mut self, parts: [&[u8; 2]; 4]) -> Result<(), Error<E>> {
        let mut columns = [0u8; 2];
        for (i, column) in columns.iter_mut().enumerate() {
            *column = parts
                .iter()
                .fold(0, |acc, part| (acc << 2) | (part[i] & 0x03));
        }
        self.write_ram(&columns).await
    }

    /// One blank column.
    pub async fn pad(&mut self) -> Result<(), Error<E>> {
        self.write_ram(&[0x00]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_are_right_aligned() {
        assert_eq!(decimal_digits(0), (*b"    0", 1));
        assert_eq!(decimal_digits(42), (*b"   42", 2));
        assert_eq!(decimal_digits(12345), (*b"12345", 5));
        assert_eq!(decimal_digits(u16::MAX), (*b"65535", 5));
    }

    #[test]
    fn cell_frames_glyph_with_blank_columns() {
        assert_eq!(cell(&[1, 2, 3, 4, 5]), [0, 1, 2, 3, 4, 5, 0]);
    }
}
