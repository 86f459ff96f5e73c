//! Row-driven key matrix scanner.
//!
//! Rows are outputs driven high one at a time, columns are inputs with
//! pull-downs. The first closed switch in row-major order wins.

use core::convert::Infallible;

use embedded_hal::digital::{InputPin, OutputPin};

use crate::Error;

/// A pressed key, zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Key {
    pub row: u8,
    pub column: u8,
}

impl Key {
    pub const fn new(row: u8, column: u8) -> Self {
        Self { row, column }
    }

    /// Legacy encoding: one-based row in the tens digit, one-based column in
    /// the units digit (the top-left key is 11).
    pub const fn code(&self) -> u8 {
        (self.row + 1) * 10 + self.column + 1
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        let (row, column) = (code / 10, code % 10);
        if row == 0 || column == 0 {
            return None;
        }
        Some(Self::new(row - 1, column - 1))
    }
}

pub struct Keypad<R, C, const ROWS: usize, const COLS: usize> {
    rows: [R; ROWS],
    cols: [C; COLS],
}

impl<R, C, const ROWS: usize, const COLS: usize> Keypad<R, C, ROWS, COLS>
where
    R: OutputPin<Error = Infallible>,
    C: InputPin<Error = Infallible>,
{
    pub fn new(rows: [R; ROWS], cols: [C; COLS]) -> Self {
        Self { rows, cols }
    }

    /// Scan the matrix once. All rows are released before returning.
    pub fn read_pressed(&mut self) -> Result<Option<Key>, Error> {
        let mut pressed = None;
        'scan: for r in 0..ROWS {
            self.release_rows()?;
            self.rows[r].set_high().map_err(Error::Pin)?;
            for (c, col) in self.cols.iter_mut().enumerate() {
                if col.is_high().map_err(Error::Pin)? {
                    pressed = Some(Key::new(r as u8, c as u8));
                    break 'scan;
                }
            }
        }
        self.release_rows()?;
        Ok(pressed)
    }

    fn release_rows(&mut self) -> Result<(), Error> {
        for row in self.rows.iter_mut() {
            row.set_low().map_err(Error::Pin)?;
        }
        Ok(())
    }

    pub fn release(self) -> ([R; ROWS], [C; COLS]) {
        (self.rows, self.cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use embedded_hal::digital::ErrorType;
    use std::rc::Rc;

    /// Row lines shared between the fake row and column pins
    type Bus = Rc<Cell<u8>>;

    struct RowPin {
        bus: Bus,
        bit: u8,
    }

    impl ErrorType for RowPin {
        type Error = Infallible;
    }

    impl OutputPin for RowPin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.bus.set(self.bus.get() & !(1 << self.bit));
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.bus.set(self.bus.get() | (1 << self.bit));
            Ok(())
        }
    }

    /// Column reading high when any driven row has its switch closed
    struct ColPin {
        bus: Bus,
        closed_rows: u8,
    }

    impl ErrorType for ColPin {
        type Error = Infallible;
    }

    impl InputPin for ColPin {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(self.bus.get() & self.closed_rows != 0)
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            self.is_high().map(|high| !high)
        }
    }

    fn keypad(closed: &[(u8, u8)]) -> (Keypad<RowPin, ColPin, 4, 4>, Bus) {
        let bus: Bus = Rc::new(Cell::new(0));
        let rows = [0, 1, 2, 3].map(|bit| RowPin {
            bus: bus.clone(),
            bit,
        });
        let cols = [0u8, 1, 2, 3].map(|c| ColPin {
            bus: bus.clone(),
            closed_rows: closed
                .iter()
                .filter(|&&(_, col)| col == c)
                .fold(0, |acc, &(row, _)| acc | (1 << row)),
        });
        (Keypad::new(rows, cols), bus)
    }

    #[test]
    fn idle_matrix_reads_nothing() {
        let (mut keypad, bus) = keypad(&[]);
        assert_eq!(keypad.read_pressed().unwrap(), None);
        assert_eq!(bus.get(), 0);
    }

    #[test]
    fn reports_row_and_column_of_closed_switch() {
        let (mut keypad, bus) = keypad(&[(0, 2)]);
        let key = keypad.read_pressed().unwrap().unwrap();
        assert_eq!(key, Key::new(0, 2));
        assert_eq!(key.code(), 13);
        assert_eq!(bus.get(), 0);
    }

    #[test]
    fn first_key_in_row_major_order_wins() {
        let (mut keypad, _) = keypad(&[(3, 0), (1, 3), (1, 1)]);
        assert_eq!(keypad.read_pressed().unwrap(), Some(Key::new(1, 1)));
    }

    #[test]
    fn legacy_codes_round_trip() {
        assert_eq!(Key::from_code(44), Some(Key::new(3, 3)));
        assert_eq!(Key::from_code(14).map(|k| k.code()), Some(14));
        assert_eq!(Key::from_code(0), None);
        assert_eq!(Key::from_code(20), None);
    }
}
