//! In-memory stand-ins for the bus, pins and timer used by the unit tests.

use core::cell::RefCell;
use core::convert::Infallible;
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::digital::{ErrorType, OutputPin};
use embedded_hal::spi::Operation;
#[cfg(not(feature = "async"))]
use embedded_hal::spi::SpiDevice;
#[cfg(feature = "async")]
use embedded_hal_async::spi::SpiDevice;

use crate::transport::Transport;
use crate::{Error, Timer};

/// One observable event on the display interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    Command(u8),
    Data(u8),
    Reset(bool),
}

#[derive(Default)]
struct State {
    dc_high: bool,
    lines: Vec<Line>,
}

/// Shared, ordered record of everything sent to the display.
#[derive(Clone, Default)]
pub struct Log(Rc<RefCell<State>>);

impl Log {
    pub fn push(&self, line: Line) {
        self.0.borrow_mut().lines.push(line);
    }

    /// Record a byte tagged by the current D/C level.
    pub fn push_byte(&self, byte: u8) {
        let mut state = self.0.borrow_mut();
        let line = if state.dc_high {
            Line::Data(byte)
        } else {
            Line::Command(byte)
        };
        state.lines.push(line);
    }

    pub fn lines(&self) -> Vec<Line> {
        self.0.borrow().lines.clone()
    }

    pub fn commands(&self) -> Vec<u8> {
        self.lines()
            .into_iter()
            .filter_map(|line| match line {
                Line::Command(byte) => Some(byte),
                _ => None,
            })
            .collect()
    }

    pub fn data(&self) -> Vec<u8> {
        self.lines()
            .into_iter()
            .filter_map(|line| match line {
                Line::Data(byte) => Some(byte),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().lines.clear();
    }
}

/// D/C pin feeding its level into the log.
pub struct LoggedPin {
    log: Log,
}

impl LoggedPin {
    pub fn new(log: &Log) -> Self {
        Self { log: log.clone() }
    }
}

impl ErrorType for LoggedPin {
    type Error = Infallible;
}

impl OutputPin for LoggedPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.log.0.borrow_mut().dc_high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.log.0.borrow_mut().dc_high = true;
        Ok(())
    }
}

/// Reset pin recording each transition as a [`Line::Reset`].
pub struct ResetPin {
    log: Log,
}

impl ResetPin {
    pub fn new(log: &Log) -> Self {
        Self { log: log.clone() }
    }
}

impl ErrorType for ResetPin {
    type Error = Infallible;
}

impl OutputPin for ResetPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.log.push(Line::Reset(false));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.log.push(Line::Reset(true));
        Ok(())
    }
}

/// SPI device logging written bytes against the D/C level.
pub struct LoggedSpi {
    log: Log,
}

impl LoggedSpi {
    pub fn new(log: &Log) -> Self {
        Self { log: log.clone() }
    }
}

impl embedded_hal::spi::ErrorType for LoggedSpi {
    type Error = Infallible;
}

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), self = "LoggedSpi",),
    async(feature = "async", keep_self)
)]
impl SpiDevice for LoggedSpi {
    async fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Infallible> {
        for op in operations.iter() {
            if let Operation::Write(bytes) = op {
                for &byte in bytes.iter() {
                    self.log.push_byte(byte);
                }
            }
        }
        Ok(())
    }
}

/// Transport recording commands and data straight into the log.
pub struct Recorder {
    log: Log,
}

impl Recorder {
    pub fn new(log: &Log) -> Self {
        Self { log: log.clone() }
    }
}

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), self = "Recorder",),
    async(feature = "async", keep_self)
)]
impl Transport for Recorder {
    type CommError = Infallible;

    async fn write_command(&mut self, byte: u8) -> Result<(), Error<Infallible>> {
        self.log.push(Line::Command(byte));
        Ok(())
    }

    async fn write_data(&mut self, byte: u8) -> Result<(), Error<Infallible>> {
        self.log.push(Line::Data(byte));
        Ok(())
    }
}

pub struct NoDelay;

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), self = "NoDelay",),
    async(feature = "async", keep_self)
)]
impl Timer for NoDelay {
    async fn delay_ms(_milliseconds: u64) {}
}
