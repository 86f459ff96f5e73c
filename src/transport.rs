//! Byte transports to the controller.
//!
//! The PCD8544 samples the D/C line together with the last bit of every byte,
//! so a command must be completely shifted out before the line is switched
//! back to data.

use core::convert::Infallible;

use embedded_hal::digital::OutputPin;
#[cfg(not(feature = "async"))]
use embedded_hal::spi::SpiDevice;
#[cfg(feature = "async")]
use embedded_hal_async::spi::SpiDevice;

use crate::Error;

/// Upper bound on status register polls before a write gives up.
pub const DEFAULT_MAX_POLLS: u32 = 100_000;

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), self = "Transport",),
    async(feature = "async", keep_self)
)]
/// Ordered byte stream with a command/data side band.
pub trait Transport {
    type CommError;

    /// Send a command byte. Returns once the byte has fully left the bus.
    async fn write_command(&mut self, byte: u8) -> Result<(), Error<Self::CommError>>;

    /// Send a display RAM byte.
    async fn write_data(&mut self, byte: u8) -> Result<(), Error<Self::CommError>>;

    async fn write_data_slice(&mut self, data: &[u8]) -> Result<(), Error<Self::CommError>> {
        for &byte in data {
            self.write_data(byte).await?;
        }
        Ok(())
    }
}

/// Transport over an `embedded-hal` SPI device and a D/C pin.
pub struct SpiTransport<SPI, DC> {
    spi: SPI,
    dc: DC,
}

impl<SPI, DC> SpiTransport<SPI, DC> {
    pub fn new(spi: SPI, dc: DC) -> Self {
        Self { spi, dc }
    }

    pub fn release(self) -> (SPI, DC) {
        (self.spi, self.dc)
    }
}

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), self = "SpiTransport",),
    async(feature = "async", keep_self)
)]
impl<SPI, DC, E> Transport for SpiTransport<SPI, DC>
where
    SPI: SpiDevice<Error = E>,
    DC: OutputPin<Error = Infallible>,
{
    type CommError = E;

    async fn write_command(&mut self, byte: u8) -> Result<(), Error<E>> {
        // Set DC low for command
        self.dc.set_low().map_err(Error::Pin)?;
        // The transaction is flushed before write() returns
        self.spi.write(&[byte]).await.map_err(Error::Comm)
    }

    async fn write_data(&mut self, byte: u8) -> Result<(), Error<E>> {
        self.dc.set_high().map_err(Error::Pin)?;
        self.spi.write(&[byte]).await.map_err(Error::Comm)
    }

    async fn write_data_slice(&mut self, data: &[u8]) -> Result<(), Error<E>> {
        self.dc.set_high().map_err(Error::Pin)?;
        self.spi.write(data).await.map_err(Error::Comm)
    }
}

/// Status and data registers of a synchronous serial port driven by polling.
pub trait SsiPort {
    /// A frame is still being shifted out or the FIFO is not empty.
    fn is_busy(&self) -> bool;

    /// The transmit FIFO has no free slot.
    fn is_tx_full(&self) -> bool;

    /// Queue a byte in the transmit FIFO.
    fn push(&mut self, byte: u8);
}

/// Transport over a polled [`SsiPort`], with every wait bounded by
/// `max_polls` status reads.
///
/// Commands bypass the FIFO: the port is drained before and after so the D/C
/// level matches the byte on the wire. Data bytes only wait for a free FIFO
/// slot.
pub struct PolledTransport<P, DC> {
    port: P,
    dc: DC,
    max_polls: u32,
}

impl<P, DC> PolledTransport<P, DC>
where
    P: SsiPort,
    DC: OutputPin<Error = Infallible>,
{
    pub fn new(port: P, dc: DC, max_polls: u32) -> Self {
        Self {
            port,
            dc,
            max_polls,
        }
    }

    pub fn release(self) -> (P, DC) {
        (self.port, self.dc)
    }

    fn wait_until(&self, ready: impl Fn(&P) -> bool) -> Result<(), Error<Infallible>> {
        let mut polls = 0;
        while !ready(&self.port) {
            polls += 1;
            if polls >= self.max_polls {
                warn!("ssi port stalled after {} polls", polls);
                return Err(Error::PeripheralTimeout);
            }
        }
        Ok(())
    }

    fn send_command(&mut self, byte: u8) -> Result<(), Error<Infallible>> {
        self.wait_until(|port| !port.is_busy())?;
        self.dc.set_low().map_err(Error::Pin)?;
        self.port.push(byte);
        self.wait_until(|port| !port.is_busy())
    }

    fn send_data(&mut self, byte: u8) -> Result<(), Error<Infallible>> {
        self.wait_until(|port| !port.is_tx_full())?;
        self.dc.set_high().map_err(Error::Pin)?;
        self.port.push(byte);
        Ok(())
    }
}

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), self = "PolledTransport",),
    async(feature = "async", keep_self)
)]
impl<P, DC> Transport for PolledTransport<P, DC>
where
    P: SsiPort,
    DC: OutputPin<Error = Infallible>,
{
    type CommError = Infallible;

    async fn write_command(&mut self, byte: u8) -> Result<(), Error<Infallible>> {
        self.send_command(byte)
    }

    async fn write_data(&mut self, byte: u8) -> Result<(), Error<Infallible>> {
        self.send_data(byte)
    }
}
