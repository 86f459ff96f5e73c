#![no_std]

#[cfg(test)]
extern crate std;

// Must come first so the logging macros are visible to the other modules
mod fmt;

pub mod bitmap;
pub mod font;
pub mod framebuffer;
pub mod keypad;
mod text;
pub mod transport;

#[cfg(test)]
mod mock;

use core::convert::Infallible;

use embedded_hal::digital::OutputPin;

pub use bitmap::{Bitmap, BitmapError, Clip};
pub use framebuffer::{BANKS, BUFFER_SIZE, Framebuffer, HEIGHT, OutOfBounds, WIDTH};
pub use keypad::{Key, Keypad};
pub use transport::{PolledTransport, SpiTransport, SsiPort, Transport};

/// Width of a text cell: one blank column, five glyph columns, one blank column
pub const CELL_WIDTH: u8 = 7;
/// Text cells per row
pub const TEXT_COLUMNS: u8 = 12;
/// Text rows, one per bank
pub const TEXT_ROWS: u8 = 6;

/// PCD8544 instruction encodings
mod cmd {
    /// Function Set (20h) - power down, addressing and instruction set bits
    pub const FUNCTION_SET: u8 = 0x20;
    /// Function Set H bit - selects the extended instruction set
    pub const EXTENDED: u8 = 0x01;

    /// Display Control (08h) - blank, normal, all on or inverse
    pub const DISPLAY_CONTROL: u8 = 0x08;
    /// Set Y Address (40h) - bank 0..5
    pub const SET_Y_ADDRESS: u8 = 0x40;
    /// Set X Address (80h) - column 0..83
    pub const SET_X_ADDRESS: u8 = 0x80;

    /// Temperature Control (04h) - extended set
    pub const TEMPERATURE_CONTROL: u8 = 0x04;
    /// Bias System (10h) - extended set
    pub const BIAS_SYSTEM: u8 = 0x10;
    /// Set Vop (80h) - operating voltage, i.e. contrast. Extended set
    pub const SET_VOP: u8 = 0x80;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TemperatureCoefficient {
    Tc0 = 0,
    Tc1 = 1,
    Tc2 = 2,
    Tc3 = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BiasMode {
    Bias1To100 = 0,
    Bias1To80 = 1,
    Bias1To65 = 2,
    Bias1To48 = 3,
    Bias1To40 = 4,
    Bias1To24 = 5,
    Bias1To18 = 6,
    Bias1To10 = 7,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayMode {
    Blank = 0b000,
    AllOn = 0b001,
    Normal = 0b100,
    Inverse = 0b101,
}

#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Vop, 0..=0x7F
    pub contrast: u8,
    pub temperature_coefficient: TemperatureCoefficient,
    pub bias: BiasMode,
    pub inverted: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            contrast: 0x37,
            temperature_coefficient: TemperatureCoefficient::Tc0,
            bias: BiasMode::Bias1To40,
            inverted: false,
        }
    }
}

#[derive(Debug)]
pub enum Error<E = ()> {
    /// Communication error
    Comm(E),
    /// Pin setting error
    Pin(Infallible),
    /// The peripheral never became ready to accept a byte
    PeripheralTimeout,
}

/// Position of the controller's RAM pointer.
///
/// The controller auto-increments `x` on every data byte and moves to the
/// next bank after column 83, wrapping to (0, 0) after the last byte. The
/// driver mirrors that so the logical cursor stays in lockstep without
/// reading anything back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Address {
    pub x: u8,
    pub bank: u8,
}

impl Address {
    fn advance(&mut self, bytes: usize) {
        let pos = (self.bank as usize * WIDTH + self.x as usize + bytes) % BUFFER_SIZE;
        self.bank = (pos / WIDTH) as u8;
        self.x = (pos % WIDTH) as u8;
    }
}

pub struct Pcd8544<T, RST, TIMER>
where
    T: Transport,
    RST: OutputPin<Error = Infallible>,
    TIMER: Timer,
{
    transport: T,
    rst: RST,
    config: Config,
    framebuffer: Framebuffer,
    address: Address,
    _timer: core::marker::PhantomData<TIMER>,
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
    pub fn new(config: Config, transport: T, rst: RST) -> Self {
        Self {
            transport,
            rst,
            config,
            framebuffer: Framebuffer::new(),
            address: Address::default(),
            _timer: core::marker::PhantomData,
        }
    }

    /// Reset the controller and run the configuration script.
    ///
    /// The order matters: Vop, temperature coefficient and bias are only
    /// reachable while the extended instruction set is selected.
    pub async fn init(&mut self) -> Result<(), Error<E>> {
        self.reset().await?;

        // Chip active, horizontal addressing, extended instruction set
        self.command(cmd::FUNCTION_SET | cmd::EXTENDED).await?;
        self.command(cmd::SET_VOP | (self.config.contrast & 0x7F))
            .await?;
        self.command(cmd::TEMPERATURE_CONTROL | self.config.temperature_coefficient as u8)
            .await?;
        self.command(cmd::BIAS_SYSTEM | self.config.bias as u8)
            .await?;

        // Back to the basic set before touching display control
        self.command(cmd::FUNCTION_SET).await?;
        let mode = if self.config.inverted {
            DisplayMode::Inverse
        } else {
            DisplayMode::Normal
        };
        self.set_display_mode(mode).await?;

        self.address = Address::default();
        debug!("pcd8544 initialized, contrast {=u8:#x}", self.config.contrast);
        Ok(())
    }

    pub async fn reset(&mut self) -> Result<(), Error<E>> {
        self.rst.set_low().map_err(Error::Pin)?;
        TIMER::delay_ms(1).await; // Datasheet asks for at least 100 ns
        self.rst.set_high().map_err(Error::Pin)?;
        Ok(())
    }

    pub async fn set_contrast(&mut self, contrast: u8) -> Result<(), Error<E>> {
        self.command(cmd::FUNCTION_SET | cmd::EXTENDED).await?;
        self.command(cmd::SET_VOP | (contrast & 0x7F)).await?;
        self.command(cmd::FUNCTION_SET).await?;
        self.config.contrast = contrast & 0x7F;
        Ok(())
    }

    pub async fn set_display_mode(&mut self, mode: DisplayMode) -> Result<(), Error<E>> {
        self.command(cmd::DISPLAY_CONTROL | mode as u8).await
    }

    async fn command(&mut self, byte: u8) -> Result<(), Error<E>> {
        self.transport.write_command(byte).await
    }

    /// Stream bytes into display RAM at the current address.
    async fn write_ram(&mut self, bytes: &[u8]) -> Result<(), Error<E>> {
        self.transport.write_data_slice(bytes).await?;
        self.address.advance(bytes.len());
        Ok(())
    }

    /// Blank the panel, move the cursor to (0, 0) and clear the framebuffer.
    pub async fn clear(&mut self) -> Result<(), Error<E>> {
        const BLANK_BANK: [u8; WIDTH] = [0; WIDTH];
        for _ in 0..BANKS {
            self.write_ram(&BLANK_BANK).await?;
        }
        self.set_cursor(0, 0).await?;
        self.framebuffer.clear_all();
        Ok(())
    }

    /// Clear the framebuffer only. The panel keeps its contents until the
    /// next [`flush`](Self::flush).
    pub fn clear_buffer(&mut self) {
        self.framebuffer.clear_all();
    }

    /// Copy the whole framebuffer to the panel.
    pub async fn flush(&mut self) -> Result<(), Error<E>> {
        self.set_cursor(0, 0).await?;
        self.transport
            .write_data_slice(self.framebuffer.as_bytes())
            .await?;
        self.address.advance(BUFFER_SIZE);
        Ok(())
    }

    /// Copy a full-screen image in framebuffer layout straight to the panel,
    /// leaving the framebuffer alone.
    pub async fn draw_full_image(&mut self, image: &[u8; BUFFER_SIZE]) -> Result<(), Error<E>> {
        self.set_cursor(0, 0).await?;
        self.write_ram(image).await
    }

    /// Composite a bitmap into the framebuffer, see [`Framebuffer::blit`].
    pub fn draw_bitmap(
        &mut self,
        x: u8,
        y: u8,
        bitmap: &Bitmap<'_>,
        threshold: u8,
    ) -> Result<(), Clip> {
        self.framebuffer.blit(x, y, bitmap, threshold)
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn framebuffer_mut(&mut self) -> &mut Framebuffer {
        &mut self.framebuffer
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Text cell (column, row) under the RAM pointer
    pub fn cursor(&self) -> (u8, u8) {
        (self.address.x / CELL_WIDTH, self.address.bank)
    }

    pub fn release(self) -> (T, RST) {
        (self.transport, self.rst)
    }
}

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), self = "Timer",),
    async(feature = "async", keep_self)
)]
/// Simplified timer trait for delay operations.
pub trait Timer {
    /// Delay for the specified number of milliseconds.
    async fn delay_ms(milliseconds: u64);
}

/// [`Timer`] backed by `embassy-time`.
#[cfg(feature = "embassy-time")]
pub struct EmbassyTimer;

#[cfg(all(feature = "embassy-time", feature = "async"))]
impl Timer for EmbassyTimer {
    async fn delay_ms(milliseconds: u64) {
        embassy_time::Timer::after_millis(milliseconds).await;
    }
}

#[cfg(all(feature = "embassy-time", not(feature = "async")))]
impl Timer for EmbassyTimer {
    fn delay_ms(milliseconds: u64) {
        embassy_time::block_for(embassy_time::Duration::from_millis(milliseconds));
    }
}
