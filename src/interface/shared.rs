//! `SpiBus` adapter for one peripheral driving several sensors.

use core::cell::RefCell;

use embedded_hal::spi::{Error as SpiError, ErrorKind, ErrorType, SpiBus};

/// Errors surfaced by [`SharedBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SharedBusError<E> {
    /// Another holder is in the middle of a bus call.
    Busy,
    /// The wrapped bus reported an error.
    Bus(E),
}

impl<E> SpiError for SharedBusError<E>
where
    E: SpiError,
{
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Busy => ErrorKind::Other,
            Self::Bus(err) => err.kind(),
        }
    }
}

/// Borrowed handle onto a `RefCell`-wrapped SPI bus.
///
/// Each sensor gets its own handle; the bus is borrowed only for the length
/// of one call. Interleaving whole transaction groups is still the caller's
/// responsibility, and the handle is not `Sync`.
pub struct SharedBus<'a, SPI> {
    bus: &'a RefCell<SPI>,
}

impl<'a, SPI> SharedBus<'a, SPI> {
    /// Creates a handle onto the shared bus.
    pub const fn new(bus: &'a RefCell<SPI>) -> Self {
        Self { bus }
    }
}

impl<SPI> ErrorType for SharedBus<'_, SPI>
where
    SPI: SpiBus,
{
    type Error = SharedBusError<SPI::Error>;
}

impl<SPI> SharedBus<'_, SPI>
where
    SPI: SpiBus,
{
    fn with_bus<T>(
        &mut self,
        op: impl FnOnce(&mut SPI) -> core::result::Result<T, SPI::Error>,
    ) -> core::result::Result<T, SharedBusError<SPI::Error>> {
        let mut bus = self.bus.try_borrow_mut().map_err(|_| SharedBusError::Busy)?;
        op(&mut *bus).map_err(SharedBusError::Bus)
    }
}

impl<SPI> SpiBus for SharedBus<'_, SPI>
where
    SPI: SpiBus,
{
    fn read(&mut self, words: &mut [u8]) -> core::result::Result<(), Self::Error> {
        self.with_bus(|bus| bus.read(words))
    }

    fn write(&mut self, words: &[u8]) -> core::result::Result<(), Self::Error> {
        self.with_bus(|bus| bus.write(words))
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> core::result::Result<(), Self::Error> {
        self.with_bus(|bus| bus.transfer(read, write))
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> core::result::Result<(), Self::Error> {
        self.with_bus(|bus| bus.transfer_in_place(words))
    }

    fn flush(&mut self) -> core::result::Result<(), Self::Error> {
        self.with_bus(|bus| bus.flush())
    }
}
