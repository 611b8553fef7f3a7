//! Pin function arbitration for serial lines shared between sensors.

use core::convert::Infallible;

/// Switches the MISO/MOSI/SCK pads between the serial peripheral and an
/// inert function.
///
/// Two sensors wired to different pad sets of the same peripheral must hand
/// the peripheral back and forth: the active sensor claims its pads, the other
/// sensor's pads stay released so their idle level is left alone.
pub trait PinMux {
    /// Error type produced while reassigning pad functions.
    type Error;

    /// Routes the pads to the serial peripheral.
    fn claim(&mut self) -> core::result::Result<(), Self::Error>;

    /// Returns the pads to their inert function.
    fn release(&mut self) -> core::result::Result<(), Self::Error>;
}

/// Pads permanently owned by a single sensor; claim and release are no-ops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dedicated;

impl PinMux for Dedicated {
    type Error = Infallible;

    fn claim(&mut self) -> core::result::Result<(), Self::Error> {
        Ok(())
    }

    fn release(&mut self) -> core::result::Result<(), Self::Error> {
        Ok(())
    }
}

impl<T: PinMux + ?Sized> PinMux for &mut T {
    type Error = T::Error;

    fn claim(&mut self) -> core::result::Result<(), Self::Error> {
        T::claim(self)
    }

    fn release(&mut self) -> core::result::Result<(), Self::Error> {
        T::release(self)
    }
}
