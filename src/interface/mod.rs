//! Bus interface abstraction for the PMW3360 driver.

pub mod pins;
pub mod shared;
pub mod spi;

use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};

use crate::timing::Timing;

/// Abstraction over the low-level bus access required by the driver.
///
/// Every method is a complete, blocking transaction: chip-select framing and
/// the protocol waits from [`Timing`] are the implementation's concern.
pub trait Pmw3360Interface {
    /// Error type produced by the concrete bus implementation.
    type Error;

    /// Reads a single register.
    fn read_register(&mut self, register: u8) -> core::result::Result<u8, Self::Error>;

    /// Writes a single register.
    fn write_register(&mut self, register: u8, value: u8) -> core::result::Result<(), Self::Error>;

    /// Streams `data` to `register` inside one chip-select span.
    fn burst_write(&mut self, register: u8, data: &[u8]) -> core::result::Result<(), Self::Error>;

    /// Toggles chip-select (deselect, select, deselect) to reset the serial port.
    fn resync(&mut self) -> core::result::Result<(), Self::Error>;

    /// Routes the shared serial pads to this sensor.
    fn claim_pins(&mut self) -> core::result::Result<(), Self::Error>;

    /// Returns the shared serial pads to their inert function.
    fn release_pins(&mut self) -> core::result::Result<(), Self::Error>;

    /// Blocks for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);

    /// Timing table applied by this interface.
    fn timing(&self) -> &Timing;
}

/// Exclusive use of the shared serial pads for one transaction group.
///
/// The pads are claimed on [`PinClaim::acquire`] and released by
/// [`PinClaim::release`]. Dropping the guard without calling `release` still
/// returns the pads, discarding any error.
pub struct PinClaim<'a, IFACE>
where
    IFACE: Pmw3360Interface,
{
    interface: &'a mut IFACE,
}

impl<'a, IFACE> PinClaim<'a, IFACE>
where
    IFACE: Pmw3360Interface,
{
    /// Claims the pads for the duration of the guard.
    ///
    /// A claim that fails partway releases whatever it had already routed
    /// before reporting the claim error.
    pub fn acquire(interface: &'a mut IFACE) -> core::result::Result<Self, IFACE::Error> {
        if let Err(err) = interface.claim_pins() {
            let _ = interface.release_pins();
            return Err(err);
        }
        Ok(Self { interface })
    }

    /// Releases the pads and reports the outcome.
    pub fn release(self) -> core::result::Result<(), IFACE::Error> {
        let mut this = ManuallyDrop::new(self);
        this.interface.release_pins()
    }
}

impl<IFACE> Deref for PinClaim<'_, IFACE>
where
    IFACE: Pmw3360Interface,
{
    type Target = IFACE;

    fn deref(&self) -> &IFACE {
        self.interface
    }
}

impl<IFACE> DerefMut for PinClaim<'_, IFACE>
where
    IFACE: Pmw3360Interface,
{
    fn deref_mut(&mut self) -> &mut IFACE {
        self.interface
    }
}

impl<IFACE> Drop for PinClaim<'_, IFACE>
where
    IFACE: Pmw3360Interface,
{
    fn drop(&mut self) {
        let _ = self.interface.release_pins();
    }
}

/// Runs `group` with the pads claimed and releases them afterwards.
///
/// The pads are released even when `group` fails; the group's error takes
/// precedence over a release error.
pub fn with_claimed_pins<IFACE, T, E>(
    interface: &mut IFACE,
    group: impl FnOnce(&mut IFACE) -> core::result::Result<T, E>,
) -> core::result::Result<T, E>
where
    IFACE: Pmw3360Interface,
    E: From<IFACE::Error>,
{
    let mut claim = PinClaim::acquire(interface)?;
    let outcome = group(&mut *claim);
    let released = claim.release();
    let value = outcome?;
    released?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::{with_claimed_pins, PinClaim, Pmw3360Interface};
    use crate::timing::Timing;

    #[derive(Default)]
    struct Pads {
        claims: u32,
        releases: u32,
        fail_claim: bool,
        fail_release: bool,
        timing: Timing,
    }

    impl Pmw3360Interface for Pads {
        type Error = &'static str;

        fn read_register(&mut self, _register: u8) -> Result<u8, Self::Error> {
            Ok(0)
        }

        fn write_register(&mut self, _register: u8, _value: u8) -> Result<(), Self::Error> {
            Ok(())
        }

        fn burst_write(&mut self, _register: u8, _data: &[u8]) -> Result<(), Self::Error> {
            Ok(())
        }

        fn resync(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }

        fn claim_pins(&mut self) -> Result<(), Self::Error> {
            self.claims += 1;
            if self.fail_claim {
                Err("claim")
            } else {
                Ok(())
            }
        }

        fn release_pins(&mut self) -> Result<(), Self::Error> {
            self.releases += 1;
            if self.fail_release {
                Err("release")
            } else {
                Ok(())
            }
        }

        fn delay_ms(&mut self, _ms: u32) {}

        fn timing(&self) -> &Timing {
            &self.timing
        }
    }

    #[test]
    fn explicit_release_happens_once() {
        let mut pads = Pads::default();

        let claim = PinClaim::acquire(&mut pads).unwrap();
        claim.release().unwrap();

        assert_eq!((pads.claims, pads.releases), (1, 1));
    }

    #[test]
    fn dropping_the_claim_releases_the_pads() {
        let mut pads = Pads::default();

        {
            let _claim = PinClaim::acquire(&mut pads).unwrap();
        }

        assert_eq!((pads.claims, pads.releases), (1, 1));
    }

    #[test]
    fn failed_claim_returns_the_pads_and_skips_the_group() {
        let mut pads = Pads {
            fail_claim: true,
            ..Pads::default()
        };
        let mut ran = false;

        let outcome: Result<(), &'static str> = with_claimed_pins(&mut pads, |_| {
            ran = true;
            Ok(())
        });

        assert_eq!(outcome, Err("claim"));
        assert!(!ran);
        assert_eq!((pads.claims, pads.releases), (1, 1));
    }

    #[test]
    fn group_error_wins_over_release_error() {
        let mut pads = Pads {
            fail_release: true,
            ..Pads::default()
        };

        let outcome: Result<(), &'static str> = with_claimed_pins(&mut pads, |_| Err("group"));
        assert_eq!(outcome, Err("group"));

        let outcome: Result<(), &'static str> = with_claimed_pins(&mut pads, |_| Ok(()));
        assert_eq!(outcome, Err("release"));
        assert_eq!(pads.releases, 2);
    }
}
