//! Strongly typed parameter enumerations for the PMW3360 driver.
//!
//! These types map datasheet field encodings and user units onto register
//! bytes. Prefer them over raw integers so out-of-range values are caught
//! before they reach the bus.
//!
//! # Examples
//!
//! ```rust
//! use pmw3360::params::{Cpi, LiftHeight};
//!
//! let cpi = Cpi::new(1600).unwrap();
//! assert_eq!(cpi.register_value(), 15);
//! assert_eq!(LiftHeight::Mm3.bits(), 0b11);
//! ```

use modular_bitfield::prelude::Specifier;

/// Operating mode reported in `Motion.OP_Mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Specifier)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
#[bits = 2]
pub enum OperationMode {
    /// Full-rate tracking.
    Run = 0b00,
    /// First rest stage.
    Rest1 = 0b01,
    /// Second rest stage.
    Rest2 = 0b10,
    /// Deepest rest stage.
    Rest3 = 0b11,
}

/// Sensor resolution in counts per inch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Cpi(u16);

impl Cpi {
    /// Resolution granularity of `Config1`.
    pub const STEP: u16 = 100;
    /// Lowest accepted resolution.
    pub const MIN: u16 = 100;
    /// Highest accepted resolution.
    pub const MAX: u16 = 12_700;

    /// Validates a resolution value.
    ///
    /// Values that are not a multiple of [`Cpi::STEP`] are accepted and round
    /// down when encoded.
    pub const fn new(cpi: u16) -> Option<Self> {
        if cpi < Self::MIN || cpi > Self::MAX {
            None
        } else {
            Some(Self(cpi))
        }
    }

    /// Returns the resolution as requested by the caller.
    pub const fn value(self) -> u16 {
        self.0
    }

    /// Encodes the resolution as the `Config1` byte (`cpi / 100 - 1`).
    pub const fn register_value(self) -> u8 {
        (self.0 / Self::STEP - 1) as u8
    }

    /// Resolution actually applied by the sensor after truncation.
    pub const fn effective(self) -> u16 {
        (self.0 / Self::STEP) * Self::STEP
    }
}

impl Default for Cpi {
    fn default() -> Self {
        // Config1 = 0x15
        Self(2_200)
    }
}

/// `Config2` value written once the firmware is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerProfile {
    /// Rest modes disabled, for USB-powered devices.
    Wired,
    /// Rest modes enabled, for battery-powered devices.
    Wireless,
}

impl PowerProfile {
    /// Whether the sensor may downshift into its rest modes.
    pub const fn rest_enabled(self) -> bool {
        matches!(self, Self::Wireless)
    }
}

/// Lift detection height encoded in `Lift_Config[1:0]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LiftHeight {
    /// Nominal 2 mm lift cutoff (power-on default).
    Mm2,
    /// Nominal 3 mm lift cutoff.
    Mm3,
}

impl LiftHeight {
    /// Returns the register encoding.
    pub const fn bits(self) -> u8 {
        match self {
            Self::Mm2 => 0b10,
            Self::Mm3 => 0b11,
        }
    }
}

/// How the identity reported in `SROM_ID` is checked after an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SromCheck {
    /// Read `SROM_ID` as the datasheet requires and discard the value.
    #[default]
    Skip,
    /// Compare against the identity embedded in the image (byte 1).
    Embedded,
    /// Compare against a caller-provided identity.
    Expect(u8),
}
