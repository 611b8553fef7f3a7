//! Error handling primitives for the PMW3360 driver.

/// Crate-wide result type alias.
pub type Result<T, E> = core::result::Result<T, Error<E>>;

/// Error variants produced by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Any error reported by the underlying bus interface.
    Interface(E),
    /// The provided configuration parameters are invalid.
    InvalidConfig,
    /// The requested resolution is outside the supported CPI range.
    InvalidCpi(u16),
    /// The requested rotation is outside -30..=30 degrees.
    InvalidAngle(i8),
    /// The driver has not completed its power-up sequence yet.
    NotReady,
    /// The firmware image contains no bytes.
    EmptyFirmware,
    /// `SROM_ID` read back after the upload did not match the expected identity.
    SromIdMismatch {
        /// Identity the caller asked for.
        expected: u8,
        /// Identity reported by the sensor.
        actual: u8,
    },
    /// `Product_ID` / `Inverse_Product_ID` do not identify a PMW3360.
    DeviceIdMismatch {
        /// Raw `Product_ID` value.
        product_id: u8,
        /// Raw `Inverse_Product_ID` value.
        inverse_product_id: u8,
    },
}

impl<E> From<E> for Error<E> {
    fn from(err: E) -> Self {
        Self::Interface(err)
    }
}
