//! High-level PMW3360 device driver implementation.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::firmware::Firmware;
use crate::interface::pins::PinMux;
use crate::interface::spi::SpiInterface;
use crate::interface::{with_claimed_pins, Pmw3360Interface};
use crate::params::{Cpi, LiftHeight, SromCheck};
use crate::registers::{
    delta_from_bytes,
    Config2,
    MotionStatus,
    Register,
    EXPECTED_INVERSE_PRODUCT_ID,
    EXPECTED_PRODUCT_ID,
    MOTION_LATCH,
    POWER_UP_RESET_COMMAND,
    REG_ANGLE_TUNE,
    REG_CONFIG1,
    REG_DELTA_X_H,
    REG_DELTA_X_L,
    REG_DELTA_Y_H,
    REG_DELTA_Y_L,
    REG_INVERSE_PRODUCT_ID,
    REG_LIFT_CONFIG,
    REG_POWER_UP_RESET,
    REG_PRODUCT_ID,
    REG_REVISION_ID,
    REG_SQUAL,
    REG_SROM_ENABLE,
    REG_SROM_ID,
    REG_SROM_LOAD_BURST,
    SROM_ENABLE_INIT,
    SROM_ENABLE_START,
};
use crate::timing::Timing;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

// Rotation accepted by `Angle_Tune`, in degrees.
const ANGLE_TUNE_RANGE: core::ops::RangeInclusive<i8> = -30..=30;

// Registers read and discarded after a power-up reset, in datasheet order.
const POST_RESET_READS: [u8; 5] = [
    MotionStatus::ADDRESS,
    REG_DELTA_X_L,
    REG_DELTA_X_H,
    REG_DELTA_Y_L,
    REG_DELTA_Y_H,
];

/// Lifecycle of the sensor as tracked by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// No bring-up attempted yet.
    Uninitialized,
    /// Serial port reset and power-up reset in progress (or failed there).
    Resetting,
    /// SROM download in progress (or failed there).
    UploadingFirmware,
    /// Firmware running; motion data is valid.
    Ready,
}

/// One motion report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotionSample {
    /// X displacement since the previous report, in counts.
    pub dx: i16,
    /// Y displacement since the previous report, in counts.
    pub dy: i16,
    /// `Motion.Lift_Stat` cleared: the lens sees the tracking surface.
    pub on_surface: bool,
}

impl MotionSample {
    /// Builds a sample from the latched status byte and the delta bytes in
    /// `[X_L, X_H, Y_L, Y_H]` order.
    pub fn from_registers(status: MotionStatus, deltas: [u8; 4]) -> Self {
        Self {
            dx: delta_from_bytes(deltas[0], deltas[1]),
            dy: delta_from_bytes(deltas[2], deltas[3]),
            on_surface: !status.lift_stat(),
        }
    }

    /// Displacement as an `[x, y]` pair.
    pub const fn movement(&self) -> [i16; 2] {
        [self.dx, self.dy]
    }
}

/// High-level synchronous driver for the PMW3360 optical sensor.
pub struct Pmw3360<IFACE> {
    interface: IFACE,
    config: Config,
    state: State,
    last: MotionSample,
}

impl<IFACE> Pmw3360<IFACE> {
    // ==================================================================
    // == Driver Construction & Ownership ===============================
    // ==================================================================
    /// Creates a new driver instance from the provided bus interface.
    pub fn new(interface: IFACE, config: Config) -> Self {
        Self {
            interface,
            config,
            state: State::Uninitialized,
            last: MotionSample::default(),
        }
    }

    /// Consumes the driver and returns the owned interface.
    pub fn release(self) -> (IFACE, Config) {
        (self.interface, self.config)
    }

    /// Provides mutable access to the underlying interface.
    pub fn interface_mut(&mut self) -> &mut IFACE {
        &mut self.interface
    }

    /// Returns a shared reference to the active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> State {
        self.state
    }

    // ==================================================================
    // == Latest Sample =================================================
    // ==================================================================
    /// Displacement reported by the most recent [`Pmw3360::sample`].
    ///
    /// Stays at the previous value until the next sample completes.
    pub fn movement(&self) -> [i16; 2] {
        self.last.movement()
    }

    /// Surface contact reported by the most recent [`Pmw3360::sample`].
    pub fn is_on_surface(&self) -> bool {
        self.last.on_surface
    }

    /// Most recent complete sample.
    pub fn last_sample(&self) -> MotionSample {
        self.last
    }
}

impl<SPI, CS, MUX, D> Pmw3360<SpiInterface<SPI, CS, MUX, D>>
where
    SPI: SpiBus,
    CS: OutputPin,
    MUX: PinMux,
    D: DelayNs,
{
    // ==================================================================
    // == SPI Convenience Constructors ==================================
    // ==================================================================
    /// Convenience constructor for SPI transports using datasheet timing.
    pub fn new_spi(spi: SPI, cs: CS, mux: MUX, delay: D, config: Config) -> Self {
        Self::new(SpiInterface::new(spi, cs, mux, delay, Timing::DATASHEET), config)
    }

    /// Releases the driver, returning the bus parts and configuration.
    pub fn release_spi(self) -> ((SPI, CS, MUX, D), Config) {
        let (iface, config) = self.release();
        (iface.release(), config)
    }
}

impl<IFACE, CommE> Pmw3360<IFACE>
where
    IFACE: Pmw3360Interface<Error = CommE>,
{
    // ==================================================================
    // == Power-Up & Firmware Upload ====================================
    // ==================================================================
    /// Resets the sensor, uploads `firmware` and applies the configuration.
    ///
    /// The whole sequence runs with the shared pads claimed. On failure the
    /// driver stays in the state that failed; calling `init` again restarts
    /// from the power-up reset.
    pub fn init(&mut self, firmware: &Firmware<'_>) -> Result<(), CommE> {
        self.config.validate().map_err(|_| Error::InvalidConfig)?;
        if firmware.is_empty() {
            return Err(Error::EmptyFirmware);
        }

        let expected_srom_id = match self.config.srom_check {
            SromCheck::Skip => None,
            SromCheck::Embedded => Some(firmware.srom_id().ok_or(Error::InvalidConfig)?),
            SromCheck::Expect(id) => Some(id),
        };

        let config = self.config;
        let state = &mut self.state;
        with_claimed_pins(&mut self.interface, |bus| {
            *state = State::Resetting;
            debug!("PMW3360: power-up reset");
            Self::power_up_reset(bus)?;

            *state = State::UploadingFirmware;
            debug!("PMW3360: uploading {} byte SROM image", firmware.len());
            Self::upload_firmware(bus, firmware, expected_srom_id)?;
            Self::apply_config(bus, &config)
        })?;

        let ready_ms = self.interface.timing().ready_ms;
        self.interface.delay_ms(ready_ms);
        self.state = State::Ready;
        info!("PMW3360 ready at {} CPI", config.initial_cpi);
        Ok(())
    }

    fn power_up_reset(bus: &mut IFACE) -> Result<(), CommE> {
        let timing = *bus.timing();

        bus.resync()?;
        bus.write_register(REG_POWER_UP_RESET, POWER_UP_RESET_COMMAND)?;
        bus.delay_ms(timing.reset_ms);

        for register in POST_RESET_READS {
            bus.read_register(register)?;
        }
        Ok(())
    }

    fn upload_firmware(
        bus: &mut IFACE,
        firmware: &Firmware<'_>,
        expected_srom_id: Option<u8>,
    ) -> Result<(), CommE> {
        let timing = *bus.timing();

        // Rest modes must be off while the SROM is streamed.
        let rest_disabled = Config2::new().with_rest_en(false);
        bus.write_register(Config2::ADDRESS, u8::from(rest_disabled))?;

        bus.write_register(REG_SROM_ENABLE, SROM_ENABLE_INIT)?;
        bus.delay_ms(timing.frame_ms);
        bus.write_register(REG_SROM_ENABLE, SROM_ENABLE_START)?;
        bus.burst_write(REG_SROM_LOAD_BURST, firmware.as_bytes())?;

        // Must be the first access after the burst.
        let srom_id = bus.read_register(REG_SROM_ID)?;
        match expected_srom_id {
            Some(expected) if expected != srom_id => {
                error!(
                    "PMW3360: SROM upload failed, expected SROM_ID {:#x}, got {:#x}",
                    expected,
                    srom_id
                );
                Err(Error::SromIdMismatch {
                    expected,
                    actual: srom_id,
                })
            }
            _ => {
                debug!("PMW3360: SROM_ID {:#x}", srom_id);
                Ok(())
            }
        }
    }

    fn apply_config(bus: &mut IFACE, config: &Config) -> Result<(), CommE> {
        let profile = Config2::new().with_rest_en(config.power_profile.rest_enabled());
        bus.write_register(Config2::ADDRESS, u8::from(profile))?;

        let cpi = Cpi::new(config.initial_cpi).ok_or(Error::InvalidConfig)?;
        bus.write_register(REG_CONFIG1, cpi.register_value())?;
        Ok(())
    }

    // ==================================================================
    // == Resolution & Tuning ===========================================
    // ==================================================================
    /// Sets the resolution in counts per inch.
    ///
    /// Values in `[100, 12700]` are accepted; anything between two multiples
    /// of 100 rounds down.
    pub fn set_cpi(&mut self, cpi: u16) -> Result<(), CommE> {
        self.ensure_ready()?;
        let cpi = Cpi::new(cpi).ok_or(Error::InvalidCpi(cpi))?;

        self.claimed(|bus| {
            bus.write_register(REG_CONFIG1, cpi.register_value())
                .map_err(Error::from)
        })?;

        debug!("PMW3360: resolution set to {} CPI", cpi.effective());
        Ok(())
    }

    /// Rotates the reported motion by `degrees`, within -30..=30.
    pub fn set_angle_tune(&mut self, degrees: i8) -> Result<(), CommE> {
        self.ensure_ready()?;
        if !ANGLE_TUNE_RANGE.contains(&degrees) {
            return Err(Error::InvalidAngle(degrees));
        }

        self.claimed(|bus| {
            bus.write_register(REG_ANGLE_TUNE, degrees as u8)
                .map_err(Error::from)
        })
    }

    /// Selects the lift detection height.
    pub fn set_lift_config(&mut self, height: LiftHeight) -> Result<(), CommE> {
        self.ensure_ready()?;
        self.claimed(|bus| {
            bus.write_register(REG_LIFT_CONFIG, height.bits())
                .map_err(Error::from)
        })
    }

    // ==================================================================
    // == Motion ========================================================
    // ==================================================================
    /// Latches and reads one motion report, replacing the previous one.
    pub fn sample(&mut self) -> Result<MotionSample, CommE> {
        self.ensure_ready()?;

        let sample = self.claimed(|bus| Self::read_motion(bus).map_err(Error::from))?;

        trace!(
            "PMW3360 motion: x: {}, y: {}, on surface: {}",
            sample.dx,
            sample.dy,
            sample.on_surface
        );
        self.last = sample;
        Ok(sample)
    }

    fn read_motion(bus: &mut IFACE) -> core::result::Result<MotionSample, CommE> {
        // Writing Motion freezes the delta registers until they are read.
        bus.write_register(MotionStatus::ADDRESS, MOTION_LATCH)?;
        let status = MotionStatus::from(bus.read_register(MotionStatus::ADDRESS)?);

        let deltas = [
            bus.read_register(REG_DELTA_X_L)?,
            bus.read_register(REG_DELTA_X_H)?,
            bus.read_register(REG_DELTA_Y_L)?,
            bus.read_register(REG_DELTA_Y_H)?,
        ];

        Ok(MotionSample::from_registers(status, deltas))
    }

    // ==================================================================
    // == Identification & Status =======================================
    // ==================================================================
    /// Reads `Product_ID`.
    pub fn product_id(&mut self) -> Result<u8, CommE> {
        self.read_one(REG_PRODUCT_ID)
    }

    /// Reads `Revision_ID`.
    pub fn revision_id(&mut self) -> Result<u8, CommE> {
        self.read_one(REG_REVISION_ID)
    }

    /// Reads `SQUAL`, the number of valid features seen in the last frame.
    pub fn surface_quality(&mut self) -> Result<u8, CommE> {
        self.read_one(REG_SQUAL)
    }

    /// Verifies `Product_ID` and `Inverse_Product_ID` against the PMW3360 constants.
    pub fn check_signature(&mut self) -> Result<(), CommE> {
        self.ensure_ready()?;

        let (product_id, inverse_product_id) = self.claimed(|bus| {
            let product_id = bus.read_register(REG_PRODUCT_ID)?;
            let inverse_product_id = bus.read_register(REG_INVERSE_PRODUCT_ID)?;
            Ok((product_id, inverse_product_id))
        })?;

        if product_id != EXPECTED_PRODUCT_ID || inverse_product_id != EXPECTED_INVERSE_PRODUCT_ID {
            warn!(
                "PMW3360: signature mismatch, got {:#x} / {:#x}",
                product_id,
                inverse_product_id
            );
            return Err(Error::DeviceIdMismatch {
                product_id,
                inverse_product_id,
            });
        }

        Ok(())
    }

    // ==================================================================
    // == Internal Helpers ==============================================
    // ==================================================================
    fn ensure_ready(&self) -> Result<(), CommE> {
        if self.state == State::Ready {
            Ok(())
        } else {
            Err(Error::NotReady)
        }
    }

    /// Runs one transaction group with the shared pads claimed.
    fn claimed<T>(
        &mut self,
        group: impl FnOnce(&mut IFACE) -> Result<T, CommE>,
    ) -> Result<T, CommE> {
        with_claimed_pins(&mut self.interface, group)
    }

    fn read_one(&mut self, register: u8) -> Result<u8, CommE> {
        self.ensure_ready()?;
        self.claimed(|bus| bus.read_register(register).map_err(Error::from))
    }
}
