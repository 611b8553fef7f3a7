//! Protocol timing table.
//!
//! Every wait the driver performs is read from a [`Timing`] value. The
//! defaults reproduce the datasheet windows used on real hardware; tests swap
//! in a virtual clock through [`DelayNs`](embedded_hal::delay::DelayNs) rather
//! than shrinking these numbers.

/// Named delays applied around bus transactions and during bring-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timing {
    /// Settle time on both sides of every chip-select edge (ns).
    pub cs_settle_ns: u32,
    /// tSRAD: address byte to valid read data (µs).
    pub read_address_us: u32,
    /// tSCLK-NCS for reads: last clock to chip-select release (µs).
    pub read_hold_us: u32,
    /// tSRW/tSRR minus the read hold: gap after a read (µs).
    pub read_recovery_us: u32,
    /// tSCLK-NCS for writes: last clock to chip-select release (µs).
    pub write_hold_us: u32,
    /// tSWW/tSWR minus the write hold: gap after a write (µs).
    pub write_recovery_us: u32,
    /// Gap between consecutive bytes of an SROM burst (µs).
    pub burst_byte_us: u32,
    /// tBEXIT: wait after a burst before the next transaction (µs).
    pub burst_exit_us: u32,
    /// Reboot time after `Power_Up_Reset` (ms).
    pub reset_ms: u32,
    /// One frame period at the slowest expected frame rate (ms).
    pub frame_ms: u32,
    /// Wait after the upload before the sensor is considered ready (ms).
    pub ready_ms: u32,
}

impl Timing {
    /// Windows taken from the PMW3360 datasheet.
    pub const DATASHEET: Self = Self {
        cs_settle_ns: 120,
        read_address_us: 100,
        read_hold_us: 1,
        read_recovery_us: 19,
        write_hold_us: 20,
        write_recovery_us: 100,
        burst_byte_us: 15,
        burst_exit_us: 1,
        reset_ms: 50,
        frame_ms: 10,
        ready_ms: 10,
    };

    /// Time one register read occupies the bus, excluding settle edges (µs).
    pub const fn read_cycle_us(&self) -> u32 {
        self.read_address_us + self.read_hold_us + self.read_recovery_us
    }

    /// Time one register write occupies the bus, excluding settle edges (µs).
    pub const fn write_cycle_us(&self) -> u32 {
        self.write_hold_us + self.write_recovery_us
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::DATASHEET
    }
}
