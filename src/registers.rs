//! Register map definitions for the PMW3360 optical motion sensor.
#![allow(unused_parens)]

use modular_bitfield::prelude::*;

use crate::params::OperationMode;

/// Register address of `Product_ID`.
pub const REG_PRODUCT_ID: u8 = 0x00;
/// Register address of `Revision_ID`.
pub const REG_REVISION_ID: u8 = 0x01;
/// Register address of `Motion`.
pub const REG_MOTION: u8 = 0x02;
/// Register address of `Delta_X_L`.
pub const REG_DELTA_X_L: u8 = 0x03;
/// Register address of `Delta_X_H`.
pub const REG_DELTA_X_H: u8 = 0x04;
/// Register address of `Delta_Y_L`.
pub const REG_DELTA_Y_L: u8 = 0x05;
/// Register address of `Delta_Y_H`.
pub const REG_DELTA_Y_H: u8 = 0x06;
/// Register address of `SQUAL`.
pub const REG_SQUAL: u8 = 0x07;
/// Register address of `Raw_Data_Sum`.
pub const REG_RAW_DATA_SUM: u8 = 0x08;
/// Register address of `Maximum_Raw_data`.
pub const REG_MAXIMUM_RAW_DATA: u8 = 0x09;
/// Register address of `Minimum_Raw_data`.
pub const REG_MINIMUM_RAW_DATA: u8 = 0x0A;
/// Register address of `Shutter_Lower`.
pub const REG_SHUTTER_LOWER: u8 = 0x0B;
/// Register address of `Shutter_Upper`.
pub const REG_SHUTTER_UPPER: u8 = 0x0C;
/// Register address of `Control`.
pub const REG_CONTROL: u8 = 0x0D;
/// Register address of `Config1` (resolution).
pub const REG_CONFIG1: u8 = 0x0F;
/// Register address of `Config2`.
pub const REG_CONFIG2: u8 = 0x10;
/// Register address of `Angle_Tune`.
pub const REG_ANGLE_TUNE: u8 = 0x11;
/// Register address of `Frame_Capture`.
pub const REG_FRAME_CAPTURE: u8 = 0x12;
/// Register address of `SROM_Enable`.
pub const REG_SROM_ENABLE: u8 = 0x13;
/// Register address of `Run_Downshift`.
pub const REG_RUN_DOWNSHIFT: u8 = 0x14;
/// Register address of `Rest1_Rate_Lower`.
pub const REG_REST1_RATE_LOWER: u8 = 0x15;
/// Register address of `Rest1_Rate_Upper`.
pub const REG_REST1_RATE_UPPER: u8 = 0x16;
/// Register address of `Rest1_Downshift`.
pub const REG_REST1_DOWNSHIFT: u8 = 0x17;
/// Register address of `Rest2_Rate_Lower`.
pub const REG_REST2_RATE_LOWER: u8 = 0x18;
/// Register address of `Rest2_Rate_Upper`.
pub const REG_REST2_RATE_UPPER: u8 = 0x19;
/// Register address of `Rest2_Downshift`.
pub const REG_REST2_DOWNSHIFT: u8 = 0x1A;
/// Register address of `Rest3_Rate_Lower`.
pub const REG_REST3_RATE_LOWER: u8 = 0x1B;
/// Register address of `Rest3_Rate_Upper`.
pub const REG_REST3_RATE_UPPER: u8 = 0x1C;
/// Register address of `Observation`.
pub const REG_OBSERVATION: u8 = 0x24;
/// Register address of `Data_Out_Lower`.
pub const REG_DATA_OUT_LOWER: u8 = 0x25;
/// Register address of `Data_Out_Upper`.
pub const REG_DATA_OUT_UPPER: u8 = 0x26;
/// Register address of `Raw_Data_Dump`.
pub const REG_RAW_DATA_DUMP: u8 = 0x29;
/// Register address of `SROM_ID`.
pub const REG_SROM_ID: u8 = 0x2A;
/// Register address of `Min_SQ_Run`.
pub const REG_MIN_SQ_RUN: u8 = 0x2B;
/// Register address of `Raw_Data_Threshold`.
pub const REG_RAW_DATA_THRESHOLD: u8 = 0x2C;
/// Register address of `Config5`.
pub const REG_CONFIG5: u8 = 0x2F;
/// Register address of `Power_Up_Reset`.
pub const REG_POWER_UP_RESET: u8 = 0x3A;
/// Register address of `Shutdown`.
pub const REG_SHUTDOWN: u8 = 0x3B;
/// Register address of `Inverse_Product_ID`.
pub const REG_INVERSE_PRODUCT_ID: u8 = 0x3F;
/// Register address of `LiftCutoff_Tune3`.
pub const REG_LIFTCUTOFF_TUNE3: u8 = 0x41;
/// Register address of `Angle_Snap`.
pub const REG_ANGLE_SNAP: u8 = 0x42;
/// Register address of `LiftCutoff_Tune1`.
pub const REG_LIFTCUTOFF_TUNE1: u8 = 0x4A;
/// Register address of `Motion_Burst`.
pub const REG_MOTION_BURST: u8 = 0x50;
/// Register address of `LiftCutoff_Tune_Timeout`.
pub const REG_LIFTCUTOFF_TUNE_TIMEOUT: u8 = 0x58;
/// Register address of `LiftCutoff_Tune_Min_Length`.
pub const REG_LIFTCUTOFF_TUNE_MIN_LENGTH: u8 = 0x5A;
/// Register address of `SROM_Load_Burst`.
pub const REG_SROM_LOAD_BURST: u8 = 0x62;
/// Register address of `Lift_Config`.
pub const REG_LIFT_CONFIG: u8 = 0x63;
/// Register address of `Raw_Data_Burst`.
pub const REG_RAW_DATA_BURST: u8 = 0x64;
/// Register address of `LiftCutoff_Tune2`.
pub const REG_LIFTCUTOFF_TUNE2: u8 = 0x65;

/// Mask applied to every register address; bit 7 carries the direction.
pub const ADDRESS_MASK: u8 = 0x7F;
/// Direction bit set on the address byte of a write transaction.
pub const WRITE_BIT: u8 = 0x80;

/// Command written to `Power_Up_Reset` to force a full reboot.
pub const POWER_UP_RESET_COMMAND: u8 = 0x5A;
/// `SROM_Enable` value that prepares the SROM download.
pub const SROM_ENABLE_INIT: u8 = 0x1D;
/// `SROM_Enable` value that starts the SROM burst download.
pub const SROM_ENABLE_START: u8 = 0x18;
/// Value written to `Motion` to freeze the delta counters.
pub const MOTION_LATCH: u8 = 0x01;

/// Expected contents of `Product_ID`.
pub const EXPECTED_PRODUCT_ID: u8 = 0x42;
/// Expected contents of `Inverse_Product_ID`.
pub const EXPECTED_INVERSE_PRODUCT_ID: u8 = 0xBD;

/// Access permissions encoded for each register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterAccess {
    /// Read-only register.
    ReadOnly,
    /// Write-only register.
    WriteOnly,
    /// Read/write register.
    ReadWrite,
}

/// Minimal metadata exposed by every register value type.
pub trait Register {
    /// Raw storage backing the register payload.
    type Raw: Copy;
    /// Register address as documented in the datasheet.
    const ADDRESS: u8;
    /// Access permission classification.
    const ACCESS: RegisterAccess;
    /// Optional reset/default value defined by the datasheet.
    const RESET_VALUE: Option<Self::Raw>;
}

/// Bitfield representation of the `Motion` register (address `0x02`).
#[allow(unused_parens)]
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionStatus {
    // First pixel of the frame capture is available (bit 0).
    pub frame_pix_first: bool,
    // Current operating mode (bits 2:1).
    pub op_mode: OperationMode,
    // Sensor is lifted off the tracking surface (bit 3).
    pub lift_stat: bool,
    #[skip]
    __: B3,
    // Motion occurred since the last report (bit 7).
    pub motion: bool,
}

impl From<u8> for MotionStatus {
    fn from(value: u8) -> Self {
        Self::from_bytes([value])
    }
}

impl From<MotionStatus> for u8 {
    fn from(value: MotionStatus) -> Self {
        value.into_bytes()[0]
    }
}

/// Bitfield representation of the `Config2` register (address `0x10`).
#[allow(unused_parens)]
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config2 {
    #[skip]
    __: B2,
    // Independent X/Y resolution reporting (bit 2).
    pub rpt_mod: bool,
    #[skip]
    __: B2,
    // Automatic downshift into rest modes (bit 5).
    pub rest_en: bool,
    #[skip]
    __: B2,
}

impl From<u8> for Config2 {
    fn from(value: u8) -> Self {
        Self::from_bytes([value])
    }
}

impl From<Config2> for u8 {
    fn from(value: Config2) -> Self {
        value.into_bytes()[0]
    }
}

impl Register for MotionStatus {
    type Raw = u8;
    const ADDRESS: u8 = REG_MOTION;
    const ACCESS: RegisterAccess = RegisterAccess::ReadWrite;
    const RESET_VALUE: Option<Self::Raw> = Some(0x20);
}

impl Register for Config2 {
    type Raw = u8;
    const ADDRESS: u8 = REG_CONFIG2;
    const ACCESS: RegisterAccess = RegisterAccess::ReadWrite;
    const RESET_VALUE: Option<Self::Raw> = Some(0x20);
}

/// Reconstructs a signed delta from its low and high register bytes.
#[inline]
pub const fn delta_from_bytes(low: u8, high: u8) -> i16 {
    i16::from_le_bytes([low, high])
}
