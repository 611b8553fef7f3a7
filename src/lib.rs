#![cfg_attr(not(test), no_std)]

#[macro_use]
mod log;

mod error;

pub mod config;
pub mod device;
pub mod firmware;
pub mod interface;
pub mod params;
pub mod registers;
pub mod timing;

pub use crate::config::Config;
pub use crate::device::{MotionSample, Pmw3360, State};
pub use crate::error::{Error, Result};
pub use crate::firmware::Firmware;
pub use crate::timing::Timing;
