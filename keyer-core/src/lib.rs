#![cfg_attr(not(any(test, feature = "std")), no_std)]

//! # Keyer Core
//!
//! Core logic for a USB-MIDI morse keyer: iambic and straight-key timing,
//! input debouncing, and the SysEx configuration protocol with its bit-exact
//! 7-bit settings codec. Hardware is reached only through the traits in
//! [`hal`].

pub mod bitpack;
pub mod codec;
pub mod debounce;
pub mod device;
pub mod fsm;
pub mod hal;
pub mod settings;
pub mod sysex;
pub mod types;

#[cfg(feature = "test-utils")]
pub mod test_utils;


pub use bitpack::{BitPackError, BitPacker};
pub use debounce::{Debouncer, PaddleInput};
pub use device::{load_settings, Keyer};
pub use fsm::{KeyEvent, KeyerFSM};
pub use hal::{HalError, HalParts, KeyerHal, PinRole};
pub use settings::{GpioAssignments, Settings, SETTINGS_VERSION};
pub use sysex::{Command, FrameError, SysExFrame};
pub use types::*;

#[cfg(feature = "embassy-time")]
pub use device::run;

/// Keyer library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Settings the device starts from before anything is loaded
pub fn default_settings() -> Settings {
    Settings::default()
}
