//! Hardware Abstraction Layer for the keyer
//!
//! The core never touches hardware directly. GPIO, MIDI transport, the RGB
//! pixel, settings storage, reset control and the millisecond clock are all
//! capabilities handed in through these traits.

use embedded_hal::digital::{InputPin, OutputPin, PinState};
use heapless::Vec;

use crate::types::{InputMode, MidiAddress, Rgb};

/// Error types for HAL operations
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HalError {
    /// GPIO operation failed
    GpioError,
    /// No pin with this number is available
    UnknownPin(u8),
    /// MIDI transport rejected the message
    MidiError,
    /// Settings storage read or write failed
    StorageError,
    /// Invalid configuration
    InvalidConfig,
}

#[cfg(feature = "std")]
impl core::fmt::Display for HalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HalError::GpioError => write!(f, "GPIO operation failed"),
            HalError::UnknownPin(pin) => write!(f, "Unknown GPIO pin {}", pin),
            HalError::MidiError => write!(f, "MIDI transport failed"),
            HalError::StorageError => write!(f, "Settings storage failed"),
            HalError::InvalidConfig => write!(f, "Invalid configuration"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HalError {}

/// Role a GPIO pin is configured for
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinRole {
    Input(InputMode),
    Output,
}

impl PinRole {
    /// Role of a pin the keyer no longer owns
    pub const RELEASED: PinRole = PinRole::Input(InputMode::Floating);
}

/// Pins addressed by GPIO number
pub trait GpioBank {
    /// Configure a pin's direction and bias
    fn configure(&mut self, pin: u8, role: PinRole) -> Result<(), HalError>;

    /// Raw level of a pin (true = high)
    fn read(&mut self, pin: u8) -> Result<bool, HalError>;

    /// Drive an output pin
    fn write(&mut self, pin: u8, high: bool) -> Result<(), HalError>;
}

/// USB-MIDI transmit side
pub trait MidiOut {
    fn note_on(&mut self, address: MidiAddress, velocity: u8) -> Result<(), HalError>;

    fn note_off(&mut self, address: MidiAddress, velocity: u8) -> Result<(), HalError>;

    /// Send a complete SysEx frame including start and end bytes
    fn send_sysex(&mut self, frame: &[u8], cable: u8) -> Result<(), HalError>;
}

/// Single addressable RGB indicator
pub trait RgbPixel {
    /// Move the pixel data line to `pin`
    fn attach(&mut self, pin: u8) -> Result<(), HalError>;

    fn show(&mut self, color: Rgb) -> Result<(), HalError>;
}

/// Persistent storage for the settings record
pub trait SettingsStore {
    /// Read the stored record into `buf`, returning the number of bytes read
    fn load(&mut self, buf: &mut [u8]) -> Result<usize, HalError>;

    /// Replace the stored record
    fn persist(&mut self, record: &[u8]) -> Result<(), HalError>;
}

/// Platform reset control
pub trait SystemControl {
    fn reboot(&mut self);

    /// Restart into the USB mass-storage bootloader
    fn enter_bootloader(&mut self);
}

/// Monotonic millisecond clock; wraps at `u32::MAX`
pub trait Clock {
    fn now_ms(&self) -> u32;
}

/// Complete keyer HAL interface
pub trait KeyerHal {
    type Gpio: GpioBank;
    type Midi: MidiOut;
    type Pixel: RgbPixel;
    type Store: SettingsStore;
    type System: SystemControl;
    type Clock: Clock;

    /// Access to GPIO
    fn gpio(&mut self) -> &mut Self::Gpio;

    /// Access to MIDI output
    fn midi(&mut self) -> &mut Self::Midi;

    /// Access to the RGB pixel
    fn pixel(&mut self) -> &mut Self::Pixel;

    /// Access to settings storage
    fn store(&mut self) -> &mut Self::Store;

    /// Access to reset control
    fn system(&mut self) -> &mut Self::System;

    /// Access to the clock
    fn clock(&self) -> &Self::Clock;
}

/// HAL assembled from independent parts
pub struct HalParts<G, M, P, S, Y, C> {
    pub gpio: G,
    pub midi: M,
    pub pixel: P,
    pub store: S,
    pub system: Y,
    pub clock: C,
}

impl<G, M, P, S, Y, C> KeyerHal for HalParts<G, M, P, S, Y, C>
where
    G: GpioBank,
    M: MidiOut,
    P: RgbPixel,
    S: SettingsStore,
    Y: SystemControl,
    C: Clock,
{
    type Gpio = G;
    type Midi = M;
    type Pixel = P;
    type Store = S;
    type System = Y;
    type Clock = C;

    fn gpio(&mut self) -> &mut G {
        &mut self.gpio
    }

    fn midi(&mut self) -> &mut M {
        &mut self.midi
    }

    fn pixel(&mut self) -> &mut P {
        &mut self.pixel
    }

    fn store(&mut self) -> &mut S {
        &mut self.store
    }

    fn system(&mut self) -> &mut Y {
        &mut self.system
    }

    fn clock(&self) -> &C {
        &self.clock
    }
}

/// Pixel implementation for boards without an RGB LED
pub struct NoPixel;

impl RgbPixel for NoPixel {
    fn attach(&mut self, _pin: u8) -> Result<(), HalError> {
        Ok(())
    }

    fn show(&mut self, _color: Rgb) -> Result<(), HalError> {
        Ok(())
    }
}

/// Clock backed by the embassy time driver
#[cfg(feature = "embassy-time")]
#[derive(Copy, Clone, Debug, Default)]
pub struct EmbassyClock;

#[cfg(feature = "embassy-time")]
impl Clock for EmbassyClock {
    fn now_ms(&self) -> u32 {
        // Truncation is the wrap the keyer expects
        embassy_time::Instant::now().as_millis() as u32
    }
}

struct FlexPin<P> {
    number: u8,
    pin: P,
    role: Option<PinRole>,
}

/// `GpioBank` over embedded-hal pins that can switch direction at runtime
///
/// Bias is applied by the board layer when it hands pins over; embedded-hal
/// has no pull configuration, so `configure` only tracks direction here.
pub struct FlexPinBank<P, const N: usize> {
    pins: Vec<FlexPin<P>, N>,
}

impl<P, const N: usize> FlexPinBank<P, N>
where
    P: InputPin + OutputPin,
{
    pub fn new() -> Self {
        Self { pins: Vec::new() }
    }

    /// Register a pin under its GPIO number
    pub fn add(&mut self, number: u8, pin: P) -> Result<(), HalError> {
        if self.pins.iter().any(|p| p.number == number) {
            return Err(HalError::InvalidConfig);
        }
        self.pins
            .push(FlexPin {
                number,
                pin,
                role: None,
            })
            .map_err(|_| HalError::InvalidConfig)
    }

    /// Role last configured for a pin
    pub fn role(&self, number: u8) -> Option<PinRole> {
        self.pins
            .iter()
            .find(|p| p.number == number)
            .and_then(|p| p.role)
    }

    /// Direct access to a registered pin
    pub fn pin_mut(&mut self, number: u8) -> Option<&mut P> {
        self.find(number).ok().map(|p| &mut p.pin)
    }

    fn find(&mut self, number: u8) -> Result<&mut FlexPin<P>, HalError> {
        self.pins
            .iter_mut()
            .find(|p| p.number == number)
            .ok_or(HalError::UnknownPin(number))
    }
}

impl<P, const N: usize> Default for FlexPinBank<P, N>
where
    P: InputPin + OutputPin,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<P, const N: usize> GpioBank for FlexPinBank<P, N>
where
    P: InputPin + OutputPin,
{
    fn configure(&mut self, pin: u8, role: PinRole) -> Result<(), HalError> {
        self.find(pin)?.role = Some(role);
        Ok(())
    }

    fn read(&mut self, pin: u8) -> Result<bool, HalError> {
        self.find(pin)?
            .pin
            .is_high()
            .map_err(|_| HalError::GpioError)
    }

    fn write(&mut self, pin: u8, high: bool) -> Result<(), HalError> {
        let entry = self.find(pin)?;
        if entry.role != Some(PinRole::Output) {
            return Err(HalError::InvalidConfig);
        }
        entry
            .pin
            .set_state(PinState::from(high))
            .map_err(|_| HalError::GpioError)
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    //! Mock implementations for testing

    use super::*;
    use std::vec::Vec;

    /// Number of addressable mock pins
    pub const MOCK_PINS: usize = 128;

    /// Side effect observed by the mock HAL
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum HalEvent {
        NoteOn { address: MidiAddress, velocity: u8 },
        NoteOff { address: MidiAddress, velocity: u8 },
        SysEx { frame: Vec<u8>, cable: u8 },
        PinConfigured { pin: u8, role: PinRole },
        PinWrite { pin: u8, high: bool },
        PixelAttached(u8),
        PixelShow(Rgb),
        Persisted,
        Reboot,
        Bootloader,
    }

    /// Event stamped with the mock clock
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct TimedEvent {
        pub at_ms: u32,
        pub event: HalEvent,
    }

    /// Single-struct HAL recording every side effect
    pub struct MockHal {
        now_ms: u32,
        levels: [bool; MOCK_PINS],
        roles: [Option<PinRole>; MOCK_PINS],
        events: Vec<TimedEvent>,
        stored: Option<Vec<u8>>,
        fail_storage: bool,
        fail_midi: bool,
        fail_pixel: bool,
    }

    impl MockHal {
        /// All pins idle high (as with pull-ups)
        pub fn new() -> Self {
            Self {
                now_ms: 0,
                levels: [true; MOCK_PINS],
                roles: [None; MOCK_PINS],
                events: Vec::new(),
                stored: None,
                fail_storage: false,
                fail_midi: false,
                fail_pixel: false,
            }
        }

        pub fn set_time(&mut self, now_ms: u32) {
            self.now_ms = now_ms;
        }

        pub fn advance(&mut self, ms: u32) {
            self.now_ms = self.now_ms.wrapping_add(ms);
        }

        /// Set the raw level seen on an input pin
        pub fn set_level(&mut self, pin: u8, high: bool) {
            if let Some(level) = self.levels.get_mut(pin as usize) {
                *level = high;
            }
        }

        /// Current level of a pin (last written, for outputs)
        pub fn level(&self, pin: u8) -> bool {
            self.levels.get(pin as usize).copied().unwrap_or(false)
        }

        pub fn role(&self, pin: u8) -> Option<PinRole> {
            self.roles.get(pin as usize).copied().flatten()
        }

        pub fn events(&self) -> &[TimedEvent] {
            &self.events
        }

        pub fn clear_events(&mut self) {
            self.events.clear();
        }

        /// Note-on/off events only
        pub fn note_events(&self) -> Vec<TimedEvent> {
            self.events
                .iter()
                .filter(|e| matches!(e.event, HalEvent::NoteOn { .. } | HalEvent::NoteOff { .. }))
                .cloned()
                .collect()
        }

        /// SysEx frames sent so far
        pub fn sysex_frames(&self) -> Vec<Vec<u8>> {
            self.events
                .iter()
                .filter_map(|e| match &e.event {
                    HalEvent::SysEx { frame, .. } => Some(frame.clone()),
                    _ => None,
                })
                .collect()
        }

        /// Preload the settings store
        pub fn set_stored(&mut self, record: Option<&[u8]>) {
            self.stored = record.map(|r| r.to_vec());
        }

        pub fn stored(&self) -> Option<&[u8]> {
            self.stored.as_deref()
        }

        /// Make every storage access fail
        pub fn set_storage_failure(&mut self, fail: bool) {
            self.fail_storage = fail;
        }

        /// Make every MIDI send fail
        pub fn set_midi_failure(&mut self, fail: bool) {
            self.fail_midi = fail;
        }

        /// Make every pixel update fail
        pub fn set_pixel_failure(&mut self, fail: bool) {
            self.fail_pixel = fail;
        }

        fn record(&mut self, event: HalEvent) {
            self.events.push(TimedEvent {
                at_ms: self.now_ms,
                event,
            });
        }

        fn check_pin(pin: u8) -> Result<usize, HalError> {
            if (pin as usize) < MOCK_PINS {
                Ok(pin as usize)
            } else {
                Err(HalError::UnknownPin(pin))
            }
        }
    }

    impl Default for MockHal {
        fn default() -> Self {
            Self::new()
        }
    }

    impl GpioBank for MockHal {
        fn configure(&mut self, pin: u8, role: PinRole) -> Result<(), HalError> {
            let index = Self::check_pin(pin)?;
            self.roles[index] = Some(role);
            self.record(HalEvent::PinConfigured { pin, role });
            Ok(())
        }

        fn read(&mut self, pin: u8) -> Result<bool, HalError> {
            let index = Self::check_pin(pin)?;
            Ok(self.levels[index])
        }

        fn write(&mut self, pin: u8, high: bool) -> Result<(), HalError> {
            let index = Self::check_pin(pin)?;
            self.levels[index] = high;
            self.record(HalEvent::PinWrite { pin, high });
            Ok(())
        }
    }

    impl MidiOut for MockHal {
        fn note_on(&mut self, address: MidiAddress, velocity: u8) -> Result<(), HalError> {
            if self.fail_midi {
                return Err(HalError::MidiError);
            }
            self.record(HalEvent::NoteOn { address, velocity });
            Ok(())
        }

        fn note_off(&mut self, address: MidiAddress, velocity: u8) -> Result<(), HalError> {
            if self.fail_midi {
                return Err(HalError::MidiError);
            }
            self.record(HalEvent::NoteOff { address, velocity });
            Ok(())
        }

        fn send_sysex(&mut self, frame: &[u8], cable: u8) -> Result<(), HalError> {
            if self.fail_midi {
                return Err(HalError::MidiError);
            }
            self.record(HalEvent::SysEx {
                frame: frame.to_vec(),
                cable,
            });
            Ok(())
        }
    }

    impl RgbPixel for MockHal {
        fn attach(&mut self, pin: u8) -> Result<(), HalError> {
            self.record(HalEvent::PixelAttached(pin));
            Ok(())
        }

        fn show(&mut self, color: Rgb) -> Result<(), HalError> {
            if self.fail_pixel {
                return Err(HalError::GpioError);
            }
            self.record(HalEvent::PixelShow(color));
            Ok(())
        }
    }

    impl SettingsStore for MockHal {
        fn load(&mut self, buf: &mut [u8]) -> Result<usize, HalError> {
            if self.fail_storage {
                return Err(HalError::StorageError);
            }
            let stored = self.stored.as_ref().ok_or(HalError::StorageError)?;
            let len = stored.len().min(buf.len());
            buf[..len].copy_from_slice(&stored[..len]);
            Ok(len)
        }

        fn persist(&mut self, record: &[u8]) -> Result<(), HalError> {
            if self.fail_storage {
                return Err(HalError::StorageError);
            }
            self.stored = Some(record.to_vec());
            self.record(HalEvent::Persisted);
            Ok(())
        }
    }

    impl SystemControl for MockHal {
        fn reboot(&mut self) {
            self.record(HalEvent::Reboot);
        }

        fn enter_bootloader(&mut self) {
            self.record(HalEvent::Bootloader);
        }
    }

    impl Clock for MockHal {
        fn now_ms(&self) -> u32 {
            self.now_ms
        }
    }

    impl KeyerHal for MockHal {
        type Gpio = Self;
        type Midi = Self;
        type Pixel = Self;
        type Store = Self;
        type System = Self;
        type Clock = Self;

        fn gpio(&mut self) -> &mut Self {
            self
        }

        fn midi(&mut self) -> &mut Self {
            self
        }

        fn pixel(&mut self) -> &mut Self {
            self
        }

        fn store(&mut self) -> &mut Self {
            self
        }

        fn system(&mut self) -> &mut Self {
            self
        }

        fn clock(&self) -> &Self {
            self
        }
    }
}
