//! Test utilities for keyer core functionality

pub mod output_capture {
    //! Output capture and analysis for testing

    use crate::hal::mock::{HalEvent, TimedEvent};
    use crate::types::Element;
    use std::string::String;
    use std::vec::Vec;

    /// One keyed interval, note-on to note-off
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct KeyedSpan {
        pub start_ms: u32,
        pub end_ms: u32,
    }

    impl KeyedSpan {
        pub fn duration(&self) -> u32 {
            self.end_ms.wrapping_sub(self.start_ms)
        }
    }

    /// Keyed intervals reconstructed from recorded MIDI notes
    #[derive(Debug, Default)]
    pub struct OutputCapture {
        spans: Vec<KeyedSpan>,
        open: Option<u32>,
    }

    impl OutputCapture {
        pub fn new() -> Self {
            Self::default()
        }

        /// Build a capture from a mock HAL event log
        pub fn from_events(events: &[TimedEvent]) -> Self {
            let mut capture = Self::new();
            for event in events {
                match event.event {
                    HalEvent::NoteOn { .. } => capture.key_down(event.at_ms),
                    HalEvent::NoteOff { .. } => capture.key_up(event.at_ms),
                    _ => {}
                }
            }
            capture
        }

        /// Record key down event
        pub fn key_down(&mut self, at_ms: u32) {
            if self.open.is_none() {
                self.open = Some(at_ms);
            }
        }

        /// Record key up event
        pub fn key_up(&mut self, at_ms: u32) {
            if let Some(start_ms) = self.open.take() {
                self.spans.push(KeyedSpan {
                    start_ms,
                    end_ms: at_ms,
                });
            }
        }

        /// True if the key is down at the end of the capture
        pub fn is_open(&self) -> bool {
            self.open.is_some()
        }

        /// Completed keyed intervals
        pub fn spans(&self) -> &[KeyedSpan] {
            &self.spans
        }

        pub fn durations(&self) -> Vec<u32> {
            self.spans.iter().map(KeyedSpan::duration).collect()
        }

        /// Silence between consecutive spans
        pub fn gaps(&self) -> Vec<u32> {
            self.spans
                .windows(2)
                .map(|pair| pair[1].start_ms.wrapping_sub(pair[0].end_ms))
                .collect()
        }

        /// Classify spans as elements; anything of two units or more is a dah
        pub fn elements(&self, dit_ms: u32) -> Vec<Element> {
            self.spans
                .iter()
                .map(|span| {
                    if span.duration() >= 2 * dit_ms {
                        Element::Dah
                    } else {
                        Element::Dit
                    }
                })
                .collect()
        }

        /// Convert to morse code string
        pub fn to_morse_string(&self, dit_ms: u32) -> String {
            self.elements(dit_ms)
                .into_iter()
                .map(|element| match element {
                    Element::Dit => '.',
                    Element::Dah => '-',
                })
                .collect()
        }

        pub fn clear(&mut self) {
            self.spans.clear();
            self.open = None;
        }
    }
}

pub mod simulator {
    //! Millisecond-stepped keyer simulation over the mock HAL

    use super::output_capture::OutputCapture;
    use crate::device::Keyer;
    use crate::hal::mock::MockHal;
    use crate::settings::Settings;
    use crate::types::KeyMode;

    /// A booted keyer with scripted key inputs
    pub struct SimulatedKeyer {
        keyer: Keyer<MockHal>,
    }

    impl SimulatedKeyer {
        /// Boot with `settings` already in storage, inputs released
        pub fn new(settings: Settings) -> Self {
            let mut hal = MockHal::new();
            hal.set_stored(Some(&settings.to_record()));

            let released = !settings.input_mode.active_high();
            for pin in [
                settings.gpio.dit_paddle,
                settings.gpio.dah_paddle,
                settings.gpio.straight_key,
            ] {
                hal.set_level(pin, released);
            }

            let mut keyer = Keyer::new(hal);
            keyer.boot();
            keyer.hal_mut().clear_events();
            Self { keyer }
        }

        /// Iambic paddles at the given speed (WPM x 100)
        pub fn paddles(wpm: u16) -> Self {
            Self::new(Settings {
                key_mode: KeyMode::Paddles,
                wpm,
                ..Settings::default()
            })
        }

        /// Straight key with default pins
        pub fn straight_key() -> Self {
            Self::new(Settings {
                key_mode: KeyMode::StraightKey,
                ..Settings::default()
            })
        }

        /// Drive a key pin to its pressed or released level
        pub fn set_key(&mut self, pin: u8, pressed: bool) {
            let active_high = self.keyer.settings().input_mode.active_high();
            self.keyer.hal_mut().set_level(pin, pressed == active_high);
        }

        pub fn set_dit(&mut self, pressed: bool) {
            let pin = self.keyer.settings().gpio.dit_paddle;
            self.set_key(pin, pressed);
        }

        pub fn set_dah(&mut self, pressed: bool) {
            let pin = self.keyer.settings().gpio.dah_paddle;
            self.set_key(pin, pressed);
        }

        pub fn set_straight(&mut self, pressed: bool) {
            let pin = self.keyer.settings().gpio.straight_key;
            self.set_key(pin, pressed);
        }

        /// Tick once per millisecond for `ms` milliseconds
        pub fn run_for(&mut self, ms: u32) {
            for _ in 0..ms {
                self.keyer.tick();
                self.keyer.hal_mut().advance(1);
            }
        }

        pub fn now(&self) -> u32 {
            use crate::hal::Clock;
            self.keyer.hal().now_ms()
        }

        /// Dit length at the configured speed
        pub fn dit_ms(&self) -> u32 {
            self.keyer.timings().dit
        }

        /// Note-on/off history so far
        pub fn capture(&self) -> OutputCapture {
            OutputCapture::from_events(self.keyer.hal().events())
        }

        pub fn keyer(&self) -> &Keyer<MockHal> {
            &self.keyer
        }

        pub fn keyer_mut(&mut self) -> &mut Keyer<MockHal> {
            &mut self.keyer
        }

        pub fn hal(&self) -> &MockHal {
            self.keyer.hal()
        }
    }
}

pub use output_capture::{KeyedSpan, OutputCapture};
pub use simulator::SimulatedKeyer;
