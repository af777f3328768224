//! Key and paddle input debouncing

use crate::settings::DEBOUNCE_MS;
use crate::types::{Element, PaddleSide};

/// Settle-time filter for one digital input
///
/// The stable state only follows the raw reading once the reading has held
/// for `settle_ms`. All time math is wrapping so a millisecond counter
/// rollover does not stall the filter.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Debouncer {
    /// Current debounced state
    state: bool,
    /// Last raw reading
    last_reading: bool,
    /// Time of the last raw reading change
    last_change: u32,
    settle_ms: u32,
}

impl Debouncer {
    /// Create a released input with the given settle time
    pub const fn new(settle_ms: u32) -> Self {
        Self {
            state: false,
            last_reading: false,
            last_change: 0,
            settle_ms,
        }
    }

    /// Feed a raw reading taken at `now_ms`, returning the debounced state
    pub fn update(&mut self, reading: bool, now_ms: u32) -> bool {
        if reading != self.last_reading {
            self.last_change = now_ms;
        }
        if now_ms.wrapping_sub(self.last_change) >= self.settle_ms {
            self.state = reading;
        }
        self.last_reading = reading;
        self.state
    }

    /// Current debounced state
    pub const fn is_active(&self) -> bool {
        self.state
    }

    /// Forget all history, back to released
    pub fn reset(&mut self) {
        *self = Self::new(self.settle_ms);
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEBOUNCE_MS)
    }
}

/// Debounced state of every key input
#[derive(Copy, Clone, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PaddleInput {
    straight: Debouncer,
    dit: Debouncer,
    dah: Debouncer,
}

impl PaddleInput {
    /// Create paddle input with default settle time
    pub const fn new() -> Self {
        Self {
            straight: Debouncer::new(DEBOUNCE_MS),
            dit: Debouncer::new(DEBOUNCE_MS),
            dah: Debouncer::new(DEBOUNCE_MS),
        }
    }

    /// Feed a raw paddle reading
    pub fn update(&mut self, side: PaddleSide, pressed: bool, now_ms: u32) -> bool {
        match side {
            PaddleSide::Dit => self.dit.update(pressed, now_ms),
            PaddleSide::Dah => self.dah.update(pressed, now_ms),
        }
    }

    /// Feed a raw straight key reading
    pub fn update_straight(&mut self, pressed: bool, now_ms: u32) -> bool {
        self.straight.update(pressed, now_ms)
    }

    /// Check if Dit paddle is pressed
    pub const fn dit(&self) -> bool {
        self.dit.is_active()
    }

    /// Check if Dah paddle is pressed
    pub const fn dah(&self) -> bool {
        self.dah.is_active()
    }

    /// Check if the straight key is down
    pub const fn straight(&self) -> bool {
        self.straight.is_active()
    }

    /// Check if the paddle for `element` is pressed
    pub const fn is_pressed(&self, element: Element) -> bool {
        match element {
            Element::Dit => self.dit(),
            Element::Dah => self.dah(),
        }
    }

    /// Check if both paddles are pressed (squeeze condition)
    pub const fn both_pressed(&self) -> bool {
        self.dit() && self.dah()
    }

    /// Reset all inputs to released
    pub fn reset(&mut self) {
        self.straight.reset();
        self.dit.reset();
        self.dah.reset();
    }
}
