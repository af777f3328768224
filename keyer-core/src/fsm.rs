//! Finite State Machine implementation for the iambic keyer

use crate::debounce::PaddleInput;
use crate::types::{Element, OutputPhase, Timings};

/// Output transition requested by the state machine
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyEvent {
    /// Output on; `None` when driven by a straight key
    KeyDown(Option<Element>),
    /// Output off
    KeyUp,
}

/// Main keyer FSM implementation
///
/// Advanced by at most one transition per `update`. Deadlines are kept as
/// start + length and compared with wrapping subtraction, so the state machine
/// survives a rollover of the millisecond clock.
#[derive(Clone, Debug)]
pub struct KeyerFSM {
    phase: OutputPhase,
    phase_start: u32,
    phase_len: u32,
    /// Element currently (or most recently) sounding
    last_element: Element,
    /// Opposite element latched during a squeeze
    queued: Option<Element>,
    timings: Timings,
}

impl KeyerFSM {
    /// Create new FSM with given timings
    pub fn new(timings: Timings) -> Self {
        Self {
            phase: OutputPhase::Idle,
            phase_start: 0,
            phase_len: 0,
            last_element: Element::Dit,
            queued: None,
            timings,
        }
    }

    /// Get current output phase
    pub fn current_phase(&self) -> OutputPhase {
        self.phase
    }

    /// Element latched to follow the current one, if any
    pub fn queued(&self) -> Option<Element> {
        self.queued
    }

    /// Element currently sounding
    pub fn sounding(&self) -> Option<Element> {
        match self.phase {
            OutputPhase::OutputOn => Some(self.last_element),
            OutputPhase::Idle | OutputPhase::OutputOff => None,
        }
    }

    /// True while the output is on
    pub fn is_keyed(&self) -> bool {
        self.phase == OutputPhase::OutputOn
    }

    /// Advance the iambic state machine
    pub fn update(&mut self, paddle: &PaddleInput, now_ms: u32) -> Option<KeyEvent> {
        match self.phase {
            OutputPhase::Idle => self.start_from_paddles(paddle, now_ms),

            OutputPhase::OutputOn => {
                if self.deadline_elapsed(now_ms) {
                    self.phase = OutputPhase::OutputOff;
                    self.phase_start = now_ms;
                    self.phase_len = self.timings.gap;
                    Some(KeyEvent::KeyUp)
                } else {
                    // Paddle memory: latch the opposite paddle while sounding
                    let opposite = self.last_element.opposite();
                    if paddle.is_pressed(opposite) {
                        self.queued = Some(opposite);
                    }
                    None
                }
            }

            OutputPhase::OutputOff => {
                if !self.deadline_elapsed(now_ms) {
                    return None;
                }
                if let Some(element) = self.queued {
                    return Some(self.start_element(element, now_ms));
                }
                let event = self.start_from_paddles(paddle, now_ms);
                if event.is_none() {
                    self.phase = OutputPhase::Idle;
                }
                event
            }
        }
    }

    /// Straight key: output mirrors the debounced key with no timing
    pub fn update_straight(&mut self, key_down: bool) -> Option<KeyEvent> {
        match (key_down, self.phase) {
            (true, OutputPhase::Idle) => {
                self.phase = OutputPhase::OutputOn;
                Some(KeyEvent::KeyDown(None))
            }
            (false, OutputPhase::OutputOn) => {
                self.phase = OutputPhase::Idle;
                Some(KeyEvent::KeyUp)
            }
            _ => None,
        }
    }

    /// Cut any element short and return to idle
    ///
    /// Returns `KeyUp` when the output was on.
    pub fn abort(&mut self) -> Option<KeyEvent> {
        let was_keyed = self.is_keyed();
        self.reset();
        if was_keyed {
            Some(KeyEvent::KeyUp)
        } else {
            None
        }
    }

    /// Reset FSM to initial state
    pub fn reset(&mut self) {
        self.phase = OutputPhase::Idle;
        self.phase_start = 0;
        self.phase_len = 0;
        self.last_element = Element::Dit;
        self.queued = None;
    }

    /// Replace timings; any element in progress is dropped
    pub fn set_timings(&mut self, timings: Timings) {
        self.timings = timings;
        self.reset();
    }

    fn start_from_paddles(&mut self, paddle: &PaddleInput, now_ms: u32) -> Option<KeyEvent> {
        // Dit wins a simultaneous press
        if paddle.dit() {
            Some(self.start_element(Element::Dit, now_ms))
        } else if paddle.dah() {
            Some(self.start_element(Element::Dah, now_ms))
        } else {
            None
        }
    }

    fn start_element(&mut self, element: Element, now_ms: u32) -> KeyEvent {
        self.phase = OutputPhase::OutputOn;
        self.phase_start = now_ms;
        self.phase_len = self.timings.element(element);
        self.last_element = element;
        self.queued = None;
        KeyEvent::KeyDown(Some(element))
    }

    fn deadline_elapsed(&self, now_ms: u32) -> bool {
        now_ms.wrapping_sub(self.phase_start) >= self.phase_len
    }
}
