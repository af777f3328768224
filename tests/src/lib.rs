//! Host integration tests for keyer-core
//!
//! Everything here runs against the mock HAL or embedded-hal mocks; no
//! hardware is needed.

#[cfg(test)]
mod embassy_tests;
#[cfg(test)]
mod mode_behavior_tests;
#[cfg(test)]
mod protocol_tests;
#[cfg(test)]
mod squeeze_tests;
