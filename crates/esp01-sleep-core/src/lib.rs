//! Hardware-independent core library for the ESP-01 sleep bench
//!
//! This crate contains the platform-agnostic part of the bench: the five-step
//! power-state machine, the table of radio actions bound to each transition,
//! the AT-command radio driver, and thin wrappers around the buttons and
//! indicator pins.
//!
//! It is `#![no_std]` so it compiles on the ESP32-S3 host firmware as well as
//! on desktop hosts (for the simulator and tests).

#![no_std]

pub mod at;
pub mod buttons;
pub mod config;
pub mod controller;
pub mod indicator;
pub mod power_state;
pub mod radio;

#[cfg(test)]
pub(crate) mod mock;

pub use controller::{BenchContext, StateController};
pub use power_state::{PowerState, TransitionAction};
pub use radio::{Protocol, RadioError, RadioLink};
