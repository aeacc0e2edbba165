//! Increment/decrement push-buttons
//!
//! Both buttons are wired to ground with the input pulled up, so a pressed
//! button reads low. Reads are raw: holding a button repeats the step once the
//! previous transition has finished.

use embedded_hal::digital::InputPin;
use log::warn;

/// Snapshot of both buttons for one pass of the polling loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Buttons {
    pub increment: bool,
    pub decrement: bool,
}

pub struct ButtonPanel<I, D> {
    increment: I,
    decrement: D,
}

impl<I: InputPin, D: InputPin> ButtonPanel<I, D> {
    pub fn new(increment: I, decrement: D) -> Self {
        Self {
            increment,
            decrement,
        }
    }

    /// A pin that cannot be read counts as released.
    pub fn read(&mut self) -> Buttons {
        let increment = self.increment.is_low().unwrap_or_else(|_| {
            warn!("increment button could not be read");
            false
        });
        let decrement = self.decrement.is_low().unwrap_or_else(|_| {
            warn!("decrement button could not be read");
            false
        });
        Buttons {
            increment,
            decrement,
        }
    }
}
