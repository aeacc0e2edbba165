//! Output lines observed by the operator and the power profiler
//!
//! The status LED pulses around every button-triggered transition. The
//! optional state pins hold exactly one line high, the one for the current
//! power state, so a logic analyser or PPK2 digital channel can tag the
//! current trace with the state.

use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use log::warn;

use crate::config::LED_PULSE_MS;
use crate::power_state::PowerState;

/// On-board LED pulsed before and after each transition
pub struct StatusLed<L> {
    pin: L,
}

impl<L: OutputPin> StatusLed<L> {
    pub fn new(pin: L) -> Self {
        Self { pin }
    }

    /// Light the LED for `LED_PULSE_MS`.
    pub async fn pulse<D: DelayNs>(&mut self, delay: &mut D) {
        if self.pin.set_high().is_err() {
            warn!("status LED could not be switched on");
        }
        delay.delay_ms(LED_PULSE_MS).await;
        if self.pin.set_low().is_err() {
            warn!("status LED could not be switched off");
        }
    }
}

/// Something that shows the current power state to an external observer.
pub trait StateSignal {
    /// Called once at startup with the initial state.
    fn init(&mut self, state: PowerState);

    /// Called after every transition.
    fn show(&mut self, previous: PowerState, current: PowerState);
}

/// One output line per power state, held high while that state is active.
pub struct StatePins<P> {
    pins: [P; PowerState::COUNT],
}

impl<P: OutputPin> StatePins<P> {
    /// Pins are indexed in state order, `Sleep` first.
    pub fn new(pins: [P; PowerState::COUNT]) -> Self {
        Self { pins }
    }

    fn drive(&mut self, state: PowerState, high: bool) {
        let pin = &mut self.pins[state.index()];
        let result = if high { pin.set_high() } else { pin.set_low() };
        if result.is_err() {
            warn!("state pin for {} could not be driven", state);
        }
    }
}

impl<P: OutputPin> StateSignal for StatePins<P> {
    fn init(&mut self, state: PowerState) {
        for s in PowerState::ALL {
            self.drive(s, false);
        }
        self.drive(state, true);
    }

    fn show(&mut self, previous: PowerState, current: PowerState) {
        self.drive(previous, false);
        self.drive(current, true);
    }
}

/// Boards without state pins track the state only in software.
pub struct NoStateSignal;

impl StateSignal for NoStateSignal {
    fn init(&mut self, _state: PowerState) {}

    fn show(&mut self, _previous: PowerState, _current: PowerState) {}
}

#[cfg(test)]
impl StatusLed<crate::mock::MockPin> {
    pub(crate) fn pin_edges(&self) -> usize {
        self.pin.edges()
    }
}

#[cfg(test)]
impl StatePins<crate::mock::MockPin> {
    pub(crate) fn is_shown(&self, state: PowerState) -> bool {
        self.pins[state.index()].is_set()
    }
}
