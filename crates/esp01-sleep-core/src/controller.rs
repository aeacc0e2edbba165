//! Power-state controller
//!
//! Owns the current [`PowerState`] and every hardware handle it needs, bundled
//! in a [`BenchContext`]. Button presses move the state one step at a time and
//! run the radio action bound to the state being left; while in
//! [`PowerState::Sending`] each loop pass sends one timestamped datagram.
//!
//! ## Blocking
//!
//! Joining the access point and opening the socket retry until they succeed.
//! The polling loop does not read the buttons meanwhile, so the bench is
//! unresponsive until the radio cooperates. There is no cancellation.

use core::fmt::Write as _;

use embassy_futures::yield_now;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal_async::delay::DelayNs;
use heapless::String;
use log::{debug, info, trace, warn};

use crate::buttons::{ButtonPanel, Buttons};
use crate::config::{Config, DEEP_SLEEP_INDEFINITE_MS, SOCKET_RETRY_DELAY_MS};
use crate::indicator::{StateSignal, StatusLed};
use crate::power_state::{PowerState, TransitionAction};
use crate::radio::{Protocol, RadioError, RadioLink};

/// Room for `u64::MAX` microseconds rendered as milliseconds
pub const DATAGRAM_CAPACITY: usize = 32;

/// Render the payload of one datagram: uptime in milliseconds with four
/// decimals, newline terminated.
pub fn datagram(uptime_micros: u64) -> String<DATAGRAM_CAPACITY> {
    let mut payload = String::new();
    // Cannot overflow the capacity
    let _ = writeln!(
        payload,
        "{}.{:04}",
        uptime_micros / 1000,
        (uptime_micros % 1000) * 10
    );
    payload
}

/// Hardware the controller drives, constructed once at startup
pub struct BenchContext<R, L, S, D> {
    pub radio: R,
    pub led: StatusLed<L>,
    pub state_signal: S,
    pub delay: D,
}

/// What a single pass of the polling loop did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    Incremented,
    Decremented,
    Sent,
    Nothing,
}

pub struct StateController<'a, R, L, S, D> {
    ctx: BenchContext<R, L, S, D>,
    config: Config<'a>,
    state: PowerState,
}

impl<'a, R, L, S, D> StateController<'a, R, L, S, D>
where
    R: RadioLink,
    L: OutputPin,
    S: StateSignal,
    D: DelayNs,
{
    /// Start in `Idle`: the module is powered and awake at boot.
    pub fn new(mut ctx: BenchContext<R, L, S, D>, config: Config<'a>) -> Self {
        let state = PowerState::Idle;
        ctx.state_signal.init(state);
        Self { ctx, config, state }
    }

    pub fn state(&self) -> PowerState {
        self.state
    }

    /// Step up one state. Ignored in `Sending`.
    pub async fn handle_increment(&mut self) {
        match (self.state.increment_action(), self.state.next()) {
            (Some(action), Some(next)) => self.step(action, next).await,
            _ => debug!("increment ignored in {}", self.state),
        }
    }

    /// Step down one state. Ignored in `Sleep`.
    pub async fn handle_decrement(&mut self) {
        match (self.state.decrement_action(), self.state.previous()) {
            (Some(action), Some(previous)) => self.step(action, previous).await,
            _ => debug!("decrement ignored in {}", self.state),
        }
    }

    /// Send one datagram if in `Sending`, otherwise do nothing.
    ///
    /// Returns whether a send was attempted.
    pub async fn tick(&mut self, uptime_micros: u64) -> bool {
        if self.state != PowerState::Sending {
            return false;
        }

        let payload = datagram(uptime_micros);
        trace!("sending {}", payload.trim_end());
        if let Err(e) = self.ctx.radio.send(payload.as_bytes()).await {
            warn!("send failed: {}", e);
        }
        true
    }

    /// One pass of the polling loop. At most one branch fires: increment,
    /// else decrement, else a send while in `Sending`.
    pub async fn poll(&mut self, buttons: Buttons, uptime_micros: u64) -> PassOutcome {
        if buttons.increment && self.state < PowerState::Sending {
            self.handle_increment().await;
            PassOutcome::Incremented
        } else if buttons.decrement && self.state > PowerState::Sleep {
            self.handle_decrement().await;
            PassOutcome::Decremented
        } else if self.tick(uptime_micros).await {
            PassOutcome::Sent
        } else {
            PassOutcome::Nothing
        }
    }

    /// Poll the buttons forever.
    pub async fn run<I, J>(
        &mut self,
        buttons: &mut ButtonPanel<I, J>,
        mut uptime_micros: impl FnMut() -> u64,
    ) -> !
    where
        I: InputPin,
        J: InputPin,
    {
        info!("starting in state {}", self.state);
        loop {
            let pressed = buttons.read();
            self.poll(pressed, uptime_micros()).await;
            yield_now().await;
        }
    }

    async fn step(&mut self, action: TransitionAction, target: PowerState) {
        self.ctx.led.pulse(&mut self.ctx.delay).await;
        self.perform(action).await;
        self.ctx.led.pulse(&mut self.ctx.delay).await;

        let previous = self.state;
        self.state = target;
        self.ctx.state_signal.show(previous, target);
        info!("state {} -> {}", previous, target);
    }

    async fn perform(&mut self, action: TransitionAction) {
        match action {
            TransitionAction::WakeRadio => {
                info!("leave ESP-01 sleep");
                let result = self.ctx.radio.hard_reset().await;
                log_ignored("hard reset", result);
            }
            TransitionAction::JoinAccessPoint => self.join_access_point().await,
            TransitionAction::OpenSocket => self.open_socket().await,
            TransitionAction::StartSending => info!("starting to send data"),
            TransitionAction::EnterDeepSleep => {
                info!("enter ESP-01 sleep");
                let result = self.ctx.radio.deep_sleep(DEEP_SLEEP_INDEFINITE_MS).await;
                log_ignored("deep sleep", result);
            }
            TransitionAction::SoftReset => {
                info!("disconnect from AP");
                let result = self.ctx.radio.soft_reset().await;
                log_ignored("soft reset", result);
            }
            TransitionAction::CloseSocket => {
                info!("disconnect from UDP");
                let result = self.ctx.radio.close_socket().await;
                log_ignored("closing the socket", result);
            }
            TransitionAction::StopSending => info!("stop sending data"),
        }
    }

    async fn join_access_point(&mut self) {
        let ssid = self.config.internet.ssid;
        let mut attempt: u32 = 0;
        loop {
            attempt = next_attempt(attempt);
            info!("connecting to AP {} ... (attempt {})", ssid, attempt);
            match self.ctx.radio.connect(&self.config.internet).await {
                Ok(()) => {
                    info!("connected to AP {}", ssid);
                    return;
                }
                Err(e) => warn!("connecting to AP failed: {}", e),
            }
        }
    }

    async fn open_socket(&mut self) {
        let host = self.config.target.remote_ip;
        let port = self.config.target.remote_port;
        let mut attempt: u32 = 0;
        loop {
            attempt = next_attempt(attempt);
            info!(
                "connecting to UDP-server {}:{} ... (attempt {})",
                host, port, attempt
            );
            match self.ctx.radio.open_socket(Protocol::Udp, host, port).await {
                Ok(true) => {
                    info!("UDP socket open");
                    return;
                }
                Ok(false) => {
                    warn!("module refused the socket, retrying");
                    self.ctx.delay.delay_ms(SOCKET_RETRY_DELAY_MS).await;
                }
                Err(e) => warn!("opening the socket failed: {}", e),
            }
        }
    }
}

/// Attempt numbers only feed the log, so they stop at `u32::MAX`.
fn next_attempt(attempt: u32) -> u32 {
    attempt.saturating_add(1)
}

fn log_ignored(what: &str, result: Result<(), RadioError>) {
    if let Err(e) = result {
        warn!("{} failed, continuing: {}", what, e);
    }
}
