//! Desktop simulator for the ESP-01 sleep bench.
//!
//! Runs the core state controller against a simulated ESP-01 so the state
//! machine and both retry loops can be exercised without hardware. While in
//! `Sending` the datagrams really go out over UDP, so `nc -ul 6000` shows
//! them arriving.
//!
//! # Key bindings (one per line on stdin)
//!
//! | Key | Action            |
//! |-----|-------------------|
//! | +   | Increment button  |
//! | -   | Decrement button  |
//! | q   | Quit              |
//!
//! `SIM_JOIN_FAILURES` sets how many AP joins fail before one succeeds.

use std::env;
use std::io::{self, BufRead};
use std::net::UdpSocket;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use embassy_futures::block_on;
use embedded_hal::digital::{ErrorType, OutputPin};
use embedded_hal_async::delay::DelayNs;
use log::{debug, info, warn};

use esp01_sleep_core::buttons::Buttons;
use esp01_sleep_core::config::{Config, InternetConfig, UdpTarget};
use esp01_sleep_core::indicator::{StatePins, StatusLed};
use esp01_sleep_core::{BenchContext, PowerState, Protocol, RadioError, RadioLink, StateController};

// ---------------------------------------------------------------------------
// Simulation constants
// ---------------------------------------------------------------------------

/// Pause between loop passes; sets the datagram rate while sending.
const LOOP_PERIOD: Duration = Duration::from_millis(500);

/// Time a simulated AP join takes.
const JOIN_DURATION: Duration = Duration::from_millis(300);

const DEFAULT_JOIN_FAILURES: u32 = 2;

/// The first socket attempt is refused so the retry delay is visible.
const SOCKET_REFUSALS: u32 = 1;

const CONFIG: Config<'static> = Config {
    internet: InternetConfig {
        ssid: "sim-ap",
        password: "sim-password",
    },
    target: UdpTarget {
        remote_ip: "127.0.0.1",
        remote_port: 6000,
    },
    debug: false,
};

// ---------------------------------------------------------------------------
// Simulated hardware
// ---------------------------------------------------------------------------

/// ESP-01 model tracking what the real module would be doing.
struct SimRadio {
    asleep: bool,
    associated: bool,
    socket: Option<UdpSocket>,
    join_failures: u32,
    socket_refusals: u32,
}

impl SimRadio {
    fn new(join_failures: u32, socket_refusals: u32) -> Self {
        Self {
            asleep: false,
            associated: false,
            socket: None,
            join_failures,
            socket_refusals,
        }
    }

    fn awake(&self) -> Result<(), RadioError> {
        if self.asleep {
            // A sleeping module does not answer at all
            Err(RadioError::Timeout)
        } else {
            Ok(())
        }
    }
}

impl RadioLink for SimRadio {
    async fn connect(&mut self, credentials: &InternetConfig<'_>) -> Result<(), RadioError> {
        self.awake()?;
        thread::sleep(JOIN_DURATION);
        if self.join_failures > 0 {
            self.join_failures -= 1;
            return Err(RadioError::Rejected);
        }
        debug!("[esp01] joined {}", credentials.ssid);
        self.associated = true;
        Ok(())
    }

    async fn open_socket(
        &mut self,
        protocol: Protocol,
        host: &str,
        port: u16,
    ) -> Result<bool, RadioError> {
        self.awake()?;
        if !self.associated || protocol != Protocol::Udp {
            return Ok(false);
        }
        if self.socket_refusals > 0 {
            self.socket_refusals -= 1;
            return Ok(false);
        }

        let socket = UdpSocket::bind("0.0.0.0:0").map_err(|e| {
            warn!("[esp01] bind failed: {}", e);
            RadioError::Rejected
        })?;
        if let Err(e) = socket.connect((host, port)) {
            warn!("[esp01] connect to {}:{} failed: {}", host, port, e);
            return Ok(false);
        }
        self.socket = Some(socket);
        Ok(true)
    }

    async fn send(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        self.awake()?;
        let socket = self.socket.as_ref().ok_or(RadioError::Rejected)?;
        // Nobody listening is normal for UDP
        if let Err(e) = socket.send(payload) {
            debug!("[esp01] send: {}", e);
        }
        info!("[esp01] sent {}", String::from_utf8_lossy(payload).trim_end());
        Ok(())
    }

    async fn close_socket(&mut self) -> Result<(), RadioError> {
        self.awake()?;
        self.socket.take().map(|_| ()).ok_or(RadioError::Rejected)
    }

    async fn deep_sleep(&mut self, duration_ms: u32) -> Result<(), RadioError> {
        self.awake()?;
        debug!("[esp01] AT+GSLP={}", duration_ms);
        self.asleep = true;
        self.associated = false;
        self.socket = None;
        Ok(())
    }

    async fn hard_reset(&mut self) -> Result<(), RadioError> {
        debug!("[esp01] reset line pulsed");
        self.asleep = false;
        self.associated = false;
        self.socket = None;
        Ok(())
    }

    async fn soft_reset(&mut self) -> Result<(), RadioError> {
        self.awake()?;
        debug!("[esp01] AT+RST");
        self.associated = false;
        self.socket = None;
        Ok(())
    }
}

/// Output line that logs its level changes.
struct ConsolePin {
    name: &'static str,
}

impl ErrorType for ConsolePin {
    type Error = core::convert::Infallible;
}

impl OutputPin for ConsolePin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        debug!("{} low", self.name);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        debug!("{} high", self.name);
        Ok(())
    }
}

/// Blocks the thread, which is the only thread running the controller.
struct StdDelay;

impl DelayNs for StdDelay {
    async fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(ns as u64));
    }

    async fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(ms as u64));
    }
}

// ---------------------------------------------------------------------------
// Keyboard input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Key {
    Increment,
    Decrement,
    Quit,
}

fn parse_key(line: &str) -> Option<Key> {
    match line.trim() {
        "+" | "i" => Some(Key::Increment),
        "-" | "d" => Some(Key::Decrement),
        "q" => Some(Key::Quit),
        _ => None,
    }
}

fn spawn_keyboard() -> Receiver<Key> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match parse_key(&line) {
                Some(key) => {
                    if tx.send(key).is_err() {
                        break;
                    }
                }
                None => warn!("unknown key {:?}; use +, - or q", line.trim()),
            }
        }
    });
    rx
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    let default_filter = if CONFIG.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let join_failures = env::var("SIM_JOIN_FAILURES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_JOIN_FAILURES);

    let state_pins = StatePins::new(PowerState::ALL.map(|state| ConsolePin {
        name: state.name(),
    }));
    let ctx = BenchContext {
        radio: SimRadio::new(join_failures, SOCKET_REFUSALS),
        led: StatusLed::new(ConsolePin { name: "LED" }),
        state_signal: state_pins,
        delay: StdDelay,
    };
    let mut controller = StateController::new(ctx, CONFIG);

    let keys = spawn_keyboard();
    let started = Instant::now();
    info!("starting in state {}; keys: + - q", controller.state());

    loop {
        let buttons = match keys.try_recv() {
            Ok(Key::Increment) => Buttons {
                increment: true,
                decrement: false,
            },
            Ok(Key::Decrement) => Buttons {
                increment: false,
                decrement: true,
            },
            Ok(Key::Quit) | Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => Buttons::default(),
        };

        let uptime_micros = started.elapsed().as_micros() as u64;
        block_on(controller.poll(buttons, uptime_micros));
        thread::sleep(LOOP_PERIOD);
    }

    info!("leaving in state {}", controller.state());
}
