//! Test doubles for pins, delays, the serial port and the radio

extern crate std;

use std::collections::VecDeque;
use std::string::String;
use std::vec::Vec;

use embedded_hal::digital::{ErrorKind as PinErrorKind, ErrorType, InputPin, OutputPin};
use embedded_hal_async::delay::DelayNs;
use embedded_io_async::{ErrorKind, Read, Write};

use crate::config::InternetConfig;
use crate::radio::{Protocol, RadioError, RadioLink};

/// Pin that remembers its level and counts level changes
pub struct MockPin {
    level: bool,
    edges: usize,
    broken: bool,
}

impl MockPin {
    pub fn high() -> Self {
        Self {
            level: true,
            edges: 0,
            broken: false,
        }
    }

    pub fn low() -> Self {
        Self {
            level: false,
            ..Self::high()
        }
    }

    /// Every access fails
    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::high()
        }
    }

    pub fn is_set(&self) -> bool {
        self.level
    }

    pub fn edges(&self) -> usize {
        self.edges
    }

    fn drive(&mut self, level: bool) -> Result<(), PinErrorKind> {
        if self.broken {
            return Err(PinErrorKind::Other);
        }
        if self.level != level {
            self.edges += 1;
        }
        self.level = level;
        Ok(())
    }
}

impl ErrorType for MockPin {
    type Error = PinErrorKind;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true)
    }
}

impl InputPin for MockPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        if self.broken {
            return Err(PinErrorKind::Other);
        }
        Ok(self.level)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

/// Delay that returns immediately and records every `delay_ms`
#[derive(Default)]
pub struct CountingDelay {
    calls: Vec<u32>,
}

impl CountingDelay {
    pub fn calls(&self) -> &[u32] {
        &self.calls
    }

    pub fn total_ms(&self) -> u64 {
        self.calls.iter().map(|&ms| ms as u64).sum()
    }
}

impl DelayNs for CountingDelay {
    async fn delay_ns(&mut self, _ns: u32) {}

    async fn delay_ms(&mut self, ms: u32) {
        self.calls.push(ms);
    }
}

/// Serial port that replays canned module output.
///
/// `pending` is readable straight away; every flush then releases the next
/// reply, the way the module answers only once a command is complete.
/// Reading with nothing released never completes, like a module that went
/// quiet.
pub struct ScriptedSerial {
    rx: VecDeque<u8>,
    replies: VecDeque<Vec<u8>>,
    tx: Vec<u8>,
}

impl ScriptedSerial {
    pub fn new(pending: &str, replies: &[&str]) -> Self {
        Self {
            rx: pending.bytes().collect(),
            replies: replies.iter().map(|r| r.as_bytes().to_vec()).collect(),
            tx: Vec::new(),
        }
    }

    pub fn written(&self) -> &[u8] {
        &self.tx
    }
}

impl embedded_io_async::ErrorType for ScriptedSerial {
    type Error = ErrorKind;
}

impl Read for ScriptedSerial {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.rx.is_empty() {
            core::future::pending::<()>().await;
        }
        let n = buf.len().min(self.rx.len());
        for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for ScriptedSerial {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.tx.extend_from_slice(buf);
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        if let Some(reply) = self.replies.pop_front() {
            self.rx.extend(reply);
        }
        Ok(())
    }
}

/// One call made on the [`RecordingRadio`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect,
    OpenSocket,
    Send(String),
    CloseSocket,
    DeepSleep(u32),
    HardReset,
    SoftReset,
}

/// Radio that records calls and fails the first few retryable ones
#[derive(Default)]
pub struct RecordingRadio {
    pub calls: Vec<Call>,
    /// `connect` errors this many times before succeeding
    pub join_failures: u32,
    /// `open_socket` answers `false` this many times before succeeding
    pub socket_refusals: u32,
    /// `open_socket` errors this many times before any refusals
    pub socket_errors: u32,
    /// Every fire-and-forget call fails
    pub unreliable: bool,
    pub socket_target: Option<(Protocol, String, u16)>,
}

impl RecordingRadio {
    pub fn count(&self, call: &Call) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    fn fire_and_forget(&mut self, call: Call) -> Result<(), RadioError> {
        self.calls.push(call);
        if self.unreliable {
            Err(RadioError::Timeout)
        } else {
            Ok(())
        }
    }
}

impl RadioLink for RecordingRadio {
    async fn connect(&mut self, _credentials: &InternetConfig<'_>) -> Result<(), RadioError> {
        self.calls.push(Call::Connect);
        if self.join_failures > 0 {
            self.join_failures -= 1;
            return Err(RadioError::Rejected);
        }
        Ok(())
    }

    async fn open_socket(
        &mut self,
        protocol: Protocol,
        host: &str,
        port: u16,
    ) -> Result<bool, RadioError> {
        self.calls.push(Call::OpenSocket);
        self.socket_target = Some((protocol, String::from(host), port));
        if self.socket_errors > 0 {
            self.socket_errors -= 1;
            return Err(RadioError::Timeout);
        }
        if self.socket_refusals > 0 {
            self.socket_refusals -= 1;
            return Ok(false);
        }
        Ok(true)
    }

    async fn send(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        let text = String::from_utf8_lossy(payload).into_owned();
        self.fire_and_forget(Call::Send(text))
    }

    async fn close_socket(&mut self) -> Result<(), RadioError> {
        self.fire_and_forget(Call::CloseSocket)
    }

    async fn deep_sleep(&mut self, duration_ms: u32) -> Result<(), RadioError> {
        self.fire_and_forget(Call::DeepSleep(duration_ms))
    }

    async fn hard_reset(&mut self) -> Result<(), RadioError> {
        self.fire_and_forget(Call::HardReset)
    }

    async fn soft_reset(&mut self) -> Result<(), RadioError> {
        self.fire_and_forget(Call::SoftReset)
    }
}
