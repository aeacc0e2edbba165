//! AT-command driver for the ESP-01
//!
//! Implements [`RadioLink`] on top of any async serial port. Only the
//! commands the bench needs are issued; every reply is matched line by line
//! against the small set of final result codes the ESP-AT firmware prints.
//!
//! Each exchange is raced against the injected delay so a silent module
//! turns into [`RadioError::Timeout`] instead of hanging the bench.

use core::fmt::{self, Write as _};

use embassy_futures::select::{Either, select};
use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use embedded_io_async::{ErrorKind, Read, Write};
use heapless::{String, Vec};
use log::debug;

use crate::config::{
    AT_COMMAND_TIMEOUT_MS, AT_DRAIN_QUIET_US, AT_JOIN_TIMEOUT_MS, AT_READY_TIMEOUT_MS,
    AT_RESET_PULSE_MS, AT_SOCKET_TIMEOUT_MS, InternetConfig, MAX_DATAGRAM_LEN,
};
use crate::radio::{Protocol, RadioError, RadioLink};

const LINE_CAPACITY: usize = 256;
const COMMAND_CAPACITY: usize = 192;

/// Classification of one reply line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reply {
    Ok,
    Error,
    SendOk,
    Ready,
    AlreadyConnected,
    /// Echo, `+CWJAP:` status, `WIFI CONNECTED`, `Recv n bytes`, ...
    Other,
}

fn classify(line: &[u8]) -> Reply {
    match line {
        b"OK" => Reply::Ok,
        b"ERROR" | b"FAIL" | b"SEND FAIL" => Reply::Error,
        b"SEND OK" => Reply::SendOk,
        b"ready" => Reply::Ready,
        b"ALREADY CONNECTED" => Reply::AlreadyConnected,
        _ => Reply::Other,
    }
}

/// Quotes, commas and backslashes must be escaped inside AT string arguments.
struct Escaped<'a>(&'a str);

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.0.chars() {
            if matches!(c, '"' | ',' | '\\') {
                f.write_char('\\')?;
            }
            f.write_char(c)?;
        }
        Ok(())
    }
}

fn serial_error<E: embedded_io_async::Error>(e: E) -> RadioError {
    RadioError::Serial(e.kind())
}

fn printable(line: &[u8]) -> &str {
    core::str::from_utf8(line).unwrap_or("<non-utf8>")
}

async fn read_byte<S: Read>(serial: &mut S) -> Result<u8, RadioError> {
    let mut byte = [0u8; 1];
    match serial.read(&mut byte).await {
        Ok(0) => Err(RadioError::Serial(ErrorKind::Other)),
        Ok(_) => Ok(byte[0]),
        Err(e) => Err(serial_error(e)),
    }
}

/// Read the next non-empty line, without its line terminator.
///
/// Bytes beyond the line buffer are dropped; such lines are never result codes.
async fn read_line<S: Read>(
    serial: &mut S,
    line: &mut Vec<u8, LINE_CAPACITY>,
) -> Result<(), RadioError> {
    line.clear();
    loop {
        match read_byte(serial).await? {
            b'\n' if line.is_empty() => {}
            b'\n' => return Ok(()),
            b'\r' => {}
            b => {
                let _ = line.push(b);
            }
        }
    }
}

async fn read_reply<S: Read>(
    serial: &mut S,
    line: &mut Vec<u8, LINE_CAPACITY>,
    verbose: bool,
    accept: &[Reply],
) -> Result<Reply, RadioError> {
    loop {
        read_line(serial, line).await?;
        if verbose {
            debug!("AT << {}", printable(line));
        }
        match classify(line) {
            reply if accept.contains(&reply) => return Ok(reply),
            Reply::Error => return Err(RadioError::Rejected),
            _ => {}
        }
    }
}

/// Wait for the `>` that `AT+CIPSEND` prints once it is ready for data.
async fn read_prompt<S: Read>(
    serial: &mut S,
    line: &mut Vec<u8, LINE_CAPACITY>,
    verbose: bool,
) -> Result<(), RadioError> {
    line.clear();
    loop {
        match read_byte(serial).await? {
            b'>' if line.is_empty() => return Ok(()),
            b'\n' => {
                if verbose && !line.is_empty() {
                    debug!("AT << {}", printable(line));
                }
                if classify(line) == Reply::Error {
                    return Err(RadioError::Rejected);
                }
                line.clear();
            }
            b'\r' => {}
            b => {
                let _ = line.push(b);
            }
        }
    }
}

/// ESP-01 driven over its AT command set
pub struct AtRadio<S, R, D> {
    serial: S,
    reset: R,
    delay: D,
    verbose: bool,
    line: Vec<u8, LINE_CAPACITY>,
}

impl<S, R, D> AtRadio<S, R, D>
where
    S: Read + Write,
    R: OutputPin,
    D: DelayNs,
{
    /// `verbose` logs every command and reply at debug level.
    pub fn new(serial: S, reset: R, delay: D, verbose: bool) -> Self {
        Self {
            serial,
            reset,
            delay,
            verbose,
            line: Vec::new(),
        }
    }

    /// Check the module answers, turn echo off and select station mode.
    pub async fn begin(&mut self) -> Result<(), RadioError> {
        self.transact(format_args!("AT"), AT_COMMAND_TIMEOUT_MS).await?;
        self.transact(format_args!("ATE0"), AT_COMMAND_TIMEOUT_MS).await?;
        self.transact(format_args!("AT+CWMODE=1"), AT_COMMAND_TIMEOUT_MS)
            .await
    }

    /// Throw away whatever the module printed since the last exchange.
    ///
    /// A reply that outlived its command's timeout must not be read as the
    /// answer to the next command.
    async fn drain(&mut self) -> Result<(), RadioError> {
        let Self {
            serial,
            delay,
            verbose,
            ..
        } = self;
        let mut discarded: usize = 0;
        loop {
            match select(read_byte(serial), delay.delay_us(AT_DRAIN_QUIET_US)).await {
                Either::First(result) => {
                    result?;
                    discarded += 1;
                }
                Either::Second(()) => break,
            }
        }
        if *verbose && discarded > 0 {
            debug!("AT discarded {} stale bytes", discarded);
        }
        Ok(())
    }

    async fn command(&mut self, args: fmt::Arguments<'_>) -> Result<(), RadioError> {
        let mut cmd: String<COMMAND_CAPACITY> = String::new();
        cmd.write_fmt(args).map_err(|_| RadioError::CommandTooLong)?;
        self.drain().await?;
        if self.verbose {
            debug!("AT >> {}", cmd);
        }
        cmd.write_str("\r\n").map_err(|_| RadioError::CommandTooLong)?;

        self.serial
            .write_all(cmd.as_bytes())
            .await
            .map_err(serial_error)?;
        self.serial.flush().await.map_err(serial_error)
    }

    async fn await_reply(&mut self, accept: &[Reply], timeout_ms: u32) -> Result<Reply, RadioError> {
        let Self {
            serial,
            delay,
            line,
            verbose,
            ..
        } = self;
        match select(
            read_reply(serial, line, *verbose, accept),
            delay.delay_ms(timeout_ms),
        )
        .await
        {
            Either::First(result) => result,
            Either::Second(()) => Err(RadioError::Timeout),
        }
    }

    async fn await_prompt(&mut self, timeout_ms: u32) -> Result<(), RadioError> {
        let Self {
            serial,
            delay,
            line,
            verbose,
            ..
        } = self;
        match select(read_prompt(serial, line, *verbose), delay.delay_ms(timeout_ms)).await {
            Either::First(result) => result,
            Either::Second(()) => Err(RadioError::Timeout),
        }
    }

    /// Send a command and wait for `OK`.
    async fn transact(&mut self, args: fmt::Arguments<'_>, timeout_ms: u32) -> Result<(), RadioError> {
        self.command(args).await?;
        self.await_reply(&[Reply::Ok], timeout_ms).await.map(|_| ())
    }

    async fn await_boot(&mut self) -> Result<(), RadioError> {
        self.await_reply(&[Reply::Ready], AT_READY_TIMEOUT_MS).await?;
        // Echo comes back on with every boot
        self.transact(format_args!("ATE0"), AT_COMMAND_TIMEOUT_MS)
            .await
    }
}

impl<S, R, D> RadioLink for AtRadio<S, R, D>
where
    S: Read + Write,
    R: OutputPin,
    D: DelayNs,
{
    async fn connect(&mut self, credentials: &InternetConfig<'_>) -> Result<(), RadioError> {
        self.transact(format_args!("AT+CWMODE=1"), AT_COMMAND_TIMEOUT_MS)
            .await?;
        self.transact(
            format_args!(
                "AT+CWJAP=\"{}\",\"{}\"",
                Escaped(credentials.ssid),
                Escaped(credentials.password)
            ),
            AT_JOIN_TIMEOUT_MS,
        )
        .await
    }

    async fn open_socket(
        &mut self,
        protocol: Protocol,
        host: &str,
        port: u16,
    ) -> Result<bool, RadioError> {
        self.command(format_args!(
            "AT+CIPSTART=\"{}\",\"{}\",{}",
            protocol.as_str(),
            Escaped(host),
            port
        ))
        .await?;

        match self
            .await_reply(&[Reply::Ok, Reply::AlreadyConnected], AT_SOCKET_TIMEOUT_MS)
            .await
        {
            Ok(Reply::AlreadyConnected) => {
                // The module follows up with ERROR; consume it
                let _ = self.await_reply(&[Reply::Ok], AT_COMMAND_TIMEOUT_MS).await;
                Ok(true)
            }
            Ok(_) => Ok(true),
            Err(RadioError::Rejected) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn send(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        if payload.len() > MAX_DATAGRAM_LEN {
            return Err(RadioError::PayloadTooLarge(payload.len()));
        }

        self.command(format_args!("AT+CIPSEND={}", payload.len()))
            .await?;
        self.await_prompt(AT_COMMAND_TIMEOUT_MS).await?;

        self.serial.write_all(payload).await.map_err(serial_error)?;
        self.serial.flush().await.map_err(serial_error)?;

        self.await_reply(&[Reply::SendOk], AT_COMMAND_TIMEOUT_MS)
            .await
            .map(|_| ())
    }

    async fn close_socket(&mut self) -> Result<(), RadioError> {
        self.transact(format_args!("AT+CIPCLOSE"), AT_COMMAND_TIMEOUT_MS)
            .await
    }

    async fn deep_sleep(&mut self, duration_ms: u32) -> Result<(), RadioError> {
        self.transact(format_args!("AT+GSLP={}", duration_ms), AT_COMMAND_TIMEOUT_MS)
            .await
    }

    async fn hard_reset(&mut self) -> Result<(), RadioError> {
        self.reset.set_low().map_err(|_| RadioError::ResetPin)?;
        self.delay.delay_ms(AT_RESET_PULSE_MS).await;
        self.reset.set_high().map_err(|_| RadioError::ResetPin)?;
        self.await_boot().await
    }

    async fn soft_reset(&mut self) -> Result<(), RadioError> {
        self.transact(format_args!("AT+RST"), AT_COMMAND_TIMEOUT_MS)
            .await?;
        self.await_boot().await
    }
}
