//! Bench configuration and timing constants

use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

/// How long the status LED stays lit for each pulse
pub const LED_PULSE_MS: u32 = 200;

/// Pause between UDP socket attempts the module refused
pub const SOCKET_RETRY_DELAY_MS: u32 = 1000;

/// Deep sleep duration meaning "until the reset line is pulsed"
pub const DEEP_SLEEP_INDEFINITE_MS: u32 = 0;

/// Serial speed of the ESP-01 AT firmware
pub const UART_BAUD_RATE: u32 = 115_200;

/// Reply timeout for quick commands (`AT`, `ATE0`, `AT+CIPCLOSE`, ...)
pub const AT_COMMAND_TIMEOUT_MS: u32 = 2_000;

/// `AT+CWJAP` has to scan, authenticate and get a DHCP lease
pub const AT_JOIN_TIMEOUT_MS: u32 = 20_000;

/// `AT+CIPSTART` resolves the host before answering
pub const AT_SOCKET_TIMEOUT_MS: u32 = 10_000;

/// Time for the module to boot and print `ready` after a reset
pub const AT_READY_TIMEOUT_MS: u32 = 5_000;

/// How long the reset line is held low for a hard reset
pub const AT_RESET_PULSE_MS: u32 = 100;

/// Silence on the serial line that ends the discard of leftover output
/// before a command
pub const AT_DRAIN_QUIET_US: u32 = 2_000;

/// Largest payload a single `AT+CIPSEND` accepts
pub const MAX_DATAGRAM_LEN: usize = 2048;

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct Config<'a> {
    pub internet: InternetConfig<'a>,
    pub target: UdpTarget<'a>,
    /// Log every AT command and reply
    pub debug: bool,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InternetConfig<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
}

/// Where the datagrams go while the bench is in `Sending`
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UdpTarget<'a> {
    pub remote_ip: &'a str,
    pub remote_port: u16,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("configuration blob is malformed")]
    Malformed,
    #[error("WiFi SSID is empty")]
    EmptySsid,
    #[error("remote host is empty")]
    EmptyRemoteHost,
    #[error("remote port must be non-zero")]
    ZeroRemotePort,
}

impl<'a> Config<'a> {
    /// Decode a postcard-encoded configuration and validate it.
    pub fn from_postcard(bytes: &'a [u8]) -> Result<Self, ConfigError> {
        let config: Config<'a> = postcard::from_bytes(bytes).map_err(|_| ConfigError::Malformed)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.internet.ssid.is_empty() {
            return Err(ConfigError::EmptySsid);
        }
        if self.target.remote_ip.is_empty() {
            return Err(ConfigError::EmptyRemoteHost);
        }
        if self.target.remote_port == 0 {
            return Err(ConfigError::ZeroRemotePort);
        }
        Ok(())
    }
}
