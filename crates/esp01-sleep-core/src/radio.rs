//! The radio capability driven by the state controller

use embedded_io_async::ErrorKind;
use thiserror_no_std::Error;

use crate::config::InternetConfig;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    #[error("no reply from the module in time")]
    Timeout,
    #[error("module rejected the command")]
    Rejected,
    #[error("serial link error: {0:?}")]
    Serial(ErrorKind),
    #[error("reset line could not be driven")]
    ResetPin,
    #[error("command does not fit the transmit buffer")]
    CommandTooLong,
    #[error("payload of {0} bytes exceeds a single datagram")]
    PayloadTooLarge(usize),
}

/// Transport protocol for `open_socket`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    pub const fn as_str(self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
        }
    }
}

/// WiFi/UDP capability of the coprocessor.
///
/// `connect` and `open_socket` may fail transiently and are retried by the
/// controller. The other operations are fire-and-forget: the controller logs
/// their errors and carries on.
pub trait RadioLink {
    /// Join the access point.
    fn connect(
        &mut self,
        credentials: &InternetConfig<'_>,
    ) -> impl Future<Output = Result<(), RadioError>>;

    /// Open a socket to `host:port`.
    ///
    /// `Ok(false)` means the module answered but did not open the socket.
    fn open_socket(
        &mut self,
        protocol: Protocol,
        host: &str,
        port: u16,
    ) -> impl Future<Output = Result<bool, RadioError>>;

    /// Send one datagram on the open socket.
    fn send(&mut self, payload: &[u8]) -> impl Future<Output = Result<(), RadioError>>;

    fn close_socket(&mut self) -> impl Future<Output = Result<(), RadioError>>;

    /// Put the module into deep sleep; a duration of 0 sleeps until reset.
    fn deep_sleep(&mut self, duration_ms: u32) -> impl Future<Output = Result<(), RadioError>>;

    /// Pulse the reset line and wait for the module to come back.
    fn hard_reset(&mut self) -> impl Future<Output = Result<(), RadioError>>;

    /// Restart the module's firmware, dropping any association.
    fn soft_reset(&mut self) -> impl Future<Output = Result<(), RadioError>>;
}
