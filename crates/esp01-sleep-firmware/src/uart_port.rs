//! `embedded-io-async` view of the esp-hal UART
//!
//! The AT driver is generic over `embedded_io_async::{Read, Write}`; this
//! wrapper forwards to the UART's async methods and reduces its errors to an
//! [`ErrorKind`].

use embedded_io_async::{ErrorKind, ErrorType, Read, Write};
use esp_hal::Async;
use esp_hal::uart::Uart;
use log::debug;

/// UART connected to the ESP-01
pub struct UartPort<'d> {
    uart: Uart<'d, Async>,
}

impl<'d> UartPort<'d> {
    pub const fn new(uart: Uart<'d, Async>) -> Self {
        Self { uart }
    }
}

impl ErrorType for UartPort<'_> {
    type Error = ErrorKind;
}

impl Read for UartPort<'_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.uart.read_async(buf).await.map_err(|e| {
            debug!("UART receive error: {:?}", e);
            ErrorKind::InvalidData
        })
    }
}

impl Write for UartPort<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.uart.write_async(buf).await.map_err(|e| {
            debug!("UART transmit error: {:?}", e);
            ErrorKind::Other
        })
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.uart.flush_async().await.map_err(|e| {
            debug!("UART flush error: {:?}", e);
            ErrorKind::Other
        })
    }
}
