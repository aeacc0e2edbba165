//! ESP32-S3 firmware-specific modules for the ESP-01 sleep bench
//!
//! This crate contains the code that only builds for the host microcontroller:
//! the UART adapter the AT driver talks through and the configuration baked in
//! at build time.

#![no_std]

pub mod secrets;
pub mod uart_port;
