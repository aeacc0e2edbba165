//! ESP-01 power-state bench
//!
//! | Signal              | GPIO |
//! |---------------------|------|
//! | UART1 TX -> ESP RX  | 17   |
//! | UART1 RX <- ESP TX  | 18   |
//! | ESP-01 RST          | 16   |
//! | Increment button    | 4    |
//! | Decrement button    | 5    |
//! | Status LED          | 21   |
//! | State pins Sleep..Sending | 9, 10, 11, 12, 13 |
//!
//! Buttons switch to ground; the state pins are meant for LEDs or the digital
//! inputs of a power profiler.

#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use embassy_executor::Spawner;
use embassy_time::{Delay, Instant};
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull};
use esp_hal::timer::timg::TimerGroup;
use esp_hal::uart::{Config as UartConfig, Uart};
use log::{LevelFilter, info, warn};

use esp01_sleep_core::at::AtRadio;
use esp01_sleep_core::buttons::ButtonPanel;
use esp01_sleep_core::config::UART_BAUD_RATE;
use esp01_sleep_core::indicator::{StatePins, StatusLed};
use esp01_sleep_core::{BenchContext, StateController};
use esp01_sleep_firmware::secrets;
use esp01_sleep_firmware::uart_port::UartPort;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    // Decoded before logging starts so the debug flag can pick the level
    let bench_config = secrets::load();
    let level = match &bench_config {
        Ok(config) if config.debug => LevelFilter::Debug,
        _ => LevelFilter::Info,
    };
    rtt_target::rtt_init_log!(level);
    let bench_config = bench_config.expect("Bench configuration baked in at build time is invalid");

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!(
        "Bench target: AP {}, UDP {}:{}",
        bench_config.internet.ssid,
        bench_config.target.remote_ip,
        bench_config.target.remote_port
    );

    let uart = Uart::new(
        peripherals.UART1,
        UartConfig::default().with_baudrate(UART_BAUD_RATE),
    )
    .expect("Failed to configure UART1")
    .with_tx(peripherals.GPIO17)
    .with_rx(peripherals.GPIO18)
    .into_async();
    let reset = Output::new(peripherals.GPIO16, Level::High, OutputConfig::default());

    let mut radio = AtRadio::new(UartPort::new(uart), reset, Delay, bench_config.debug);
    match radio.begin().await {
        Ok(()) => info!("ESP-01 ready"),
        Err(e) => warn!("ESP-01 handshake failed, continuing: {}", e),
    }

    let mut buttons = ButtonPanel::new(
        Input::new(peripherals.GPIO4, InputConfig::default().with_pull(Pull::Up)),
        Input::new(peripherals.GPIO5, InputConfig::default().with_pull(Pull::Up)),
    );

    let led = Output::new(peripherals.GPIO21, Level::Low, OutputConfig::default());
    let state_pins = StatePins::new([
        Output::new(peripherals.GPIO9, Level::Low, OutputConfig::default()),
        Output::new(peripherals.GPIO10, Level::Low, OutputConfig::default()),
        Output::new(peripherals.GPIO11, Level::Low, OutputConfig::default()),
        Output::new(peripherals.GPIO12, Level::Low, OutputConfig::default()),
        Output::new(peripherals.GPIO13, Level::Low, OutputConfig::default()),
    ]);

    let ctx = BenchContext {
        radio,
        led: StatusLed::new(led),
        state_signal: state_pins,
        delay: Delay,
    };
    let mut controller = StateController::new(ctx, bench_config);

    controller
        .run(&mut buttons, || Instant::now().as_micros())
        .await
}
