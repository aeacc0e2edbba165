//! Bakes the bench configuration into the firmware.
//!
//! Settings come from `.env` (see `.env.example`) or the build environment,
//! are validated here, and are written to `OUT_DIR` as a postcard blob that
//! `secrets::load` decodes at startup.

use std::env;
use std::fs;
use std::path::PathBuf;

use esp01_sleep_core::config::{Config, InternetConfig, UdpTarget};

const VARS: [&str; 5] = [
    "ESP01_SSID",
    "ESP01_PASSWORD",
    "ESP01_REMOTE_IP",
    "ESP01_REMOTE_PORT",
    "ESP01_DEBUG",
];

fn required(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| {
        panic!("{name} is not set; copy .env.example to .env and fill it in")
    })
}

fn main() {
    println!("cargo:rerun-if-changed=.env");
    for var in VARS {
        println!("cargo:rerun-if-env-changed={var}");
    }
    println!("cargo:rustc-link-arg-bins=-Tlinkall.x");

    // Plain environment variables work without a .env file
    let _ = dotenvy::dotenv();

    let ssid = required("ESP01_SSID");
    let password = env::var("ESP01_PASSWORD").unwrap_or_default();
    let remote_ip = required("ESP01_REMOTE_IP");
    let remote_port = required("ESP01_REMOTE_PORT");
    let remote_port: u16 = remote_port
        .parse()
        .unwrap_or_else(|e| panic!("ESP01_REMOTE_PORT={remote_port:?} is not a port: {e}"));
    let debug = env::var("ESP01_DEBUG")
        .map(|v| matches!(v.trim(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false);

    let config = Config {
        internet: InternetConfig {
            ssid: &ssid,
            password: &password,
        },
        target: UdpTarget {
            remote_ip: &remote_ip,
            remote_port,
        },
        debug,
    };
    if let Err(e) = config.validate() {
        panic!("invalid bench configuration: {e}");
    }

    let blob = postcard::to_allocvec(&config).expect("configuration serializes");
    let out = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"))
        .join("bench_config.bin");
    fs::write(&out, blob).unwrap_or_else(|e| panic!("writing {}: {e}", out.display()));
}
