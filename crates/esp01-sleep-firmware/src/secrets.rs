//! Bench configuration baked in by `build.rs`

use esp01_sleep_core::config::{Config, ConfigError};

static CONFIG_BLOB: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/bench_config.bin"));

/// Decode the embedded configuration.
pub fn load() -> Result<Config<'static>, ConfigError> {
    Config::from_postcard(CONFIG_BLOB)
}
