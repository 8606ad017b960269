use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::frame::{reset_padding_bytes, FrameLayout};

/// WS2812B high-time windows in nanoseconds: a zero bit is one symbol high,
/// a one bit is two.
const T0H_NS: (f64, f64) = (250.0, 550.0);
const T1H_NS: (f64, f64) = (650.0, 950.0);

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// spidev node the strip's data line hangs off
    #[serde(default = "default_device")]
    pub device: String,

    #[serde(default = "default_led_count")]
    pub led_count: usize,

    /// SPI clock; three clock periods make one data bit
    #[serde(default = "default_clock_hz")]
    pub clock_hz: u32,

    /// Minimum idle-low time that latches a frame
    #[serde(default = "default_reset_us")]
    pub reset_us: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            device: default_device(),
            led_count: default_led_count(),
            clock_hz: default_clock_hz(),
            reset_us: default_reset_us(),
        }
    }
}

fn default_device() -> String {
    "/dev/spidev0.0".to_string()
}

fn default_led_count() -> usize {
    186
}

fn default_clock_hz() -> u32 {
    2_400_000
}

fn default_reset_us() -> u32 {
    280
}

impl Config {
    /// Read a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Reject settings the strip cannot work with.
    pub fn validate(&self) -> std::result::Result<(), Error> {
        if self.led_count == 0 {
            return Err(Error::InvalidConfig("led_count must be at least 1".into()));
        }
        if self.reset_us == 0 {
            return Err(Error::InvalidConfig("reset_us must be non-zero".into()));
        }
        if self.device.is_empty() {
            return Err(Error::InvalidConfig("device path is empty".into()));
        }

        let (t0h, t1h) = self.high_times_ns();
        let in_window = |t: f64, (lo, hi): (f64, f64)| t >= lo && t <= hi;
        if self.clock_hz == 0 || !in_window(t0h, T0H_NS) || !in_window(t1h, T1H_NS) {
            return Err(Error::InvalidConfig(format!(
                "clock_hz {} gives T0H {:.0} ns / T1H {:.0} ns, outside {:?} / {:?}",
                self.clock_hz, t0h, t1h, T0H_NS, T1H_NS
            )));
        }

        let padding = reset_padding_bytes(self.clock_hz, self.reset_us);
        if FrameLayout::checked_frame_bytes(self.led_count, padding).is_none() {
            return Err(Error::InvalidConfig(format!(
                "led_count {} does not fit in one frame buffer",
                self.led_count
            )));
        }
        Ok(())
    }

    /// High pulse lengths of a zero and a one bit at this clock.
    pub fn high_times_ns(&self) -> (f64, f64) {
        let symbol_ns = 1e9 / f64::from(self.clock_hz);
        (symbol_ns, 2.0 * symbol_ns)
    }

    pub fn layout(&self) -> FrameLayout {
        FrameLayout::new(self.led_count, self.clock_hz, self.reset_us)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.device, "/dev/spidev0.0");
        assert_eq!(config.led_count, 186);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config: Config =
            serde_json::from_str(r#"{ "device": "/dev/spidev1.0", "led_count": 30 }"#).unwrap();
        assert_eq!(config.device, "/dev/spidev1.0");
        assert_eq!(config.led_count, 30);
        assert_eq!(config.clock_hz, 2_400_000);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(serde_json::from_str::<Config>(r#"{ "leds": 30 }"#).is_err());
    }

    #[test]
    fn test_layout_from_config() {
        let layout = Config::default().layout();
        assert_eq!(layout.led_count(), 186);
        assert_eq!(layout.padding_bytes(), 84);
    }

    #[test]
    fn test_clock_window() {
        let mut config = Config::default();
        for hz in [2_200_000, 2_400_000, 3_000_000] {
            config.clock_hz = hz;
            assert!(config.validate().is_ok(), "{hz} Hz should be accepted");
        }
        for hz in [0, 1_000_000, 2_000_000, 3_200_000, 8_000_000] {
            config.clock_hz = hz;
            assert!(config.validate().is_err(), "{hz} Hz should be rejected");
        }
    }

    #[test]
    fn test_zero_leds_rejected() {
        let config = Config {
            led_count: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_oversized_strip_rejected() {
        let config = Config {
            led_count: usize::MAX / 8,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let config = Config {
            reset_us: u32::MAX,
            led_count: usize::MAX / 9,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_load_file() {
        let path = std::env::temp_dir().join(format!("spi_strip_config_{}.json", std::process::id()));
        fs::write(&path, r#"{ "led_count": 12, "reset_us": 300 }"#).unwrap();
        let config = Config::load(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(config.led_count, 12);
        assert_eq!(config.reset_us, 300);
    }
}
