//! Bus access and the frame that goes over it.

use std::fs;
use std::io::{self, Write};
use std::time::Instant;

use spidev::{SpiModeFlags, Spidev, SpidevOptions};
use tracing::{debug, info, trace};

use crate::error::{Error, Result};
use crate::frame::{FrameLayout, TransportFrame};

/// Kernel default for the largest single spidev transfer.
const SPIDEV_DEFAULT_BUFSIZ: usize = 4096;
const SPIDEV_BUFSIZ_PARAM: &str = "/sys/module/spidev/parameters/bufsiz";

/// Anything that can push a buffer out in one write.
pub trait Bus {
    /// Write `bytes` in a single call and report how many were accepted.
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize>;
}

/// A `/dev/spidevX.Y` node set up for WS2812 output.
pub struct SpiBus {
    path: String,
    spi: Spidev,
}

impl SpiBus {
    /// Open the device at `path`: mode 0, 8-bit words, MSB first.
    pub fn open(path: &str, clock_hz: u32) -> Result<Self> {
        let unavailable = |source| Error::DeviceUnavailable {
            path: path.to_string(),
            source,
        };

        let mut spi = Spidev::open(path).map_err(unavailable)?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(clock_hz)
            .lsb_first(false)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.configure(&options).map_err(unavailable)?;

        info!("Opened {} at {} Hz", path, clock_hz);
        Ok(SpiBus {
            path: path.to_string(),
            spi,
        })
    }
}

impl Drop for SpiBus {
    fn drop(&mut self) {
        debug!("Closing {}", self.path);
    }
}

impl Bus for SpiBus {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.spi.write(bytes)
    }
}

/// Accepts every frame without touching hardware.
#[derive(Debug, Default)]
pub struct DryRunBus {
    frames: u64,
}

impl DryRunBus {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Bus for DryRunBus {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.frames += 1;
        debug!("Dry run frame {}: {} bytes", self.frames, bytes.len());
        Ok(bytes.len())
    }
}

/// Largest transfer the spidev driver will take, if it tells us.
pub fn spidev_bufsiz() -> usize {
    fs::read_to_string(SPIDEV_BUFSIZ_PARAM)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(SPIDEV_DEFAULT_BUFSIZ)
}

/// Owns the bus and the transmit buffer.
pub struct FrameTransport<B: Bus> {
    bus: B,
    frame: TransportFrame,
    frames_sent: u64,
}

impl<B: Bus> FrameTransport<B> {
    pub fn new(bus: B, layout: FrameLayout) -> Self {
        FrameTransport {
            bus,
            frame: TransportFrame::new(layout),
            frames_sent: 0,
        }
    }

    pub fn frame_mut(&mut self) -> &mut TransportFrame {
        &mut self.frame
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Send the whole frame in one write.
    ///
    /// Not retried on failure: after a partial transfer the strip's shift
    /// registers are in an unknown state until the next full frame.
    pub fn render(&mut self) -> Result<()> {
        let bytes = self.frame.as_bytes();

        if tracing::enabled!(tracing::Level::TRACE) {
            let hex: String = bytes
                .iter()
                .map(|b| format!("{:02x}", b))
                .collect::<Vec<_>>()
                .join(" ");
            trace!("Frame: {}", hex);

            let pixels: String = (0..self.frame.layout().led_count())
                .map(|i| match self.frame.decode_pixel(i) {
                    Some(color) => format!("{:06x}", color.to_rgb24()),
                    None => "??????".to_string(),
                })
                .collect::<Vec<_>>()
                .join(" ");
            trace!(
                "Frame pixels (RGB): {} + {} padding bytes",
                pixels,
                self.frame.padding().len()
            );
        }

        let start = Instant::now();
        let written = self
            .bus
            .write(bytes)
            .map_err(Error::TransmissionFailure)?;
        if written != bytes.len() {
            return Err(Error::ShortWrite {
                written,
                expected: bytes.len(),
            });
        }

        self.frames_sent += 1;
        debug!(
            "Sent frame {} ({} bytes) in {:?}",
            self.frames_sent,
            written,
            start.elapsed()
        );
        Ok(())
    }

    /// Encode black into every pixel, zero the padding, and send.
    pub fn blank_and_render(&mut self) -> Result<()> {
        self.frame.fill_black();
        self.render()
    }

    /// Give the bus back, e.g. to close the device.
    pub fn into_bus(self) -> B {
        self.bus
    }
}

/// Refuse a frame that cannot go out in one spidev transfer.
pub fn check_transfer_size(layout: &FrameLayout) -> Result<()> {
    check_frame_fits(layout.frame_bytes(), spidev_bufsiz())
}

fn check_frame_fits(frame_bytes: usize, limit: usize) -> Result<()> {
    if frame_bytes > limit {
        return Err(Error::InvalidConfig(format!(
            "frame is {} bytes but spidev bufsiz is {}; raise it with spidev.bufsiz={}",
            frame_bytes, limit, frame_bytes
        )));
    }
    debug!("Frame of {} bytes fits spidev bufsiz {}", frame_bytes, limit);
    Ok(())
}
