//! Byte layout of one strip update on the SPI bus.

use crate::encoder::{decode_channel, ENCODED_CHANNEL_BYTES, ENCODED_ZERO};
use crate::pixel_format::Color;

/// Encoded bytes per pixel: three channels of three symbol bytes.
pub const BYTES_PER_PIXEL: usize = 3 * ENCODED_CHANNEL_BYTES;

/// Sizes of the data and reset-padding regions for a given strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    led_count: usize,
    padding_bytes: usize,
}

impl FrameLayout {
    /// Layout whose idle-low tail lasts at least `reset_us` at `clock_hz`.
    pub fn new(led_count: usize, clock_hz: u32, reset_us: u32) -> Self {
        Self::with_padding(led_count, reset_padding_bytes(clock_hz, reset_us))
    }

    /// Layout with an explicit padding length.
    pub fn with_padding(led_count: usize, padding_bytes: usize) -> Self {
        FrameLayout {
            led_count,
            padding_bytes,
        }
    }

    pub fn led_count(&self) -> usize {
        self.led_count
    }

    pub fn padding_bytes(&self) -> usize {
        self.padding_bytes
    }

    /// `led_count * 24` data bits at three symbol bits each, 9 bytes a pixel.
    pub fn data_bytes(&self) -> usize {
        self.led_count * BYTES_PER_PIXEL
    }

    pub fn frame_bytes(&self) -> usize {
        self.data_bytes() + self.padding_bytes
    }

    /// Frame size, or `None` if it cannot be held in one buffer.
    pub fn checked_frame_bytes(led_count: usize, padding_bytes: usize) -> Option<usize> {
        led_count
            .checked_mul(BYTES_PER_PIXEL)?
            .checked_add(padding_bytes)
            .filter(|&total| total <= isize::MAX as usize)
    }
}

/// Zero bytes needed to hold the line low for `reset_us` at `clock_hz`.
pub fn reset_padding_bytes(clock_hz: u32, reset_us: u32) -> usize {
    let bits = (u64::from(clock_hz) * u64::from(reset_us)).div_ceil(1_000_000);
    bits.div_ceil(8) as usize
}

/// The transmit buffer: pixel data followed by zero padding.
#[derive(Debug, Clone)]
pub struct TransportFrame {
    layout: FrameLayout,
    bytes: Vec<u8>,
}

impl TransportFrame {
    /// A frame that encodes an all-black strip.
    pub fn new(layout: FrameLayout) -> Self {
        let mut frame = TransportFrame {
            layout,
            bytes: vec![0u8; layout.frame_bytes()],
        };
        frame.fill_black();
        frame
    }

    pub fn layout(&self) -> FrameLayout {
        self.layout
    }

    /// Everything that goes on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn data(&self) -> &[u8] {
        &self.bytes[..self.layout.data_bytes()]
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        let end = self.layout.data_bytes();
        &mut self.bytes[..end]
    }

    pub fn padding(&self) -> &[u8] {
        &self.bytes[self.layout.data_bytes()..]
    }

    /// Encoded bytes of one pixel, or `None` past the end of the strip.
    pub fn pixel(&self, index: usize) -> Option<&[u8]> {
        let start = index.checked_mul(BYTES_PER_PIXEL)?;
        let end = start.checked_add(BYTES_PER_PIXEL)?;
        self.data().get(start..end)
    }

    /// Read a pixel back from its wire bytes.
    ///
    /// `None` past the end of the strip or if the bytes are not valid symbols.
    pub fn decode_pixel(&self, index: usize) -> Option<Color> {
        let bytes = self.pixel(index)?;
        let channel = |offset: usize| {
            decode_channel([bytes[offset], bytes[offset + 1], bytes[offset + 2]])
        };
        Some(Color::new(channel(3)?, channel(0)?, channel(6)?))
    }

    /// Encoded zero in every channel and zeroed padding.
    ///
    /// A bytewise zero would not do here: `000` is not a valid data bit and
    /// the strip would read it as part of a reset.
    pub fn fill_black(&mut self) {
        for chunk in self.data_mut().chunks_exact_mut(ENCODED_CHANNEL_BYTES) {
            chunk.copy_from_slice(&ENCODED_ZERO);
        }
        self.zero_padding();
    }

    pub fn zero_padding(&mut self) {
        let start = self.layout.data_bytes();
        self.bytes[start..].fill(0);
    }
}
