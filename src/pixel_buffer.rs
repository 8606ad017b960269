use crate::encoder::{encode_channel, ENCODED_CHANNEL_BYTES};
use crate::error::{Error, Result};
use crate::frame::{TransportFrame, BYTES_PER_PIXEL};
use crate::pixel_format::Color;

/// The logical contents of the strip, one color per LED.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pixels: Vec<Color>,
}

impl PixelBuffer {
    /// An all-black buffer of `led_count` pixels.
    pub fn new(led_count: usize) -> Self {
        PixelBuffer {
            pixels: vec![Color::BLACK; led_count],
        }
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn get(&self, index: usize) -> Option<Color> {
        self.pixels.get(index).copied()
    }

    /// Set one pixel. An index past the end leaves the buffer untouched.
    pub fn set(&mut self, index: usize, color: Color) -> Result<()> {
        let len = self.pixels.len();
        match self.pixels.get_mut(index) {
            Some(slot) => {
                *slot = color;
                Ok(())
            }
            None => Err(Error::IndexOutOfRange { index, len }),
        }
    }

    pub fn fill(&mut self, color: Color) {
        self.pixels.fill(color);
    }

    pub fn clear_all(&mut self) {
        self.fill(Color::BLACK);
    }

    /// Encode every pixel into the frame's data region in GRB order.
    ///
    /// The padding region is left alone.
    pub fn serialize_into(&self, frame: &mut TransportFrame) {
        debug_assert_eq!(frame.layout().led_count(), self.pixels.len());

        let data = frame.data_mut();
        for (color, slot) in self.pixels.iter().zip(data.chunks_exact_mut(BYTES_PER_PIXEL)) {
            for (channel, out) in color
                .to_grb()
                .into_iter()
                .zip(slot.chunks_exact_mut(ENCODED_CHANNEL_BYTES))
            {
                out.copy_from_slice(&encode_channel(channel));
            }
        }
    }
}
