//! Error types for driving the strip.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the strip.
#[derive(Error, Debug)]
pub enum Error {
    /// The bus could not be opened or configured.
    #[error("SPI device {path} unavailable: {source}")]
    DeviceUnavailable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A frame write failed outright.
    #[error("frame transmission failed: {0}")]
    TransmissionFailure(#[source] std::io::Error),

    /// The bus accepted only part of the frame.
    #[error("frame transmission failed: wrote {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    /// Pixel index outside the strip.
    #[error("pixel index {index} out of range (strip has {len} LEDs)")]
    IndexOutOfRange { index: usize, len: usize },

    /// Operation attempted after the session was closed.
    #[error("session is closed")]
    SessionClosed,

    /// Configuration rejected by validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// True for both kinds of failed frame write.
    pub fn is_transmission(&self) -> bool {
        matches!(self, Error::TransmissionFailure(_) | Error::ShortWrite { .. })
    }
}
