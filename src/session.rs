//! The one object that owns a strip while it is in use.

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::frame::FrameLayout;
use crate::pixel_buffer::PixelBuffer;
use crate::pixel_format::Color;
use crate::transport::{check_transfer_size, Bus, FrameTransport, SpiBus};

/// A request for the session, from whatever is producing input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Set { index: usize, color: Color },
    Show,
    Clear,
}

struct Open<B: Bus> {
    pixels: PixelBuffer,
    transport: FrameTransport<B>,
}

/// Pixel buffer plus transport for one strip.
///
/// The session is open from construction until [`close`](Self::close) (or
/// drop), which blanks the strip and releases the bus.
pub struct DeviceSession<B: Bus> {
    state: Option<Open<B>>,
}

impl DeviceSession<SpiBus> {
    /// Open the configured SPI device and blank the strip.
    pub fn open(config: &Config) -> Result<Self> {
        config.validate()?;
        let layout = config.layout();
        check_transfer_size(&layout)?;
        let bus = SpiBus::open(&config.device, config.clock_hz)?;
        Self::with_bus(bus, layout)
    }
}

impl<B: Bus> DeviceSession<B> {
    /// Start a session on an already configured bus.
    ///
    /// The strip is blanked straight away so it does not show whatever the
    /// last process left on it. If that blank fails the bus is dropped
    /// without a second attempt.
    pub fn with_bus(bus: B, layout: FrameLayout) -> Result<Self> {
        let mut state = Open {
            pixels: PixelBuffer::new(layout.led_count()),
            transport: FrameTransport::new(bus, layout),
        };
        state.transport.blank_and_render()?;

        info!(
            "Session open: {} LEDs, {} byte frames ({} bytes reset padding)",
            layout.led_count(),
            layout.frame_bytes(),
            layout.padding_bytes()
        );
        Ok(DeviceSession { state: Some(state) })
    }

    fn open_state(&mut self) -> Result<&mut Open<B>> {
        self.state.as_mut().ok_or(Error::SessionClosed)
    }

    #[cfg(test)]
    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    pub fn led_count(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.pixels.len())
    }

    /// Color held in memory for one pixel, shown or not.
    pub fn pixel(&self, index: usize) -> Option<Color> {
        self.state.as_ref()?.pixels.get(index)
    }

    /// Change one pixel in memory; nothing is sent until [`show`](Self::show).
    ///
    /// A bad index is logged and ignored. Only a closed session is an error.
    pub fn set_pixel(&mut self, index: usize, color: Color) -> Result<()> {
        let state = self.open_state()?;
        if let Err(e) = state.pixels.set(index, color) {
            warn!("Ignoring set_pixel: {}", e);
        }
        Ok(())
    }

    /// Set every pixel to `color` in memory.
    pub fn fill(&mut self, color: Color) -> Result<()> {
        self.open_state()?.pixels.fill(color);
        Ok(())
    }

    /// Re-encode every pixel and send the frame.
    ///
    /// On failure the pixel buffer is untouched, so calling `show` again
    /// resends the same picture.
    pub fn show(&mut self) -> Result<()> {
        let state = self.open_state()?;
        state.pixels.serialize_into(state.transport.frame_mut());
        state.transport.render()
    }

    /// Turn every pixel off and send.
    pub fn clear(&mut self) -> Result<()> {
        let state = self.open_state()?;
        state.pixels.clear_all();
        state.transport.blank_and_render()
    }

    pub fn apply(&mut self, command: Command) -> Result<()> {
        debug!("Applying {:?}", command);
        match command {
            Command::Set { index, color } => self.set_pixel(index, color),
            Command::Show => self.show(),
            Command::Clear => self.clear(),
        }
    }

    /// Blank the strip and release the bus.
    ///
    /// A failed blank is logged and teardown carries on. Returns the bus,
    /// or `None` if the session was already closed.
    pub fn close(&mut self) -> Option<B> {
        let mut state = self.state.take()?;
        match state.transport.blank_and_render() {
            Ok(()) => info!(
                "Strip blanked; session closed after {} frames",
                state.transport.frames_sent()
            ),
            Err(e) => warn!("Could not blank strip on close: {}", e),
        }
        Some(state.transport.into_bus())
    }
}

impl<B: Bus> Drop for DeviceSession<B> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{encode_channel, ENCODED_ZERO};
    use crate::transport::testing::{FailingBus, RecordingBus};

    const PADDING: usize = 6;

    fn session(leds: usize) -> (DeviceSession<RecordingBus>, RecordingBus) {
        let bus = RecordingBus::default();
        let session =
            DeviceSession::with_bus(bus.clone(), FrameLayout::with_padding(leds, PADDING)).unwrap();
        (session, bus)
    }

    fn zero_pixel() -> Vec<u8> {
        ENCODED_ZERO.repeat(3)
    }

    #[test]
    fn test_open_blanks_strip() {
        let (_session, bus) = session(2);
        let writes = bus.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(&writes[0][..18], [zero_pixel(), zero_pixel()].concat().as_slice());
    }

    #[test]
    fn test_single_red_pixel_scenario() {
        let (mut session, bus) = session(3);
        session.set_pixel(1, Color::new(255, 0, 0)).unwrap();
        session.show().unwrap();

        let mut expected = zero_pixel();
        expected.extend_from_slice(&[0x92, 0x49, 0x24, 0xDB, 0x6D, 0xB6, 0x92, 0x49, 0x24]);
        expected.extend(zero_pixel());
        expected.extend(std::iter::repeat(0u8).take(PADDING));

        assert_eq!(bus.last().unwrap(), expected);
    }

    #[test]
    fn test_show_sends_every_pixel_in_grb() {
        let (mut session, bus) = session(2);
        session.set_pixel(0, Color::new(1, 2, 3)).unwrap();
        session.show().unwrap();
        session.show().unwrap();

        let writes = bus.writes();
        assert_eq!(writes.len(), 3);
        assert_eq!(writes[1], writes[2]);

        let frame = &writes[2];
        assert_eq!(frame[0..3], encode_channel(2));
        assert_eq!(frame[3..6], encode_channel(1));
        assert_eq!(frame[6..9], encode_channel(3));
        assert_eq!(frame[9..18], zero_pixel()[..]);
    }

    #[test]
    fn test_out_of_range_is_ignored() {
        let (mut session, _bus) = session(3);
        session.set_pixel(0, Color::WHITE).unwrap();
        assert!(session.set_pixel(3, Color::new(1, 1, 1)).is_ok());
        assert!(session.set_pixel(usize::MAX, Color::new(1, 1, 1)).is_ok());
        assert_eq!(session.pixel(0), Some(Color::WHITE));
        assert_eq!(session.pixel(1), Some(Color::BLACK));
        assert_eq!(session.pixel(2), Some(Color::BLACK));
    }

    #[test]
    fn test_clear_sends_zero_pattern_and_padding() {
        let (mut session, bus) = session(3);
        session.fill(Color::WHITE).unwrap();
        session.show().unwrap();
        session.clear().unwrap();

        let sent = bus.last().unwrap();
        for chunk in sent[..27].chunks(3) {
            assert_eq!(chunk, ENCODED_ZERO);
        }
        assert_eq!(&sent[27..], &[0u8; PADDING]);
        assert_eq!(session.pixel(1), Some(Color::BLACK));
    }

    #[test]
    fn test_apply_commands() {
        let (mut session, bus) = session(2);
        session
            .apply(Command::Set {
                index: 1,
                color: Color::new(0, 0, 255),
            })
            .unwrap();
        session.apply(Command::Show).unwrap();
        assert_eq!(bus.last().unwrap()[15..18], encode_channel(255));

        session.apply(Command::Clear).unwrap();
        assert_eq!(session.pixel(1), Some(Color::BLACK));
        assert_eq!(bus.writes().len(), 3);
    }

    #[test]
    fn test_closed_session_rejects_operations() {
        let (mut session, bus) = session(2);
        assert!(session.close().is_some());
        assert!(!session.is_open());

        assert!(matches!(session.set_pixel(0, Color::WHITE), Err(Error::SessionClosed)));
        assert!(matches!(session.show(), Err(Error::SessionClosed)));
        assert!(matches!(session.clear(), Err(Error::SessionClosed)));
        assert!(session.close().is_none());

        // open blank + close blank
        assert_eq!(bus.writes().len(), 2);
    }

    #[test]
    fn test_close_blanks_lit_strip() {
        let (mut session, bus) = session(1);
        session.set_pixel(0, Color::WHITE).unwrap();
        session.show().unwrap();
        session.close();

        let sent = bus.last().unwrap();
        assert_eq!(&sent[..9], zero_pixel().as_slice());
    }

    #[test]
    fn test_drop_blanks_strip() {
        let bus = RecordingBus::default();
        {
            let mut session =
                DeviceSession::with_bus(bus.clone(), FrameLayout::with_padding(1, 0)).unwrap();
            session.set_pixel(0, Color::WHITE).unwrap();
            session.show().unwrap();
        }
        let writes = bus.writes();
        assert_eq!(writes.len(), 3);
        assert_eq!(writes[2], zero_pixel());
    }

    #[test]
    fn test_failed_open_blank_is_reported() {
        let result = DeviceSession::with_bus(FailingBus::Broken, FrameLayout::with_padding(1, 1));
        assert!(matches!(result, Err(Error::TransmissionFailure(_))));
    }

    #[test]
    fn test_failed_open_blanks_once() {
        let bus = RecordingBus::broken();
        let result = DeviceSession::with_bus(bus.clone(), FrameLayout::with_padding(2, 3));
        assert!(result.is_err());
        assert_eq!(bus.writes().len(), 1);
    }

    #[test]
    fn test_close_survives_failing_bus() {
        let mut session = DeviceSession {
            state: Some(Open {
                pixels: PixelBuffer::new(2),
                transport: FrameTransport::new(FailingBus::Short(1), FrameLayout::with_padding(2, 1)),
            }),
        };
        assert!(session.show().unwrap_err().is_transmission());
        session.set_pixel(0, Color::WHITE).unwrap();
        assert_eq!(session.pixel(0), Some(Color::WHITE));
        assert!(session.close().is_some());
        assert!(!session.is_open());
    }
}
