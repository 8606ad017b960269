//! Keyboard-driven single-LED controller.
//!
//! Keeps track of which LED is selected and its color, and turns key
//! presses into session commands. One LED is lit at a time.

use crate::pixel_format::Color;
use crate::session::Command;

pub const COLOR_STEP: u8 = 16;
pub const INTENSITY_STEP: u8 = 20;
pub const DEFAULT_COLOR: Color = Color::from_rgb24(0x8F8F8F);

pub const HELP: &str = "\
--- Interactive LED Controller ---
Controls:
  [a/s]: next/previous LED (circular)
  [d/f]: +/- intensity
  [e/r/t]: make color more Red/Green/Blue
  [w]: Set color to White
  [q]: Close program
----------------------------------";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// State changed; send the new frame.
    Update,
    /// Key had no effect.
    Ignored,
    Quit,
}

#[derive(Debug, Clone)]
pub struct Controller {
    led_count: usize,
    index: usize,
    color: Color,
    lit: Option<usize>,
}

impl Controller {
    pub fn new(led_count: usize) -> Self {
        Controller {
            led_count: led_count.max(1),
            index: 0,
            color: DEFAULT_COLOR,
            lit: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn handle_key(&mut self, key: char) -> Action {
        let c = self.color;
        match key {
            'q' => return Action::Quit,
            'a' => self.index = (self.index + 1) % self.led_count,
            's' => self.index = (self.index + self.led_count - 1) % self.led_count,
            'e' => self.color = shift_toward(c, Channel::Red),
            'r' => self.color = shift_toward(c, Channel::Green),
            't' => self.color = shift_toward(c, Channel::Blue),
            'w' => self.color = DEFAULT_COLOR,
            'd' => self.color = brighten(c),
            'f' => self.color = dim(c),
            _ => return Action::Ignored,
        }
        Action::Update
    }

    /// Commands that put the current selection on the strip.
    pub fn frame_commands(&mut self) -> Vec<Command> {
        let mut commands = Vec::with_capacity(3);
        if let Some(previous) = self.lit.filter(|&i| i != self.index) {
            commands.push(Command::Set {
                index: previous,
                color: Color::BLACK,
            });
        }
        commands.push(Command::Set {
            index: self.index,
            color: self.color,
        });
        commands.push(Command::Show);
        self.lit = Some(self.index);
        commands
    }

    pub fn status_line(&self) -> String {
        format!(
            "LED: {:03}/{:03} | Color: {}",
            self.index + 1,
            self.led_count,
            self.color
        )
    }
}

#[derive(Debug, Clone, Copy)]
enum Channel {
    Red,
    Green,
    Blue,
}

/// Raise one channel by a full step and lower the other two by half.
fn shift_toward(c: Color, channel: Channel) -> Color {
    let up = |v: u8| v.saturating_add(COLOR_STEP);
    let down = |v: u8| v.saturating_sub(COLOR_STEP / 2);
    match channel {
        Channel::Red => Color::new(up(c.r), down(c.g), down(c.b)),
        Channel::Green => Color::new(down(c.r), up(c.g), down(c.b)),
        Channel::Blue => Color::new(down(c.r), down(c.g), up(c.b)),
    }
}

fn scale(c: Color, from_max: u8, to_max: u8) -> Color {
    let factor = f64::from(to_max) / f64::from(from_max);
    let apply = |v: u8| (f64::from(v) * factor).round().clamp(0.0, 255.0) as u8;
    Color::new(apply(c.r), apply(c.g), apply(c.b))
}

/// Step the brightest channel up, keeping the ratio between channels.
fn brighten(c: Color) -> Color {
    let max = c.max_channel();
    if max == 0 {
        return Color::new(INTENSITY_STEP, INTENSITY_STEP, INTENSITY_STEP);
    }
    let target = max.saturating_add(INTENSITY_STEP);
    if target == max {
        return c;
    }
    scale(c, max, target)
}

/// Step the brightest channel down, keeping the ratio between channels.
fn dim(c: Color) -> Color {
    let max = c.max_channel();
    if max == 0 {
        return c;
    }
    scale(c, max, max.saturating_sub(INTENSITY_STEP))
}
