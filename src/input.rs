//! Terminal input on background threads.
//!
//! Readers never touch the strip. They hand what they read to the thread
//! that owns the session through a bounded channel.

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const QUEUE_DEPTH: usize = 16;

/// Puts the terminal in raw mode until dropped.
pub struct RawModeGuard;

impl RawModeGuard {
    pub fn enable() -> Result<Self> {
        terminal::enable_raw_mode().context("Failed to put terminal in raw mode")?;
        Ok(RawModeGuard)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            warn!("Failed to restore terminal: {}", e);
        }
    }
}

/// Map a key event to the character the controller understands.
///
/// Raw mode swallows SIGINT, so Ctrl-C arrives here and becomes `q`.
pub fn key_char(key: &KeyEvent) -> Option<char> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some('q'),
        KeyCode::Esc => Some('q'),
        KeyCode::Char(c) => Some(c.to_ascii_lowercase()),
        _ => None,
    }
}

/// Read key presses until `running` drops or the receiver goes away.
pub fn spawn_key_reader(running: Arc<AtomicBool>) -> Receiver<char> {
    let (sender, receiver) = mpsc::sync_channel(QUEUE_DEPTH);
    thread::spawn(move || {
        if let Err(e) = key_reader(&sender, &running) {
            warn!("Keyboard reader stopped: {}", e);
        }
        debug!("Keyboard reader exiting");
    });
    receiver
}

fn key_reader(sender: &SyncSender<char>, running: &AtomicBool) -> io::Result<()> {
    while running.load(Ordering::Relaxed) {
        if !event::poll(POLL_INTERVAL)? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if let Some(c) = key_char(&key) {
                if sender.send(c).is_err() {
                    break;
                }
            }
        }
    }
    Ok(())
}

/// Deliver one message per line of stdin.
///
/// The thread blocks in `read_line`, so it is left behind at exit rather
/// than joined.
pub fn spawn_line_reader() -> Receiver<String> {
    let (sender, receiver) = mpsc::sync_channel(QUEUE_DEPTH);
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if sender.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("stdin read failed: {}", e);
                    break;
                }
            }
        }
    });
    receiver
}

/// Block for the next message, giving up once `running` is cleared or the
/// sender hangs up.
pub fn wait_for<T>(receiver: &Receiver<T>, running: &AtomicBool) -> Option<T> {
    while running.load(Ordering::Relaxed) {
        match receiver.recv_timeout(POLL_INTERVAL) {
            Ok(value) => return Some(value),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return None,
        }
    }
    None
}

/// Sleep until `running` is cleared.
pub fn wait_for_shutdown(running: &AtomicBool) {
    while running.load(Ordering::Relaxed) {
        thread::sleep(POLL_INTERVAL);
    }
}

/// Print without a newline and flush, for prompts and status lines.
pub fn prompt(text: &str) {
    let mut stdout = io::stdout();
    let _ = write!(stdout, "{}", text);
    let _ = stdout.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_key_char() {
        assert_eq!(key_char(&press(KeyCode::Char('a'), KeyModifiers::NONE)), Some('a'));
        assert_eq!(key_char(&press(KeyCode::Char('W'), KeyModifiers::SHIFT)), Some('w'));
        assert_eq!(key_char(&press(KeyCode::Char('c'), KeyModifiers::CONTROL)), Some('q'));
        assert_eq!(key_char(&press(KeyCode::Esc, KeyModifiers::NONE)), Some('q'));
        assert_eq!(key_char(&press(KeyCode::Up, KeyModifiers::NONE)), None);
    }

    #[test]
    fn test_key_release_ignored() {
        let mut key = press(KeyCode::Char('a'), KeyModifiers::NONE);
        key.kind = KeyEventKind::Release;
        assert_eq!(key_char(&key), None);
    }

    #[test]
    fn test_wait_for_delivers_then_reports_hangup() {
        let running = AtomicBool::new(true);
        let (sender, receiver) = mpsc::sync_channel(2);
        sender.send(7).unwrap();
        drop(sender);
        assert_eq!(wait_for(&receiver, &running), Some(7));
        assert_eq!(wait_for(&receiver, &running), None);
    }

    #[test]
    fn test_wait_for_stops_when_not_running() {
        let running = AtomicBool::new(false);
        let (_sender, receiver) = mpsc::sync_channel::<u8>(1);
        assert_eq!(wait_for(&receiver, &running), None);
    }
}
