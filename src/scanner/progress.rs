//! Stderr progress reporting for scans.

use std::io::{self, IsTerminal, Write};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Carriage return plus erase-line, so each update overwrites the last.
const CLEAR_LINE: &str = "\r\x1b[2K";

/// Rate-limits progress writes to stderr and suppresses them entirely when
/// stderr is not a terminal.
pub struct ProgressThrottle {
    last_update: Mutex<Option<Instant>>,
    interval: Duration,
    is_tty: bool,
}

impl ProgressThrottle {
    pub fn new(interval: Duration) -> Self {
        Self::with_tty(interval, io::stderr().is_terminal())
    }

    fn with_tty(interval: Duration, is_tty: bool) -> Self {
        Self {
            last_update: Mutex::new(None),
            interval,
            is_tty,
        }
    }

    /// True when enough time has passed since the last accepted update.
    /// Always false when stderr is not a terminal.
    pub fn should_update(&self) -> bool {
        if !self.is_tty {
            return false;
        }
        let mut last = self.last_update.lock().unwrap();
        match *last {
            Some(at) if at.elapsed() < self.interval => false,
            _ => {
                *last = Some(Instant::now());
                true
            }
        }
    }

    /// Overwrite the current progress line with `text`.
    pub fn write_line(&self, text: &str) {
        if !self.is_tty {
            return;
        }
        let mut stderr = io::stderr();
        let _ = stderr.write_all(CLEAR_LINE.as_bytes());
        let _ = stderr.write_all(text.as_bytes());
        let _ = stderr.flush();
    }

    /// Erase the progress line before final output.
    pub fn clear_line(&self) {
        if self.is_tty {
            let mut stderr = io::stderr();
            let _ = stderr.write_all(CLEAR_LINE.as_bytes());
            let _ = stderr.flush();
        }
    }
}
