//! Fire-and-forget feedback for typing events.
//!
//! A terminal has no tone generator, so cues are a bell for the events that
//! matter and a short flash the UI draws around the prompt.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;
use std::time::{Duration, Instant};

use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum Cue {
    Correct,
    Error,
    LevelUp,
}

pub trait CueSink {
    /// Must not fail or block; playback problems are swallowed.
    fn play(&mut self, cue: Cue);
}

/// Plays nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCues;

impl CueSink for NullCues {
    fn play(&mut self, _cue: Cue) {}
}

/// Rings the terminal bell on errors and level-ups.
#[derive(Debug)]
pub struct TerminalBell<W: Write> {
    out: W,
}

impl<W: Write> TerminalBell<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl TerminalBell<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> CueSink for TerminalBell<W> {
    fn play(&mut self, cue: Cue) {
        let rings = match cue {
            Cue::Correct => 0,
            Cue::Error => 1,
            Cue::LevelUp => 2,
        };
        for _ in 0..rings {
            if let Err(err) = self.out.write_all(b"\x07") {
                debug!("bell failed: {err}");
                return;
            }
        }
        let _ = self.out.flush();
    }
}

/// Remembers every cue; clones share the log.
#[derive(Debug, Clone, Default)]
pub struct RecordingCues {
    played: Rc<RefCell<Vec<Cue>>>,
}

impl RecordingCues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> Vec<Cue> {
        self.played.borrow().clone()
    }

    pub fn count(&self, cue: Cue) -> usize {
        self.played.borrow().iter().filter(|c| **c == cue).count()
    }
}

impl CueSink for RecordingCues {
    fn play(&mut self, cue: Cue) {
        self.played.borrow_mut().push(cue);
    }
}

pub const FLASH_MS: u64 = 180;

/// The visual half of a cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flash {
    pub cue: Cue,
    pub started: Instant,
}

impl Flash {
    pub fn new(cue: Cue, started: Instant) -> Self {
        Self { cue, started }
    }

    pub fn is_active(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started) < Duration::from_millis(FLASH_MS)
    }
}
