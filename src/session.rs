use crate::typing::{format_accuracy, format_wpm};

/// Running totals for one run. Reset when a run starts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStats {
    pub completed_commands: u32,
    /// Keystrokes that grew the input, right or wrong.
    pub total_typed: usize,
    /// Characters of completed commands.
    pub correct_chars: usize,
    pub errors: u32,
    pub elapsed_seconds: f64,
    pub hints: u32,
}

impl SessionStats {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn accuracy(&self) -> u32 {
        format_accuracy(self.correct_chars, self.total_typed)
    }

    pub fn wpm(&self, elapsed_seconds: f64) -> u32 {
        format_wpm(self.correct_chars, elapsed_seconds)
    }
}

/// Words per minute at a point in the run, taken each time a command completes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WpmSample {
    pub t: f64,
    pub wpm: f64,
}

impl WpmSample {
    pub fn new(t: f64, wpm: f64) -> Self {
        Self { t, wpm }
    }
}

impl From<WpmSample> for (f64, f64) {
    fn from(s: WpmSample) -> Self {
        (s.t, s.wpm)
    }
}
