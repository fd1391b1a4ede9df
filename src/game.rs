//! Screen state machine and the per-keystroke game loop.

use std::time::Instant;

use chrono::Local;
use log::{debug, info, warn};

use crate::config::Config;
use crate::cues::{Cue, CueSink, Flash};
use crate::history::{CommandOutcome, CommandSummary, HistoryDb, RunRecord};
use crate::pack::{CommandEntry, CommandPack, CommandQueue, PackLoad};
use crate::profile::{PackStats, ScoreRecord, ScoreStore};
use crate::scoring::{CommandResult, ScoreBreakdown, ScoringConfig, ScoringSession, DEFAULT_TOTAL_SECONDS};
use crate::session::{SessionStats, WpmSample};
use crate::timer::{Clock, RunTimer};
use crate::typing::{self, count_command_errors, format_accuracy, format_wpm, TypingEvaluation};
use crate::util;

pub const TUTORIAL_SECONDS: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Screen {
    Loading,
    Start,
    Play,
    Results,
    Tutorial,
    TutorialSummary,
    CommandStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Scored,
    Tutorial,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameSettings {
    pub run_seconds: f64,
    pub mode_id: String,
    /// A level-up cue plays every this many completed commands; 0 disables it.
    pub level_up_every: u32,
    pub scoring: ScoringConfig,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for GameSettings {
    fn from(cfg: &Config) -> Self {
        let run_seconds = if cfg.run_seconds == 0 {
            DEFAULT_TOTAL_SECONDS
        } else {
            cfg.run_seconds as f64
        };
        Self {
            run_seconds,
            mode_id: cfg.mode_id.clone(),
            level_up_every: cfg.level_up_every,
            scoring: cfg.scoring,
        }
    }
}

/// Everything the results screen shows about a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub pack_id: String,
    pub score: ScoreBreakdown,
    pub high_score: u64,
    pub new_high_score: bool,
    pub accuracy: u32,
    pub wpm: u32,
    pub completed_commands: u32,
    pub errors: u32,
    pub hints: u32,
    pub elapsed_seconds: f64,
    pub pack_stats: Option<PackStats>,
    /// 0-100, from the spread of per-command durations.
    pub consistency: Option<f64>,
    pub samples: Vec<WpmSample>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TutorialResult {
    pub completed_steps: usize,
    pub total_steps: usize,
    pub accuracy: u32,
    pub wpm: u32,
    pub elapsed_seconds: f64,
}

/// State of the run in progress.
#[derive(Debug)]
struct RunState {
    kind: RunKind,
    pack: CommandPack,
    queue: CommandQueue,
    current: usize,
    duration: f64,
    timer: RunTimer,
    paused: bool,
    scoring: ScoringSession,
    stats: SessionStats,
    input: String,
    last_input_len: usize,
    command_typed: usize,
    command_hinted: usize,
    command_started_at: f64,
    error_active: bool,
    samples: Vec<WpmSample>,
    outcomes: Vec<CommandOutcome>,
    durations: Vec<f64>,
}

impl RunState {
    fn current_command(&self) -> &CommandEntry {
        &self.pack.commands[self.current]
    }

    fn evaluate(&self) -> TypingEvaluation {
        typing::evaluate(self.current_command().candidates(), &self.input)
    }

    /// Advance to the next command. `false` when the pack has nothing to draw.
    fn draw_next(&mut self, now: Instant) -> bool {
        let Some(next) = self.queue.draw() else {
            return false;
        };
        self.current = next;
        self.input.clear();
        self.last_input_len = 0;
        self.command_typed = 0;
        self.command_hinted = 0;
        self.error_active = false;
        self.command_started_at = self.timer.elapsed_secs(now);
        true
    }

    fn complete_current(&mut self, variant: &str, now: Instant) {
        let length = variant.chars().count();
        let elapsed = self.timer.elapsed_secs(now);
        let duration = (elapsed - self.command_started_at).max(0.0);
        // Hinted characters were not typed, so they earn nothing.
        let earned = length.saturating_sub(self.command_hinted);
        let errors = count_command_errors(self.command_typed, earned);
        let entry = &self.pack.commands[self.current];

        self.scoring.add_command(&CommandResult {
            completed: true,
            errors,
            duration_seconds: duration,
            multiplier: entry.points_multiplier,
        });
        self.outcomes.push(CommandOutcome {
            command_id: entry.id.clone(),
            command: entry.command.clone(),
            errors,
            duration_ms: (duration * 1000.0).round() as u64,
        });
        self.durations.push(duration);

        self.stats.correct_chars += earned;
        self.stats.elapsed_seconds += duration;
        self.stats.completed_commands += 1;
        self.stats.errors = self.stats.errors.saturating_add(errors);
        self.samples.push(WpmSample::new(
            elapsed,
            f64::from(format_wpm(self.stats.correct_chars, elapsed)),
        ));
    }
}

/// Owns the game state and reacts to player actions and clock ticks.
pub struct Game {
    settings: GameSettings,
    store: Box<dyn ScoreStore>,
    cues: Box<dyn CueSink>,
    clock: Box<dyn Clock>,
    history: Option<HistoryDb>,
    queue_seed: Option<u64>,
    screen: Screen,
    pack: Option<CommandPack>,
    pack_fell_back: bool,
    run: Option<RunState>,
    last_result: Option<RunResult>,
    tutorial_result: Option<TutorialResult>,
    command_stats: Vec<CommandSummary>,
    flash: Option<Flash>,
}

impl Game {
    pub fn new(
        settings: GameSettings,
        store: Box<dyn ScoreStore>,
        cues: Box<dyn CueSink>,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            settings,
            store,
            cues,
            clock,
            history: None,
            queue_seed: None,
            screen: Screen::Loading,
            pack: None,
            pack_fell_back: false,
            run: None,
            last_result: None,
            tutorial_result: None,
            command_stats: Vec::new(),
            flash: None,
        }
    }

    pub fn with_history(mut self, history: Option<HistoryDb>) -> Self {
        self.history = history;
        self
    }

    /// Draw commands in a reproducible order.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.queue_seed = Some(seed);
        self
    }

    pub fn on_pack_loaded(&mut self, load: PackLoad) {
        info!(
            "pack `{}` ready with {} commands{}",
            load.pack.pack_id,
            load.pack.len(),
            if load.fell_back { " (fallback)" } else { "" }
        );
        if !load.fell_back {
            self.store.set_last_pack_id(&load.pack.pack_id);
        }
        self.pack_fell_back = load.fell_back;
        self.pack = Some(load.pack);
        if self.screen == Screen::Loading {
            self.show_start();
        }
    }

    /// Go to the start screen, dropping any run in progress.
    pub fn show_start(&mut self) {
        if self.pack.is_none() {
            return;
        }
        self.run = None;
        self.screen = Screen::Start;
    }

    fn queue_for(&self, kind: RunKind, len: usize) -> CommandQueue {
        match (kind, self.queue_seed) {
            (RunKind::Tutorial, _) => CommandQueue::sequential(len),
            (RunKind::Scored, Some(seed)) => CommandQueue::seeded(len, seed),
            (RunKind::Scored, None) => CommandQueue::shuffled(len),
        }
    }

    fn begin(&mut self, kind: RunKind, pack: CommandPack, duration: f64) -> bool {
        let now = self.clock.now();
        let mut timer = RunTimer::new();
        timer.start(now);

        let mut run = RunState {
            kind,
            queue: self.queue_for(kind, pack.len()),
            pack,
            current: 0,
            duration,
            timer,
            paused: false,
            scoring: ScoringSession::new(self.settings.scoring),
            stats: SessionStats::default(),
            input: String::new(),
            last_input_len: 0,
            command_typed: 0,
            command_hinted: 0,
            command_started_at: 0.0,
            error_active: false,
            samples: Vec::new(),
            outcomes: Vec::new(),
            durations: Vec::new(),
        };
        if !run.draw_next(now) {
            warn!("pack `{}` has no commands, not starting", run.pack.pack_id);
            return false;
        }

        debug!("starting {kind:?} run on `{}` for {duration}s", run.pack.pack_id);
        self.run = Some(run);
        self.flash = None;
        true
    }

    /// Start a scored run on the loaded pack.
    pub fn start_run(&mut self) -> bool {
        let Some(pack) = self.pack.clone() else {
            return false;
        };
        if !self.begin(RunKind::Scored, pack, self.settings.run_seconds) {
            return false;
        }
        self.last_result = None;
        self.screen = Screen::Play;
        true
    }

    pub fn start_tutorial(&mut self) -> bool {
        if !self.begin(RunKind::Tutorial, CommandPack::tutorial(), TUTORIAL_SECONDS) {
            return false;
        }
        self.tutorial_result = None;
        self.screen = Screen::Tutorial;
        true
    }

    /// Leave the tutorial without marking it completed.
    pub fn skip_tutorial(&mut self) {
        if self.screen == Screen::Tutorial || self.screen == Screen::TutorialSummary {
            self.run = None;
            self.show_start();
        }
    }

    /// Quit a scored run without recording it.
    pub fn abandon_run(&mut self) {
        if self.screen == Screen::Play {
            info!("run abandoned");
            self.show_start();
        }
    }

    pub fn restart(&mut self) -> bool {
        self.start_run()
    }

    pub fn back_to_start(&mut self) {
        self.show_start();
    }

    pub fn show_command_stats(&mut self) {
        if self.screen != Screen::Results {
            return;
        }
        self.command_stats = match &self.history {
            Some(history) => history.command_summary().unwrap_or_else(|err| {
                warn!("could not load command stats: {err}");
                Vec::new()
            }),
            None => Vec::new(),
        };
        self.screen = Screen::CommandStats;
    }

    pub fn close_command_stats(&mut self) {
        if self.screen == Screen::CommandStats {
            self.screen = Screen::Results;
        }
    }

    /// Replace the typed text with `raw`, as an input field would.
    pub fn handle_input(&mut self, raw: &str) {
        self.apply_input(raw.trim_start().to_string(), true);
    }

    pub fn type_char(&mut self, c: char) {
        let Some(run) = &self.run else {
            return;
        };
        let mut value = run.input.clone();
        value.push(c);
        self.handle_input(&value);
    }

    pub fn backspace(&mut self) {
        let Some(run) = &self.run else {
            return;
        };
        let mut value = run.input.clone();
        value.pop();
        self.handle_input(&value);
    }

    pub fn clear_input(&mut self) {
        self.handle_input("");
    }

    /// Type the next expected character for the player, fixing any mistake
    /// first. Costs a hint in scored runs.
    pub fn use_hint(&mut self) -> bool {
        if self.expire_if_due() {
            return false;
        }
        let Some(run) = self.run.as_mut() else {
            return false;
        };
        let target = typing::resolve_target(run.current_command().candidates(), &run.input);
        let matched = typing::prefix_score(target, &run.input);
        let Some(next) = target.chars().nth(matched) else {
            return false;
        };
        let mut value: String = target.chars().take(matched).collect();
        value.push(next);

        run.stats.hints += 1;
        run.command_hinted += 1;
        if run.kind == RunKind::Scored {
            run.scoring.register_hint(1);
        }
        debug!("hint used: `{next}`");
        self.apply_input(value, false);
        true
    }

    /// Evaluate new input. Only growth of a `counted` input counts as keystrokes.
    fn apply_input(&mut self, value: String, counted: bool) {
        if self.expire_if_due() {
            return;
        }
        let now = self.clock.now();
        let level_up_every = self.settings.level_up_every;
        let Some(run) = self.run.as_mut() else {
            return;
        };
        if run.paused {
            run.timer.resume(now);
            run.paused = false;
        }

        let len = value.chars().count();
        if counted {
            let diff = len.saturating_sub(run.last_input_len);
            run.stats.total_typed += diff;
            run.command_typed += diff;
        }
        run.last_input_len = len;
        run.input = value;

        let evaluation = run.evaluate();
        let mut cues = Vec::new();
        let has_error = evaluation.has_error(&run.input);
        if has_error && !run.error_active {
            run.error_active = true;
            cues.push(Cue::Error);
        } else if !has_error {
            run.error_active = false;
        }

        let mut tutorial_done = false;
        if let Some(variant) = evaluation.completed_variant {
            run.complete_current(&variant, now);
            cues.push(Cue::Correct);
            let completed = run.stats.completed_commands;
            match run.kind {
                RunKind::Scored => {
                    if level_up_every > 0 && completed % level_up_every == 0 {
                        cues.push(Cue::LevelUp);
                    }
                    run.draw_next(now);
                }
                RunKind::Tutorial => {
                    if completed as usize >= run.pack.len() {
                        tutorial_done = true;
                    } else {
                        run.draw_next(now);
                    }
                }
            }
        }

        for cue in cues {
            self.cue(cue, now);
        }
        if tutorial_done {
            self.complete_tutorial();
        }
    }

    fn cue(&mut self, cue: Cue, now: Instant) {
        self.flash = Some(Flash::new(cue, now));
        if self.effects_enabled() {
            self.cues.play(cue);
        }
    }

    /// Advance the clock: ends the run once its time is up.
    pub fn on_tick(&mut self) {
        let now = self.clock.now();
        if self.flash.is_some_and(|f| !f.is_active(now)) {
            self.flash = None;
        }
        self.expire_if_due();
    }

    /// Finish the run if its time is up. Returns `true` when it ended.
    fn expire_if_due(&mut self) -> bool {
        let now = self.clock.now();
        let Some(kind) = self
            .run
            .as_ref()
            .filter(|r| r.timer.elapsed_secs(now) >= r.duration)
            .map(|r| r.kind)
        else {
            return false;
        };
        match kind {
            RunKind::Scored => {
                self.finish_run();
            }
            RunKind::Tutorial => {
                self.complete_tutorial();
            }
        }
        true
    }

    /// Focus lost: stop the clock until [`Game::resume`].
    pub fn pause(&mut self) {
        let now = self.clock.now();
        if let Some(run) = self.run.as_mut() {
            if !run.paused {
                run.timer.pause(now);
                run.paused = true;
                debug!("run paused at {:.1}s", run.timer.elapsed_secs(now));
            }
        }
    }

    pub fn resume(&mut self) {
        let now = self.clock.now();
        if let Some(run) = self.run.as_mut() {
            if run.paused {
                run.timer.resume(now);
                run.paused = false;
                debug!("run resumed");
            }
        }
    }

    /// End the scored run, record it and show the results.
    pub fn finish_run(&mut self) -> Option<&RunResult> {
        if self.run.as_ref().map(|r| r.kind) != Some(RunKind::Scored) {
            return None;
        }
        let now = self.clock.now();
        let mut run = self.run.take()?;
        run.timer.pause(now);

        let elapsed = run.timer.elapsed_secs(now).min(run.duration);
        let score = run.scoring.finalise(Some(run.duration));
        let previous_high = self.store.high_score(&self.settings.mode_id);
        let outcome = self.store.record_score(&ScoreRecord {
            mode_id: self.settings.mode_id.clone(),
            score: score.total,
            pack_id: Some(run.pack.pack_id.clone()),
            completed: true,
        });

        let result = RunResult {
            pack_id: run.pack.pack_id.clone(),
            high_score: outcome.high_score,
            new_high_score: score.total > previous_high,
            accuracy: format_accuracy(run.stats.correct_chars, run.stats.total_typed),
            wpm: format_wpm(run.stats.correct_chars, elapsed),
            completed_commands: run.stats.completed_commands,
            errors: run.stats.errors,
            hints: run.stats.hints,
            elapsed_seconds: elapsed,
            pack_stats: outcome.pack,
            consistency: util::consistency(&run.durations),
            samples: std::mem::take(&mut run.samples),
            score,
        };
        info!(
            "run finished: score {} ({} commands, {}% accuracy)",
            result.score.total, result.completed_commands, result.accuracy
        );

        if let Some(history) = self.history.as_mut() {
            let record = RunRecord {
                finished_at: Local::now(),
                pack_id: result.pack_id.clone(),
                mode_id: self.settings.mode_id.clone(),
                score: result.score.total,
                completed_commands: result.completed_commands,
                errors: result.errors,
                hints: result.hints,
                accuracy: result.accuracy,
                wpm: result.wpm,
                elapsed_seconds: result.elapsed_seconds,
            };
            if let Err(err) = history.record_run(&record, &run.outcomes) {
                warn!("could not save run history: {err}");
            }
        }

        self.screen = Screen::Results;
        self.last_result = Some(result);
        self.last_result.as_ref()
    }

    /// End the tutorial (all steps done or time up) and show the summary.
    pub fn complete_tutorial(&mut self) -> Option<TutorialResult> {
        if self.run.as_ref().map(|r| r.kind) != Some(RunKind::Tutorial) {
            return None;
        }
        let now = self.clock.now();
        let mut run = self.run.take()?;
        run.timer.pause(now);

        let elapsed = run.timer.elapsed_secs(now).min(run.duration);
        let result = TutorialResult {
            completed_steps: run.stats.completed_commands as usize,
            total_steps: run.pack.len(),
            accuracy: format_accuracy(run.stats.correct_chars, run.stats.total_typed),
            wpm: format_wpm(run.stats.correct_chars, elapsed.max(1.0)),
            elapsed_seconds: elapsed,
        };

        self.store.mark_tutorial_completed();
        self.cue(Cue::LevelUp, now);
        self.tutorial_result = Some(result);
        self.screen = Screen::TutorialSummary;
        Some(result)
    }

    pub fn toggle_effects(&mut self) -> bool {
        let enabled = !self.effects_enabled();
        self.store.set_effects_enabled(enabled)
    }

    pub fn toggle_music(&mut self) -> bool {
        let enabled = !self.music_enabled();
        self.store.set_music_enabled(enabled)
    }

    /// Turn all audio off, or back on if any of it is off.
    pub fn toggle_mute(&mut self) -> bool {
        let enabled = !self.store.audio_enabled();
        self.store.set_audio_enabled(enabled)
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn pack(&self) -> Option<&CommandPack> {
        self.pack.as_ref()
    }

    pub fn pack_fell_back(&self) -> bool {
        self.pack_fell_back
    }

    pub fn run_kind(&self) -> Option<RunKind> {
        self.run.as_ref().map(|r| r.kind)
    }

    pub fn current_command(&self) -> Option<&CommandEntry> {
        self.run.as_ref().map(RunState::current_command)
    }

    pub fn input(&self) -> &str {
        self.run.as_ref().map_or("", |r| r.input.as_str())
    }

    pub fn evaluation(&self) -> Option<TypingEvaluation> {
        self.run.as_ref().map(RunState::evaluate)
    }

    pub fn has_error(&self) -> bool {
        self.run.as_ref().is_some_and(|r| r.error_active)
    }

    pub fn stats(&self) -> Option<&SessionStats> {
        self.run.as_ref().map(|r| &r.stats)
    }

    pub fn samples(&self) -> &[WpmSample] {
        self.run.as_ref().map_or(&[], |r| r.samples.as_slice())
    }

    pub fn elapsed_seconds(&self) -> f64 {
        let now = self.clock.now();
        self.run.as_ref().map_or(0.0, |r| r.timer.elapsed_secs(now))
    }

    pub fn remaining_seconds(&self) -> f64 {
        let now = self.clock.now();
        self.run.as_ref().map_or(0.0, |r| {
            (r.duration - r.timer.elapsed_secs(now)).clamp(0.0, r.duration)
        })
    }

    pub fn live_wpm(&self) -> u32 {
        self.stats()
            .map_or(0, |s| s.wpm(self.elapsed_seconds()))
    }

    pub fn is_paused(&self) -> bool {
        self.run.as_ref().is_some_and(|r| r.paused)
    }

    /// (1-based step, total steps) while the tutorial runs.
    pub fn tutorial_step(&self) -> Option<(usize, usize)> {
        let run = self.run.as_ref().filter(|r| r.kind == RunKind::Tutorial)?;
        Some((run.stats.completed_commands as usize + 1, run.pack.len()))
    }

    pub fn last_result(&self) -> Option<&RunResult> {
        self.last_result.as_ref()
    }

    pub fn tutorial_result(&self) -> Option<&TutorialResult> {
        self.tutorial_result.as_ref()
    }

    pub fn command_stats(&self) -> &[CommandSummary] {
        &self.command_stats
    }

    pub fn high_score(&self) -> u64 {
        self.store.high_score(&self.settings.mode_id)
    }

    pub fn pack_stats(&self) -> Option<PackStats> {
        self.pack
            .as_ref()
            .and_then(|p| self.store.pack_stats(&p.pack_id))
    }

    pub fn tutorial_completed(&self) -> bool {
        self.store.tutorial_completed()
    }

    pub fn effects_enabled(&self) -> bool {
        self.store.audio_prefs().effects_enabled
    }

    pub fn music_enabled(&self) -> bool {
        self.store.audio_prefs().music_enabled
    }

    /// The cue to flash, if one fired recently.
    pub fn flash(&self) -> Option<Cue> {
        let now = self.clock.now();
        self.flash.filter(|f| f.is_active(now)).map(|f| f.cue)
    }
}
