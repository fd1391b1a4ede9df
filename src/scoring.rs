//! Turns a finished run into points.
//!
//! Every completed command earns base points, finishing early earns a time
//! bonus and mistakes (and hints, when tracked) cost points. Nothing here
//! fails: malformed numbers are normalised to safe defaults.

use serde::{Deserialize, Serialize};

/// Round length assumed when the caller does not say otherwise.
pub const DEFAULT_TOTAL_SECONDS: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeBonusConfig {
    /// Points per second left on the clock (default 5).
    pub per_second_remaining: f64,
    /// Upper bound on the bonus (default 500).
    pub max_bonus: f64,
}

impl Default for TimeBonusConfig {
    fn default() -> Self {
        Self {
            per_second_remaining: 5.0,
            max_bonus: 500.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorPenaltyConfig {
    /// Points lost per mistyped keystroke (default 15).
    pub per_error: f64,
    /// The error penalty never exceeds this share of the base score (default 0.5).
    pub max_share_of_base: f64,
}

impl Default for ErrorPenaltyConfig {
    fn default() -> Self {
        Self {
            per_error: 15.0,
            max_share_of_base: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HintPenaltyConfig {
    /// Points lost per hint (default 25).
    pub per_hint: f64,
    /// The hint penalty never exceeds this share of the base score (default 0.3).
    pub max_share_of_base: f64,
}

impl Default for HintPenaltyConfig {
    fn default() -> Self {
        Self {
            per_hint: 25.0,
            max_share_of_base: 0.3,
        }
    }
}

/// Scoring knobs. Any subset can be given in the config file; the rest keep
/// their defaults. Setting `hint_penalty` to `null` makes hints free.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Points per completed command (default 100).
    pub base_command_points: f64,
    pub time_bonus: TimeBonusConfig,
    pub error_penalty: ErrorPenaltyConfig,
    pub hint_penalty: Option<HintPenaltyConfig>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_command_points: 100.0,
            time_bonus: TimeBonusConfig::default(),
            error_penalty: ErrorPenaltyConfig::default(),
            hint_penalty: Some(HintPenaltyConfig::default()),
        }
    }
}

/// Session totals handed to [`calculate_score`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreInput {
    pub completed_commands: u32,
    pub errors: u32,
    pub elapsed_seconds: f64,
    /// Length of the round; defaults to `max(elapsed_seconds, 60)`.
    pub total_seconds: Option<f64>,
    /// Precomputed base score, e.g. with per-command multipliers. Takes
    /// precedence over `completed_commands * base_command_points`.
    pub base_points: Option<f64>,
    /// `None` when hints are not tracked for this run.
    pub hints: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Penalties {
    pub errors: f64,
    pub hints: Option<f64>,
}

impl Penalties {
    pub fn sum(&self) -> f64 {
        self.errors + self.hints.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ScoreBreakdown {
    pub total: u64,
    pub base: f64,
    pub time_bonus: f64,
    pub penalties: Penalties,
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

pub fn calculate_score(input: &ScoreInput, config: &ScoringConfig) -> ScoreBreakdown {
    let elapsed = non_negative(input.elapsed_seconds);
    let total_seconds = match input.total_seconds.map(non_negative) {
        Some(total) if total > 0.0 => total.max(elapsed),
        _ => elapsed.max(DEFAULT_TOTAL_SECONDS),
    };

    let base = match input.base_points {
        Some(points) => non_negative(points),
        None => f64::from(input.completed_commands) * non_negative(config.base_command_points),
    };

    let remaining = clamp(total_seconds - elapsed, 0.0, total_seconds);
    let time_bonus = clamp(
        remaining * non_negative(config.time_bonus.per_second_remaining),
        0.0,
        non_negative(config.time_bonus.max_bonus),
    );

    let error_penalty = clamp(
        f64::from(input.errors) * non_negative(config.error_penalty.per_error),
        0.0,
        base * non_negative(config.error_penalty.max_share_of_base),
    );

    let hint_penalty = match (input.hints, config.hint_penalty) {
        (Some(hints), Some(cfg)) => Some(clamp(
            f64::from(hints) * non_negative(cfg.per_hint),
            0.0,
            base * non_negative(cfg.max_share_of_base),
        )),
        _ => None,
    };

    let penalties = Penalties {
        errors: error_penalty,
        hints: hint_penalty,
    };
    let combined = penalties.sum().min(base);
    let total = (base + time_bonus - combined).round().max(0.0) as u64;

    ScoreBreakdown {
        total,
        base,
        time_bonus,
        penalties,
    }
}

/// Outcome of a single command, reported once it is finished.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CommandResult {
    pub completed: bool,
    pub errors: u32,
    pub duration_seconds: f64,
    /// Points multiplier for this command; values below 1 count as 1.
    pub multiplier: Option<f64>,
}

/// Accumulates command results over a run and scores them at the end.
#[derive(Debug, Clone)]
pub struct ScoringSession {
    config: ScoringConfig,
    completed_commands: u32,
    errors: u32,
    elapsed_seconds: f64,
    weighted_points: f64,
    uses_multipliers: bool,
    hints: Option<u32>,
}

impl ScoringSession {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            config,
            completed_commands: 0,
            errors: 0,
            elapsed_seconds: 0.0,
            weighted_points: 0.0,
            uses_multipliers: false,
            hints: None,
        }
    }

    pub fn add_command(&mut self, result: &CommandResult) {
        if result.completed {
            self.completed_commands += 1;
            let multiplier = result
                .multiplier
                .filter(|m| m.is_finite())
                .map_or(1.0, |m| m.max(1.0));
            if result.multiplier.is_some() {
                self.uses_multipliers = true;
            }
            self.weighted_points += non_negative(self.config.base_command_points) * multiplier;
        }
        self.errors = self.errors.saturating_add(result.errors);
        self.elapsed_seconds += non_negative(result.duration_seconds);
    }

    pub fn register_hint(&mut self, count: u32) {
        self.hints = Some(self.hints.unwrap_or(0).saturating_add(count));
    }

    pub fn completed_commands(&self) -> u32 {
        self.completed_commands
    }

    pub fn errors(&self) -> u32 {
        self.errors
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }

    pub fn hints(&self) -> Option<u32> {
        self.hints
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score the accumulated totals against a round of `total_seconds`.
    pub fn finalise(&self, total_seconds: Option<f64>) -> ScoreBreakdown {
        let input = ScoreInput {
            completed_commands: self.completed_commands,
            errors: self.errors,
            elapsed_seconds: self.elapsed_seconds,
            total_seconds,
            base_points: self.uses_multipliers.then_some(self.weighted_points),
            hints: self.hints,
        };
        calculate_score(&input, &self.config)
    }
}

impl Default for ScoringSession {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(completed: u32, errors: u32, elapsed: f64, total: Option<f64>) -> ScoreInput {
        ScoreInput {
            completed_commands: completed,
            errors,
            elapsed_seconds: elapsed,
            total_seconds: total,
            ..ScoreInput::default()
        }
    }

    #[test]
    fn test_reference_scenario() {
        let score = calculate_score(&input(5, 2, 40.0, Some(60.0)), &ScoringConfig::default());
        assert_eq!(score.base, 500.0);
        assert_eq!(score.time_bonus, 100.0);
        assert_eq!(score.penalties.errors, 30.0);
        assert_eq!(score.penalties.hints, None);
        assert_eq!(score.total, 570);
    }

    #[test]
    fn test_empty_run_keeps_time_bonus() {
        let score = calculate_score(&ScoreInput::default(), &ScoringConfig::default());
        assert_eq!(score.base, 0.0);
        assert_eq!(score.time_bonus, 300.0);
        assert_eq!(score.total, 300);
    }

    #[test]
    fn test_total_seconds_defaults_to_at_least_a_minute() {
        let score = calculate_score(&input(1, 0, 40.0, None), &ScoringConfig::default());
        assert_eq!(score.time_bonus, 100.0);

        let score = calculate_score(&input(1, 0, 90.0, None), &ScoringConfig::default());
        assert_eq!(score.time_bonus, 0.0);
    }

    #[test]
    fn test_total_seconds_never_below_elapsed() {
        let score = calculate_score(&input(2, 0, 80.0, Some(60.0)), &ScoringConfig::default());
        assert_eq!(score.time_bonus, 0.0);
        assert_eq!(score.total, 200);
    }

    #[test]
    fn test_invalid_numbers_are_normalised() {
        let score = calculate_score(
            &ScoreInput {
                completed_commands: 3,
                errors: 0,
                elapsed_seconds: f64::NAN,
                total_seconds: Some(-10.0),
                base_points: None,
                hints: None,
            },
            &ScoringConfig::default(),
        );
        assert_eq!(score.base, 300.0);
        assert_eq!(score.time_bonus, 300.0);
        assert_eq!(score.total, 600);

        let score = calculate_score(
            &ScoreInput {
                base_points: Some(f64::INFINITY),
                elapsed_seconds: -5.0,
                ..ScoreInput::default()
            },
            &ScoringConfig::default(),
        );
        assert_eq!(score.base, 0.0);
    }

    #[test]
    fn test_error_penalty_capped_at_share_of_base() {
        let score = calculate_score(&input(2, 100, 60.0, Some(60.0)), &ScoringConfig::default());
        assert_eq!(score.penalties.errors, 100.0);
        assert_eq!(score.total, 100);
    }

    #[test]
    fn test_penalties_never_exceed_base() {
        let config = ScoringConfig {
            error_penalty: ErrorPenaltyConfig {
                per_error: 50.0,
                max_share_of_base: 0.9,
            },
            hint_penalty: Some(HintPenaltyConfig {
                per_hint: 50.0,
                max_share_of_base: 0.9,
            }),
            ..ScoringConfig::default()
        };
        for completed in 0..6 {
            for errors in [0, 1, 5, 40] {
                let score = calculate_score(
                    &ScoreInput {
                        completed_commands: completed,
                        errors,
                        elapsed_seconds: 60.0,
                        total_seconds: Some(60.0),
                        base_points: None,
                        hints: Some(errors),
                    },
                    &config,
                );
                assert!(score.penalties.sum().min(score.base) <= score.base);
                assert!(score.total as f64 <= score.base + score.time_bonus);
            }
        }

        // combined cap: each penalty is within its own share but together they would exceed base
        let score = calculate_score(
            &ScoreInput {
                completed_commands: 1,
                errors: 10,
                elapsed_seconds: 60.0,
                total_seconds: Some(60.0),
                base_points: None,
                hints: Some(10),
            },
            &config,
        );
        assert_eq!(score.penalties.errors, 90.0);
        assert_eq!(score.penalties.hints, Some(90.0));
        assert_eq!(score.total, 0);
    }

    #[test]
    fn test_time_bonus_monotonic_and_bounded() {
        let config = ScoringConfig::default();
        let mut previous = -1.0;
        for elapsed in (0..=200).rev() {
            let score = calculate_score(&input(0, 0, elapsed as f64, Some(200.0)), &config);
            assert!(score.time_bonus >= previous);
            assert!(score.time_bonus <= config.time_bonus.max_bonus);
            previous = score.time_bonus;
        }
        assert_eq!(previous, 500.0);
    }

    #[test]
    fn test_base_points_take_precedence() {
        let score = calculate_score(
            &ScoreInput {
                completed_commands: 1,
                base_points: Some(350.0),
                elapsed_seconds: 60.0,
                total_seconds: Some(60.0),
                ..ScoreInput::default()
            },
            &ScoringConfig::default(),
        );
        assert_eq!(score.base, 350.0);
        assert_eq!(score.total, 350);
    }

    #[test]
    fn test_hint_penalty_only_when_tracked_and_configured() {
        let tracked = ScoreInput {
            completed_commands: 4,
            elapsed_seconds: 60.0,
            total_seconds: Some(60.0),
            hints: Some(2),
            ..ScoreInput::default()
        };
        let score = calculate_score(&tracked, &ScoringConfig::default());
        assert_eq!(score.penalties.hints, Some(50.0));
        assert_eq!(score.total, 350);

        let free_hints = ScoringConfig {
            hint_penalty: None,
            ..ScoringConfig::default()
        };
        let score = calculate_score(&tracked, &free_hints);
        assert_eq!(score.penalties.hints, None);
        assert_eq!(score.total, 400);
    }

    #[test]
    fn test_session_accumulates_results() {
        let mut session = ScoringSession::default();
        for _ in 0..5 {
            session.add_command(&CommandResult {
                completed: true,
                errors: 0,
                duration_seconds: 8.0,
                multiplier: None,
            });
        }
        session.add_command(&CommandResult {
            completed: false,
            errors: 2,
            duration_seconds: f64::NAN,
            multiplier: None,
        });
        assert_eq!(session.completed_commands(), 5);
        assert_eq!(session.errors(), 2);
        assert_eq!(session.elapsed_seconds(), 40.0);
        assert_eq!(session.finalise(Some(60.0)).total, 570);
    }

    #[test]
    fn test_session_multipliers_feed_base_points() {
        let mut session = ScoringSession::default();
        session.add_command(&CommandResult {
            completed: true,
            multiplier: Some(1.5),
            ..CommandResult::default()
        });
        session.add_command(&CommandResult {
            completed: true,
            multiplier: Some(0.2),
            ..CommandResult::default()
        });
        session.add_command(&CommandResult {
            completed: true,
            ..CommandResult::default()
        });
        let score = session.finalise(Some(0.0001));
        assert_eq!(score.base, 350.0);
    }

    #[test]
    fn test_session_hints() {
        let mut session = ScoringSession::default();
        assert_eq!(session.finalise(None).penalties.hints, None);

        session.add_command(&CommandResult {
            completed: true,
            duration_seconds: 60.0,
            ..CommandResult::default()
        });
        session.register_hint(1);
        session.register_hint(2);
        assert_eq!(session.hints(), Some(3));
        let score = session.finalise(Some(60.0));
        assert_eq!(score.penalties.hints, Some(30.0));
        assert_eq!(score.total, 70);
    }

    #[test]
    fn test_partial_config_from_json() {
        let config: ScoringConfig =
            serde_json::from_str(r#"{"time_bonus": {"max_bonus": 50}, "hint_penalty": null}"#)
                .unwrap();
        assert_eq!(config.base_command_points, 100.0);
        assert_eq!(config.time_bonus.per_second_remaining, 5.0);
        assert_eq!(config.time_bonus.max_bonus, 50.0);
        assert_eq!(config.error_penalty, ErrorPenaltyConfig::default());
        assert_eq!(config.hint_penalty, None);
    }
}
