//! Keystroke evaluation against a command's accepted variants.

/// What to show in place of the first wrong character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mismatch {
    /// The character the target expected at the mismatch position.
    Expected(char),
    /// The player typed past the end of the target.
    PastEnd,
}

/// Display-ready split of a target against what has been typed so far.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressDisplay {
    pub matched: String,
    pub mismatch: Option<Mismatch>,
    pub remainder: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingEvaluation {
    pub target: String,
    pub matched_prefix_length: usize,
    pub is_prefix_valid: bool,
    pub is_complete: bool,
    pub completed_variant: Option<String>,
    pub display: ProgressDisplay,
}

impl TypingEvaluation {
    /// True while the player has typed something that no longer fits the target.
    pub fn has_error(&self, typed: &str) -> bool {
        !typed.is_empty() && !self.is_prefix_valid
    }
}

/// Length, in characters, of the common leading run of `candidate` and `typed`.
pub fn prefix_score(candidate: &str, typed: &str) -> usize {
    candidate
        .chars()
        .zip(typed.chars())
        .take_while(|(a, b)| a == b)
        .count()
}

/// Pick the candidate the player is most plausibly typing.
///
/// Ties keep the earlier candidate. An empty candidate list resolves to "".
pub fn resolve_target<'a, S: AsRef<str>>(candidates: &'a [S], typed: &str) -> &'a str {
    let Some(first) = candidates.first() else {
        return "";
    };
    if typed.is_empty() {
        return first.as_ref();
    }

    let typed_len = typed.chars().count();
    let mut best = first.as_ref();
    let mut best_score = prefix_score(best, typed);

    for candidate in &candidates[1..] {
        if best_score == typed_len {
            break;
        }
        let score = prefix_score(candidate.as_ref(), typed);
        if score > best_score {
            best = candidate.as_ref();
            best_score = score;
        }
    }

    best
}

/// Split `target` into the correctly typed prefix, a single mismatch marker and the rest.
pub fn split_progress(target: &str, typed: &str) -> ProgressDisplay {
    let target_chars: Vec<char> = target.chars().collect();
    let prefix_len = prefix_score(target, typed);
    let has_mistake = typed.chars().count() > prefix_len;
    let next_char = target_chars.get(prefix_len).copied();

    let rest_start = match (has_mistake, next_char) {
        (true, Some(_)) => prefix_len + 1,
        _ => prefix_len,
    };

    ProgressDisplay {
        matched: target_chars[..prefix_len].iter().collect(),
        mismatch: has_mistake.then(|| next_char.map_or(Mismatch::PastEnd, Mismatch::Expected)),
        remainder: target_chars[rest_start.min(target_chars.len())..]
            .iter()
            .collect(),
    }
}

/// Evaluate `typed` against an ordered list of acceptable targets.
///
/// Pure: calling it twice with the same arguments yields the same result.
pub fn evaluate<S: AsRef<str>>(candidates: &[S], typed: &str) -> TypingEvaluation {
    let target = resolve_target(candidates, typed);
    let trimmed = typed.trim_end();
    let completed_variant = candidates
        .iter()
        .map(AsRef::as_ref)
        .find(|candidate| *candidate == trimmed)
        .map(str::to_owned);

    TypingEvaluation {
        target: target.to_owned(),
        matched_prefix_length: prefix_score(target, typed),
        is_prefix_valid: target.starts_with(typed),
        is_complete: completed_variant.is_some(),
        completed_variant,
        display: split_progress(target, typed),
    }
}

/// Keystrokes spent on a command beyond the characters it needed.
pub fn count_command_errors(total_typed: usize, correct_chars: usize) -> u32 {
    u32::try_from(total_typed.saturating_sub(correct_chars)).unwrap_or(u32::MAX)
}

/// Accuracy in whole percent; 100 when nothing has been typed yet.
pub fn format_accuracy(correct_chars: usize, total_typed: usize) -> u32 {
    if total_typed == 0 {
        return 100;
    }
    let ratio = correct_chars as f64 / total_typed as f64;
    (ratio * 100.0).round().clamp(0.0, 100.0) as u32
}

/// Words per minute with the usual five characters per word.
pub fn format_wpm(correct_chars: usize, elapsed_seconds: f64) -> u32 {
    if elapsed_seconds.is_nan() || elapsed_seconds <= 0.0 {
        return 0;
    }
    let words = correct_chars as f64 / 5.0;
    let minutes = elapsed_seconds / 60.0;
    let wpm = words / minutes;
    if wpm.is_finite() {
        wpm.round().max(0.0) as u32
    } else {
        0
    }
}
