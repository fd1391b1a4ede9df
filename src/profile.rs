//! Persistent player profile: high scores, per-pack stats and preferences.
//!
//! The profile is a single JSON document. Whatever is on disk is treated as
//! untrusted: unknown shapes are coerced to defaults and a file that does not
//! parse at all is discarded. When the file cannot be written the store keeps
//! working from memory.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;

use crate::app_dirs::AppDirs;

pub const PROFILE_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackStats {
    pub attempts: u64,
    pub clears: u64,
    pub best_score: u64,
}

/// Fields to overwrite in [`ScoreStore::update_pack_stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PackStatsPatch {
    pub attempts: Option<u64>,
    pub clears: Option<u64>,
    pub best_score: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioPrefs {
    pub music_enabled: bool,
    pub effects_enabled: bool,
}

impl Default for AudioPrefs {
    fn default() -> Self {
        Self {
            music_enabled: true,
            effects_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub tutorial_completed: bool,
    pub last_pack_id: Option<String>,
    pub pack_stats: BTreeMap<String, PackStats>,
    pub audio: AudioPrefs,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub version: u32,
    pub high_scores: BTreeMap<String, u64>,
    pub progress: Progress,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            version: PROFILE_VERSION,
            high_scores: BTreeMap::new(),
            progress: Progress::default(),
        }
    }
}

/// Non-negative whole number from loosely typed JSON; anything else is 0.
fn count(value: Option<&Value>) -> u64 {
    let number = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    match number {
        Some(n) if n.is_finite() && n > 0.0 => n.floor() as u64,
        _ => 0,
    }
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

fn pack_stats_from_value(value: &Value) -> PackStats {
    PackStats {
        attempts: count(value.get("attempts")),
        clears: count(value.get("clears")),
        best_score: count(value.get("bestScore")),
    }
}

/// Audio prefs, migrating the single legacy `audioEnabled` flag.
fn audio_from_progress(progress: Option<&Value>) -> AudioPrefs {
    let Some(progress) = progress.filter(|p| p.is_object()) else {
        return AudioPrefs::default();
    };
    if let Some(audio) = progress.get("audio").filter(|a| a.is_object()) {
        let enabled = |key: &str| !matches!(audio.get(key), Some(Value::Bool(false)));
        return AudioPrefs {
            music_enabled: enabled("musicEnabled"),
            effects_enabled: enabled("effectsEnabled"),
        };
    }
    if let Some(legacy) = progress.get("audioEnabled") {
        let enabled = !matches!(legacy, Value::Bool(false));
        return AudioPrefs {
            music_enabled: enabled,
            effects_enabled: enabled,
        };
    }
    AudioPrefs::default()
}

impl Profile {
    /// Coerce arbitrary JSON into a valid profile.
    pub fn from_value(raw: &Value) -> Self {
        if !raw.is_object() {
            return Self::default();
        }

        let high_scores = raw
            .get("highScores")
            .and_then(Value::as_object)
            .map(|scores| {
                scores
                    .iter()
                    .filter(|(mode, _)| !mode.is_empty())
                    .map(|(mode, score)| (mode.clone(), count(Some(score))))
                    .collect()
            })
            .unwrap_or_default();

        let progress = raw.get("progress");
        let pack_stats = progress
            .and_then(|p| p.get("packStats"))
            .and_then(Value::as_object)
            .map(|stats| {
                stats
                    .iter()
                    .filter(|(pack_id, stats)| !pack_id.is_empty() && stats.is_object())
                    .map(|(pack_id, stats)| (pack_id.clone(), pack_stats_from_value(stats)))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            version: raw
                .get("version")
                .and_then(Value::as_u64)
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(PROFILE_VERSION),
            high_scores,
            progress: Progress {
                tutorial_completed: truthy(progress.and_then(|p| p.get("tutorialCompleted"))),
                last_pack_id: progress
                    .and_then(|p| p.get("lastPackId"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
                pack_stats,
                audio: audio_from_progress(progress),
            },
        }
    }

    pub fn high_score(&self, mode_id: &str) -> u64 {
        self.high_scores.get(mode_id).copied().unwrap_or(0)
    }

    /// Keep `score` if it beats the mode's best. Returns the best.
    pub fn record_high_score(&mut self, mode_id: &str, score: u64) -> u64 {
        let high = self.high_scores.entry(mode_id.to_string()).or_insert(0);
        if score > *high {
            *high = score;
        }
        *high
    }
}

/// A finished run to record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreRecord {
    pub mode_id: String,
    pub score: u64,
    pub pack_id: Option<String>,
    pub completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordOutcome {
    pub high_score: u64,
    pub pack: Option<PackStats>,
}

/// Key-value persistence used by the game controller.
pub trait ScoreStore {
    fn high_score(&self, mode_id: &str) -> u64;
    fn record_score(&mut self, record: &ScoreRecord) -> RecordOutcome;

    fn audio_prefs(&self) -> AudioPrefs;
    fn set_music_enabled(&mut self, enabled: bool) -> bool;
    fn set_effects_enabled(&mut self, enabled: bool) -> bool;

    fn audio_enabled(&self) -> bool {
        let prefs = self.audio_prefs();
        prefs.music_enabled && prefs.effects_enabled
    }

    fn set_audio_enabled(&mut self, enabled: bool) -> bool {
        self.set_music_enabled(enabled);
        self.set_effects_enabled(enabled)
    }

    fn tutorial_completed(&self) -> bool;
    fn mark_tutorial_completed(&mut self) -> bool;

    /// `None` for an empty id; zeroed stats for a pack never played.
    fn pack_stats(&self, pack_id: &str) -> Option<PackStats>;
    fn update_pack_stats(&mut self, pack_id: &str, patch: PackStatsPatch) -> Option<PackStats>;

    fn last_pack_id(&self) -> Option<String>;
    fn set_last_pack_id(&mut self, pack_id: &str) -> Option<String>;

    fn reset(&mut self);
    fn snapshot(&self) -> Profile;
}

/// [`ScoreStore`] backed by a JSON file, or by memory alone.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: Option<PathBuf>,
    state: Profile,
}

impl ProfileStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let state = Self::read(&path);
        Self {
            path: Some(path),
            state,
        }
    }

    /// Profile at the default location; memory-only if there is none.
    pub fn open_default() -> Self {
        match AppDirs::profile_path() {
            Some(path) => Self::open(path),
            None => {
                warn!("no profile location available, progress will not be saved");
                Self::in_memory()
            }
        }
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: Profile::default(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn read(path: &Path) -> Profile {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Profile::default(),
            Err(err) => {
                warn!("failed to read profile {}: {err}", path.display());
                return Profile::default();
            }
        };
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(raw) => Profile::from_value(&raw),
            Err(err) => {
                warn!("corrupt profile {}, resetting: {err}", path.display());
                if let Err(err) = fs::remove_file(path) {
                    warn!("failed to remove corrupt profile: {err}");
                }
                Profile::default()
            }
        }
    }

    fn write(&self) -> io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(&self.state)?;
        fs::write(path, data)
    }

    /// Apply `f` to the profile and persist the result.
    fn update<T>(&mut self, f: impl FnOnce(&mut Profile) -> T) -> T {
        let out = f(&mut self.state);
        if let Err(err) = self.write() {
            warn!("failed to persist profile, keeping it in memory: {err}");
        }
        out
    }
}

impl ScoreStore for ProfileStore {
    fn high_score(&self, mode_id: &str) -> u64 {
        self.state.high_score(mode_id)
    }

    fn record_score(&mut self, record: &ScoreRecord) -> RecordOutcome {
        debug!("recording score {} for mode `{}`", record.score, record.mode_id);
        let high_score =
            self.update(|profile| profile.record_high_score(&record.mode_id, record.score));

        let pack = record.pack_id.as_deref().and_then(|pack_id| {
            let current = self.pack_stats(pack_id)?;
            let stats = self.update_pack_stats(
                pack_id,
                PackStatsPatch {
                    attempts: Some(current.attempts + 1),
                    clears: Some(current.clears + u64::from(record.completed)),
                    best_score: Some(current.best_score.max(record.score)),
                },
            )?;
            self.set_last_pack_id(pack_id);
            Some(stats)
        });

        RecordOutcome { high_score, pack }
    }

    fn audio_prefs(&self) -> AudioPrefs {
        self.state.progress.audio
    }

    fn set_music_enabled(&mut self, enabled: bool) -> bool {
        self.update(|profile| {
            profile.progress.audio.music_enabled = enabled;
            enabled
        })
    }

    fn set_effects_enabled(&mut self, enabled: bool) -> bool {
        self.update(|profile| {
            profile.progress.audio.effects_enabled = enabled;
            enabled
        })
    }

    fn tutorial_completed(&self) -> bool {
        self.state.progress.tutorial_completed
    }

    fn mark_tutorial_completed(&mut self) -> bool {
        self.update(|profile| {
            profile.progress.tutorial_completed = true;
            true
        })
    }

    fn pack_stats(&self, pack_id: &str) -> Option<PackStats> {
        if pack_id.is_empty() {
            return None;
        }
        Some(
            self.state
                .progress
                .pack_stats
                .get(pack_id)
                .copied()
                .unwrap_or_default(),
        )
    }

    fn update_pack_stats(&mut self, pack_id: &str, patch: PackStatsPatch) -> Option<PackStats> {
        if pack_id.is_empty() {
            return None;
        }
        let updated = self.update(|profile| {
            let stats = profile
                .progress
                .pack_stats
                .entry(pack_id.to_string())
                .or_default();
            *stats = PackStats {
                attempts: patch.attempts.unwrap_or(stats.attempts),
                clears: patch.clears.unwrap_or(stats.clears),
                best_score: patch.best_score.unwrap_or(stats.best_score),
            };
            *stats
        });
        Some(updated)
    }

    fn last_pack_id(&self) -> Option<String> {
        self.state.progress.last_pack_id.clone()
    }

    fn set_last_pack_id(&mut self, pack_id: &str) -> Option<String> {
        let pack_id = pack_id.trim();
        if pack_id.is_empty() {
            return self.last_pack_id();
        }
        self.update(|profile| {
            profile.progress.last_pack_id = Some(pack_id.to_string());
            profile.progress.last_pack_id.clone()
        })
    }

    fn reset(&mut self) {
        self.state = Profile::default();
        if let Some(path) = &self.path {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => warn!("failed to remove profile {}: {err}", path.display()),
            }
        }
    }

    fn snapshot(&self) -> Profile {
        self.state.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn record(score: u64, pack_id: Option<&str>) -> ScoreRecord {
        ScoreRecord {
            mode_id: "core".into(),
            score,
            pack_id: pack_id.map(str::to_string),
            completed: true,
        }
    }

    #[test]
    fn test_record_score_keeps_the_best() {
        let mut store = ProfileStore::in_memory();
        assert_eq!(store.high_score("core"), 0);

        let outcome = store.record_score(&record(570, Some("beginner")));
        assert_eq!(outcome.high_score, 570);
        assert_eq!(
            outcome.pack,
            Some(PackStats {
                attempts: 1,
                clears: 1,
                best_score: 570
            })
        );

        let outcome = store.record_score(&record(300, Some("beginner")));
        assert_eq!(outcome.high_score, 570);
        assert_eq!(outcome.pack.unwrap().attempts, 2);
        assert_eq!(outcome.pack.unwrap().best_score, 570);
        assert_eq!(store.last_pack_id().as_deref(), Some("beginner"));
    }

    #[test]
    fn test_record_score_without_pack() {
        let mut store = ProfileStore::in_memory();
        let outcome = store.record_score(&record(10, None));
        assert_eq!(outcome.pack, None);
        assert_eq!(store.last_pack_id(), None);
    }

    #[test]
    fn test_incomplete_run_counts_attempt_only() {
        let mut store = ProfileStore::in_memory();
        let outcome = store.record_score(&ScoreRecord {
            completed: false,
            ..record(0, Some("recon"))
        });
        assert_eq!(
            outcome.pack,
            Some(PackStats {
                attempts: 1,
                clears: 0,
                best_score: 0
            })
        );
    }

    #[test]
    fn test_profile_persists_between_opens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("profile.json");

        let mut store = ProfileStore::open(&path);
        store.record_score(&record(420, Some("recon")));
        store.mark_tutorial_completed();
        store.set_effects_enabled(false);

        let reopened = ProfileStore::open(&path);
        assert_eq!(reopened.high_score("core"), 420);
        assert!(reopened.tutorial_completed());
        assert!(!reopened.audio_prefs().effects_enabled);
        assert!(reopened.audio_prefs().music_enabled);
        assert!(!reopened.audio_enabled());
        assert_eq!(reopened.pack_stats("recon").unwrap().best_score, 420);
    }

    #[test]
    fn test_corrupt_profile_is_discarded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("profile.json");
        fs::write(&path, "{ definitely not json").unwrap();

        let store = ProfileStore::open(&path);
        assert_eq!(store.snapshot(), Profile::default());
        assert!(!path.exists());
    }

    #[test]
    fn test_normalise_odd_shapes() {
        let profile = Profile::from_value(&json!({
            "version": "seven",
            "highScores": {"core": 123.9, "": 5, "hard": "77", "neg": -4, "junk": [1]},
            "progress": {
                "tutorialCompleted": 1,
                "lastPackId": 12,
                "packStats": {
                    "beginner": {"attempts": "3", "clears": 2.7, "bestScore": null},
                    "broken": 5
                },
                "audioEnabled": false
            }
        }));

        assert_eq!(profile.version, PROFILE_VERSION);
        assert_eq!(profile.high_score("core"), 123);
        assert_eq!(profile.high_score("hard"), 77);
        assert_eq!(profile.high_score("neg"), 0);
        assert_eq!(profile.high_score("junk"), 0);
        assert!(!profile.high_scores.contains_key(""));
        assert!(profile.progress.tutorial_completed);
        assert_eq!(profile.progress.last_pack_id, None);
        assert_eq!(
            profile.progress.pack_stats.get("beginner"),
            Some(&PackStats {
                attempts: 3,
                clears: 2,
                best_score: 0
            })
        );
        assert!(!profile.progress.pack_stats.contains_key("broken"));
        assert_eq!(
            profile.progress.audio,
            AudioPrefs {
                music_enabled: false,
                effects_enabled: false
            }
        );
    }

    #[test]
    fn test_audio_object_wins_over_legacy_flag() {
        let profile = Profile::from_value(&json!({
            "progress": {
                "audio": {"musicEnabled": false, "effectsEnabled": "yes"},
                "audioEnabled": false
            }
        }));
        assert!(!profile.progress.audio.music_enabled);
        assert!(profile.progress.audio.effects_enabled);
    }

    #[test]
    fn test_non_object_profile_is_default() {
        assert_eq!(Profile::from_value(&json!("hello")), Profile::default());
        assert_eq!(Profile::from_value(&json!(null)), Profile::default());
    }

    #[test]
    fn test_pack_stats_queries_and_patches() {
        let mut store = ProfileStore::in_memory();
        assert_eq!(store.pack_stats(""), None);
        assert_eq!(store.pack_stats("unknown"), Some(PackStats::default()));

        let patched = store.update_pack_stats(
            "beginner",
            PackStatsPatch {
                clears: Some(4),
                ..PackStatsPatch::default()
            },
        );
        assert_eq!(
            patched,
            Some(PackStats {
                attempts: 0,
                clears: 4,
                best_score: 0
            })
        );
        assert_eq!(store.update_pack_stats("", PackStatsPatch::default()), None);
    }

    #[test]
    fn test_last_pack_id_ignores_blank() {
        let mut store = ProfileStore::in_memory();
        assert_eq!(store.set_last_pack_id("  recon "), Some("recon".to_string()));
        assert_eq!(store.set_last_pack_id("   "), Some("recon".to_string()));
    }

    #[test]
    fn test_set_audio_enabled_toggles_both() {
        let mut store = ProfileStore::in_memory();
        assert!(store.audio_enabled());
        assert!(!store.set_audio_enabled(false));
        assert_eq!(
            store.audio_prefs(),
            AudioPrefs {
                music_enabled: false,
                effects_enabled: false
            }
        );
    }

    #[test]
    fn test_reset_removes_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("profile.json");
        let mut store = ProfileStore::open(&path);
        store.record_score(&record(99, None));
        assert!(path.exists());

        store.reset();
        assert!(!path.exists());
        assert_eq!(store.high_score("core"), 0);
    }
}
