use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::pack::DEFAULT_PACK_ID;
use crate::scoring::{ScoringConfig, DEFAULT_TOTAL_SECONDS};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub run_seconds: u64,
    pub pack: String,
    pub packs_dir: Option<PathBuf>,
    pub mode_id: String,
    pub level_up_every: u32,
    pub scoring: ScoringConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            run_seconds: DEFAULT_TOTAL_SECONDS as u64,
            pack: DEFAULT_PACK_ID.to_string(),
            packs_dir: None,
            mode_id: "core".to_string(),
            level_up_every: 5,
            scoring: ScoringConfig::default(),
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("hacktype_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load, writing the defaults out when no config exists yet.
    pub fn load_or_init(&self) -> Config {
        if self.path.exists() {
            return self.load();
        }
        let cfg = Config::default();
        if let Err(err) = self.save(&cfg) {
            warn!("could not write default config {}: {err}", self.path.display());
        }
        cfg
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        match fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => cfg,
                Err(err) => {
                    warn!("ignoring invalid config {}: {err}", self.path.display());
                    Config::default()
                }
            },
            Err(_) => Config::default(),
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        assert_eq!(cfg, store.load());
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"run_seconds": 90, "scoring": {"base_command_points": 150, "time_bonus": {"max_bonus": 100}}}"#,
        )
        .unwrap();

        let cfg = FileConfigStore::with_path(&path).load();
        assert_eq!(cfg.run_seconds, 90);
        assert_eq!(cfg.pack, "beginner");
        assert_eq!(cfg.level_up_every, 5);
        assert_eq!(cfg.scoring.base_command_points, 150.0);
        assert_eq!(cfg.scoring.time_bonus.max_bonus, 100.0);
        assert_eq!(cfg.scoring.time_bonus.per_second_remaining, 5.0);
        assert_eq!(cfg.scoring.error_penalty.per_error, 15.0);
    }

    #[test]
    fn invalid_config_loads_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "[1, 2").unwrap();
        assert_eq!(FileConfigStore::with_path(&path).load(), Config::default());
    }

    #[test]
    fn load_or_init_writes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sub").join("config.json");
        let store = FileConfigStore::with_path(&path);
        assert_eq!(store.load_or_init(), Config::default());
        assert!(path.exists());
    }
}
