use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "hacktype";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// `$HOME/.local/state/hacktype`, or the platform data dir without `HOME`.
    pub fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join(APP_NAME),
            )
        } else {
            ProjectDirs::from("", "", APP_NAME).map(|pd| pd.data_local_dir().to_path_buf())
        }
    }

    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|pd| pd.config_dir().to_path_buf())
    }

    pub fn profile_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("profile.json"))
    }

    pub fn history_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("history.db"))
    }

    pub fn log_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("hacktype.log"))
    }

    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_files_share_a_directory() {
        let (Some(profile), Some(history), Some(log)) = (
            AppDirs::profile_path(),
            AppDirs::history_path(),
            AppDirs::log_path(),
        ) else {
            return;
        };
        assert_eq!(profile.parent(), history.parent());
        assert_eq!(history.parent(), log.parent());
        assert!(profile.ends_with("hacktype/profile.json"));
    }
}
