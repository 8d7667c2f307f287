use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("config directory not found")]
    DirectoryNotFound,

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Engine settings, loaded from `~/.config/gitscope/config.toml`.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub git: GitSettings,
    pub refresh: RefreshSettings,
    pub history: HistorySettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GitSettings {
    /// Path to the git binary; `None` means take it from PATH.
    pub binary: Option<PathBuf>,
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RefreshSettings {
    pub auto_refresh: bool,
    pub interval_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HistorySettings {
    /// Cap on commits loaded per history refresh; 0 means unlimited.
    pub max_commits: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            git: GitSettings {
                binary: None,
                timeout_seconds: 30,
            },
            refresh: RefreshSettings {
                auto_refresh: true,
                interval_ms: 2000,
            },
            history: HistorySettings { max_commits: 2000 },
        }
    }
}

impl Settings {
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        let home = std::env::var("HOME").map_err(|_| ConfigError::DirectoryNotFound)?;
        Ok(PathBuf::from(home).join(".config").join("gitscope"))
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load settings, falling back to defaults when no file exists.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)?;
        let settings: Settings = toml::from_str(&contents)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.validate()?;

        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir)?;

        let path = Self::config_path()?;
        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&path, perms)?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.git.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "git.timeout_seconds must be positive".to_string(),
            ));
        }
        if self.refresh.auto_refresh && self.refresh.interval_ms < 100 {
            return Err(ConfigError::InvalidValue(
                "refresh.interval_ms below 100 would hammer the repository".to_string(),
            ));
        }
        Ok(())
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.git.timeout_seconds)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh.interval_ms)
    }

    /// Log limit as an `Option`, 0 meaning unlimited.
    pub fn history_limit(&self) -> Option<usize> {
        (self.history.max_commits > 0).then_some(self.history.max_commits)
    }
}
