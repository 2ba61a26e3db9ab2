//! Configurable per-game defaults, loaded from disk with hot reload support.

use std::{
    env, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the engine looks for the JSON settings.
const DEFAULT_SETTINGS_PATH: &str = "config/settings.json";
/// Environment variable that overrides [`DEFAULT_SETTINGS_PATH`].
const SETTINGS_PATH_ENV: &str = "CHAT_ARCADE_CONFIG_PATH";

/// Defaults for the lucky wheel giveaway.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WheelSettings {
    /// Collection window in seconds.
    pub duration_secs: u64,
    /// Trigger word viewers must include to enter (whole word, any case).
    pub keyword: String,
}

impl Default for WheelSettings {
    fn default() -> Self {
        Self {
            duration_secs: 10,
            keyword: "GAME".into(),
        }
    }
}

/// One poll option as configured (text shown to viewers plus vote keyword).
#[derive(Debug, Clone, Deserialize)]
pub struct PollOptionSetting {
    /// Display text of the option.
    pub text: String,
    /// Keyword voters must include (matched as uppercase substring).
    pub keyword: String,
}

/// Defaults for multiple-choice polls.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    /// Voting window in seconds.
    pub duration_secs: u64,
    /// Question used when the caller does not supply one.
    pub default_question: String,
    /// Options used when the caller does not supply any.
    pub default_options: Vec<PollOptionSetting>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            duration_secs: 30,
            default_question: "Yes or no?".into(),
            default_options: vec![
                PollOptionSetting {
                    text: "Yes".into(),
                    keyword: "YES".into(),
                },
                PollOptionSetting {
                    text: "No".into(),
                    keyword: "NO".into(),
                },
            ],
        }
    }
}

/// Defaults for the progress race.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RaceSettings {
    /// Race duration in seconds.
    pub duration_secs: u64,
    /// Smallest advance granted per accepted comment.
    pub step_min: u32,
    /// Largest advance granted per accepted comment.
    pub step_max: u32,
    /// Position at which a racer wins immediately.
    pub goal: u32,
}

impl Default for RaceSettings {
    fn default() -> Self {
        Self {
            duration_secs: 60,
            step_min: 3,
            step_max: 8,
            goal: 100,
        }
    }
}

/// Defaults for the multi-round song request game.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DjSettings {
    /// Length of the song-request phase in seconds.
    pub request_secs: u64,
    /// Length of the voting phase in seconds.
    pub voting_secs: u64,
    /// Pause between a finished round and the next request phase.
    pub cooldown_secs: u64,
    /// How many songs go up for vote each round (labels A..).
    pub top_songs: usize,
    /// Whether finished rounds chain into a new one automatically.
    pub auto_loop: bool,
}

impl Default for DjSettings {
    fn default() -> Self {
        Self {
            request_secs: 30,
            voting_secs: 30,
            cooldown_secs: 5,
            top_songs: 4,
            auto_loop: false,
        }
    }
}

/// Full settings snapshot handed to games at start time.
///
/// A game captures the snapshot that was current when it started; refreshing
/// the provider never retouches in-flight games.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Lucky wheel defaults.
    pub lucky_wheel: WheelSettings,
    /// Poll defaults.
    pub poll: PollSettings,
    /// Race defaults.
    pub race: RaceSettings,
    /// DJ game defaults.
    pub dj: DjSettings,
    /// How long ended games stay queryable before cleanup evicts them.
    pub retention_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            lucky_wheel: WheelSettings::default(),
            poll: PollSettings::default(),
            race: RaceSettings::default(),
            dj: DjSettings::default(),
            retention_secs: 60,
        }
    }
}

/// Read-only provider of [`Settings`] snapshots, refreshable on demand.
#[derive(Debug)]
pub struct SettingsProvider {
    path: PathBuf,
    current: RwLock<Arc<Settings>>,
}

impl SettingsProvider {
    /// Load the settings from disk, falling back to built-in defaults when the
    /// file is missing or malformed.
    pub fn load() -> Self {
        let path = resolve_settings_path();
        let settings = read_settings(&path);
        Self {
            path,
            current: RwLock::new(Arc::new(settings)),
        }
    }

    /// Build a provider that always serves the given snapshot (tests, demos).
    pub fn fixed(settings: Settings) -> Self {
        Self {
            path: PathBuf::from(DEFAULT_SETTINGS_PATH),
            current: RwLock::new(Arc::new(settings)),
        }
    }

    /// Current settings snapshot.
    pub fn snapshot(&self) -> Arc<Settings> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Re-read the settings file. The new snapshot applies only to games
    /// started afterwards.
    pub fn refresh(&self) {
        let settings = read_settings(&self.path);
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(settings);
    }
}

/// Resolve the settings path taking the environment override into account.
fn resolve_settings_path() -> PathBuf {
    env::var_os(SETTINGS_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH))
}

/// Read and parse the settings file, logging and defaulting on any failure.
fn read_settings(path: &Path) -> Settings {
    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<Settings>(&contents) {
            Ok(settings) => {
                info!(path = %path.display(), "loaded game settings from config");
                settings
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to parse settings; falling back to defaults"
                );
                Settings::default()
            }
        },
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!(
                path = %path.display(),
                "settings file not found; using built-in defaults"
            );
            Settings::default()
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %err,
                "failed to read settings; falling back to defaults"
            );
            Settings::default()
        }
    }
}
