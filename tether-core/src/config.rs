use lazy_static::lazy_static;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::repo::Strategy;

lazy_static! {
    static ref CONFIG: RwLock<Config> = RwLock::new(Config::load());
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Strategy used when no `--rebase`/`--merge` flag is given.
    /// `None` falls through to the hardcoded rebase default.
    pub default_strategy: Option<Strategy>,
}

impl Config {
    fn load() -> Self {
        let Some(path) = config_dir().map(|dir| dir.join("config.toml")) else {
            return Config::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|_| {
                crate::display::emit(
                    crate::display::LogLevel::Warn,
                    format!("ignoring malformed config at {}", path.display()),
                );
                Config::default()
            }),
            Err(_) => Config::default(),
        }
    }
}

pub fn set_config(new_config: Config) {
    *CONFIG.write().unwrap() = new_config;
}

pub fn get_config() -> Config {
    CONFIG.read().unwrap().clone()
}

pub(crate) fn user_home_dir() -> Option<PathBuf> {
    if let Some(home) = env::var_os("HOME")
        && !home.is_empty()
    {
        return Some(PathBuf::from(home));
    }

    #[cfg(windows)]
    {
        if let Some(profile) = env::var_os("USERPROFILE")
            && !profile.is_empty()
        {
            return Some(PathBuf::from(profile));
        }
    }

    None
}

/// Per-user directory holding the config file and the offline queue.
pub fn config_dir() -> Option<PathBuf> {
    user_home_dir().map(|home| home.join(".tether"))
}
