//! Agent settings stored as JSON in the per-user config directory
//!
//! Precedence: command-line flags > environment > settings file > defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::constants::{config, env};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Explicit displayplacer path, searched before the bundle locations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_path: Option<PathBuf>,

    /// Profile collection file; defaults to the per-user data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiles_path: Option<PathBuf>,

    /// Seconds between background checks of the active layout
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_refresh_interval_secs() -> u64 {
    config::DEFAULT_REFRESH_INTERVAL_SECS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            tool_path: None,
            profiles_path: None,
            refresh_interval_secs: default_refresh_interval_secs(),
            log_level: default_log_level(),
        }
    }
}

impl AgentSettings {
    pub fn path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(config::APP_DIR);
        path.push(config::FILENAME);
        path
    }

    /// Load from the default location with environment overrides applied
    pub fn load() -> Self {
        let mut settings = Self::load_from(&Self::path());
        settings.apply_env_overrides(|key| std::env::var(key).ok());
        settings.validate_and_clamp();
        settings
    }

    /// Load from `path`. A missing file is created with defaults; an
    /// unreadable one is reported and replaced by defaults in memory only.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!(path = %path.display(), "Settings file not found, writing defaults");
            let settings = Self::default();
            if let Err(e) = settings.save_to(path) {
                warn!(error = ?e, "Failed to write default settings");
            }
            return settings;
        }

        let parsed = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {:?}", path))
            .and_then(|contents| {
                serde_json::from_str::<Self>(&contents)
                    .with_context(|| format!("Failed to parse settings JSON from {:?}", path))
            });

        match parsed {
            Ok(mut settings) => {
                settings.validate_and_clamp();
                settings
            }
            Err(e) => {
                warn!(error = ?e, "Using default settings");
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, json).with_context(|| format!("Failed to write settings to {:?}", path))?;

        info!(path = %path.display(), "Saved settings");
        Ok(())
    }

    /// Apply environment overrides using `lookup` (normally `std::env::var`)
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(tool) = lookup(env::TOOL_PATH).filter(|v| !v.trim().is_empty()) {
            self.tool_path = Some(PathBuf::from(tool));
        }
        if let Some(profiles) = lookup(env::PROFILES_PATH).filter(|v| !v.trim().is_empty()) {
            self.profiles_path = Some(PathBuf::from(profiles));
        }
        if let Some(raw) = lookup(env::REFRESH_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) => self.refresh_interval_secs = secs,
                Err(e) => warn!(var = env::REFRESH_SECS, value = %raw, error = %e, "Ignoring invalid refresh interval"),
            }
        }
    }

    fn validate_and_clamp(&mut self) {
        let clamped = self
            .refresh_interval_secs
            .clamp(config::MIN_REFRESH_INTERVAL_SECS, config::MAX_REFRESH_INTERVAL_SECS);
        if clamped != self.refresh_interval_secs {
            warn!(
                refresh_interval_secs = self.refresh_interval_secs,
                using = clamped,
                "refresh_interval_secs out of range, clamping"
            );
            self.refresh_interval_secs = clamped;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("display-layouts").join("settings.json");

        let settings = AgentSettings::load_from(&path);
        assert_eq!(settings, AgentSettings::default());
        assert!(path.is_file());
        assert_eq!(AgentSettings::load_from(&path), settings);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "tool_path": "/opt/displayplacer" }"#).unwrap();

        let settings = AgentSettings::load_from(&path);
        assert_eq!(settings.tool_path, Some(PathBuf::from("/opt/displayplacer")));
        assert_eq!(settings.refresh_interval_secs, config::DEFAULT_REFRESH_INTERVAL_SECS);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_corrupt_file_uses_defaults_without_overwriting() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ broken").unwrap();

        assert_eq!(AgentSettings::load_from(&path), AgentSettings::default());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ broken");
    }

    #[test]
    fn test_refresh_interval_is_clamped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "refresh_interval_secs": 0 }"#).unwrap();
        assert_eq!(
            AgentSettings::load_from(&path).refresh_interval_secs,
            config::MIN_REFRESH_INTERVAL_SECS
        );

        fs::write(&path, r#"{ "refresh_interval_secs": 999999 }"#).unwrap();
        assert_eq!(
            AgentSettings::load_from(&path).refresh_interval_secs,
            config::MAX_REFRESH_INTERVAL_SECS
        );
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = AgentSettings::default();
        settings.apply_env_overrides(lookup_from(&[
            (env::TOOL_PATH, "/usr/local/bin/displayplacer"),
            (env::PROFILES_PATH, "/tmp/profiles.json"),
            (env::REFRESH_SECS, " 30 "),
        ]));
        assert_eq!(settings.tool_path, Some(PathBuf::from("/usr/local/bin/displayplacer")));
        assert_eq!(settings.profiles_path, Some(PathBuf::from("/tmp/profiles.json")));
        assert_eq!(settings.refresh_interval_secs, 30);
    }

    #[test]
    fn test_env_overrides_ignore_blank_and_invalid() {
        let mut settings = AgentSettings {
            tool_path: Some(PathBuf::from("/from/file")),
            ..AgentSettings::default()
        };
        settings.apply_env_overrides(lookup_from(&[
            (env::TOOL_PATH, "  "),
            (env::REFRESH_SECS, "soon"),
        ]));
        assert_eq!(settings.tool_path, Some(PathBuf::from("/from/file")));
        assert_eq!(settings.refresh_interval_secs, config::DEFAULT_REFRESH_INTERVAL_SECS);
    }
}
