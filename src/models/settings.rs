use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::PolicyPreset;
use crate::utils::AppResult;

/// Environment variable pointing at an alternative settings file.
pub const SETTINGS_PATH_ENV: &str = "APP_UPDATER_SETTINGS";

/// Where releases are published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "camelCase")]
pub enum FeedSettings {
    /// GitHub releases of `owner/repo`.
    #[serde(rename_all = "camelCase")]
    Github {
        owner: String,
        repo: String,
        #[serde(default)]
        api_base: Option<String>,
    },
    /// A directory served over HTTP containing an electron-builder `latest.yml`.
    Generic { url: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdaterSettings {
    pub preset: PolicyPreset,
    pub check_interval_secs: Option<u64>,
    pub check_immediately_on_ready: Option<bool>,
    pub notify_on_check: Option<bool>,
    pub prompt_before_install_on_available: Option<bool>,
    pub prompt_before_install_on_downloaded: Option<bool>,
    pub install_on_quit: Option<bool>,
    pub silent_install: Option<bool>,
    pub force_restart_after_install: Option<bool>,
    pub feed: Option<FeedSettings>,
    /// Regex selecting the release asset to download.
    pub asset_pattern: Option<String>,
    pub allow_prerelease: bool,
    /// Version to compare against; defaults to this crate's version.
    pub current_version: Option<String>,
}

impl Default for UpdaterSettings {
    fn default() -> Self {
        Self {
            preset: PolicyPreset::default(),
            check_interval_secs: None,
            check_immediately_on_ready: None,
            notify_on_check: None,
            prompt_before_install_on_available: None,
            prompt_before_install_on_downloaded: None,
            install_on_quit: None,
            silent_install: None,
            force_restart_after_install: None,
            feed: None,
            asset_pattern: None,
            allow_prerelease: false,
            current_version: None,
        }
    }
}

impl UpdaterSettings {
    /// `$APP_UPDATER_SETTINGS`, else `<config dir>/app-updater/settings.json`.
    pub fn settings_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(SETTINGS_PATH_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|d| d.join("app-updater").join("settings.json"))
    }

    /// Load settings, falling back to defaults when the file is missing or broken.
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            log::warn!("No config directory available, using default settings");
            return Self::default();
        };

        if !path.exists() {
            log::info!("No settings at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Failed to load settings from {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn current_version(&self) -> &str {
        self.current_version
            .as_deref()
            .unwrap_or(env!("CARGO_PKG_VERSION"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_github_feed() {
        let json = r#"{
            "preset": "promptOnDownloaded",
            "checkIntervalSecs": 60,
            "feed": { "provider": "github", "owner": "acme", "repo": "desk" },
            "assetPattern": "\\.AppImage$"
        }"#;
        let settings: UpdaterSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.preset, PolicyPreset::PromptOnDownloaded);
        assert_eq!(settings.check_interval_secs, Some(60));
        assert_eq!(
            settings.feed,
            Some(FeedSettings::Github {
                owner: "acme".into(),
                repo: "desk".into(),
                api_base: None,
            })
        );
        assert!(!settings.allow_prerelease);
    }

    #[test]
    fn test_parse_generic_feed() {
        let json = r#"{ "feed": { "provider": "generic", "url": "https://dl.example.com/desk/" } }"#;
        let settings: UpdaterSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.preset, PolicyPreset::FullySilent);
        assert_eq!(
            settings.feed,
            Some(FeedSettings::Generic {
                url: "https://dl.example.com/desk/".into()
            })
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"currentVersion": "1.2.3", "allowPrerelease": true}"#).unwrap();

        let settings = UpdaterSettings::load_from(&path).unwrap();
        assert_eq!(settings.current_version(), "1.2.3");
        assert!(settings.allow_prerelease);
    }

    #[test]
    fn test_load_from_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(UpdaterSettings::load_from(&path).is_err());
    }

    #[test]
    fn test_current_version_defaults_to_package() {
        assert_eq!(UpdaterSettings::default().current_version(), env!("CARGO_PKG_VERSION"));
    }
}
