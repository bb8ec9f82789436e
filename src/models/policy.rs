use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{InstallOptions, UpdaterSettings};
use crate::utils::{AppError, AppResult};

/// Longest accepted interval between automatic checks (30 days).
pub const MAX_CHECK_CADENCE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// The three install behaviours shipped so far. Each is only a starting point
/// for [`UpdatePolicy`]; every field can be overridden from settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PolicyPreset {
    /// Download and install without asking, then relaunch.
    #[default]
    FullySilent,
    /// Ask before downloading a newly found release.
    PromptOnAvailable,
    /// Download in the background, ask before installing.
    PromptOnDownloaded,
}

impl PolicyPreset {
    pub fn as_str(&self) -> &str {
        match self {
            PolicyPreset::FullySilent => "fullySilent",
            PolicyPreset::PromptOnAvailable => "promptOnAvailable",
            PolicyPreset::PromptOnDownloaded => "promptOnDownloaded",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "fullySilent" | "fully_silent" | "silent" => Some(PolicyPreset::FullySilent),
            "promptOnAvailable" | "prompt_on_available" => Some(PolicyPreset::PromptOnAvailable),
            "promptOnDownloaded" | "prompt_on_downloaded" => Some(PolicyPreset::PromptOnDownloaded),
            _ => None,
        }
    }

    /// Polling period used when settings do not name one.
    pub fn default_cadence(&self) -> Duration {
        match self {
            PolicyPreset::FullySilent => Duration::from_secs(10),
            PolicyPreset::PromptOnAvailable | PolicyPreset::PromptOnDownloaded => Duration::from_secs(60),
        }
    }

    pub fn policy(&self) -> UpdatePolicy {
        match self {
            PolicyPreset::FullySilent => UpdatePolicy::fully_silent(self.default_cadence()),
            PolicyPreset::PromptOnAvailable => UpdatePolicy::prompt_on_available(self.default_cadence()),
            PolicyPreset::PromptOnDownloaded => UpdatePolicy::prompt_on_downloaded(self.default_cadence()),
        }
    }
}

/// Install behaviour, fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePolicy {
    pub check_cadence: Duration,
    pub check_immediately_on_ready: bool,
    /// Use the check variant that also raises a desktop notification.
    pub notify_on_check: bool,
    pub prompt_before_install_on_available: bool,
    pub prompt_before_install_on_downloaded: bool,
    pub install_on_quit: bool,
    /// Options for installs that happen while the app keeps running.
    pub install: InstallOptions,
    /// Options for the install performed while the app is quitting.
    pub quit_install: InstallOptions,
}

impl UpdatePolicy {
    pub fn fully_silent(check_cadence: Duration) -> Self {
        Self {
            check_cadence,
            check_immediately_on_ready: false,
            notify_on_check: false,
            prompt_before_install_on_available: false,
            prompt_before_install_on_downloaded: false,
            install_on_quit: true,
            install: InstallOptions::new(true, true),
            quit_install: InstallOptions::new(true, true),
        }
    }

    pub fn prompt_on_available(check_cadence: Duration) -> Self {
        Self {
            check_cadence,
            check_immediately_on_ready: true,
            notify_on_check: true,
            prompt_before_install_on_available: true,
            prompt_before_install_on_downloaded: false,
            install_on_quit: true,
            install: InstallOptions::new(false, true),
            quit_install: InstallOptions::new(true, false),
        }
    }

    pub fn prompt_on_downloaded(check_cadence: Duration) -> Self {
        Self {
            check_cadence,
            check_immediately_on_ready: true,
            notify_on_check: false,
            prompt_before_install_on_available: false,
            prompt_before_install_on_downloaded: true,
            install_on_quit: true,
            install: InstallOptions::new(false, true),
            quit_install: InstallOptions::new(true, false),
        }
    }

    /// Resolve the preset named in settings and apply any per-field overrides.
    pub fn from_settings(settings: &UpdaterSettings) -> AppResult<Self> {
        let mut policy = settings.preset.policy();

        if let Some(secs) = settings.check_interval_secs {
            policy.check_cadence = Duration::from_secs(secs);
        }
        if let Some(v) = settings.check_immediately_on_ready {
            policy.check_immediately_on_ready = v;
        }
        if let Some(v) = settings.notify_on_check {
            policy.notify_on_check = v;
        }
        if let Some(v) = settings.prompt_before_install_on_available {
            policy.prompt_before_install_on_available = v;
        }
        if let Some(v) = settings.prompt_before_install_on_downloaded {
            policy.prompt_before_install_on_downloaded = v;
        }
        if let Some(v) = settings.install_on_quit {
            policy.install_on_quit = v;
        }
        if let Some(v) = settings.silent_install {
            policy.install.silent = v;
        }
        if let Some(v) = settings.force_restart_after_install {
            policy.install.force_restart = v;
        }

        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.check_cadence.is_zero() {
            return Err(AppError::Config("check interval must be greater than zero".to_string()));
        }
        if self.check_cadence > MAX_CHECK_CADENCE {
            return Err(AppError::Config(format!(
                "check interval of {}s exceeds the maximum of {}s",
                self.check_cadence.as_secs(),
                MAX_CHECK_CADENCE.as_secs()
            )));
        }
        if self.prompt_before_install_on_available && self.prompt_before_install_on_downloaded {
            log::warn!("Both prompt points are enabled; the user may be asked twice per update");
        }
        Ok(())
    }

    /// No prompts at all and installs are silent with a relaunch.
    pub fn is_fully_silent(&self) -> bool {
        !self.prompt_before_install_on_available
            && !self.prompt_before_install_on_downloaded
            && self.install.silent
            && self.install.force_restart
    }
}

impl Default for UpdatePolicy {
    fn default() -> Self {
        PolicyPreset::default().policy()
    }
}
