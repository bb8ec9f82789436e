use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata of a release as reported by the release channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseInfo {
    pub version: String,
    pub release_name: Option<String>,
    pub release_notes: Option<String>,
    pub release_date: Option<DateTime<Utc>>,
    pub download_url: Option<String>,
    pub file_name: Option<String>,
    /// Base64 SHA-512 of the artifact, when the feed publishes one.
    pub sha512: Option<String>,
}

impl ReleaseInfo {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Default::default()
        }
    }
}

/// One download progress notification. Formatted straight into a status line,
/// never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadProgressSample {
    pub bytes_per_second: u64,
    pub percent: f64,
    pub transferred_bytes: u64,
    pub total_bytes: u64,
}

impl fmt::Display for DownloadProgressSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Download speed: {} - Downloaded {}% ({}/{})",
            self.bytes_per_second, self.percent, self.transferred_bytes, self.total_bytes
        )
    }
}

/// Arguments of the install primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallOptions {
    pub silent: bool,
    pub force_restart: bool,
}

impl InstallOptions {
    pub const fn new(silent: bool, force_restart: bool) -> Self {
        Self { silent, force_restart }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatePhase {
    Idle,
    Checking,
    NoUpdateFound,
    UpdateFound,
    Downloading,
    Downloaded,
    Installing,
    Errored,
}

impl UpdatePhase {
    pub fn as_str(&self) -> &str {
        match self {
            UpdatePhase::Idle => "idle",
            UpdatePhase::Checking => "checking",
            UpdatePhase::NoUpdateFound => "no_update_found",
            UpdatePhase::UpdateFound => "update_found",
            UpdatePhase::Downloading => "downloading",
            UpdatePhase::Downloaded => "downloaded",
            UpdatePhase::Installing => "installing",
            UpdatePhase::Errored => "errored",
        }
    }
}

impl fmt::Display for UpdatePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_line_format() {
        let sample = DownloadProgressSample {
            bytes_per_second: 1000,
            percent: 50.0,
            transferred_bytes: 500,
            total_bytes: 1000,
        };
        assert_eq!(sample.to_string(), "Download speed: 1000 - Downloaded 50% (500/1000)");
    }

    #[test]
    fn test_progress_line_keeps_fractional_percent() {
        let sample = DownloadProgressSample {
            bytes_per_second: 2048,
            percent: 12.5,
            transferred_bytes: 125,
            total_bytes: 1000,
        };
        assert_eq!(sample.to_string(), "Download speed: 2048 - Downloaded 12.5% (125/1000)");
    }

    #[test]
    fn test_phase_serde_names() {
        let json = serde_json::to_string(&UpdatePhase::NoUpdateFound).unwrap();
        assert_eq!(json, "\"no_update_found\"");
        assert_eq!(UpdatePhase::Downloading.to_string(), "downloading");
    }
}
