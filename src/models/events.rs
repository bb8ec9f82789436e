use serde::{Deserialize, Serialize};

use super::{DownloadProgressSample, ReleaseInfo, UpdatePhase};

/// Events produced by a release channel client, in the order it observes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum ChannelEvent {
    CheckingForUpdate,
    UpdateAvailable(ReleaseInfo),
    UpdateNotAvailable(ReleaseInfo),
    DownloadProgress(DownloadProgressSample),
    UpdateDownloaded(ReleaseInfo),
    Error(String),
}

impl ChannelEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ChannelEvent::CheckingForUpdate => "checking-for-update",
            ChannelEvent::UpdateAvailable(_) => "update-available",
            ChannelEvent::UpdateNotAvailable(_) => "update-not-available",
            ChannelEvent::DownloadProgress(_) => "download-progress",
            ChannelEvent::UpdateDownloaded(_) => "update-downloaded",
            ChannelEvent::Error(_) => "error",
        }
    }
}

/// Where in the lifecycle the user is being asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptStage {
    UpdateFound,
    Downloaded,
}

/// Binary choice shown to the user. Option 0 accepts; anything else declines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptRequest {
    pub stage: PromptStage,
    pub title: String,
    pub message: String,
    pub options: [String; 2],
}

/// Point-in-time view of the controller for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerSnapshot {
    pub phase: UpdatePhase,
    pub pending_artifact_ready: bool,
    pub available_version: Option<String>,
}

impl Default for ControllerSnapshot {
    fn default() -> Self {
        Self {
            phase: UpdatePhase::Idle,
            pending_artifact_ready: false,
            available_version: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_names() {
        let json = serde_json::to_value(ChannelEvent::CheckingForUpdate).unwrap();
        assert_eq!(json["event"], "checking-for-update");

        let json = serde_json::to_value(ChannelEvent::Error("boom".into())).unwrap();
        assert_eq!(json["event"], "error");
        assert_eq!(json["payload"], "boom");
        assert_eq!(ChannelEvent::Error("boom".into()).name(), "error");
    }

    #[test]
    fn test_snapshot_camel_case() {
        let json = serde_json::to_value(ControllerSnapshot::default()).unwrap();
        assert_eq!(json["phase"], "idle");
        assert_eq!(json["pendingArtifactReady"], false);
    }
}
