use crate::models::{PromptRequest, PromptStage, ReleaseInfo};

pub const CHECKING: &str = "Checking for update...";
pub const AVAILABLE: &str = "Update available.";
pub const NOT_AVAILABLE: &str = "Update not available.";
pub const DOWNLOADED: &str = "Update downloaded.";

pub fn prompt_for(stage: PromptStage, release: Option<&ReleaseInfo>) -> PromptRequest {
    let version = release
        .map(|r| format!(" ({})", r.version))
        .unwrap_or_default();

    let (title, message) = match stage {
        PromptStage::UpdateFound => (
            "Update Available",
            format!("A new version{} is available. Do you want to install it now?", version),
        ),
        PromptStage::Downloaded => (
            "Update Ready",
            format!(
                "A new version{} has been downloaded. Restart the application to apply the update.",
                version
            ),
        ),
    };

    PromptRequest {
        stage,
        title: title.to_string(),
        message,
        options: ["Install now".to_string(), "Later".to_string()],
    }
}
