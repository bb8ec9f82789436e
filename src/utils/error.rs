use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Version parse error: {0}")]
    VersionParse(String),

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Update(#[from] UpdateError),

    #[error("{0}")]
    Custom(String),
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Failures of the update lifecycle itself. None of these stop the controller;
/// they are reported and the next scheduled check tries again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpdateError {
    #[error("{0}")]
    CheckFailed(String),

    #[error("{0}")]
    DownloadFailed(String),

    #[error("{0}")]
    InstallFailed(String),
}

impl UpdateError {
    pub fn message(&self) -> &str {
        match self {
            UpdateError::CheckFailed(m) | UpdateError::DownloadFailed(m) | UpdateError::InstallFailed(m) => m,
        }
    }

    /// Text shown to the user for this failure.
    pub fn status_text(&self) -> String {
        format!("Error in auto-updater. {}", self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text_appends_raw_message() {
        let err = UpdateError::CheckFailed("net::ERR_INTERNET_DISCONNECTED".to_string());
        assert_eq!(err.status_text(), "Error in auto-updater. net::ERR_INTERNET_DISCONNECTED");
    }

    #[test]
    fn test_app_error_serializes_as_string() {
        let err = AppError::Update(UpdateError::InstallFailed("installer missing".to_string()));
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, "\"installer missing\"");
    }
}
