use chrono::{DateTime, Utc};
use url::Url;

use crate::models::ReleaseInfo;
use crate::utils::{AppError, AppResult};

/// Release description published by electron-builder next to the artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestYml {
    pub version: String,
    pub path: Option<String>,
    pub sha512: Option<String>,
    pub release_date: Option<DateTime<Utc>>,
    pub release_name: Option<String>,
}

/// Name of the feed file for this platform.
pub fn feed_file_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "latest.yml"
    } else if cfg!(target_os = "macos") {
        "latest-mac.yml"
    } else {
        "latest-linux.yml"
    }
}

/// Parse the top-level keys of a `latest.yml`. Only the flat keys are read;
/// when `path` is absent the first `files[].url` entry is used instead.
pub fn parse_latest_yml(content: &str) -> Option<LatestYml> {
    let mut version = None;
    let mut path = None;
    let mut first_file_url = None;
    let mut sha512 = None;
    let mut release_date = None;
    let mut release_name = None;

    for raw in content.lines() {
        let indented = raw.starts_with(' ') || raw.starts_with('\t');
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if indented {
            let item = line.trim_start_matches("- ");
            if let Some(url) = item.strip_prefix("url:") {
                if first_file_url.is_none() {
                    first_file_url = Some(unquote(url).to_string());
                }
            }
            continue;
        }

        if let Some((key, value)) = line.split_once(':') {
            let value = unquote(value);
            if value.is_empty() {
                continue;
            }
            match key.trim() {
                "version" => version = Some(value.to_string()),
                "path" => path = Some(value.to_string()),
                "sha512" => sha512 = Some(value.to_string()),
                "releaseName" => release_name = Some(value.to_string()),
                "releaseDate" => {
                    release_date = DateTime::parse_from_rfc3339(value)
                        .ok()
                        .map(|d| d.with_timezone(&Utc));
                }
                _ => {}
            }
        }
    }

    Some(LatestYml {
        version: version?,
        path: path.or(first_file_url),
        sha512,
        release_date,
        release_name,
    })
}

fn unquote(value: &str) -> &str {
    value.trim().trim_matches('"').trim_matches('\'')
}

impl LatestYml {
    /// Resolve the artifact against the feed directory.
    pub fn into_release_info(self, base: &Url) -> AppResult<ReleaseInfo> {
        let download_url = match &self.path {
            Some(p) => Some(base.join(p)?.to_string()),
            None => None,
        };
        let file_name = self
            .path
            .as_deref()
            .and_then(|p| p.rsplit('/').next())
            .map(str::to_string);

        Ok(ReleaseInfo {
            version: self.version,
            release_name: self.release_name,
            release_notes: None,
            release_date: self.release_date,
            download_url,
            file_name,
            sha512: self.sha512,
        })
    }
}

pub async fn fetch_latest_yml(client: &reqwest::Client, base: &Url) -> AppResult<LatestYml> {
    let url = base.join(feed_file_name())?;
    log::debug!("Fetching update feed {}", url);

    let response = client.get(url.clone()).send().await?;
    if !response.status().is_success() {
        return Err(AppError::Custom(format!(
            "Update feed {} returned HTTP {}",
            url,
            response.status()
        )));
    }

    let body = response.text().await?;
    parse_latest_yml(&body).ok_or_else(|| AppError::NotFound(format!("version in {}", url)))
}
