use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use crate::models::ReleaseInfo;
use crate::utils::{AppError, AppResult};

pub const DEFAULT_API_BASE: &str = "https://api.github.com/";

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRelease {
    pub tag_name: String,
    pub name: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub draft: bool,
    pub body: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assets: Vec<GitHubAsset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubAsset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
}

/// Asset extensions tried, in order, when no pattern is configured.
fn platform_extensions() -> &'static [&'static str] {
    if cfg!(target_os = "windows") {
        &[".exe", ".msi"]
    } else if cfg!(target_os = "macos") {
        &[".dmg", ".pkg", ".zip"]
    } else {
        &[".AppImage"]
    }
}

fn releases_url(api_base: &Url, owner: &str, repo: &str, allow_prerelease: bool) -> AppResult<Url> {
    let path = if allow_prerelease {
        format!("repos/{}/{}/releases?per_page=10", owner, repo)
    } else {
        format!("repos/{}/{}/releases/latest", owner, repo)
    };
    Ok(api_base.join(&path)?)
}

/// Fetch the newest published release. `Ok(None)` when the repo has none.
pub async fn fetch_latest_release(
    client: &reqwest::Client,
    api_base: &Url,
    owner: &str,
    repo: &str,
    allow_prerelease: bool,
) -> AppResult<Option<GitHubRelease>> {
    let url = releases_url(api_base, owner, repo, allow_prerelease)?;
    log::debug!("Fetching releases from {}", url);

    let response = client
        .get(url)
        .header("Accept", "application/vnd.github+json")
        .send()
        .await?;

    match response.status() {
        StatusCode::NOT_FOUND => return Ok(None),
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
            return Err(AppError::Custom(format!(
                "GitHub API rate limit reached for {}/{}",
                owner, repo
            )));
        }
        status if !status.is_success() => {
            return Err(AppError::Custom(format!("GitHub API returned HTTP {}", status)));
        }
        _ => {}
    }

    if allow_prerelease {
        let releases: Vec<GitHubRelease> = response.json().await?;
        Ok(releases.into_iter().find(|r| !r.draft))
    } else {
        let release: GitHubRelease = response.json().await?;
        Ok((!release.draft).then_some(release))
    }
}

/// Pick the asset to download: first match of `pattern`, else the first asset
/// with a platform extension.
pub fn select_asset<'a>(assets: &'a [GitHubAsset], pattern: Option<&Regex>) -> Option<&'a GitHubAsset> {
    if let Some(re) = pattern {
        return assets.iter().find(|a| re.is_match(&a.name));
    }

    platform_extensions()
        .iter()
        .find_map(|ext| assets.iter().find(|a| a.name.ends_with(ext)))
}

impl GitHubRelease {
    pub fn into_release_info(self, asset: Option<&GitHubAsset>) -> ReleaseInfo {
        ReleaseInfo {
            version: super::version_compare::normalize_tag(&self.tag_name).to_string(),
            release_name: self.name,
            release_notes: self.body,
            release_date: self.published_at,
            download_url: asset.map(|a| a.browser_download_url.clone()),
            file_name: asset.map(|a| a.name.clone()),
            sha512: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_base(server: &MockServer) -> Url {
        Url::parse(&format!("{}/", server.uri())).unwrap()
    }

    async fn respond(server: &MockServer, route: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(response)
            .mount(server)
            .await;
    }

    const RELEASE_JSON: &str = r#"{
        "tag_name": "v2.1.0",
        "name": "Desk 2.1",
        "html_url": "https://github.com/acme/desk/releases/tag/v2.1.0",
        "prerelease": false,
        "draft": false,
        "body": "Bug fixes",
        "published_at": "2026-09-01T12:00:00Z",
        "assets": [
            { "name": "desk-2.1.0.AppImage", "browser_download_url": "https://example.com/desk-2.1.0.AppImage", "size": 1024 },
            { "name": "desk-setup-2.1.0.exe", "browser_download_url": "https://example.com/desk-setup-2.1.0.exe", "size": 2048 },
            { "name": "desk-2.1.0.dmg", "browser_download_url": "https://example.com/desk-2.1.0.dmg", "size": 4096 }
        ]
    }"#;

    #[test]
    fn test_parse_release() {
        let release: GitHubRelease = serde_json::from_str(RELEASE_JSON).unwrap();
        assert_eq!(release.assets.len(), 3);
        assert!(release.published_at.is_some());

        let asset = select_asset(&release.assets, None).cloned();
        assert!(asset.is_some(), "every platform has a matching asset");

        let info = release.into_release_info(asset.as_ref());
        assert_eq!(info.version, "2.1.0");
        assert_eq!(info.release_name.as_deref(), Some("Desk 2.1"));
        assert!(info.download_url.is_some());
    }

    #[test]
    fn test_select_asset_by_pattern() {
        let release: GitHubRelease = serde_json::from_str(RELEASE_JSON).unwrap();
        let re = Regex::new(r"setup-.*\.exe$").unwrap();
        let asset = select_asset(&release.assets, Some(&re)).unwrap();
        assert_eq!(asset.name, "desk-setup-2.1.0.exe");

        let none = Regex::new(r"\.deb$").unwrap();
        assert!(select_asset(&release.assets, Some(&none)).is_none());
    }

    #[test]
    fn test_releases_url() {
        let base = Url::parse(DEFAULT_API_BASE).unwrap();
        let latest = releases_url(&base, "acme", "desk", false).unwrap();
        assert_eq!(latest.as_str(), "https://api.github.com/repos/acme/desk/releases/latest");

        let list = releases_url(&base, "acme", "desk", true).unwrap();
        assert_eq!(list.as_str(), "https://api.github.com/repos/acme/desk/releases?per_page=10");
    }

    #[tokio::test]
    async fn test_missing_repo_has_no_release() {
        let server = MockServer::start().await;
        respond(&server, "/repos/acme/desk/releases/latest", ResponseTemplate::new(404)).await;

        let client = reqwest::Client::new();
        let release = fetch_latest_release(&client, &api_base(&server), "acme", "desk", false)
            .await
            .unwrap();
        assert!(release.is_none());
    }

    #[tokio::test]
    async fn test_rate_limit_reported() {
        for status in [403, 429] {
            let server = MockServer::start().await;
            respond(&server, "/repos/acme/desk/releases/latest", ResponseTemplate::new(status)).await;

            let client = reqwest::Client::new();
            let err = fetch_latest_release(&client, &api_base(&server), "acme", "desk", false)
                .await
                .unwrap_err();
            assert!(err.to_string().contains("rate limit"), "HTTP {}: {}", status, err);
        }
    }

    #[tokio::test]
    async fn test_latest_draft_skipped() {
        let server = MockServer::start().await;
        let mut draft: serde_json::Value = serde_json::from_str(RELEASE_JSON).unwrap();
        draft["draft"] = json!(true);
        respond(
            &server,
            "/repos/acme/desk/releases/latest",
            ResponseTemplate::new(200).set_body_json(draft),
        )
        .await;

        let client = reqwest::Client::new();
        let release = fetch_latest_release(&client, &api_base(&server), "acme", "desk", false)
            .await
            .unwrap();
        assert!(release.is_none());
    }

    #[tokio::test]
    async fn test_release_list_skips_drafts() {
        let server = MockServer::start().await;
        let published: serde_json::Value = serde_json::from_str(RELEASE_JSON).unwrap();
        let mut draft = published.clone();
        draft["tag_name"] = json!("v3.0.0-beta.1");
        draft["draft"] = json!(true);
        respond(
            &server,
            "/repos/acme/desk/releases",
            ResponseTemplate::new(200).set_body_json(json!([draft, published])),
        )
        .await;

        let client = reqwest::Client::new();
        let release = fetch_latest_release(&client, &api_base(&server), "acme", "desk", true)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(release.tag_name, "v2.1.0");
    }
}
