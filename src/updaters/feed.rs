//! Release channel backed by an HTTP feed (GitHub releases or an
//! electron-builder `latest.yml` directory).

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use futures::{Stream, StreamExt};
use regex::Regex;
use sha2::{Digest, Sha512};
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use url::Url;

use super::{emit, github_releases, latest_yml, version_compare, EventSender, ReleaseChannel};
use crate::executor::installer;
use crate::models::{ChannelEvent, DownloadProgressSample, FeedSettings, InstallOptions, ReleaseInfo, UpdaterSettings};
use crate::utils::{AppError, AppResult, UpdateError};

/// Minimum spacing between progress events while streaming.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(150);

#[derive(Debug, Clone)]
enum FeedSource {
    Github { api_base: Url, owner: String, repo: String },
    Generic { base: Url },
}

pub struct FeedReleaseChannel {
    client: reqwest::Client,
    source: FeedSource,
    current_version: String,
    asset_pattern: Option<Regex>,
    allow_prerelease: bool,
    events: EventSender,
    download_dir: TempDir,
    available: Mutex<Option<ReleaseInfo>>,
    artifact: Mutex<Option<PathBuf>>,
}

impl FeedReleaseChannel {
    pub fn new(client: reqwest::Client, settings: &UpdaterSettings, events: EventSender) -> AppResult<Self> {
        let source = match &settings.feed {
            Some(FeedSettings::Github { owner, repo, api_base }) => FeedSource::Github {
                api_base: Url::parse(api_base.as_deref().unwrap_or(github_releases::DEFAULT_API_BASE))?,
                owner: owner.clone(),
                repo: repo.clone(),
            },
            Some(FeedSettings::Generic { url }) => {
                // Relative joins need a trailing slash on the directory.
                let url = if url.ends_with('/') { url.clone() } else { format!("{}/", url) };
                FeedSource::Generic { base: Url::parse(&url)? }
            }
            None => return Err(AppError::Config("no release feed configured".to_string())),
        };

        let asset_pattern = settings.asset_pattern.as_deref().map(Regex::new).transpose()?;
        let download_dir = tempfile::Builder::new().prefix("app-updater-").tempdir()?;

        Ok(Self {
            client,
            source,
            current_version: settings.current_version().to_string(),
            asset_pattern,
            allow_prerelease: settings.allow_prerelease,
            events,
            download_dir,
            available: Mutex::new(None),
            artifact: Mutex::new(None),
        })
    }

    /// Newest release on the feed, whether or not it is newer than ours.
    async fn fetch_candidate(&self) -> AppResult<Option<ReleaseInfo>> {
        match &self.source {
            FeedSource::Github { api_base, owner, repo } => {
                let Some(release) = github_releases::fetch_latest_release(
                    &self.client,
                    api_base,
                    owner,
                    repo,
                    self.allow_prerelease,
                )
                .await?
                else {
                    return Ok(None);
                };
                let asset = github_releases::select_asset(&release.assets, self.asset_pattern.as_ref()).cloned();
                if asset.is_none() {
                    log::warn!("Release {} has no asset for this platform", release.tag_name);
                }
                Ok(Some(release.into_release_info(asset.as_ref())))
            }
            FeedSource::Generic { base } => {
                let yml = latest_yml::fetch_latest_yml(&self.client, base).await?;
                Ok(Some(yml.into_release_info(base)?))
            }
        }
    }

    fn is_acceptable(&self, release: &ReleaseInfo) -> bool {
        if !self.allow_prerelease && version_compare::is_prerelease(&release.version) {
            return false;
        }
        version_compare::is_newer(&self.current_version, &release.version)
    }
}

#[async_trait]
impl ReleaseChannel for FeedReleaseChannel {
    async fn check_for_updates(&self) -> AppResult<()> {
        emit(&self.events, ChannelEvent::CheckingForUpdate);

        match self.fetch_candidate().await? {
            Some(release) if self.is_acceptable(&release) => {
                *self.available.lock().await = Some(release.clone());
                emit(&self.events, ChannelEvent::UpdateAvailable(release));
            }
            Some(release) => {
                log::debug!("Latest release {} is not newer than {}", release.version, self.current_version);
                *self.available.lock().await = None;
                emit(&self.events, ChannelEvent::UpdateNotAvailable(release));
            }
            None => {
                *self.available.lock().await = None;
                emit(
                    &self.events,
                    ChannelEvent::UpdateNotAvailable(ReleaseInfo::new(self.current_version.clone())),
                );
            }
        }
        Ok(())
    }

    async fn check_for_updates_and_notify(&self) -> AppResult<()> {
        self.check_for_updates().await?;
        if let Some(release) = self.available.lock().await.as_ref() {
            log::info!(
                "A new update is available: {} (current {})",
                release.version,
                self.current_version
            );
        }
        Ok(())
    }

    async fn download_update(&self) -> AppResult<()> {
        let release = self
            .available
            .lock()
            .await
            .clone()
            .ok_or_else(|| UpdateError::DownloadFailed("no update available to download".to_string()))?;
        let download_url = release
            .download_url
            .clone()
            .ok_or_else(|| UpdateError::DownloadFailed(format!("release {} has no artifact", release.version)))?;

        let file_name = release
            .file_name
            .clone()
            .unwrap_or_else(|| file_name_from_url(&download_url));
        let dest = self.download_dir.path().join(&file_name);

        log::info!("Downloading {} to {}", download_url, dest.display());
        let response = self.client.get(&download_url).send().await?;
        if !response.status().is_success() {
            return Err(UpdateError::DownloadFailed(format!("download returned HTTP {}", response.status())).into());
        }
        let total = response.content_length();

        self.store_artifact(response.bytes_stream(), total, release.sha512.as_deref(), &dest)
            .await?;

        *self.artifact.lock().await = Some(dest);
        emit(&self.events, ChannelEvent::UpdateDownloaded(release));
        Ok(())
    }

    async fn quit_and_install(&self, options: InstallOptions) -> AppResult<()> {
        let artifact = self
            .artifact
            .lock()
            .await
            .clone()
            .ok_or_else(|| UpdateError::InstallFailed("no downloaded update to install".to_string()))?;

        let outcome = tokio::task::spawn_blocking(move || installer::install_artifact(&artifact, options))
            .await
            .map_err(|e| UpdateError::InstallFailed(format!("install task: {}", e)))??;

        log::info!("Installed {:?} artifact (relaunched: {})", outcome.kind, outcome.relaunched);
        Ok(())
    }
}

impl FeedReleaseChannel {
    /// Stream into a staging file next to `dest` and move it into place only
    /// once it is complete and verified. A previously downloaded artifact at
    /// `dest` stays untouched until then.
    async fn store_artifact<S, B, E>(&self, stream: S, total: Option<u64>, sha512: Option<&str>, dest: &Path) -> AppResult<()>
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        AppError: From<E>,
    {
        let staging = staging_path(dest);
        if let Err(e) = self.write_staging(stream, total, sha512, &staging).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e);
        }
        tokio::fs::rename(&staging, dest).await?;
        Ok(())
    }

    async fn write_staging<S, B, E>(&self, stream: S, total: Option<u64>, sha512: Option<&str>, path: &Path) -> AppResult<()>
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        AppError: From<E>,
    {
        let mut stream = std::pin::pin!(stream);
        let mut file = tokio::fs::File::create(path).await?;
        let mut hasher = Sha512::new();
        let started = Instant::now();
        let mut last_emit = started;
        let mut transferred: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            let bytes = chunk.as_ref();
            file.write_all(bytes).await?;
            hasher.update(bytes);
            transferred += bytes.len() as u64;

            if last_emit.elapsed() >= PROGRESS_INTERVAL {
                last_emit = Instant::now();
                let sample = progress_sample(transferred, total, started.elapsed());
                emit(&self.events, ChannelEvent::DownloadProgress(sample));
            }
        }
        file.flush().await?;

        if let Some(expected) = total {
            if transferred != expected {
                return Err(UpdateError::DownloadFailed(format!(
                    "download truncated: {} of {} bytes",
                    transferred, expected
                ))
                .into());
            }
        }

        if let Some(expected) = sha512 {
            let actual = BASE64_STANDARD.encode(hasher.finalize());
            if actual != expected {
                return Err(UpdateError::DownloadFailed(format!(
                    "sha512 checksum mismatch: expected {}, got {}",
                    expected, actual
                ))
                .into());
            }
        }

        let sample = progress_sample(transferred, total, started.elapsed());
        emit(&self.events, ChannelEvent::DownloadProgress(sample));
        Ok(())
    }
}

fn staging_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

/// Average speed since the download started; an unknown total is treated as
/// what has been transferred so far.
pub fn progress_sample(transferred: u64, total: Option<u64>, elapsed: Duration) -> DownloadProgressSample {
    let total = total.unwrap_or(transferred);
    let percent = if total == 0 {
        0.0
    } else {
        transferred as f64 / total as f64 * 100.0
    };
    let secs = elapsed.as_secs_f64();
    let bytes_per_second = if secs > 0.0 {
        (transferred as f64 / secs).round() as u64
    } else {
        transferred
    };

    DownloadProgressSample {
        bytes_per_second,
        percent,
        transferred_bytes: transferred,
        total_bytes: total,
    }
}

fn file_name_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "update.bin".to_string())
}
