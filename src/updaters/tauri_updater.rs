//! Release channel backed by `tauri-plugin-updater` (signed bundles described
//! by the endpoints in `tauri.conf.json`).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tauri::{AppHandle, Manager, Runtime};
use tauri_plugin_updater::{Update, UpdaterExt};
use tokio::sync::Mutex;

use super::{emit, EventSender, ReleaseChannel};
use crate::models::{ChannelEvent, InstallOptions, ReleaseInfo};
use crate::updaters::feed::progress_sample;
use crate::utils::{AppResult, UpdateError};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(150);

/// Latest check result and the bundle downloaded for an earlier one. A check
/// that finds nothing clears `available` only; the downloaded pair stays until
/// it is installed or replaced by a newer download.
struct BundleState<U> {
    available: Option<U>,
    downloaded: Option<(U, Vec<u8>)>,
}

impl<U: Clone> BundleState<U> {
    fn new() -> Self {
        Self {
            available: None,
            downloaded: None,
        }
    }

    fn set_available(&mut self, update: Option<U>) {
        self.available = update;
    }

    fn available(&self) -> Option<U> {
        self.available.clone()
    }

    fn store_download(&mut self, update: U, bytes: Vec<u8>) {
        self.downloaded = Some((update, bytes));
    }

    fn take_download(&mut self) -> Option<(U, Vec<u8>)> {
        self.downloaded.take()
    }
}

pub struct TauriReleaseChannel<R: Runtime> {
    app: AppHandle<R>,
    events: EventSender,
    state: Mutex<BundleState<Update>>,
}

impl<R: Runtime> TauriReleaseChannel<R> {
    pub fn new(app: AppHandle<R>, events: EventSender) -> Self {
        Self {
            app,
            events,
            state: Mutex::new(BundleState::new()),
        }
    }
}

fn release_info(update: &Update) -> ReleaseInfo {
    ReleaseInfo {
        version: update.version.clone(),
        release_name: None,
        release_notes: update.body.clone(),
        release_date: update
            .date
            .and_then(|d| chrono::DateTime::from_timestamp(d.unix_timestamp(), 0)),
        download_url: Some(update.download_url.to_string()),
        file_name: None,
        sha512: None,
    }
}

fn check_failed(e: impl std::fmt::Display) -> UpdateError {
    UpdateError::CheckFailed(e.to_string())
}

#[async_trait]
impl<R: Runtime> ReleaseChannel for TauriReleaseChannel<R> {
    async fn check_for_updates(&self) -> AppResult<()> {
        emit(&self.events, ChannelEvent::CheckingForUpdate);

        let updater = self.app.updater().map_err(check_failed)?;
        let found = updater.check().await.map_err(check_failed)?;

        let mut state = self.state.lock().await;
        match found {
            Some(update) => {
                let info = release_info(&update);
                state.set_available(Some(update));
                emit(&self.events, ChannelEvent::UpdateAvailable(info));
            }
            None => {
                state.set_available(None);
                let current = self.app.package_info().version.to_string();
                emit(&self.events, ChannelEvent::UpdateNotAvailable(ReleaseInfo::new(current)));
            }
        }
        Ok(())
    }

    async fn download_update(&self) -> AppResult<()> {
        let update = self
            .state
            .lock()
            .await
            .available()
            .ok_or_else(|| UpdateError::DownloadFailed("no update available to download".to_string()))?;

        let events = self.events.clone();
        let started = Instant::now();
        let mut last_emit = started;
        let mut transferred: u64 = 0;

        let bytes = update
            .download(
                |chunk, total| {
                    transferred += chunk as u64;
                    if last_emit.elapsed() >= PROGRESS_INTERVAL {
                        last_emit = Instant::now();
                        let sample = progress_sample(transferred, total, started.elapsed());
                        emit(&events, ChannelEvent::DownloadProgress(sample));
                    }
                },
                || log::debug!("Update bundle download finished"),
            )
            .await
            .map_err(|e| UpdateError::DownloadFailed(e.to_string()))?;

        let sample = progress_sample(bytes.len() as u64, Some(bytes.len() as u64), started.elapsed());
        emit(&self.events, ChannelEvent::DownloadProgress(sample));

        let info = release_info(&update);
        self.state.lock().await.store_download(update, bytes);
        emit(&self.events, ChannelEvent::UpdateDownloaded(info));
        Ok(())
    }

    async fn quit_and_install(&self, options: InstallOptions) -> AppResult<()> {
        let (update, bytes) = self
            .state
            .lock()
            .await
            .take_download()
            .ok_or_else(|| UpdateError::InstallFailed("update bundle was not downloaded".to_string()))?;

        if options.silent {
            log::debug!("Installer mode comes from the bundle's updater configuration");
        }
        update
            .install(bytes)
            .map_err(|e| UpdateError::InstallFailed(e.to_string()))?;
        log::info!("Installed {}", update.version);

        if options.force_restart {
            self.app.restart();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_later_empty_check_keeps_downloaded_bundle() {
        let mut state = BundleState::new();
        state.set_available(Some("2.0.0".to_string()));
        let update = state.available().unwrap();
        state.store_download(update, vec![1, 2, 3]);

        state.set_available(None);
        assert!(state.available().is_none());
        assert_eq!(state.take_download(), Some(("2.0.0".to_string(), vec![1, 2, 3])));
        assert!(state.take_download().is_none());
    }

    #[test]
    fn test_newer_download_replaces_bundle() {
        let mut state = BundleState::new();
        state.store_download("2.0.0".to_string(), vec![1]);
        state.set_available(Some("2.1.0".to_string()));
        assert_eq!(state.take_download().map(|(v, _)| v).as_deref(), Some("2.0.0"));

        state.store_download("2.0.0".to_string(), vec![1]);
        state.store_download("2.1.0".to_string(), vec![2]);
        assert_eq!(state.take_download(), Some(("2.1.0".to_string(), vec![2])));
    }
}
