pub mod feed;
pub mod github_releases;
pub mod latest_yml;
#[cfg(feature = "desktop")]
pub mod tauri_updater;
pub mod version_compare;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::models::{ChannelEvent, InstallOptions};
use crate::utils::AppResult;

pub use feed::FeedReleaseChannel;

pub type EventSender = mpsc::UnboundedSender<ChannelEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<ChannelEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Client for a remote release channel.
///
/// Progress and outcomes are published as [`ChannelEvent`]s on the sender the
/// client was built with. A failed operation is reported by returning `Err`
/// only, never as an additional `Error` event; the caller turns it into one.
#[async_trait]
pub trait ReleaseChannel: Send + Sync {
    async fn check_for_updates(&self) -> AppResult<()>;

    /// Same as [`check_for_updates`](Self::check_for_updates) but also raises a
    /// desktop notification when something is found.
    async fn check_for_updates_and_notify(&self) -> AppResult<()> {
        self.check_for_updates().await
    }

    async fn download_update(&self) -> AppResult<()>;

    /// Apply the downloaded artifact. With `force_restart` the new version is
    /// launched; either way the current process is expected to exit afterwards.
    async fn quit_and_install(&self, options: InstallOptions) -> AppResult<()>;
}

/// Publish an event, ignoring a receiver that already went away.
pub(crate) fn emit(tx: &EventSender, event: ChannelEvent) {
    if tx.send(event).is_err() {
        log::debug!("Update event dropped, controller stopped");
    }
}
