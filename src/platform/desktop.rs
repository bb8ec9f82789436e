//! Tauri adapters: status lines go to the webview as `message` events, prompts
//! use native dialogs, and the service follows the app lifecycle.

use std::sync::Arc;

use async_trait::async_trait;
use tauri::{AppHandle, Emitter, RunEvent, Runtime};
use tauri_plugin_dialog::{DialogExt, MessageDialogButtons};
use tokio::sync::oneshot;

use super::{StatusSink, UserPrompt};
use crate::models::{PromptRequest, UpdatePolicy};
use crate::scheduler::{ExitReason, UpdateHandle, UpdateService};
use crate::updaters::event_channel;
use crate::updaters::tauri_updater::TauriReleaseChannel;
use crate::utils::AppResult;

/// Event name the frontend listens on for status text.
pub const STATUS_EVENT: &str = "message";

pub struct TauriStatusSink<R: Runtime> {
    app: AppHandle<R>,
}

impl<R: Runtime> TauriStatusSink<R> {
    pub fn new(app: AppHandle<R>) -> Self {
        Self { app }
    }
}

impl<R: Runtime> StatusSink for TauriStatusSink<R> {
    fn report(&self, text: &str) {
        if let Err(e) = self.app.emit(STATUS_EVENT, text) {
            log::warn!("Failed to deliver update status to the window: {}", e);
        }
    }
}

pub struct TauriPrompt<R: Runtime> {
    app: AppHandle<R>,
}

impl<R: Runtime> TauriPrompt<R> {
    pub fn new(app: AppHandle<R>) -> Self {
        Self { app }
    }
}

#[async_trait]
impl<R: Runtime> UserPrompt for TauriPrompt<R> {
    async fn ask_user_choice(&self, request: &PromptRequest) -> usize {
        let (tx, rx) = oneshot::channel();
        let [accept, decline] = request.options.clone();

        self.app
            .dialog()
            .message(request.message.clone())
            .title(request.title.clone())
            .buttons(MessageDialogButtons::OkCancelCustom(accept, decline))
            .show(move |accepted| {
                let _ = tx.send(accepted);
            });

        // A dismissed or dropped dialog counts as "Later".
        match rx.await {
            Ok(true) => 0,
            _ => 1,
        }
    }
}

/// Start the update service on Tauri's runtime with the native adapters.
/// Call from the `setup` hook; it blocks briefly on the async runtime.
pub fn start<R: Runtime>(app: &AppHandle<R>, policy: UpdatePolicy) -> AppResult<UpdateHandle> {
    let (events_tx, events_rx) = event_channel();
    let channel = Arc::new(TauriReleaseChannel::new(app.clone(), events_tx.clone()));
    let sink = Arc::new(TauriStatusSink::new(app.clone()));
    let prompt = Arc::new(TauriPrompt::new(app.clone()));

    let service = UpdateService::new(policy, channel, sink, prompt)?;
    let (handle, task) = tauri::async_runtime::block_on(async move { service.spawn(events_tx, events_rx) });

    let app = app.clone();
    tauri::async_runtime::spawn(async move {
        match task.await {
            Ok(ExitReason::Installed { relaunch: false }) => app.exit(0),
            Ok(reason) => log::debug!("Update service finished: {:?}", reason),
            Err(e) => log::error!("Update service panicked: {}", e),
        }
    });
    Ok(handle)
}

/// Run-loop hook: installs a pending update before the app goes away.
pub fn handle_run_event(handle: &UpdateHandle, event: &RunEvent) {
    if let RunEvent::ExitRequested { .. } = event {
        match tauri::async_runtime::block_on(handle.quit()) {
            Ok(reason) => log::info!("Update service stopped on exit: {:?}", reason),
            Err(e) => log::warn!("Update service not running at exit: {}", e),
        }
    }
}
