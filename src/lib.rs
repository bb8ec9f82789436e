pub mod controller;
pub mod executor;
pub mod models;
pub mod platform;
pub mod scheduler;
pub mod updaters;
pub mod utils;

#[cfg(test)]
mod testing;

use std::future::Future;
use std::io::IsTerminal;
use std::sync::Arc;

use tokio::task::{JoinError, JoinHandle};

use models::{UpdatePolicy, UpdaterSettings};
use platform::{ConsolePrompt, ConsoleStatusSink, FixedAnswer, UserPrompt};
use scheduler::{ExitReason, UpdateHandle, UpdateService};
use updaters::{event_channel, FeedReleaseChannel};
use utils::{http_client, AppError, AppResult};

/// Headless entry point: keep the configured feed checked until Ctrl-C, then
/// run the quit-time install.
pub fn run() -> AppResult<ExitReason> {
    env_logger::init();

    let settings = UpdaterSettings::load();
    let policy = UpdatePolicy::from_settings(&settings)?;
    log::info!(
        "Starting updater for version {} with preset {}",
        settings.current_version(),
        settings.preset.as_str()
    );

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(async move {
        let client = http_client::create_http_client()?;
        let (events_tx, events_rx) = event_channel();
        let channel = Arc::new(FeedReleaseChannel::new(client, &settings, events_tx.clone())?);

        // Without a terminal nobody can answer, so every prompt means "Later"
        // and updates wait for the quit hook.
        let prompt: Arc<dyn UserPrompt> = if std::io::stdin().is_terminal() {
            Arc::new(ConsolePrompt::new())
        } else {
            Arc::new(FixedAnswer(1))
        };

        let service = UpdateService::new(policy, channel, Arc::new(ConsoleStatusSink), prompt)?;
        let (handle, task) = service.spawn(events_tx, events_rx);
        run_until_shutdown(handle, task, tokio::signal::ctrl_c()).await
    })
}

/// Wait for the service to stop on its own or for `shutdown` to fire, then
/// quit through the handle. A shutdown source that fails is logged and the
/// service keeps running.
async fn run_until_shutdown<F>(handle: UpdateHandle, mut task: JoinHandle<ExitReason>, shutdown: F) -> AppResult<ExitReason>
where
    F: Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        finished = &mut task => return service_result(finished),
        signal = shutdown => {
            if let Err(e) = signal {
                log::warn!("Cannot listen for Ctrl-C, running until the service stops: {}", e);
                return service_result(task.await);
            }
        }
    }

    log::info!("Shutting down");
    handle.quit().await
}

fn service_result(finished: Result<ExitReason, JoinError>) -> AppResult<ExitReason> {
    finished.map_err(|e| AppError::Custom(format!("update service failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::models::{PolicyPreset, ReleaseInfo};
    use crate::testing::{FakeChannel, RecordingSink, Script, ScriptedPrompt};

    fn spawn_service(script: Script) -> (UpdateHandle, JoinHandle<ExitReason>) {
        let (events_tx, events_rx) = event_channel();
        let service = UpdateService::new(
            PolicyPreset::FullySilent.policy(),
            Arc::new(FakeChannel::new(events_tx.clone(), script)),
            Arc::new(RecordingSink::default()),
            Arc::new(ScriptedPrompt::new(vec![])),
        )
        .unwrap();
        service.spawn(events_tx, events_rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_signal_keeps_service_running() {
        let (handle, task) = spawn_service(Script::Update(ReleaseInfo::new("9.0.0")));
        let broken = async { Err::<(), _>(std::io::Error::other("signal driver unavailable")) };

        let reason = run_until_shutdown(handle, task, broken).await.unwrap();
        assert_eq!(reason, ExitReason::Installed { relaunch: true });
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_quits_service() {
        let (handle, task) = spawn_service(Script::NoUpdate);
        let signal = async {
            tokio::time::sleep(Duration::from_secs(25)).await;
            Ok::<(), std::io::Error>(())
        };

        let reason = run_until_shutdown(handle, task, signal).await.unwrap();
        assert_eq!(reason, ExitReason::Quit { installed: false });
    }
}
