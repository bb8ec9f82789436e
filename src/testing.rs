//! In-memory collaborators for driving the update service in tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::models::{ChannelEvent, DownloadProgressSample, InstallOptions, PromptRequest, ReleaseInfo};
use crate::platform::{StatusSink, UserPrompt};
use crate::updaters::{emit, EventSender, ReleaseChannel};
use crate::utils::{AppError, AppResult, UpdateError};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Check { notify: bool },
    Download,
    Install(InstallOptions),
}

/// How the fake channel answers a check.
#[derive(Debug, Clone)]
pub enum Script {
    NoUpdate,
    Update(ReleaseInfo),
    Fail(String),
    /// The check never completes.
    Hang,
}

pub struct FakeChannel {
    events: EventSender,
    script: Script,
    install_error: Option<String>,
    calls: Mutex<Vec<Call>>,
}

impl FakeChannel {
    pub fn new(events: EventSender, script: Script) -> Self {
        Self {
            events,
            script,
            install_error: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_install(mut self, message: &str) -> Self {
        self.install_error = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    async fn check(&self) -> AppResult<()> {
        emit(&self.events, ChannelEvent::CheckingForUpdate);
        match &self.script {
            Script::NoUpdate => emit(&self.events, ChannelEvent::UpdateNotAvailable(ReleaseInfo::new("1.0.0"))),
            Script::Update(release) => emit(&self.events, ChannelEvent::UpdateAvailable(release.clone())),
            Script::Fail(message) => return Err(AppError::Custom(message.clone())),
            Script::Hang => std::future::pending::<()>().await,
        }
        Ok(())
    }
}

#[async_trait]
impl ReleaseChannel for FakeChannel {
    async fn check_for_updates(&self) -> AppResult<()> {
        self.record(Call::Check { notify: false });
        self.check().await
    }

    async fn check_for_updates_and_notify(&self) -> AppResult<()> {
        self.record(Call::Check { notify: true });
        self.check().await
    }

    async fn download_update(&self) -> AppResult<()> {
        self.record(Call::Download);
        let Script::Update(release) = &self.script else {
            return Err(UpdateError::DownloadFailed("nothing to download".into()).into());
        };
        emit(
            &self.events,
            ChannelEvent::DownloadProgress(DownloadProgressSample {
                bytes_per_second: 1000,
                percent: 50.0,
                transferred_bytes: 500,
                total_bytes: 1000,
            }),
        );
        emit(&self.events, ChannelEvent::UpdateDownloaded(release.clone()));
        Ok(())
    }

    async fn quit_and_install(&self, options: InstallOptions) -> AppResult<()> {
        self.record(Call::Install(options));
        match &self.install_error {
            Some(message) => Err(UpdateError::InstallFailed(message.clone()).into()),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn count(&self, text: &str) -> usize {
        self.lines.lock().unwrap().iter().filter(|l| *l == text).count()
    }
}

impl StatusSink for RecordingSink {
    fn report(&self, text: &str) {
        self.lines.lock().unwrap().push(text.to_string());
    }
}

/// Replays queued answers, declining once they run out.
pub struct ScriptedPrompt {
    answers: Mutex<VecDeque<usize>>,
}

impl ScriptedPrompt {
    pub fn new(answers: Vec<usize>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
        }
    }
}

#[async_trait]
impl UserPrompt for ScriptedPrompt {
    async fn ask_user_choice(&self, _request: &PromptRequest) -> usize {
        self.answers.lock().unwrap().pop_front().unwrap_or(1)
    }
}
