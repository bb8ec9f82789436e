//! Update lifecycle state machine.
//!
//! The controller never performs I/O. Every input (timer tick, channel event,
//! user answer, quit) returns the [`Effect`]s the caller has to carry out, so the
//! whole lifecycle can be driven from a scripted event sequence.

pub mod status;

use crate::models::{
    ChannelEvent, ControllerSnapshot, InstallOptions, PromptRequest, PromptStage, ReleaseInfo,
    UpdatePhase, UpdatePolicy,
};
use crate::utils::UpdateError;

/// Work requested by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Status line for the status sink.
    Report(String),
    /// Ask the release channel for a newer build.
    Check { notify: bool },
    Download,
    Prompt(PromptRequest),
    Install(InstallOptions),
}

pub struct UpdateController {
    policy: UpdatePolicy,
    phase: UpdatePhase,
    pending_artifact_ready: bool,
    /// Set when the user accepted at `UpdateFound`; the download then installs.
    install_approved: bool,
    awaiting: Option<PromptStage>,
    release: Option<ReleaseInfo>,
    quitting: bool,
}

impl UpdateController {
    pub fn new(policy: UpdatePolicy) -> Self {
        Self {
            policy,
            phase: UpdatePhase::Idle,
            pending_artifact_ready: false,
            install_approved: false,
            awaiting: None,
            release: None,
            quitting: false,
        }
    }

    pub fn policy(&self) -> &UpdatePolicy {
        &self.policy
    }

    pub fn phase(&self) -> UpdatePhase {
        self.phase
    }

    pub fn pending_artifact_ready(&self) -> bool {
        self.pending_artifact_ready
    }

    pub fn awaiting_prompt(&self) -> Option<PromptStage> {
        self.awaiting
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            phase: self.phase,
            pending_artifact_ready: self.pending_artifact_ready,
            available_version: self.release.as_ref().map(|r| r.version.clone()),
        }
    }

    /// Host is ready: optionally run the first check right away.
    pub fn on_ready(&mut self) -> Vec<Effect> {
        if self.policy.check_immediately_on_ready {
            self.on_tick()
        } else {
            Vec::new()
        }
    }

    /// Timer tick or manual "check now". Dropped while anything is in flight.
    pub fn on_tick(&mut self) -> Vec<Effect> {
        if self.quitting {
            return Vec::new();
        }
        if self.phase != UpdatePhase::Idle {
            log::debug!("Skipping update check: {} in progress", self.phase);
            return Vec::new();
        }
        self.set_phase(UpdatePhase::Checking);
        vec![Effect::Check {
            notify: self.policy.notify_on_check,
        }]
    }

    pub fn on_event(&mut self, event: ChannelEvent) -> Vec<Effect> {
        match event {
            ChannelEvent::CheckingForUpdate => {
                // A channel may start a check on its own.
                if self.phase == UpdatePhase::Idle && !self.quitting {
                    self.set_phase(UpdatePhase::Checking);
                }
                vec![Effect::Report(status::CHECKING.to_string())]
            }
            ChannelEvent::UpdateAvailable(release) => self.on_update_available(release),
            ChannelEvent::UpdateNotAvailable(_) => {
                if self.phase == UpdatePhase::Checking {
                    self.set_phase(UpdatePhase::NoUpdateFound);
                    self.set_phase(UpdatePhase::Idle);
                } else {
                    log::warn!("Ignoring update-not-available while {}", self.phase);
                }
                vec![Effect::Report(status::NOT_AVAILABLE.to_string())]
            }
            ChannelEvent::DownloadProgress(sample) => {
                if self.phase == UpdatePhase::Downloading {
                    vec![Effect::Report(sample.to_string())]
                } else {
                    log::debug!("Dropping progress sample while {}", self.phase);
                    Vec::new()
                }
            }
            ChannelEvent::UpdateDownloaded(release) => self.on_update_downloaded(release),
            ChannelEvent::Error(message) => {
                let err = match self.phase {
                    UpdatePhase::Downloading | UpdatePhase::Downloaded => UpdateError::DownloadFailed(message),
                    UpdatePhase::Installing => UpdateError::InstallFailed(message),
                    _ => UpdateError::CheckFailed(message),
                };
                self.fail(err)
            }
        }
    }

    fn on_update_available(&mut self, release: ReleaseInfo) -> Vec<Effect> {
        let mut effects = vec![Effect::Report(status::AVAILABLE.to_string())];
        if self.phase != UpdatePhase::Checking {
            log::warn!("Ignoring update-available while {}", self.phase);
            return effects;
        }

        log::info!("Release {} available", release.version);
        self.release = Some(release);
        self.set_phase(UpdatePhase::UpdateFound);

        if self.policy.prompt_before_install_on_available {
            effects.push(self.prompt(PromptStage::UpdateFound));
        } else {
            self.set_phase(UpdatePhase::Downloading);
            effects.push(Effect::Download);
        }
        effects
    }

    fn on_update_downloaded(&mut self, release: ReleaseInfo) -> Vec<Effect> {
        let mut effects = vec![Effect::Report(status::DOWNLOADED.to_string())];
        if self.phase != UpdatePhase::Downloading {
            log::warn!("Ignoring update-downloaded while {}", self.phase);
            return effects;
        }

        self.release = Some(release);
        self.pending_artifact_ready = true;
        self.set_phase(UpdatePhase::Downloaded);

        if self.policy.prompt_before_install_on_downloaded {
            effects.push(self.prompt(PromptStage::Downloaded));
        } else if self.install_approved || self.policy.is_fully_silent() {
            effects.push(self.install(self.policy.install));
        } else {
            log::info!("Update ready, deferring install");
            self.set_phase(UpdatePhase::Idle);
        }
        effects
    }

    /// Answer to a prompt. Index 0 accepts; anything else declines.
    pub fn on_user_choice(&mut self, stage: PromptStage, index: usize) -> Vec<Effect> {
        if self.awaiting != Some(stage) {
            log::debug!("Ignoring stale answer for {:?} prompt", stage);
            return Vec::new();
        }
        self.awaiting = None;
        let accepted = index == 0;
        log::info!("User {} update at {:?}", if accepted { "accepted" } else { "declined" }, stage);

        match (stage, accepted) {
            (PromptStage::UpdateFound, true) => {
                self.install_approved = true;
                self.set_phase(UpdatePhase::Downloading);
                vec![Effect::Download]
            }
            (PromptStage::UpdateFound, false) => {
                self.release = None;
                self.set_phase(UpdatePhase::Idle);
                Vec::new()
            }
            (PromptStage::Downloaded, true) => vec![self.install(self.policy.install)],
            (PromptStage::Downloaded, false) => {
                self.set_phase(UpdatePhase::Idle);
                Vec::new()
            }
        }
    }

    /// Host is shutting down. Returns the fallback install, if one applies.
    pub fn on_quit(&mut self) -> Vec<Effect> {
        self.quitting = true;
        self.awaiting = None;
        if self.policy.install_on_quit && self.pending_artifact_ready && self.phase != UpdatePhase::Installing {
            log::info!("Installing downloaded update on quit");
            vec![self.install(self.policy.quit_install)]
        } else {
            Vec::new()
        }
    }

    /// The install primitive returned successfully.
    pub fn on_install_finished(&mut self) {
        self.pending_artifact_ready = false;
        self.install_approved = false;
    }

    /// Report a failure and fall back to `Idle`.
    pub fn fail(&mut self, err: UpdateError) -> Vec<Effect> {
        log::error!("Update {} failed while {}: {}", failure_kind(&err), self.phase, err);
        self.set_phase(UpdatePhase::Errored);
        self.install_approved = false;
        self.awaiting = None;
        self.release = None;
        self.set_phase(UpdatePhase::Idle);
        vec![Effect::Report(err.status_text())]
    }

    fn prompt(&mut self, stage: PromptStage) -> Effect {
        self.awaiting = Some(stage);
        Effect::Prompt(status::prompt_for(stage, self.release.as_ref()))
    }

    fn install(&mut self, options: InstallOptions) -> Effect {
        self.set_phase(UpdatePhase::Installing);
        Effect::Install(options)
    }

    fn set_phase(&mut self, phase: UpdatePhase) {
        if self.phase != phase {
            log::debug!("Update phase {} -> {}", self.phase, phase);
            self.phase = phase;
        }
    }
}

fn failure_kind(err: &UpdateError) -> &'static str {
    match err {
        UpdateError::CheckFailed(_) => "check",
        UpdateError::DownloadFailed(_) => "download",
        UpdateError::InstallFailed(_) => "install",
    }
}
