//! Runs an [`UpdateController`] on a tokio task.
//!
//! The task owns the controller and the check timer. Channel operations,
//! prompts and installs run on spawned tasks and report back as messages, so
//! the control loop never waits on the network or on the user.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::controller::{Effect, UpdateController};
use crate::models::{ChannelEvent, ControllerSnapshot, InstallOptions, PromptStage, UpdatePolicy};
use crate::platform::{StatusSink, UserPrompt};
use crate::updaters::{emit, EventReceiver, EventSender, ReleaseChannel};
use crate::utils::{AppError, AppResult, UpdateError};

/// Why the service stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Host quit; `installed` tells whether the quit-time install ran.
    Quit { installed: bool },
    /// An update was installed while running; the process should exit now.
    Installed { relaunch: bool },
}

enum HostSignal {
    CheckNow,
    Quit(oneshot::Sender<ExitReason>),
}

/// Cloneable handle used by the host to talk to a running service.
#[derive(Clone)]
pub struct UpdateHandle {
    signals: mpsc::UnboundedSender<HostSignal>,
    snapshot: watch::Receiver<ControllerSnapshot>,
}

impl UpdateHandle {
    /// Manual "Check for Updates". Ignored while another operation is running.
    pub fn check_now(&self) {
        let _ = self.signals.send(HostSignal::CheckNow);
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to controller state changes.
    pub fn watch(&self) -> watch::Receiver<ControllerSnapshot> {
        self.snapshot.clone()
    }

    /// Stop the timer, run the quit-time install if one is pending, and wait
    /// for the service to finish.
    pub async fn quit(&self) -> AppResult<ExitReason> {
        let (tx, rx) = oneshot::channel();
        self.signals
            .send(HostSignal::Quit(tx))
            .map_err(|_| AppError::Custom("update service already stopped".to_string()))?;
        rx.await
            .map_err(|_| AppError::Custom("update service stopped before quitting".to_string()))
    }
}

pub struct UpdateService {
    controller: UpdateController,
    channel: Arc<dyn ReleaseChannel>,
    sink: Arc<dyn StatusSink>,
    prompt: Arc<dyn UserPrompt>,
}

/// Results of spawned work flowing back into the loop.
enum Completion {
    Choice(PromptStage, usize),
    Install(InstallOptions, AppResult<()>),
}

impl UpdateService {
    /// Fails with [`AppError::Config`] when the policy's cadence is out of range.
    pub fn new(
        policy: UpdatePolicy,
        channel: Arc<dyn ReleaseChannel>,
        sink: Arc<dyn StatusSink>,
        prompt: Arc<dyn UserPrompt>,
    ) -> AppResult<Self> {
        policy.validate()?;
        Ok(Self {
            controller: UpdateController::new(policy),
            channel,
            sink,
            prompt,
        })
    }

    /// Start the service. `events_tx` must be the sender the channel publishes
    /// on; operation failures are fed back through it.
    pub fn spawn(self, events_tx: EventSender, events_rx: EventReceiver) -> (UpdateHandle, JoinHandle<ExitReason>) {
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(self.controller.snapshot());

        let task = tokio::spawn(self.run(events_tx, events_rx, signals_rx, snapshot_tx));
        let handle = UpdateHandle {
            signals: signals_tx,
            snapshot: snapshot_rx,
        };
        (handle, task)
    }

    async fn run(
        mut self,
        events_tx: EventSender,
        mut events_rx: EventReceiver,
        mut signals_rx: mpsc::UnboundedReceiver<HostSignal>,
        snapshot_tx: watch::Sender<ControllerSnapshot>,
    ) -> ExitReason {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion>();
        let cadence = self.controller.policy().check_cadence;
        log::info!("Update checks every {:?}", cadence);

        let mut ticker = time::interval_at(Instant::now() + cadence, cadence);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let effects = self.controller.on_ready();
        self.apply(effects, &events_tx, &done_tx);
        snapshot_tx.send_replace(self.controller.snapshot());

        let reason = loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let effects = self.controller.on_tick();
                    self.apply(effects, &events_tx, &done_tx);
                }
                Some(event) = events_rx.recv() => {
                    let effects = self.controller.on_event(event);
                    self.apply(effects, &events_tx, &done_tx);
                }
                Some(done) = done_rx.recv() => match done {
                    Completion::Choice(stage, index) => {
                        let effects = self.controller.on_user_choice(stage, index);
                        self.apply(effects, &events_tx, &done_tx);
                    }
                    Completion::Install(options, Ok(())) => {
                        self.controller.on_install_finished();
                        break ExitReason::Installed { relaunch: options.force_restart };
                    }
                    Completion::Install(_, Err(e)) => {
                        let effects = self.controller.fail(install_error(e));
                        self.apply(effects, &events_tx, &done_tx);
                    }
                },
                signal = signals_rx.recv() => match signal {
                    Some(HostSignal::CheckNow) => {
                        let effects = self.controller.on_tick();
                        self.apply(effects, &events_tx, &done_tx);
                    }
                    Some(HostSignal::Quit(ack)) => {
                        let reason = self.quit().await;
                        let _ = ack.send(reason);
                        break reason;
                    }
                    None => {
                        log::debug!("All update handles dropped, shutting down");
                        break self.quit().await;
                    }
                },
            }
            snapshot_tx.send_replace(self.controller.snapshot());
        };

        snapshot_tx.send_replace(self.controller.snapshot());
        log::info!("Update service stopped: {:?}", reason);
        reason
    }

    /// Quit hook: the fallback install runs to completion before returning.
    async fn quit(&mut self) -> ExitReason {
        let mut installed = false;
        for effect in self.controller.on_quit() {
            match effect {
                Effect::Install(options) => match self.channel.quit_and_install(options).await {
                    Ok(()) => {
                        self.controller.on_install_finished();
                        installed = true;
                    }
                    Err(e) => {
                        for effect in self.controller.fail(install_error(e)) {
                            if let Effect::Report(text) = effect {
                                self.report(&text);
                            }
                        }
                    }
                },
                Effect::Report(text) => self.report(&text),
                other => log::debug!("Ignoring {:?} while quitting", other),
            }
        }
        ExitReason::Quit { installed }
    }

    fn apply(&self, effects: Vec<Effect>, events_tx: &EventSender, done_tx: &mpsc::UnboundedSender<Completion>) {
        for effect in effects {
            match effect {
                Effect::Report(text) => self.report(&text),
                Effect::Check { notify } => {
                    let channel = self.channel.clone();
                    let events = events_tx.clone();
                    tokio::spawn(async move {
                        let result = if notify {
                            channel.check_for_updates_and_notify().await
                        } else {
                            channel.check_for_updates().await
                        };
                        if let Err(e) = result {
                            emit(&events, ChannelEvent::Error(error_message(&e)));
                        }
                    });
                }
                Effect::Download => {
                    let channel = self.channel.clone();
                    let events = events_tx.clone();
                    tokio::spawn(async move {
                        if let Err(e) = channel.download_update().await {
                            emit(&events, ChannelEvent::Error(error_message(&e)));
                        }
                    });
                }
                Effect::Prompt(request) => {
                    let prompt = self.prompt.clone();
                    let done = done_tx.clone();
                    tokio::spawn(async move {
                        let index = prompt.ask_user_choice(&request).await;
                        let _ = done.send(Completion::Choice(request.stage, index));
                    });
                }
                Effect::Install(options) => {
                    let channel = self.channel.clone();
                    let done = done_tx.clone();
                    tokio::spawn(async move {
                        let result = channel.quit_and_install(options).await;
                        let _ = done.send(Completion::Install(options, result));
                    });
                }
            }
        }
    }

    fn report(&self, text: &str) {
        log::info!("{}", text);
        self.sink.report(text);
    }
}

/// Raw message of a failure, without the error-kind prefix for our own errors.
fn error_message(e: &AppError) -> String {
    match e {
        AppError::Update(inner) => inner.message().to_string(),
        other => other.to_string(),
    }
}

fn install_error(e: AppError) -> UpdateError {
    match e {
        AppError::Update(UpdateError::InstallFailed(m)) => UpdateError::InstallFailed(m),
        other => UpdateError::InstallFailed(error_message(&other)),
    }
}
