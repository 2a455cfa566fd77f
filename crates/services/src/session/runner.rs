//! Async orchestration around the session machine.
//!
//! The runner is a small actor: commands in, notices out. It performs the
//! machine's effects (evaluation calls, timers, audio cues) and shields the
//! machine from stale async results via an epoch counter bumped on every
//! session start and shutdown.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use tutor_core::model::{Feedback, PhrasePack, SessionSettings, SessionSummary};

use crate::audio::AudioCoordinator;
use crate::capture::{CaptureState, ResponseCapture, ResponseGate};
use crate::error::{EvaluationError, SessionError};
use crate::evaluation::{EvaluationClient, EvaluationRequest, EvaluationResponse};
use crate::session::machine::{
    SessionEffect, SessionEvent, SessionMachine, SessionState, TimerToken,
};

//
// ─── PUBLIC SURFACE ────────────────────────────────────────────────────────────
//

/// Commands accepted by a running session.
#[derive(Debug)]
pub enum SessionCommand {
    /// Start a session over the pack, or switch packs mid-session. Switching
    /// discards all prior state, timers, and in-flight evaluations.
    Start(PhrasePack),
    /// The presentation layer finished showing the prompt.
    PromptShown,
    /// A typed transcript.
    Submit(String),
    /// Begin speech capture.
    StartCapture,
    /// End speech capture; a successful transcript is submitted.
    StopCapture,
    /// Tear the session down.
    Shutdown,
}

/// Notifications emitted toward the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionNotice {
    StateChanged(SessionState),
    FeedbackReady(Feedback),
    Advanced { index: usize },
    Completed(SessionSummary),
    Capture(CaptureState),
    StartFailed(SessionError),
}

/// Cheap cloneable handle for driving the runner.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<RunnerMessage>,
}

impl SessionHandle {
    fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.tx
            .send(RunnerMessage::Command(command))
            .map_err(|_| SessionError::Closed)
    }

    /// Start (or restart with a new pack) the session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Closed` when the runner has shut down.
    pub fn start(&self, pack: PhrasePack) -> Result<(), SessionError> {
        self.send(SessionCommand::Start(pack))
    }

    /// Signal prompt readiness.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Closed` when the runner has shut down.
    pub fn prompt_shown(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::PromptShown)
    }

    /// Submit a typed transcript.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Closed` when the runner has shut down.
    pub fn submit(&self, transcript: impl Into<String>) -> Result<(), SessionError> {
        self.send(SessionCommand::Submit(transcript.into()))
    }

    /// Begin speech capture.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Closed` when the runner has shut down.
    pub fn start_capture(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::StartCapture)
    }

    /// Stop speech capture and submit the transcript on success.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Closed` when the runner has shut down.
    pub fn stop_capture(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::StopCapture)
    }

    /// Tear the session down, cancelling timers and in-flight work.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Closed` when the runner has already shut down.
    pub fn shutdown(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Shutdown)
    }
}

//
// ─── RUNNER ────────────────────────────────────────────────────────────────────
//

enum RunnerMessage {
    Command(SessionCommand),
    EvaluationOutcome {
        epoch: u64,
        result: Result<EvaluationResponse, EvaluationError>,
    },
    AdvanceFired {
        epoch: u64,
        timer: TimerToken,
    },
    PromptCue {
        epoch: u64,
    },
}

pub struct SessionRunner {
    machine: Option<SessionMachine>,
    settings: SessionSettings,
    evaluator: Arc<dyn EvaluationClient>,
    audio: AudioCoordinator,
    capture: ResponseCapture,
    notices: mpsc::UnboundedSender<SessionNotice>,
    internal: mpsc::UnboundedSender<RunnerMessage>,
    epoch: u64,
    advance_task: Option<JoinHandle<()>>,
    prompt_task: Option<JoinHandle<()>>,
    last_state: SessionState,
}

impl SessionRunner {
    /// Spawn the runner onto the current tokio runtime.
    ///
    /// Returns the command handle and the notice stream.
    #[must_use]
    pub fn spawn(
        settings: SessionSettings,
        evaluator: Arc<dyn EvaluationClient>,
        audio: AudioCoordinator,
        capture: ResponseCapture,
    ) -> (SessionHandle, mpsc::UnboundedReceiver<SessionNotice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();

        let runner = Self {
            machine: None,
            settings,
            evaluator,
            audio,
            capture,
            notices: notice_tx,
            internal: tx.clone(),
            epoch: 0,
            advance_task: None,
            prompt_task: None,
            last_state: SessionState::Idle,
        };
        tokio::spawn(runner.run(rx));

        (SessionHandle { tx }, notice_rx)
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<RunnerMessage>) {
        while let Some(message) = rx.recv().await {
            match message {
                RunnerMessage::Command(SessionCommand::Shutdown) => break,
                RunnerMessage::Command(command) => {
                    self.handle_command(command).await;
                }
                RunnerMessage::EvaluationOutcome { epoch, result } => {
                    if epoch != self.epoch {
                        debug!("discarding evaluation result from an abandoned session");
                        continue;
                    }
                    let event = match result {
                        Ok(verdict) => SessionEvent::EvaluationResolved { verdict },
                        Err(err) => SessionEvent::EvaluationFailed {
                            message: err.to_string(),
                        },
                    };
                    self.apply(event).await;
                    if let Some(feedback) =
                        self.machine.as_ref().and_then(SessionMachine::feedback)
                    {
                        self.notify(SessionNotice::FeedbackReady(feedback.clone()));
                    }
                }
                RunnerMessage::AdvanceFired { epoch, timer } => {
                    if epoch != self.epoch {
                        debug!("discarding auto-advance from an abandoned session");
                        continue;
                    }
                    self.advance_task = None;
                    self.apply(SessionEvent::AdvanceElapsed { timer }).await;
                    if let Some(machine) = self.machine.as_ref() {
                        if machine.state() == SessionState::Presenting {
                            self.notify(SessionNotice::Advanced {
                                index: machine.current_index(),
                            });
                        }
                    }
                }
                RunnerMessage::PromptCue { epoch } => {
                    if epoch != self.epoch {
                        continue;
                    }
                    self.prompt_task = None;
                    self.apply(SessionEvent::PromptShown).await;
                }
            }
        }
        self.teardown();
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Start(pack) => {
                // Invalidate timers and in-flight evaluations from the
                // previous pack before any new state exists.
                self.epoch += 1;
                self.cancel_tasks();
                self.audio.reset();
                self.capture.reset_error();
                self.last_state = SessionState::Idle;

                match SessionMachine::new(pack, self.settings.clone()) {
                    Ok(machine) => {
                        self.machine = Some(machine);
                        self.apply(SessionEvent::Started).await;
                    }
                    Err(err) => {
                        warn!(%err, "session start rejected");
                        self.machine = None;
                        self.notify(SessionNotice::StartFailed(err));
                    }
                }
            }
            SessionCommand::PromptShown => {
                self.apply(SessionEvent::PromptShown).await;
            }
            SessionCommand::Submit(transcript) => {
                self.apply(SessionEvent::Submitted { transcript }).await;
            }
            SessionCommand::StartCapture => {
                let gate = self.response_gate();
                self.capture.start(gate).await;
                self.notify(SessionNotice::Capture(self.capture.state().clone()));
            }
            SessionCommand::StopCapture => {
                let transcript = self.capture.stop().await;
                self.notify(SessionNotice::Capture(self.capture.state().clone()));
                if let Some(transcript) = transcript {
                    self.apply(SessionEvent::Submitted { transcript }).await;
                }
            }
            // Shutdown is intercepted by the run loop.
            SessionCommand::Shutdown => {}
        }
    }

    async fn apply(&mut self, event: SessionEvent) {
        let Some(machine) = self.machine.as_mut() else {
            return;
        };
        let effects = machine.apply(event);
        let state = machine.state();
        if state != self.last_state {
            self.last_state = state;
            self.notify(SessionNotice::StateChanged(state));
        }
        for effect in effects {
            self.perform(effect).await;
        }
    }

    async fn perform(&mut self, effect: SessionEffect) {
        match effect {
            SessionEffect::Evaluate { index, transcript } => {
                let Some(request) = self.evaluation_request(index, transcript) else {
                    return;
                };
                let evaluator = Arc::clone(&self.evaluator);
                let tx = self.internal.clone();
                let epoch = self.epoch;
                tokio::spawn(async move {
                    let result = evaluator.evaluate(&request).await;
                    let _ = tx.send(RunnerMessage::EvaluationOutcome { epoch, result });
                });
            }
            SessionEffect::ScheduleAdvance { timer, delay } => {
                // Cancel-then-replace: at most one outstanding handle.
                if let Some(task) = self.advance_task.take() {
                    task.abort();
                }
                let tx = self.internal.clone();
                let epoch = self.epoch;
                self.advance_task = Some(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(RunnerMessage::AdvanceFired { epoch, timer });
                }));
            }
            SessionEffect::CancelAdvance => {
                if let Some(task) = self.advance_task.take() {
                    task.abort();
                }
            }
            SessionEffect::PlayPrompt { reference } => {
                self.audio.play(reference.as_deref(), true).await;
                self.schedule_prompt_cue();
            }
            SessionEffect::EmitSummary(summary) => {
                self.notify(SessionNotice::Completed(summary));
            }
        }
    }

    /// Internal prompt cue so the machine reaches `AwaitingResponse` even
    /// when no presentation layer reports readiness.
    fn schedule_prompt_cue(&mut self) {
        if let Some(task) = self.prompt_task.take() {
            task.abort();
        }
        let tx = self.internal.clone();
        let epoch = self.epoch;
        let delay = self.settings.prompt_delay();
        self.prompt_task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(RunnerMessage::PromptCue { epoch });
        }));
    }

    fn evaluation_request(&self, index: usize, transcript: String) -> Option<EvaluationRequest> {
        let machine = self.machine.as_ref()?;
        let phrase = machine.pack().get(index)?;
        Some(EvaluationRequest {
            phrase_id: phrase.id().clone(),
            user_transcript: transcript,
            audio_reference: phrase.audio().map(ToString::to_string),
            expected_phrase: Some(phrase.text().to_string()),
        })
    }

    fn response_gate(&self) -> ResponseGate {
        match self.machine.as_ref() {
            Some(machine) => ResponseGate {
                is_evaluating: machine.is_evaluating(),
                is_auto_advancing: machine.is_auto_advancing(),
                has_phrase: machine.pack().get(machine.current_index()).is_some()
                    && !machine.is_complete(),
            },
            None => ResponseGate::default(),
        }
    }

    fn notify(&self, notice: SessionNotice) {
        let _ = self.notices.send(notice);
    }

    fn cancel_tasks(&mut self) {
        if let Some(task) = self.advance_task.take() {
            task.abort();
        }
        if let Some(task) = self.prompt_task.take() {
            task.abort();
        }
    }

    fn teardown(&mut self) {
        self.epoch += 1;
        self.cancel_tasks();
        self.audio.reset();
    }
}

impl Drop for SessionRunner {
    fn drop(&mut self) {
        self.cancel_tasks();
    }
}
