//! The session state machine.
//!
//! Pure and synchronous: events go in, a new state plus a list of effect
//! descriptions comes out. The runner owns timers, network, and audio; the
//! machine only decides.

use std::time::Duration;

use tutor_core::model::{
    Attempt, AttemptLog, Feedback, PhrasePack, SessionSettings, SessionSummary,
};

use crate::error::SessionError;
use crate::evaluation::EvaluationResponse;

//
// ─── STATES, EVENTS, EFFECTS ───────────────────────────────────────────────────
//

/// Phase of the guided-practice loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Presenting,
    AwaitingResponse,
    Evaluating,
    Feedback,
    Advancing,
    Complete,
}

/// Identity of one scheduled auto-advance. Stale timers carry an old token
/// and are ignored when they fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerToken(u64);

/// Inputs to the machine.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Session start or pack change; resets everything.
    Started,
    /// The presentation layer finished showing the current prompt.
    PromptShown,
    /// A transcript arrived from either capture path.
    Submitted { transcript: String },
    /// The evaluation call resolved.
    EvaluationResolved { verdict: EvaluationResponse },
    /// The evaluation call failed (network/exception).
    EvaluationFailed { message: String },
    /// The auto-advance timer fired.
    AdvanceElapsed { timer: TimerToken },
    /// Pack change away from this session, or teardown.
    Reset,
}

/// Side effects for the runner to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEffect {
    /// Call the evaluation client exactly once for this submission.
    Evaluate {
        index: usize,
        transcript: String,
    },
    /// Arm the auto-advance timer. Replaces any previous one.
    ScheduleAdvance { timer: TimerToken, delay: Duration },
    /// Abort any outstanding auto-advance timer.
    CancelAdvance,
    /// Autoplay cue for the newly presented phrase.
    PlayPrompt { reference: Option<String> },
    /// Deliver the session summary. Emitted exactly once per session.
    EmitSummary(SessionSummary),
}

//
// ─── MACHINE ───────────────────────────────────────────────────────────────────
//

/// Sequences one session over a fixed phrase pack.
#[derive(Debug)]
pub struct SessionMachine {
    pack: PhrasePack,
    settings: SessionSettings,
    state: SessionState,
    current_index: usize,
    attempts: AttemptLog,
    feedback: Option<Feedback>,
    last_transcript: Option<String>,
    armed_timer: Option<TimerToken>,
    next_timer: u64,
    summary_emitted: bool,
}

impl SessionMachine {
    /// Create a machine for the given pack.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` for a pack with no phrases.
    pub fn new(pack: PhrasePack, settings: SessionSettings) -> Result<Self, SessionError> {
        if pack.is_empty() {
            return Err(SessionError::Empty);
        }
        Ok(Self {
            pack,
            settings,
            state: SessionState::Idle,
            current_index: 0,
            attempts: AttemptLog::new(),
            feedback: None,
            last_transcript: None,
            armed_timer: None,
            next_timer: 0,
            summary_emitted: false,
        })
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn pack(&self) -> &PhrasePack {
        &self.pack
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    #[must_use]
    pub fn last_transcript(&self) -> Option<&str> {
        self.last_transcript.as_deref()
    }

    #[must_use]
    pub fn attempts(&self) -> &AttemptLog {
        &self.attempts
    }

    #[must_use]
    pub fn is_evaluating(&self) -> bool {
        self.state == SessionState::Evaluating
    }

    #[must_use]
    pub fn is_auto_advancing(&self) -> bool {
        self.state == SessionState::Advancing
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Complete
    }

    /// Apply one event, returning the effects the runner must perform.
    pub fn apply(&mut self, event: SessionEvent) -> Vec<SessionEffect> {
        match event {
            SessionEvent::Started => self.on_started(),
            SessionEvent::PromptShown => self.on_prompt_shown(),
            SessionEvent::Submitted { transcript } => self.on_submitted(transcript),
            SessionEvent::EvaluationResolved { verdict } => self.on_resolved(verdict),
            SessionEvent::EvaluationFailed { message } => self.on_failed(&message),
            SessionEvent::AdvanceElapsed { timer } => self.on_advance_elapsed(timer),
            SessionEvent::Reset => self.on_reset(),
        }
    }

    fn on_started(&mut self) -> Vec<SessionEffect> {
        let mut effects = Vec::new();
        if self.armed_timer.take().is_some() {
            effects.push(SessionEffect::CancelAdvance);
        }
        self.state = SessionState::Presenting;
        self.current_index = 0;
        self.attempts.clear();
        self.feedback = None;
        self.last_transcript = None;
        self.summary_emitted = false;
        effects.push(self.play_prompt_effect());
        effects
    }

    fn on_prompt_shown(&mut self) -> Vec<SessionEffect> {
        if self.state == SessionState::Presenting {
            self.state = SessionState::AwaitingResponse;
        }
        Vec::new()
    }

    fn on_submitted(&mut self, transcript: String) -> Vec<SessionEffect> {
        // Retry from Feedback re-enters Evaluating directly, never through
        // Presenting.
        if !matches!(
            self.state,
            SessionState::AwaitingResponse | SessionState::Feedback
        ) {
            return Vec::new();
        }

        let trimmed = transcript.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }

        let transcript = trimmed.to_string();
        self.last_transcript = Some(transcript.clone());
        self.state = SessionState::Evaluating;

        vec![SessionEffect::Evaluate {
            index: self.current_index,
            transcript,
        }]
    }

    fn on_resolved(&mut self, verdict: EvaluationResponse) -> Vec<SessionEffect> {
        if self.state != SessionState::Evaluating {
            return Vec::new();
        }
        let Some(phrase) = self.pack.get(self.current_index) else {
            return Vec::new();
        };

        self.attempts.record(Attempt::new(
            phrase.id().clone(),
            verdict.passed,
            verdict.score,
        ));

        let feedback = Feedback::from_verdict(
            verdict.passed,
            verdict.score,
            verdict.feedback,
            self.settings.warning_threshold(),
        )
        .with_hint(verdict.hint)
        .with_recommendation(verdict.recommendation)
        .with_focus_word(verdict.focus_word);
        self.feedback = Some(feedback);

        if verdict.passed {
            self.state = SessionState::Advancing;
            self.arm_advance_timer()
        } else {
            self.state = SessionState::Feedback;
            Vec::new()
        }
    }

    fn on_failed(&mut self, message: &str) -> Vec<SessionEffect> {
        if self.state != SessionState::Evaluating {
            return Vec::new();
        }
        // No attempt is recorded; the phrase stays retryable.
        self.feedback = Some(Feedback::evaluation_failed(message));
        self.state = SessionState::Feedback;
        Vec::new()
    }

    fn on_advance_elapsed(&mut self, timer: TimerToken) -> Vec<SessionEffect> {
        if self.armed_timer != Some(timer) || self.state != SessionState::Advancing {
            return Vec::new();
        }
        self.armed_timer = None;
        self.feedback = None;
        self.last_transcript = None;
        self.current_index += 1;

        if self.current_index < self.pack.len() {
            self.state = SessionState::Presenting;
            return vec![self.play_prompt_effect()];
        }

        self.state = SessionState::Complete;
        if self.summary_emitted {
            return Vec::new();
        }
        // Latch set before emission; cleared only by a fresh Started.
        self.summary_emitted = true;
        let total = u32::try_from(self.pack.len()).unwrap_or(u32::MAX);
        match SessionSummary::from_attempts(self.pack.id().clone(), total, &self.attempts) {
            Ok(summary) => vec![SessionEffect::EmitSummary(summary)],
            Err(_) => Vec::new(),
        }
    }

    fn on_reset(&mut self) -> Vec<SessionEffect> {
        let mut effects = Vec::new();
        if self.armed_timer.take().is_some() {
            effects.push(SessionEffect::CancelAdvance);
        }
        self.state = SessionState::Idle;
        self.current_index = 0;
        self.attempts.clear();
        self.feedback = None;
        self.last_transcript = None;
        self.summary_emitted = false;
        effects
    }

    fn arm_advance_timer(&mut self) -> Vec<SessionEffect> {
        let mut effects = Vec::new();
        // Re-arming cancels and replaces, never stacks.
        if self.armed_timer.is_some() {
            effects.push(SessionEffect::CancelAdvance);
        }
        self.next_timer += 1;
        let token = TimerToken(self.next_timer);
        self.armed_timer = Some(token);
        effects.push(SessionEffect::ScheduleAdvance {
            timer: token,
            delay: self.settings.auto_advance_delay(),
        });
        effects
    }

    fn play_prompt_effect(&self) -> SessionEffect {
        SessionEffect::PlayPrompt {
            reference: self
                .pack
                .get(self.current_index)
                .and_then(|phrase| phrase.audio())
                .map(ToString::to_string),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
