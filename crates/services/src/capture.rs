//! Response capture: one transcript from either manual entry or a
//! speech-to-text flow.
//!
//! Recording lifecycle is a sub-state of its own; the session machine only
//! feeds in an "allowed to respond" gate and receives transcripts back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;

use tutor_core::Clock;

use crate::error::CaptureError;

/// Text derived from a speech-to-text flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub text: String,
}

/// Hardware/network boundary for speech capture.
#[async_trait]
pub trait SpeechCapture: Send + Sync {
    /// Begin recording.
    ///
    /// # Errors
    ///
    /// Returns `CaptureError` when the microphone or recognizer cannot start.
    async fn start(&mut self) -> Result<(), CaptureError>;

    /// Stop recording and transcribe what was captured.
    ///
    /// # Errors
    ///
    /// Returns `CaptureError` when transcription fails; recording still ends.
    async fn stop(&mut self) -> Result<Transcript, CaptureError>;
}

/// Gate computed from the session machine: responding is only allowed while
/// nothing is being evaluated or auto-advanced and a phrase is on screen.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseGate {
    pub is_evaluating: bool,
    pub is_auto_advancing: bool,
    pub has_phrase: bool,
}

impl ResponseGate {
    #[must_use]
    pub fn can_respond(&self) -> bool {
        !self.is_evaluating && !self.is_auto_advancing && self.has_phrase
    }
}

/// Observable capture sub-state, independent of the session machine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureState {
    pub is_recording: bool,
    pub is_transcribing: bool,
    pub amplitude: f32,
    pub elapsed_seconds: u32,
    pub error: Option<String>,
}

/// Owns the recording lifecycle around a boxed `SpeechCapture` backend.
pub struct ResponseCapture {
    backend: Box<dyn SpeechCapture>,
    state: CaptureState,
    clock: Clock,
    recording_since: Option<DateTime<Utc>>,
}

impl ResponseCapture {
    #[must_use]
    pub fn new(backend: Box<dyn SpeechCapture>) -> Self {
        Self {
            backend,
            state: CaptureState::default(),
            clock: Clock::default(),
            recording_since: None,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.state.is_recording
    }

    /// Begin recording. A no-op while already recording or while the gate
    /// denies responding. Backend failures land in `state.error`.
    pub async fn start(&mut self, gate: ResponseGate) {
        if self.state.is_recording || !gate.can_respond() {
            return;
        }

        match self.backend.start().await {
            Ok(()) => {
                self.state.is_recording = true;
                self.state.error = None;
                self.state.amplitude = 0.0;
                self.state.elapsed_seconds = 0;
                self.recording_since = Some(self.clock.now());
            }
            Err(err) => {
                warn!(%err, "speech capture failed to start");
                self.state.error = Some(err.to_string());
            }
        }
    }

    /// Stop recording and return the transcript on success.
    ///
    /// Always transitions out of recording; on transcription failure the
    /// error is surfaced via `state.error` and `None` is returned. Callers
    /// must not evaluate a `None` transcript.
    pub async fn stop(&mut self) -> Option<String> {
        if !self.state.is_recording {
            return None;
        }

        self.state.is_recording = false;
        self.state.is_transcribing = true;
        self.refresh_elapsed();

        let result = self.backend.stop().await;

        self.state.is_transcribing = false;
        self.state.amplitude = 0.0;
        self.recording_since = None;

        match result {
            Ok(transcript) => Some(transcript.text),
            Err(err) => {
                warn!(%err, "transcription failed");
                self.state.error = Some(err.to_string());
                None
            }
        }
    }

    /// Clear a surfaced capture error.
    pub fn reset_error(&mut self) {
        self.state.error = None;
    }

    /// Latest meter reading from the backend.
    pub fn update_amplitude(&mut self, amplitude: f32) {
        if self.state.is_recording {
            self.state.amplitude = amplitude.clamp(0.0, 1.0);
            self.refresh_elapsed();
        }
    }

    fn refresh_elapsed(&mut self) {
        if let Some(since) = self.recording_since {
            let elapsed = self.clock.now().signed_duration_since(since);
            self.state.elapsed_seconds =
                u32::try_from(elapsed.num_seconds().max(0)).unwrap_or(u32::MAX);
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use tutor_core::time::fixed_clock;

    struct ScriptedBackend {
        start_result: Option<CaptureError>,
        stop_result: Result<&'static str, CaptureError>,
    }

    impl ScriptedBackend {
        fn ok(transcript: &'static str) -> Self {
            Self {
                start_result: None,
                stop_result: Ok(transcript),
            }
        }
    }

    #[async_trait]
    impl SpeechCapture for ScriptedBackend {
        async fn start(&mut self) -> Result<(), CaptureError> {
            match self.start_result.take() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }

        async fn stop(&mut self) -> Result<Transcript, CaptureError> {
            match &self.stop_result {
                Ok(text) => Ok(Transcript {
                    text: (*text).to_string(),
                }),
                Err(_) => Err(CaptureError::Backend("recognizer offline".into())),
            }
        }
    }

    fn open_gate() -> ResponseGate {
        ResponseGate {
            is_evaluating: false,
            is_auto_advancing: false,
            has_phrase: true,
        }
    }

    #[tokio::test]
    async fn start_then_stop_returns_transcript() {
        let mut capture =
            ResponseCapture::new(Box::new(ScriptedBackend::ok("hola"))).with_clock(fixed_clock());

        capture.start(open_gate()).await;
        assert!(capture.is_recording());

        let transcript = capture.stop().await;
        assert_eq!(transcript.as_deref(), Some("hola"));
        assert!(!capture.is_recording());
        assert!(capture.state().error.is_none());
    }

    #[tokio::test]
    async fn start_is_noop_while_recording() {
        let mut capture = ResponseCapture::new(Box::new(ScriptedBackend::ok("hola")));

        capture.start(open_gate()).await;
        capture.start(open_gate()).await;

        // Second start never reaches the backend.
        assert!(capture.is_recording());
    }

    #[tokio::test]
    async fn start_is_noop_while_gated() {
        let mut capture = ResponseCapture::new(Box::new(ScriptedBackend::ok("hola")));

        capture
            .start(ResponseGate {
                is_evaluating: true,
                is_auto_advancing: false,
                has_phrase: true,
            })
            .await;

        assert!(!capture.is_recording());
    }

    #[tokio::test]
    async fn start_failure_surfaces_error() {
        let backend = ScriptedBackend {
            start_result: Some(CaptureError::Backend("mic busy".into())),
            stop_result: Ok(""),
        };
        let mut capture = ResponseCapture::new(Box::new(backend));

        capture.start(open_gate()).await;

        assert!(!capture.is_recording());
        assert!(capture.state().error.as_deref().unwrap().contains("mic busy"));
    }

    #[tokio::test]
    async fn stop_failure_exits_recording_and_returns_none() {
        let backend = ScriptedBackend {
            start_result: None,
            stop_result: Err(CaptureError::Backend("recognizer offline".into())),
        };
        let mut capture = ResponseCapture::new(Box::new(backend));

        capture.start(open_gate()).await;
        let transcript = capture.stop().await;

        assert_eq!(transcript, None);
        assert!(!capture.is_recording());
        assert!(capture.state().error.is_some());

        capture.reset_error();
        assert!(capture.state().error.is_none());
    }

    #[tokio::test]
    async fn stop_without_recording_returns_none() {
        let mut capture = ResponseCapture::new(Box::new(ScriptedBackend::ok("hola")));
        assert_eq!(capture.stop().await, None);
    }

    #[tokio::test]
    async fn amplitude_is_clamped_and_ignored_when_idle() {
        let mut capture = ResponseCapture::new(Box::new(ScriptedBackend::ok("hola")));

        capture.update_amplitude(0.8);
        assert_eq!(capture.state().amplitude, 0.0);

        capture.start(open_gate()).await;
        capture.update_amplitude(1.7);
        assert_eq!(capture.state().amplitude, 1.0);
    }
}
