use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use services::{
    AudioCoordinator, AudioResolver, AudioResolverConfig, AudioSink, CaptureError,
    EvaluationClient, EvaluationError, EvaluationRequest, EvaluationResponse, NextAction,
    PlaybackSource, ResponseCapture, SessionNotice, SessionRunner, SessionState, SpeechCapture,
    Transcript,
};
use tutor_core::model::{PackId, PhraseDraft, PhrasePack, SessionSettings};

//
// ─── FAKES ─────────────────────────────────────────────────────────────────────
//

/// Evaluator scripted by transcript text; counts calls.
struct ScriptedEvaluator {
    verdicts: HashMap<String, (bool, f32)>,
    calls: AtomicUsize,
}

impl ScriptedEvaluator {
    fn new(verdicts: &[(&str, bool, f32)]) -> Self {
        Self {
            verdicts: verdicts
                .iter()
                .map(|(text, passed, score)| ((*text).to_string(), (*passed, *score)))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EvaluationClient for ScriptedEvaluator {
    async fn evaluate(
        &self,
        request: &EvaluationRequest,
    ) -> Result<EvaluationResponse, EvaluationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (passed, score) = self
            .verdicts
            .get(&request.user_transcript)
            .copied()
            .ok_or(EvaluationError::EmptyResponse)?;
        Ok(EvaluationResponse {
            score,
            feedback: "scripted".into(),
            hint: None,
            passed,
            next_action: if passed {
                NextAction::Advance
            } else {
                NextAction::Retry
            },
            difficulty: None,
            error_type: None,
            recommendation: None,
            focus_word: None,
        })
    }
}

/// Evaluator whose verdicts resolve only after a scripted delay.
struct DelayedEvaluator {
    verdicts: HashMap<String, (Duration, bool, f32)>,
}

impl DelayedEvaluator {
    fn new(verdicts: &[(&str, u64, bool, f32)]) -> Self {
        Self {
            verdicts: verdicts
                .iter()
                .map(|(text, secs, passed, score)| {
                    (
                        (*text).to_string(),
                        (Duration::from_secs(*secs), *passed, *score),
                    )
                })
                .collect(),
        }
    }
}

#[async_trait]
impl EvaluationClient for DelayedEvaluator {
    async fn evaluate(
        &self,
        request: &EvaluationRequest,
    ) -> Result<EvaluationResponse, EvaluationError> {
        let (delay, passed, score) = self
            .verdicts
            .get(&request.user_transcript)
            .copied()
            .ok_or(EvaluationError::EmptyResponse)?;
        tokio::time::sleep(delay).await;
        Ok(EvaluationResponse {
            score,
            feedback: "delayed".into(),
            hint: None,
            passed,
            next_action: if passed {
                NextAction::Advance
            } else {
                NextAction::Retry
            },
            difficulty: None,
            error_type: None,
            recommendation: None,
            focus_word: None,
        })
    }
}

struct NullSink;

impl AudioSink for NullSink {
    fn play(&mut self, _source: PlaybackSource) -> Result<(), services::AudioError> {
        Ok(())
    }

    fn stop(&mut self) {}
}

struct SilentBackend;

#[async_trait]
impl SpeechCapture for SilentBackend {
    async fn start(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }

    async fn stop(&mut self) -> Result<Transcript, CaptureError> {
        Ok(Transcript {
            text: "bien gracias".into(),
        })
    }
}

fn test_audio() -> AudioCoordinator {
    let resolver = AudioResolver::new(
        AudioResolverConfig::new("https://cdn.example.com", "/audio/", std::env::temp_dir())
            .unwrap(),
    );
    AudioCoordinator::new(Box::new(NullSink), resolver)
}

fn two_phrase_pack(pack_id: &str) -> PhrasePack {
    let phrases = vec![
        PhraseDraft::new("A", "Hola").validate().unwrap(),
        PhraseDraft::new("B", "¿Cómo estás?").validate().unwrap(),
    ];
    PhrasePack::new(PackId::new(pack_id), phrases)
}

async fn next_notice(rx: &mut tokio::sync::mpsc::UnboundedReceiver<SessionNotice>) -> SessionNotice {
    tokio::time::timeout(Duration::from_secs(30), rx.recv())
        .await
        .expect("notice should arrive")
        .expect("runner should be alive")
}

async fn wait_for_state(
    rx: &mut tokio::sync::mpsc::UnboundedReceiver<SessionNotice>,
    want: SessionState,
) {
    loop {
        if next_notice(rx).await == SessionNotice::StateChanged(want) {
            return;
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[tokio::test(start_paused = true)]
async fn session_runs_to_summary_exactly_once() {
    let evaluator = Arc::new(ScriptedEvaluator::new(&[
        ("correct for A", true, 1.0),
        ("wrong for B", false, 0.3),
        ("correct for B", true, 0.9),
    ]));
    let capture = ResponseCapture::new(Box::new(SilentBackend));
    let (handle, mut rx) = SessionRunner::spawn(
        SessionSettings::default(),
        evaluator.clone(),
        test_audio(),
        capture,
    );

    handle.start(two_phrase_pack("pack-1")).unwrap();
    wait_for_state(&mut rx, SessionState::AwaitingResponse).await;

    handle.submit("correct for A").unwrap();
    wait_for_state(&mut rx, SessionState::Advancing).await;

    // The 900ms auto-advance elapses under paused time.
    loop {
        if let SessionNotice::Advanced { index } = next_notice(&mut rx).await {
            assert_eq!(index, 1);
            break;
        }
    }
    wait_for_state(&mut rx, SessionState::AwaitingResponse).await;

    handle.submit("wrong for B").unwrap();
    wait_for_state(&mut rx, SessionState::Feedback).await;

    handle.submit("correct for B").unwrap();

    let summary = loop {
        if let SessionNotice::Completed(summary) = next_notice(&mut rx).await {
            break summary;
        }
    };

    assert_eq!(summary.total(), 2);
    assert_eq!(summary.correct(), 2);
    assert_eq!(summary.attempts().len(), 2);
    assert_eq!(evaluator.calls.load(Ordering::SeqCst), 3);

    // No second completion ever arrives; the runner goes quiet.
    handle.shutdown().unwrap();
    while let Some(notice) = rx.recv().await {
        assert!(!matches!(notice, SessionNotice::Completed(_)));
    }
}

#[tokio::test(start_paused = true)]
async fn pack_change_cancels_pending_advance() {
    let evaluator = Arc::new(ScriptedEvaluator::new(&[("correct for A", true, 1.0)]));
    let capture = ResponseCapture::new(Box::new(SilentBackend));
    let (handle, mut rx) = SessionRunner::spawn(
        SessionSettings::default(),
        evaluator,
        test_audio(),
        capture,
    );

    handle.start(two_phrase_pack("pack-1")).unwrap();
    wait_for_state(&mut rx, SessionState::AwaitingResponse).await;

    handle.submit("correct for A").unwrap();
    wait_for_state(&mut rx, SessionState::Advancing).await;

    // Switch packs before the auto-advance fires.
    handle.start(two_phrase_pack("pack-2")).unwrap();
    wait_for_state(&mut rx, SessionState::AwaitingResponse).await;

    // Give any stale timer ample simulated time to fire, then shut down and
    // verify the old session never advanced the new one.
    tokio::time::sleep(Duration::from_secs(5)).await;
    handle.shutdown().unwrap();
    while let Some(notice) = rx.recv().await {
        assert!(
            !matches!(
                notice,
                SessionNotice::Advanced { .. } | SessionNotice::Completed(_)
            ),
            "stale timer leaked into the new session: {notice:?}"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn pack_change_discards_in_flight_evaluation() {
    // pack-1's passing verdict resolves after the switch, while pack-2 is
    // still evaluating its own (failing, slower) submission.
    let evaluator = Arc::new(DelayedEvaluator::new(&[
        ("respuesta vieja", 2, true, 1.0),
        ("respuesta nueva", 8, false, 0.2),
    ]));
    let capture = ResponseCapture::new(Box::new(SilentBackend));
    let (handle, mut rx) = SessionRunner::spawn(
        SessionSettings::default(),
        evaluator,
        test_audio(),
        capture,
    );

    handle.start(two_phrase_pack("pack-1")).unwrap();
    wait_for_state(&mut rx, SessionState::AwaitingResponse).await;
    handle.submit("respuesta vieja").unwrap();
    wait_for_state(&mut rx, SessionState::Evaluating).await;

    handle.start(two_phrase_pack("pack-2")).unwrap();
    wait_for_state(&mut rx, SessionState::AwaitingResponse).await;
    handle.submit("respuesta nueva").unwrap();
    wait_for_state(&mut rx, SessionState::Evaluating).await;

    // The old verdict fires first. If it leaked into the new session it
    // would surface as passing feedback and an auto-advance; the feedback
    // that arrives must be pack-2's own failing verdict.
    let feedback = loop {
        if let SessionNotice::FeedbackReady(feedback) = next_notice(&mut rx).await {
            break feedback;
        }
    };
    assert_eq!(feedback.score(), 0.2);
    assert_eq!(feedback.tone(), tutor_core::model::FeedbackTone::Error);

    handle.shutdown().unwrap();
    while let Some(notice) = rx.recv().await {
        assert!(
            !matches!(
                notice,
                SessionNotice::Advanced { .. } | SessionNotice::Completed(_)
            ),
            "stale verdict leaked into the new session: {notice:?}"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn speech_capture_path_submits_transcript() {
    let evaluator = Arc::new(ScriptedEvaluator::new(&[("bien gracias", true, 0.95)]));
    let capture = ResponseCapture::new(Box::new(SilentBackend));
    let (handle, mut rx) = SessionRunner::spawn(
        SessionSettings::default(),
        evaluator,
        test_audio(),
        capture,
    );

    let pack = PhrasePack::new(
        PackId::new("pack-speech"),
        vec![PhraseDraft::new("A", "¿Cómo estás?").validate().unwrap()],
    );
    handle.start(pack).unwrap();
    wait_for_state(&mut rx, SessionState::AwaitingResponse).await;

    handle.start_capture().unwrap();
    handle.stop_capture().unwrap();

    let summary = loop {
        if let SessionNotice::Completed(summary) = next_notice(&mut rx).await {
            break summary;
        }
    };
    assert_eq!(summary.correct(), 1);
}

#[tokio::test(start_paused = true)]
async fn evaluation_failure_keeps_session_retryable() {
    // Only the retry transcript is scripted; the first submission errors.
    let evaluator = Arc::new(ScriptedEvaluator::new(&[("hola", true, 1.0)]));
    let capture = ResponseCapture::new(Box::new(SilentBackend));
    let (handle, mut rx) = SessionRunner::spawn(
        SessionSettings::default(),
        evaluator,
        test_audio(),
        capture,
    );

    let pack = PhrasePack::new(
        PackId::new("pack-err"),
        vec![PhraseDraft::new("A", "Hola").validate().unwrap()],
    );
    handle.start(pack).unwrap();
    wait_for_state(&mut rx, SessionState::AwaitingResponse).await;

    handle.submit("unscripted answer").unwrap();
    let feedback = loop {
        if let SessionNotice::FeedbackReady(feedback) = next_notice(&mut rx).await {
            break feedback;
        }
    };
    assert_eq!(feedback.tone(), tutor_core::model::FeedbackTone::Error);

    handle.submit("hola").unwrap();
    let summary = loop {
        if let SessionNotice::Completed(summary) = next_notice(&mut rx).await {
            break summary;
        }
    };
    // The failed call recorded no attempt.
    assert_eq!(summary.attempts().len(), 1);
    assert_eq!(summary.correct(), 1);
}

#[tokio::test(start_paused = true)]
async fn empty_pack_reports_start_failure() {
    let evaluator = Arc::new(ScriptedEvaluator::new(&[]));
    let capture = ResponseCapture::new(Box::new(SilentBackend));
    let (handle, mut rx) = SessionRunner::spawn(
        SessionSettings::default(),
        evaluator,
        test_audio(),
        capture,
    );

    handle
        .start(PhrasePack::new(PackId::new("empty"), Vec::new()))
        .unwrap();

    let notice = next_notice(&mut rx).await;
    assert_eq!(
        notice,
        SessionNotice::StartFailed(services::SessionError::Empty)
    );
}
