#![forbid(unsafe_code)]

pub mod audio;
pub mod capture;
pub mod error;
pub mod evaluation;
pub mod session;

pub use tutor_core::Clock;

pub use error::{AudioError, CaptureError, EvaluationError, SessionError};

pub use audio::{
    AudioCoordinator, AudioResolver, AudioResolverConfig, AudioSink, PlaybackSource, RodioSink,
    ToneSpec,
};
pub use capture::{CaptureState, ResponseCapture, ResponseGate, SpeechCapture, Transcript};
pub use evaluation::{
    EvaluationClient, EvaluationConfig, EvaluationRequest, EvaluationResponse,
    HttpEvaluationClient, NextAction,
};
pub use session::{
    SessionCommand, SessionEffect, SessionEvent, SessionHandle, SessionMachine, SessionNotice,
    SessionRunner, SessionState, TimerToken,
};
