//! Shared error types for the services crate.

use thiserror::Error;

/// Errors emitted by `EvaluationClient` implementations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EvaluationError {
    #[error("evaluation request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("evaluation returned an empty response")]
    EmptyResponse,
}

/// Errors emitted by `ResponseCapture` and `SpeechCapture` backends.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CaptureError {
    #[error("speech backend error: {0}")]
    Backend(String),
}

/// Errors emitted by the audio coordinator and sinks.
///
/// These never escape `AudioCoordinator::play`; playback degrades to the
/// fallback tone instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AudioError {
    #[error("failed to fetch audio resource: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("audio sink unavailable")]
    Sink,
}

/// Errors emitted by the session machine and runner.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no phrases available for session")]
    Empty,
    #[error("session runner is shut down")]
    Closed,
}
