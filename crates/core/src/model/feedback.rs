/// Visual tone of a feedback message, derived from the evaluation verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackTone {
    Success,
    Warning,
    Error,
}

/// Ephemeral feedback tied to the most recent evaluation; cleared on advance.
#[derive(Debug, Clone, PartialEq)]
pub struct Feedback {
    tone: FeedbackTone,
    score: f32,
    message: String,
    hint: Option<String>,
    recommendation: Option<String>,
    focus_word: Option<String>,
}

impl Feedback {
    /// Build feedback for a resolved evaluation.
    ///
    /// Tone is `Success` when passed, `Warning` for near-miss scores at or
    /// above `warning_threshold`, and `Error` otherwise.
    #[must_use]
    pub fn from_verdict(
        passed: bool,
        score: f32,
        message: impl Into<String>,
        warning_threshold: f32,
    ) -> Self {
        let tone = if passed {
            FeedbackTone::Success
        } else if score >= warning_threshold {
            FeedbackTone::Warning
        } else {
            FeedbackTone::Error
        };
        Self {
            tone,
            score: score.clamp(0.0, 1.0),
            message: message.into(),
            hint: None,
            recommendation: None,
            focus_word: None,
        }
    }

    /// Error-tone feedback for an evaluation call that failed outright.
    ///
    /// No attempt is recorded for these; the learner may retry.
    #[must_use]
    pub fn evaluation_failed(message: impl Into<String>) -> Self {
        Self {
            tone: FeedbackTone::Error,
            score: 0.0,
            message: message.into(),
            hint: None,
            recommendation: None,
            focus_word: None,
        }
    }

    #[must_use]
    pub fn with_hint(mut self, hint: Option<String>) -> Self {
        self.hint = hint;
        self
    }

    #[must_use]
    pub fn with_recommendation(mut self, recommendation: Option<String>) -> Self {
        self.recommendation = recommendation;
        self
    }

    #[must_use]
    pub fn with_focus_word(mut self, focus_word: Option<String>) -> Self {
        self.focus_word = focus_word;
        self
    }

    #[must_use]
    pub fn tone(&self) -> FeedbackTone {
        self.tone
    }

    #[must_use]
    pub fn score(&self) -> f32 {
        self.score
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    #[must_use]
    pub fn recommendation(&self) -> Option<&str> {
        self.recommendation.as_deref()
    }

    #[must_use]
    pub fn focus_word(&self) -> Option<&str> {
        self.focus_word.as_deref()
    }
}
