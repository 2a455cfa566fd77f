use crate::model::ids::PhraseId;

/// The recorded outcome of one evaluated submission for a phrase.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    phrase_id: PhraseId,
    passed: bool,
    score: f32,
}

impl Attempt {
    /// Creates a new attempt. Scores are clamped to the nominal 0.0–1.0 range.
    #[must_use]
    pub fn new(phrase_id: PhraseId, passed: bool, score: f32) -> Self {
        Self {
            phrase_id,
            passed,
            score: score.clamp(0.0, 1.0),
        }
    }

    #[must_use]
    pub fn phrase_id(&self) -> &PhraseId {
        &self.phrase_id
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.passed
    }

    #[must_use]
    pub fn score(&self) -> f32 {
        self.score
    }
}

/// Insertion-ordered attempt collection, at most one entry per phrase.
///
/// Recording an attempt for a phrase already present replaces it in place,
/// keeping the original insertion position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttemptLog {
    attempts: Vec<Attempt>,
}

impl AttemptLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert an attempt keyed by phrase id.
    pub fn record(&mut self, attempt: Attempt) {
        if let Some(existing) = self
            .attempts
            .iter_mut()
            .find(|a| a.phrase_id() == attempt.phrase_id())
        {
            *existing = attempt;
        } else {
            self.attempts.push(attempt);
        }
    }

    #[must_use]
    pub fn get(&self, phrase_id: &PhraseId) -> Option<&Attempt> {
        self.attempts.iter().find(|a| a.phrase_id() == phrase_id)
    }

    /// Number of attempts with a passing outcome.
    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.attempts.iter().filter(|a| a.passed()).count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Attempt] {
        &self.attempts
    }

    pub fn clear(&mut self) {
        self.attempts.clear();
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
