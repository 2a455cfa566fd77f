use thiserror::Error;

use crate::model::attempt::{Attempt, AttemptLog};
use crate::model::ids::PackId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SummaryError {
    #[error("more attempts ({attempts}) than phrases ({total})")]
    TooManyAttempts { attempts: usize, total: u32 },

    #[error("correct count ({correct}) exceeds total ({total})")]
    CorrectExceedsTotal { correct: u32, total: u32 },
}

/// Aggregate summary for a finished practice session.
///
/// Built exactly once per session, when the index first runs past the end of
/// the phrase sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pack_id: PackId,
    total: u32,
    correct: u32,
    attempts: Vec<Attempt>,
}

impl SessionSummary {
    /// Fold the attempt log into a summary.
    ///
    /// `total` is the pack size fixed at session construction; `correct` is
    /// derived from the log, never cached elsewhere.
    ///
    /// # Errors
    ///
    /// Returns `SummaryError` if the log holds more entries than the pack has
    /// phrases.
    pub fn from_attempts(
        pack_id: PackId,
        total: u32,
        attempts: &AttemptLog,
    ) -> Result<Self, SummaryError> {
        if attempts.len() > total as usize {
            return Err(SummaryError::TooManyAttempts {
                attempts: attempts.len(),
                total,
            });
        }

        let correct = u32::try_from(attempts.correct_count()).unwrap_or(u32::MAX);
        if correct > total {
            return Err(SummaryError::CorrectExceedsTotal { correct, total });
        }

        Ok(Self {
            pack_id,
            total,
            correct,
            attempts: attempts.as_slice().to_vec(),
        })
    }

    #[must_use]
    pub fn pack_id(&self) -> &PackId {
        &self.pack_id
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    /// Attempts in insertion order.
    #[must_use]
    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }
}
