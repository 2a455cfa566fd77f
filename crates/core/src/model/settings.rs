use std::time::Duration;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionSettingsError {
    #[error("warning threshold must be in (0, 1]")]
    InvalidWarningThreshold,

    #[error("auto advance delay must be > 0")]
    InvalidAutoAdvanceDelay,
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Tuned session parameters.
///
/// The defaults match the shipped client behavior; none of the values carry
/// semantic meaning beyond pacing.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    warning_threshold: f32,
    auto_advance_delay: Duration,
    prompt_delay: Duration,
}

impl SessionSettings {
    /// Validated constructor.
    ///
    /// # Errors
    ///
    /// Returns `SessionSettingsError` for an out-of-range threshold or a zero
    /// auto-advance delay.
    pub fn new(
        warning_threshold: f32,
        auto_advance_delay: Duration,
        prompt_delay: Duration,
    ) -> Result<Self, SessionSettingsError> {
        if !(warning_threshold > 0.0 && warning_threshold <= 1.0) {
            return Err(SessionSettingsError::InvalidWarningThreshold);
        }
        if auto_advance_delay.is_zero() {
            return Err(SessionSettingsError::InvalidAutoAdvanceDelay);
        }
        Ok(Self {
            warning_threshold,
            auto_advance_delay,
            prompt_delay,
        })
    }

    /// Score floor for warning-tone (rather than error-tone) feedback on a
    /// failed attempt.
    #[must_use]
    pub fn warning_threshold(&self) -> f32 {
        self.warning_threshold
    }

    /// Delay between a passing evaluation and the automatic advance.
    #[must_use]
    pub fn auto_advance_delay(&self) -> Duration {
        self.auto_advance_delay
    }

    /// Delay before the prompt cue for a newly presented phrase.
    #[must_use]
    pub fn prompt_delay(&self) -> Duration {
        self.prompt_delay
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            warning_threshold: 0.6,
            auto_advance_delay: Duration::from_millis(900),
            prompt_delay: Duration::from_millis(600),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let defaults = SessionSettings::default();
        let rebuilt = SessionSettings::new(
            defaults.warning_threshold(),
            defaults.auto_advance_delay(),
            defaults.prompt_delay(),
        )
        .unwrap();
        assert_eq!(rebuilt, defaults);
    }

    #[test]
    fn rejects_zero_threshold() {
        let err = SessionSettings::new(0.0, Duration::from_millis(900), Duration::ZERO)
            .unwrap_err();
        assert_eq!(err, SessionSettingsError::InvalidWarningThreshold);
    }

    #[test]
    fn rejects_zero_advance_delay() {
        let err = SessionSettings::new(0.6, Duration::ZERO, Duration::ZERO).unwrap_err();
        assert_eq!(err, SessionSettingsError::InvalidAutoAdvanceDelay);
    }
}
