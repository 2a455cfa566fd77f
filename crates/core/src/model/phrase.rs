use thiserror::Error;

use crate::model::ids::{PackId, PhraseId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PhraseError {
    #[error("phrase id cannot be empty")]
    EmptyId,

    #[error("phrase text cannot be empty")]
    EmptyText,
}

//
// ─── PHRASE ────────────────────────────────────────────────────────────────────
//

/// Unvalidated phrase input as it arrives from the content source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhraseDraft {
    pub id: String,
    pub text: String,
    pub translation: Option<String>,
    pub audio: Option<String>,
}

impl PhraseDraft {
    #[must_use]
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            translation: None,
            audio: None,
        }
    }

    #[must_use]
    pub fn with_translation(mut self, translation: impl Into<String>) -> Self {
        self.translation = Some(translation.into());
        self
    }

    #[must_use]
    pub fn with_audio(mut self, reference: impl Into<String>) -> Self {
        self.audio = Some(reference.into());
        self
    }

    /// Validate and normalize the draft into an immutable `Phrase`.
    ///
    /// # Errors
    ///
    /// Returns `PhraseError::EmptyId` or `PhraseError::EmptyText` when the
    /// respective field is empty after trimming.
    pub fn validate(self) -> Result<Phrase, PhraseError> {
        let id = self.id.trim();
        if id.is_empty() {
            return Err(PhraseError::EmptyId);
        }
        let text = self.text.trim();
        if text.is_empty() {
            return Err(PhraseError::EmptyText);
        }

        Ok(Phrase {
            id: PhraseId::new(id),
            text: text.to_string(),
            translation: normalize_optional(self.translation),
            audio: normalize_optional(self.audio),
        })
    }
}

/// A single prompt unit in a practice sequence. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phrase {
    id: PhraseId,
    text: String,
    translation: Option<String>,
    audio: Option<String>,
}

impl Phrase {
    #[must_use]
    pub fn id(&self) -> &PhraseId {
        &self.id
    }

    /// Target-language text shown to the learner.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn translation(&self) -> Option<&str> {
        self.translation.as_deref()
    }

    /// Logical audio reference, resolved by the audio coordinator.
    #[must_use]
    pub fn audio(&self) -> Option<&str> {
        self.audio.as_deref()
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

//
// ─── PACK ──────────────────────────────────────────────────────────────────────
//

/// The ordered phrase sequence for one session, fixed at session start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhrasePack {
    id: PackId,
    phrases: Vec<Phrase>,
}

impl PhrasePack {
    #[must_use]
    pub fn new(id: PackId, phrases: Vec<Phrase>) -> Self {
        Self { id, phrases }
    }

    #[must_use]
    pub fn id(&self) -> &PackId {
        &self.id
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Phrase> {
        self.phrases.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    #[must_use]
    pub fn phrases(&self) -> &[Phrase] {
        &self.phrases
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_validates_and_trims() {
        let phrase = PhraseDraft::new(" p1 ", "  Hola  ")
            .with_translation("Hello")
            .with_audio("hola.mp3")
            .validate()
            .unwrap();

        assert_eq!(phrase.id(), &PhraseId::new("p1"));
        assert_eq!(phrase.text(), "Hola");
        assert_eq!(phrase.translation(), Some("Hello"));
        assert_eq!(phrase.audio(), Some("hola.mp3"));
    }

    #[test]
    fn draft_rejects_empty_id() {
        let err = PhraseDraft::new("  ", "Hola").validate().unwrap_err();
        assert_eq!(err, PhraseError::EmptyId);
    }

    #[test]
    fn draft_rejects_empty_text() {
        let err = PhraseDraft::new("p1", "   ").validate().unwrap_err();
        assert_eq!(err, PhraseError::EmptyText);
    }

    #[test]
    fn blank_optionals_become_none() {
        let phrase = PhraseDraft::new("p1", "Hola")
            .with_translation("  ")
            .validate()
            .unwrap();
        assert_eq!(phrase.translation(), None);
        assert_eq!(phrase.audio(), None);
    }

    #[test]
    fn pack_preserves_order() {
        let phrases = vec![
            PhraseDraft::new("a", "Uno").validate().unwrap(),
            PhraseDraft::new("b", "Dos").validate().unwrap(),
        ];
        let pack = PhrasePack::new(PackId::new("pack"), phrases);

        assert_eq!(pack.len(), 2);
        assert_eq!(pack.get(0).unwrap().text(), "Uno");
        assert_eq!(pack.get(1).unwrap().text(), "Dos");
        assert!(pack.get(2).is_none());
    }
}
