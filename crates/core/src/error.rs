use thiserror::Error;

use crate::model::{PhraseError, SessionSettingsError, SummaryError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Phrase(#[from] PhraseError),
    #[error(transparent)]
    Settings(#[from] SessionSettingsError),
    #[error(transparent)]
    Summary(#[from] SummaryError),
}
