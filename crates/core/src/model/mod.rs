mod attempt;
mod feedback;
mod ids;
mod phrase;
mod settings;
mod summary;

pub use attempt::{Attempt, AttemptLog};
pub use feedback::{Feedback, FeedbackTone};
pub use ids::{PackId, PhraseId};
pub use phrase::{Phrase, PhraseDraft, PhraseError, PhrasePack};
pub use settings::{SessionSettings, SessionSettingsError};
pub use summary::{SessionSummary, SummaryError};
