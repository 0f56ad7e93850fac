mod definition;
mod ids;
mod question;
mod session;

pub use ids::{MaterialId, ParseIdError, QuestionId};

pub use definition::{AttemptReview, DefinitionError, ReviewItem, TestDefinition};
pub use question::{MAX_CHOICES, Question, QuestionError, QuestionKind};
pub use session::{
    AnswerEntry, AnswerSheet, Phase, SessionError, SessionProgress, SubmitTrigger, TestSession,
    Tick, is_answered,
};
