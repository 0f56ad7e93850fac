use thiserror::Error;

use crate::model::{DefinitionError, QuestionError, SessionError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    #[error(transparent)]
    Session(#[from] SessionError),
}
