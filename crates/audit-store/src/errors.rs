use thiserror::Error;

use healkit_core_types::AttemptId;

#[derive(Clone, Debug, Error)]
pub enum PersistenceErrorKind {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("outcome references unknown attempt {0}")]
    UnknownAttempt(AttemptId),
    #[error("write failed: {0}")]
    WriteFailed(String),
    #[error("read failed: {0}")]
    ReadFailed(String),
    #[error("corrupt row: {0}")]
    CorruptRow(String),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Clone, Debug, Error)]
#[error(transparent)]
pub struct PersistenceError(pub PersistenceErrorKind);

impl PersistenceError {
    pub fn new(kind: PersistenceErrorKind) -> Self {
        Self(kind)
    }

    pub fn kind(&self) -> &PersistenceErrorKind {
        &self.0
    }

    pub fn is_unknown_attempt(&self) -> bool {
        matches!(self.0, PersistenceErrorKind::UnknownAttempt(_))
    }
}

impl From<PersistenceErrorKind> for PersistenceError {
    fn from(kind: PersistenceErrorKind) -> Self {
        PersistenceError(kind)
    }
}
