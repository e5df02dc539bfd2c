use thiserror::Error;

use crate::format::GoTo;

pub type Result<T, E = RuntimeError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Script has no sections")]
    NoSections,
    #[error("Section {0} not found")]
    SectionNotFound(String),
    #[error("Dangling goto {0:?}")]
    DanglingGoTo(GoTo),
    #[error("Dialog session not started")]
    SessionNotStarted,
    #[error("Dialog session has started")]
    SessionStarted,
    #[error("Dialog session closed")]
    SessionClosed,
    #[error("Choice {index} is not selectable (offered {offered})")]
    InvalidChoice { index: usize, offered: usize },
    #[error("Choice set {0} has no choices")]
    EmptyChoiceSet(usize),
    #[error("Exceeded {0} steps without presenting anything")]
    StepLimitExceeded(usize),

    #[error("Failed to deserialize script: {0}")]
    Deserialize(#[from] serde_json::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StatsError {
    #[error("Status effect {0} is not registered")]
    UnknownStatusEffect(String),
}
