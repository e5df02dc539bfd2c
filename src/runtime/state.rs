use serde::{Deserialize, Serialize};

use crate::format::GoTo;
use crate::speaker::Speaker;
use crate::storage::Storage;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    Running,
    Closed,
}

/// Resumable state of a dialog session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub current: Option<GoTo>,
    pub storage: Storage,
    pub speakers: Vec<Speaker>,
}
