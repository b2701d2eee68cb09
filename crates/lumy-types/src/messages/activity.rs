//! `activity` target: errors, processing state, progress.

use serde::{Deserialize, Serialize};

use crate::message_types;

/// The single error-reporting message of the system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgError {
    /// Correlation id, also present in server logs.
    pub id: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_message: Option<String>,
}

/// Processing state of the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum State {
    Busy,
    Idle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgExecutionState {
    pub state: State,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgProgress {
    pub progress: f64,
}

message_types!(MsgError, MsgExecutionState, MsgProgress);
