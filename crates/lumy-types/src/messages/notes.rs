//! `notes` target: per-page user notes.

use serde::{Deserialize, Serialize};

use crate::message_types;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(default)]
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgNotesGetNotes {
    pub step_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgNotesAdd {
    pub step_id: String,
    pub note: Note,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgNotesUpdate {
    pub step_id: String,
    pub note: Note,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgNotesDelete {
    pub step_id: String,
    pub note_id: String,
}

/// Current notes of a page, sent after every notes operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgNotesNotes {
    pub step_id: String,
    pub notes: Vec<Note>,
}

message_types!(
    MsgNotesAdd,
    MsgNotesDelete,
    MsgNotesGetNotes,
    MsgNotesNotes,
    MsgNotesUpdate,
);
