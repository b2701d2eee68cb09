//! `notes` target. Every operation answers with the page's current notes.

use std::sync::Arc;

use chrono::Utc;
use lumy_types::messages::{
    MsgNotesAdd, MsgNotesDelete, MsgNotesGetNotes, MsgNotesNotes, MsgNotesUpdate,
};
use lumy_types::{Target, TargetRegistry};
use tracing::warn;
use uuid::Uuid;

use crate::error::HandlerResult;
use crate::handler::{Handler, Reply, reply};
use crate::notes::NotesStore;

pub struct NotesContext {
    store: Arc<dyn NotesStore>,
}

pub fn notes_handler(
    store: Arc<dyn NotesStore>,
    registry: Arc<TargetRegistry>,
) -> Handler<NotesContext> {
    Handler::builder(Target::Notes, Arc::new(NotesContext { store }), registry)
        .on::<MsgNotesGetNotes, _, _>(|ctx, msg| async move { ctx.notes(msg.step_id) })
        .on::<MsgNotesAdd, _, _>(|ctx, msg| async move {
            let mut note = msg.note;
            note.id = Uuid::new_v4().to_string();
            note.created_at = Utc::now().to_rfc3339();
            ctx.store.add_note(&msg.step_id, note);
            ctx.notes(msg.step_id)
        })
        .on::<MsgNotesUpdate, _, _>(|ctx, msg| async move {
            let note_id = msg.note.id.clone();
            if !ctx.store.update_note(&msg.step_id, msg.note) {
                warn!(step = %msg.step_id, note = %note_id, "Note to update not found");
            }
            ctx.notes(msg.step_id)
        })
        .on::<MsgNotesDelete, _, _>(|ctx, msg| async move {
            if !ctx.store.delete_note(&msg.step_id, &msg.note_id) {
                warn!(step = %msg.step_id, note = %msg.note_id, "Note to delete not found");
            }
            ctx.notes(msg.step_id)
        })
        .build()
}

impl NotesContext {
    fn notes(&self, step_id: String) -> HandlerResult<Reply> {
        let notes = self.store.get_notes(&step_id);
        reply(&MsgNotesNotes { step_id, notes })
    }
}
