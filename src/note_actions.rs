use crate::data_store::{DataStore, StoreResult};
use crate::events::{ChangeSink, NoteChange};
use crate::models::{Note, NotePatch};

/// Note CRUD mirrors the timer flow: persist first, announce the persisted
/// record after. The rich-text document itself is opaque here.

pub fn create_note(store: &DataStore, changes: &dyn ChangeSink) -> StoreResult<Note> {
    let note = store.create_note()?;
    changes.note_changed(&NoteChange::Create { note: note.clone() });
    Ok(note)
}

pub fn update_note(
    store: &DataStore,
    changes: &dyn ChangeSink,
    id: &str,
    patch: NotePatch,
) -> StoreResult<Option<Note>> {
    let Some(note) = store.update_note(id, patch)? else {
        return Ok(None);
    };
    changes.note_changed(&NoteChange::Update { note: note.clone() });
    Ok(Some(note))
}

pub fn set_note_pinned(
    store: &DataStore,
    changes: &dyn ChangeSink,
    id: &str,
    pinned: bool,
) -> StoreResult<Option<Note>> {
    update_note(
        store,
        changes,
        id,
        NotePatch {
            is_pinned: Some(pinned),
            ..NotePatch::default()
        },
    )
}

pub fn set_note_color(
    store: &DataStore,
    changes: &dyn ChangeSink,
    id: &str,
    color: impl Into<String>,
) -> StoreResult<Option<Note>> {
    update_note(
        store,
        changes,
        id,
        NotePatch {
            color: Some(color.into()),
            ..NotePatch::default()
        },
    )
}

pub fn delete_note(store: &DataStore, changes: &dyn ChangeSink, id: &str) -> StoreResult<()> {
    store.delete_note(id)?;
    changes.note_changed(&NoteChange::Delete {
        note_id: id.to_string(),
    });
    Ok(())
}
