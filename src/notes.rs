//! Note CRUD, always scoped to the calling user.
//!
//! A note that belongs to somebody else is reported exactly like a note that
//! does not exist, so callers cannot probe for other users' ids.

use super::{
    db_ops::{GetNoteQuery, ListNoteQuery, NoteStore},
    errors::ApiError,
    models::{Note, NoteDraft, NotePatch, User, DEFAULT_CATEGORY},
};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use tracing::debug;
use uuid::Uuid;

fn not_found() -> ApiError {
    ApiError::NotFound("Note not found".into())
}

/// Ids that don't parse can't name a note the caller owns.
fn parse_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| not_found())
}

/// Postgres keeps microseconds. Trimming up front means the note we return
/// is equal to what a later read gives back.
fn normalize(note: &mut Note) {
    note.reminder = note.reminder.map(|r| r.trunc_subsecs(6));
    note.created_at = note.created_at.trunc_subsecs(6);
}

fn validate(note: &Note) -> Result<(), ApiError> {
    if note.title.trim().is_empty() {
        return Err(ApiError::Validation("Title is required".into()));
    }
    if note.content.trim().is_empty() {
        return Err(ApiError::Validation("Content is required".into()));
    }
    if note.category.trim().is_empty() {
        return Err(ApiError::Validation("Category cannot be empty".into()));
    }
    Ok(())
}

pub async fn list(
    store: &dyn NoteStore,
    caller: &User,
) -> Result<Vec<Note>, ApiError> {
    Ok(store
        .list(&ListNoteQuery {
            owner: Some(caller.id),
            ..Default::default()
        })
        .await?)
}

pub async fn create(
    store: &dyn NoteStore,
    caller: &User,
    draft: NoteDraft,
    now: DateTime<Utc>,
    reminder_offset: Duration,
) -> Result<Note, ApiError> {
    let mut note = Note {
        id: Uuid::new_v4(),
        owner: caller.id,
        title: draft.title.unwrap_or_default(),
        content: draft.content.unwrap_or_default(),
        category: draft
            .category
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        priority: draft.priority.unwrap_or_default(),
        reminder: draft
            .reminder
            .map(|r| {
                r.checked_add_signed(reminder_offset).ok_or_else(|| {
                    ApiError::Validation("Reminder is out of range".into())
                })
            })
            .transpose()?,
        is_completed: draft.is_completed.unwrap_or(false),
        created_at: now,
    };
    normalize(&mut note);
    validate(&note)?;
    store.create(&note).await?;
    debug!(note = %note.id, owner = %caller.id, "created note");

    Ok(note)
}

pub async fn update(
    store: &dyn NoteStore,
    caller: &User,
    id: &str,
    patch: NotePatch,
    now: DateTime<Utc>,
) -> Result<Note, ApiError> {
    let query = GetNoteQuery {
        id: parse_id(id)?,
        owner: caller.id,
    };
    let edit = move |note: &mut Note| -> anyhow::Result<()> {
        if let Some(title) = patch.title {
            note.title = title;
        }
        if let Some(content) = patch.content {
            note.content = content;
        }
        if let Some(category) = patch.category {
            note.category = category;
        }
        if let Some(priority) = patch.priority {
            note.priority = priority;
        }
        if let Some(reminder) = patch.reminder {
            note.reminder = reminder;
        }
        if let Some(is_completed) = patch.is_completed {
            note.is_completed = is_completed;
        }
        if let Some(status) = patch.status {
            status.apply_to(note, now);
        }
        normalize(note);
        validate(note)?;
        Ok(())
    };

    let note = store
        .update_with(&query, Box::new(edit))
        .await
        .map_err(|e| match e.downcast::<ApiError>() {
            Ok(rejected) => rejected,
            Err(e) => ApiError::Internal(e),
        })?
        .ok_or_else(not_found)?;
    debug!(note = %note.id, owner = %caller.id, "updated note");

    Ok(note)
}

pub async fn delete(
    store: &dyn NoteStore,
    caller: &User,
    id: &str,
) -> Result<(), ApiError> {
    let query = GetNoteQuery {
        id: parse_id(id)?,
        owner: caller.id,
    };
    if !store.delete(&query).await? {
        return Err(not_found());
    }
    debug!(note = %query.id, owner = %caller.id, "deleted note");

    Ok(())
}
