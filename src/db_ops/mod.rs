//! Storage seams. Services only ever see these traits; `pg` backs them with
//! Postgres and `memory` backs them with a couple of vectors for tests.

use super::models::{Note, User};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[cfg(test)]
pub mod memory;
pub mod pg;

/// Lookups are always owner-scoped; there is no way to fetch a note by id
/// alone.
pub struct GetNoteQuery {
    pub id: Uuid,
    pub owner: Uuid,
}

/// Every filter is optional, and they are AND-ed together. Results come back
/// newest `created_at` first.
#[derive(Default)]
pub struct ListNoteQuery {
    pub owner: Option<Uuid>,
    pub is_completed: Option<bool>,
    /// Only notes with a reminder at or before this instant
    pub reminder_before: Option<DateTime<Utc>>,
}

/// An in-place edit of a stored note. An error aborts the write and is handed
/// back to the caller unchanged.
pub type NoteEdit<'a> = Box<dyn FnOnce(&mut Note) -> Result<()> + Send + 'a>;

#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn get(&self, query: &GetNoteQuery) -> Result<Option<Note>>;
    async fn list(&self, query: &ListNoteQuery) -> Result<Vec<Note>>;
    async fn create(&self, note: &Note) -> Result<()>;
    /// Runs `edit` against the current row and writes the result back. No
    /// other write to the same note can land in between. Returns `None` if
    /// no such note exists.
    async fn update_with(
        &self,
        query: &GetNoteQuery,
        edit: NoteEdit<'_>,
    ) -> Result<Option<Note>>;
    async fn delete(&self, query: &GetNoteQuery) -> Result<bool>;
    async fn ping(&self) -> Result<()>;
}

pub enum GetUserQuery<'a> {
    Id(Uuid),
    /// Exact match; emails are stored lowercase
    Email(&'a str),
    /// Exact, case-sensitive match
    Username(&'a str),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get(&self, query: &GetUserQuery<'_>) -> Result<Option<User>>;
    async fn get_password_hash(&self, user_id: Uuid) -> Result<Option<String>>;
    /// Returns `false` if the username or email is already taken.
    async fn create(&self, user: &User, password_hash: &str) -> Result<bool>;
}
