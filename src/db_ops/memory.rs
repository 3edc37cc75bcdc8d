use super::{
    GetNoteQuery, GetUserQuery, ListNoteQuery, NoteEdit, NoteStore, UserStore,
};
use crate::models::{Note, User};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};
use uuid::Uuid;

/// Store used by tests. Flip `offline` to make every call fail the way an
/// unreachable database would.
#[derive(Default)]
pub struct MemoryStore {
    notes: Mutex<Vec<Note>>,
    users: Mutex<Vec<(User, String)>>,
    pub offline: AtomicBool,
}

fn matches(query: &ListNoteQuery, note: &Note) -> bool {
    query.owner.map_or(true, |owner| note.owner == owner)
        && query
            .is_completed
            .map_or(true, |done| note.is_completed == done)
        && query.reminder_before.map_or(true, |cutoff| {
            note.reminder.map_or(false, |r| r <= cutoff)
        })
}

impl MemoryStore {
    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            bail!("connection refused");
        }
        Ok(())
    }
}

#[async_trait]
impl NoteStore for MemoryStore {
    async fn get(&self, query: &GetNoteQuery) -> Result<Option<Note>> {
        self.check_online()?;
        let notes = self.notes.lock().expect("lock");

        Ok(notes
            .iter()
            .find(|n| n.id == query.id && n.owner == query.owner)
            .cloned())
    }

    async fn list(&self, query: &ListNoteQuery) -> Result<Vec<Note>> {
        self.check_online()?;
        let notes = self.notes.lock().expect("lock");
        let mut res: Vec<Note> =
            notes.iter().filter(|n| matches(query, n)).cloned().collect();
        res.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(res)
    }

    async fn create(&self, note: &Note) -> Result<()> {
        self.check_online()?;
        self.notes.lock().expect("lock").push(note.clone());

        Ok(())
    }

    async fn update_with(
        &self,
        query: &GetNoteQuery,
        edit: NoteEdit<'_>,
    ) -> Result<Option<Note>> {
        self.check_online()?;
        let mut notes = self.notes.lock().expect("lock");
        let Some(existing) = notes
            .iter_mut()
            .find(|n| n.id == query.id && n.owner == query.owner)
        else {
            return Ok(None);
        };
        let mut note = existing.clone();
        edit(&mut note)?;
        // only the columns the pg store writes
        existing.title = note.title.clone();
        existing.content = note.content.clone();
        existing.category = note.category.clone();
        existing.priority = note.priority;
        existing.reminder = note.reminder;
        existing.is_completed = note.is_completed;

        Ok(Some(existing.clone()))
    }

    async fn delete(&self, query: &GetNoteQuery) -> Result<bool> {
        self.check_online()?;
        let mut notes = self.notes.lock().expect("lock");
        let before = notes.len();
        notes.retain(|n| !(n.id == query.id && n.owner == query.owner));

        Ok(notes.len() != before)
    }

    async fn ping(&self) -> Result<()> {
        self.check_online()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get(&self, query: &GetUserQuery<'_>) -> Result<Option<User>> {
        self.check_online()?;
        let users = self.users.lock().expect("lock");

        Ok(users
            .iter()
            .map(|(user, _)| user)
            .find(|user| match query {
                GetUserQuery::Id(id) => user.id == *id,
                GetUserQuery::Email(email) => user.email == *email,
                GetUserQuery::Username(username) => user.username == *username,
            })
            .cloned())
    }

    async fn get_password_hash(&self, user_id: Uuid) -> Result<Option<String>> {
        self.check_online()?;
        let users = self.users.lock().expect("lock");

        Ok(users
            .iter()
            .find(|(user, _)| user.id == user_id)
            .map(|(_, digest)| digest.clone()))
    }

    async fn create(&self, user: &User, password_hash: &str) -> Result<bool> {
        self.check_online()?;
        let mut users = self.users.lock().expect("lock");
        if users
            .iter()
            .any(|(u, _)| u.username == user.username || u.email == user.email)
        {
            return Ok(false);
        }
        users.push((user.clone(), password_hash.to_string()));

        Ok(true)
    }
}
