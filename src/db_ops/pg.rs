use super::{
    GetNoteQuery, GetUserQuery, ListNoteQuery, NoteEdit, NoteStore, UserStore,
};
use crate::models::{Note, User};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPool, query, query_as, FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

/// Postgres' error code for `unique_violation`
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone, Debug)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[derive(FromRow)]
struct NoteRes {
    id: Uuid,
    owner_id: Uuid,
    title: String,
    content: String,
    category: String,
    priority: String,
    reminder: Option<DateTime<Utc>>,
    is_completed: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<NoteRes> for Note {
    type Error = anyhow::Error;

    fn try_from(row: NoteRes) -> Result<Self> {
        Ok(Note {
            id: row.id,
            owner: row.owner_id,
            title: row.title,
            content: row.content,
            category: row.category,
            priority: row.priority.parse()?,
            reminder: row.reminder,
            is_completed: row.is_completed,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl NoteStore for PgStore {
    async fn get(&self, query: &GetNoteQuery) -> Result<Option<Note>> {
        let row = query_as::<_, NoteRes>(
            "select id, owner_id, title, content, category, priority,
                reminder, is_completed, created_at
            from note
            where id = $1 and owner_id = $2",
        )
        .bind(query.id)
        .bind(query.owner)
        .fetch_optional(&self.db)
        .await?;

        row.map(Note::try_from).transpose()
    }

    async fn list(&self, query: &ListNoteQuery) -> Result<Vec<Note>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "select id, owner_id, title, content, category, priority,
                reminder, is_completed, created_at
            from note
            where true",
        );
        if let Some(owner) = query.owner {
            builder.push(" and owner_id = ").push_bind(owner);
        }
        if let Some(is_completed) = query.is_completed {
            builder.push(" and is_completed = ").push_bind(is_completed);
        }
        if let Some(cutoff) = query.reminder_before {
            builder.push(" and reminder <= ").push_bind(cutoff);
        }
        builder.push(" order by created_at desc");

        builder
            .build_query_as::<NoteRes>()
            .fetch_all(&self.db)
            .await?
            .into_iter()
            .map(Note::try_from)
            .collect()
    }

    async fn create(&self, note: &Note) -> Result<()> {
        query(
            "insert into note (
                id, owner_id, title, content, category, priority,
                reminder, is_completed, created_at
            ) values ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(note.id)
        .bind(note.owner)
        .bind(&note.title)
        .bind(&note.content)
        .bind(&note.category)
        .bind(note.priority.as_str())
        .bind(note.reminder)
        .bind(note.is_completed)
        .bind(note.created_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn update_with(
        &self,
        query: &GetNoteQuery,
        edit: NoteEdit<'_>,
    ) -> Result<Option<Note>> {
        let mut tx = self.db.begin().await?;
        let row = query_as::<_, NoteRes>(
            "select id, owner_id, title, content, category, priority,
                reminder, is_completed, created_at
            from note
            where id = $1 and owner_id = $2
            for update",
        )
        .bind(query.id)
        .bind(query.owner)
        .fetch_optional(&mut tx)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut note = Note::try_from(row)?;
        edit(&mut note)?;

        sqlx::query(
            "update note
            set
                title = $1,
                content = $2,
                category = $3,
                priority = $4,
                reminder = $5,
                is_completed = $6
            where id = $7 and owner_id = $8",
        )
        .bind(&note.title)
        .bind(&note.content)
        .bind(&note.category)
        .bind(note.priority.as_str())
        .bind(note.reminder)
        .bind(note.is_completed)
        .bind(note.id)
        .bind(note.owner)
        .execute(&mut tx)
        .await?;
        tx.commit().await?;

        Ok(Some(note))
    }

    async fn delete(&self, query: &GetNoteQuery) -> Result<bool> {
        let res = sqlx::query("delete from note where id = $1 and owner_id = $2")
            .bind(query.id)
            .bind(query.owner)
            .execute(&self.db)
            .await?;

        Ok(res.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<()> {
        query("select 1").execute(&self.db).await?;

        Ok(())
    }
}

#[derive(FromRow)]
struct UserRes {
    id: Uuid,
    username: String,
    email: String,
}

impl From<UserRes> for User {
    fn from(row: UserRes) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
        }
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn get(&self, query: &GetUserQuery<'_>) -> Result<Option<User>> {
        let row = match query {
            GetUserQuery::Id(id) => {
                query_as::<_, UserRes>(
                    "select id, username, email from users where id = $1",
                )
                .bind(*id)
                .fetch_optional(&self.db)
                .await?
            }
            GetUserQuery::Email(email) => {
                query_as::<_, UserRes>(
                    "select id, username, email from users where email = $1",
                )
                .bind(*email)
                .fetch_optional(&self.db)
                .await?
            }
            GetUserQuery::Username(username) => {
                query_as::<_, UserRes>(
                    "select id, username, email from users
                    where username = $1",
                )
                .bind(*username)
                .fetch_optional(&self.db)
                .await?
            }
        };

        Ok(row.map(User::from))
    }

    async fn get_password_hash(&self, user_id: Uuid) -> Result<Option<String>> {
        let row: Option<(String,)> =
            query_as("select password_hash from users where id = $1")
                .bind(user_id)
                .fetch_optional(&self.db)
                .await?;

        Ok(row.map(|(digest,)| digest))
    }

    async fn create(&self, user: &User, password_hash: &str) -> Result<bool> {
        let res = query(
            "insert into users (id, username, email, password_hash)
            values ($1, $2, $3, $4)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(password_hash)
        .execute(&self.db)
        .await;

        match res {
            Ok(_) => Ok(true),
            Err(sqlx::Error::Database(e))
                if e.code().as_deref() == Some(UNIQUE_VIOLATION) =>
            {
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}
