use super::{
    config::Config,
    db_ops::{NoteStore, UserStore},
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::{str::FromStr, sync::Arc};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub notes: Arc<dyn NoteStore>,
    pub users: Arc<dyn UserStore>,
    pub config: Arc<Config>,
}

pub const DEFAULT_CATEGORY: &str = "personal";

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(anyhow::anyhow!("{s} is not a valid priority")),
        }
    }
}

/// The dashboard bucket a note is displayed in. This is never stored; it is
/// always derived from `is_completed` and `reminder` against the current
/// time.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Todo,
    Upcoming,
    Done,
}

impl Status {
    pub fn derive(
        is_completed: bool,
        reminder: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        if is_completed {
            Self::Done
        } else if reminder.map_or(false, |r| r > now) {
            Self::Upcoming
        } else {
            Self::Todo
        }
    }

    /// Rewrite the stored fields of `note` so that it lands in this bucket.
    pub fn apply_to(self, note: &mut Note, now: DateTime<Utc>) {
        match self {
            Self::Done => note.is_completed = true,
            Self::Upcoming => {
                note.is_completed = false;
                if !note.reminder.map_or(false, |r| r > now) {
                    note.reminder = Some(now + Duration::days(1));
                }
            }
            Self::Todo => {
                note.is_completed = false;
                if note.reminder.map_or(false, |r| r > now) {
                    note.reminder = None;
                }
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub owner: Uuid,
    pub title: String,
    pub content: String,
    pub category: String,
    pub priority: Priority,
    pub reminder: Option<DateTime<Utc>>,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Note {
    pub fn status(&self, now: DateTime<Utc>) -> Status {
        Status::derive(self.is_completed, self.reminder, now)
    }

    pub fn view(&self, now: DateTime<Utc>) -> NoteView<'_> {
        NoteView {
            note: self,
            status: self.status(now),
        }
    }
}

/// What the API hands back: the stored note plus its status as of the time
/// the response was built.
#[derive(Debug, Serialize)]
pub struct NoteView<'a> {
    #[serde(flatten)]
    pub note: &'a Note,
    pub status: Status,
}

/// Request body for note creation. Required fields are optional here so that
/// a missing title produces a validation message instead of a parse error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDraft {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub reminder: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_completed: Option<bool>,
}

/// Partial update. Fields that are absent are left untouched; `reminder`
/// distinguishes "absent" from an explicit `null`, which clears it. Anything
/// not listed here (`owner`, `id`, `createdAt`) is ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "present")]
    pub reminder: Option<Option<DateTime<Utc>>>,
    #[serde(default)]
    pub is_completed: Option<bool>,
    #[serde(default)]
    pub status: Option<Status>,
}

fn present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: User,
}
