//! Background scan for notes whose reminder is about to come due.
//!
//! Nothing is delivered yet: each tick only logs how many incomplete notes
//! fall inside the window, and the same note is picked up again on every
//! tick until it is completed. A notifier would sit behind
//! [`ReminderSource`] and keep track of what it already sent.

use super::{
    db_ops::{ListNoteQuery, NoteStore},
    models::Note,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

#[async_trait]
pub trait ReminderSource: Send + Sync {
    /// Incomplete notes, across every owner, with a reminder at or before
    /// `now` plus the lookahead window.
    async fn due_soon(&self, now: DateTime<Utc>) -> Result<Vec<Note>>;
}

pub struct StoreReminders {
    notes: Arc<dyn NoteStore>,
    lookahead: Duration,
}

impl StoreReminders {
    pub fn new(notes: Arc<dyn NoteStore>, lookahead: Duration) -> Self {
        Self { notes, lookahead }
    }
}

#[async_trait]
impl ReminderSource for StoreReminders {
    async fn due_soon(&self, now: DateTime<Utc>) -> Result<Vec<Note>> {
        self.notes
            .list(&ListNoteQuery {
                owner: None,
                is_completed: Some(false),
                reminder_before: Some(
                    now.checked_add_signed(self.lookahead)
                        .unwrap_or(DateTime::<Utc>::MAX_UTC),
                ),
            })
            .await
    }
}

/// One scan. Errors are logged and swallowed so that a failed scan never
/// stops the next one; `None` means the scan failed.
pub async fn tick(source: &dyn ReminderSource, now: DateTime<Utc>) -> Option<usize> {
    match source.due_soon(now).await {
        Ok(notes) => {
            if !notes.is_empty() {
                info!(count = notes.len(), "pending reminders");
            }
            Some(notes.len())
        }
        Err(e) => {
            error!("error checking reminders: {e:?}");
            None
        }
    }
}

pub async fn run(source: Arc<dyn ReminderSource>, period: std::time::Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(?period, "reminder poller started");
    loop {
        interval.tick().await;
        tick(source.as_ref(), Utc::now()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db_ops::memory::MemoryStore,
        models::{Priority, DEFAULT_CATEGORY},
    };
    use anyhow::bail;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    fn note(
        owner: Uuid,
        reminder: Option<DateTime<Utc>>,
        is_completed: bool,
    ) -> Note {
        Note {
            id: Uuid::new_v4(),
            owner,
            title: "t".into(),
            content: "c".into(),
            category: DEFAULT_CATEGORY.into(),
            priority: Priority::Low,
            reminder,
            is_completed,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_due_soon_selects_incomplete_notes_in_window() {
        let store = Arc::new(MemoryStore::default());
        let now = Utc::now();
        let (jack, jill) = (Uuid::new_v4(), Uuid::new_v4());

        let wanted = [
            note(jack, Some(now + Duration::minutes(4)), false),
            note(jill, Some(now - Duration::days(1)), false),
        ];
        let ignored = [
            note(jack, Some(now + Duration::minutes(6)), false),
            note(jack, Some(now + Duration::minutes(1)), true),
            note(jill, None, false),
        ];
        for n in wanted.iter().chain(ignored.iter()) {
            NoteStore::create(store.as_ref(), n).await.expect("create");
        }

        let source = StoreReminders::new(store, Duration::minutes(5));
        let mut found: Vec<Uuid> = source
            .due_soon(now)
            .await
            .expect("due soon")
            .iter()
            .map(|n| n.id)
            .collect();
        let mut expected: Vec<Uuid> = wanted.iter().map(|n| n.id).collect();
        found.sort();
        expected.sort();
        assert_eq!(found, expected);
    }

    #[tokio::test]
    async fn test_lookahead_past_the_calendar_takes_everything() {
        let store = Arc::new(MemoryStore::default());
        let now = Utc::now();
        let far = note(Uuid::new_v4(), Some(now + Duration::days(3650)), false);
        NoteStore::create(store.as_ref(), &far).await.expect("create");

        let source = StoreReminders::new(store, Duration::max_value());
        let found = source.due_soon(now).await.expect("due soon");
        assert_eq!(found, vec![far]);
    }

    #[tokio::test]
    async fn test_same_note_is_found_every_tick() {
        let store = Arc::new(MemoryStore::default());
        let now = Utc::now();
        NoteStore::create(store.as_ref(), &note(Uuid::new_v4(), Some(now), false))
            .await
            .expect("create");
        let source = StoreReminders::new(store, Duration::minutes(5));

        assert_eq!(tick(&source, now).await, Some(1));
        assert_eq!(tick(&source, now + Duration::minutes(1)).await, Some(1));
    }

    struct Flaky {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ReminderSource for Flaky {
        async fn due_soon(&self, _now: DateTime<Utc>) -> Result<Vec<Note>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                bail!("database went away");
            }
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_failed_tick_does_not_stop_the_next() {
        let source = Flaky {
            calls: AtomicUsize::new(0),
        };

        assert_eq!(tick(&source, Utc::now()).await, None);
        assert_eq!(tick(&source, Utc::now()).await, Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_keeps_polling() {
        let source = Arc::new(Flaky {
            calls: AtomicUsize::new(0),
        });
        let handle = tokio::spawn(run(
            source.clone(),
            std::time::Duration::from_secs(60),
        ));

        tokio::time::sleep(std::time::Duration::from_secs(150)).await;
        handle.abort();

        // ticks at 0s, 60s and 120s; the first one failed
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }
}
