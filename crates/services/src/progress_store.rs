//! Write-through cache in front of the remote lesson-progress store.
//!
//! Reads fail soft to the zero state. Writes are coalesced per lesson: an
//! ordinary update waits out the save window and only the latest value is
//! sent, while the first `completed = true` for a lesson goes out after a
//! short flush delay.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use course_core::model::{LessonId, LessonProgress};
use storage::repository::{ProgressRecord, ProgressRepository, StorageError};
use tracing::{debug, warn};

use crate::notify::{Notice, Notifier};
use crate::task::ScheduledTask;

struct Pending {
    progress: LessonProgress,
    ticket: u64,
    urgent: bool,
    timer: Option<ScheduledTask>,
}

#[derive(Default)]
struct StoreState {
    cache: HashMap<LessonId, LessonProgress>,
    pending: HashMap<LessonId, Pending>,
    next_ticket: u64,
}

struct Inner {
    repo: Arc<dyn ProgressRepository>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<StoreState>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, StoreState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    async fn write(&self, lesson: LessonId, progress: LessonProgress) {
        let record = ProgressRecord::from_progress(&progress);
        match self.repo.put_progress(lesson, &record).await {
            Ok(()) => debug!(
                %lesson,
                watched = record.watched_time,
                completed = record.completed,
                "progress saved"
            ),
            Err(err) => {
                warn!(%lesson, %err, "progress write failed");
                self.notifier.notify(Notice::advisory(
                    "Progress not saved",
                    "Your progress could not be saved. It will be retried on the next update.",
                ));
            }
        }
    }

    /// Timer callback: send the pending write if it is still the one armed.
    async fn fire(&self, lesson: LessonId, ticket: u64) {
        let progress = {
            let mut state = self.state();
            match state.pending.get(&lesson) {
                Some(p) if p.ticket == ticket => {}
                _ => return,
            }
            let Some(pending) = state.pending.remove(&lesson) else {
                return;
            };
            // This code runs inside the timer's own task.
            if let Some(timer) = pending.timer {
                timer.disarm();
            }
            pending.progress
        };
        self.write(lesson, progress).await;
    }
}

/// Debounced client for per-lesson progress.
///
/// Cheap to clone; clones share the cache and pending writes. Saving must
/// happen inside a tokio runtime since timers are spawned tasks.
#[derive(Clone)]
pub struct ProgressStoreClient {
    inner: Arc<Inner>,
    save_window: Duration,
    completion_flush: Duration,
}

impl ProgressStoreClient {
    #[must_use]
    pub fn new(repo: Arc<dyn ProgressRepository>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            inner: Arc::new(Inner {
                repo,
                notifier,
                state: Mutex::new(StoreState::default()),
            }),
            save_window: Duration::from_secs(5),
            completion_flush: Duration::from_millis(200),
        }
    }

    /// Override the save window and the completion flush delay.
    #[must_use]
    pub fn with_windows(mut self, save_window: Duration, completion_flush: Duration) -> Self {
        self.save_window = save_window;
        self.completion_flush = completion_flush;
        self
    }

    /// Progress for a lesson, from the session cache when possible.
    ///
    /// Never fails: an unreachable backend yields the zero state. A missing
    /// record means the lesson was never watched.
    pub async fn fetch_progress(&self, lesson: LessonId) -> LessonProgress {
        if let Some(cached) = self.cached(lesson) {
            return cached;
        }
        let fetched = match self.inner.repo.get_progress(lesson).await {
            Ok(Some(record)) => record.into_progress(),
            Ok(None) => LessonProgress::zero(),
            Err(StorageError::NotFound) => LessonProgress::zero(),
            Err(err) => {
                warn!(%lesson, %err, "progress read failed; starting from zero");
                return LessonProgress::zero();
            }
        };
        let mut state = self.inner.state();
        let entry = state.cache.entry(lesson).or_insert(fetched);
        *entry = entry.merge(fetched);
        *entry
    }

    #[must_use]
    pub fn cached(&self, lesson: LessonId) -> Option<LessonProgress> {
        self.inner.state().cache.get(&lesson).copied()
    }

    #[must_use]
    pub fn has_pending(&self, lesson: LessonId) -> bool {
        self.inner.state().pending.contains_key(&lesson)
    }

    /// Queue a progress write for a lesson.
    ///
    /// The cache is updated right away. Completion is sticky and watched time
    /// never decreases, whatever the caller passes.
    pub fn save_progress(&self, lesson: LessonId, watched_time: f64, completed: bool) {
        let incoming = LessonProgress::new(watched_time, completed);
        let mut state = self.inner.state();

        let previous = state.cache.get(&lesson).copied();
        let merged = previous.map_or(incoming, |p| p.merge(incoming));
        state.cache.insert(lesson, merged);

        let newly_completed = merged.completed && !previous.is_some_and(|p| p.completed);
        let pending_urgent = state.pending.get(&lesson).is_some_and(|p| p.urgent);

        if let Some(pending) = state.pending.get_mut(&lesson) {
            pending.progress = merged;
            if !newly_completed || pending_urgent {
                return;
            }
        }

        let delay = if newly_completed {
            self.completion_flush
        } else {
            self.save_window
        };
        state.next_ticket += 1;
        let ticket = state.next_ticket;
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let timer = ScheduledTask::after(delay, async move {
            if let Some(inner) = weak.upgrade() {
                inner.fire(lesson, ticket).await;
            }
        });
        // Replacing an armed timer drops and aborts it.
        state.pending.insert(
            lesson,
            Pending {
                progress: merged,
                ticket,
                urgent: newly_completed,
                timer: Some(timer),
            },
        );
        debug!(%lesson, ?delay, urgent = newly_completed, "progress write scheduled");
    }

    /// Send the pending write for a lesson now, if any.
    pub async fn flush(&self, lesson: LessonId) {
        let pending = self.inner.state().pending.remove(&lesson);
        if let Some(pending) = pending {
            drop(pending.timer);
            self.inner.write(lesson, pending.progress).await;
        }
    }

    /// Send every pending write now.
    pub async fn flush_all(&self) {
        let lessons: Vec<LessonId> = self.inner.state().pending.keys().copied().collect();
        for lesson in lessons {
            self.flush(lesson).await;
        }
    }

    /// Drop the pending write for a lesson without sending it.
    pub fn cancel(&self, lesson: LessonId) {
        if self.inner.state().pending.remove(&lesson).is_some() {
            debug!(%lesson, "pending progress write cancelled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingNotifier;
    use storage::repository::InMemoryRepository;

    fn client(repo: &InMemoryRepository) -> ProgressStoreClient {
        ProgressStoreClient::new(Arc::new(repo.clone()), Arc::new(RecordingNotifier::new()))
    }

    #[tokio::test(start_paused = true)]
    async fn missing_record_reads_as_zero_and_is_cached() {
        let repo = InMemoryRepository::new();
        let store = client(&repo);
        let lesson = LessonId::new(1);
        assert_eq!(store.fetch_progress(lesson).await, LessonProgress::zero());
        assert_eq!(store.cached(lesson), Some(LessonProgress::zero()));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_read_is_zero_and_not_cached() {
        let repo = InMemoryRepository::new();
        repo.set_fail_reads(true);
        let store = client(&repo);
        let lesson = LessonId::new(1);
        assert_eq!(store.fetch_progress(lesson).await, LessonProgress::zero());
        assert!(store.cached(lesson).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn reads_see_unsent_writes() {
        let repo = InMemoryRepository::new();
        let store = client(&repo);
        let lesson = LessonId::new(2);
        store.save_progress(lesson, 42.0, false);
        assert!((store.fetch_progress(lesson).await.watched_time - 42.0).abs() < f64::EPSILON);
        assert!(repo.writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn saved_values_never_regress() {
        let repo = InMemoryRepository::new();
        let store = client(&repo);
        let lesson = LessonId::new(3);
        store.save_progress(lesson, 80.0, true);
        store.save_progress(lesson, 10.0, false);
        let cached = store.cached(lesson).unwrap();
        assert!(cached.completed);
        assert!((cached.watched_time - 80.0).abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_the_write() {
        let repo = InMemoryRepository::new();
        let store = client(&repo);
        let lesson = LessonId::new(4);
        store.save_progress(lesson, 5.0, false);
        store.cancel(lesson);
        assert!(!store.has_pending(lesson));
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(repo.writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn flush_sends_immediately() {
        let repo = InMemoryRepository::new();
        let store = client(&repo);
        let lesson = LessonId::new(5);
        store.save_progress(lesson, 7.0, false);
        store.flush(lesson).await;
        assert_eq!(repo.writes_for(lesson).len(), 1);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(repo.writes_for(lesson).len(), 1);
    }
}
