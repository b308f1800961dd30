//! Course viewer orchestration.
//!
//! `CourseViewer` is the single owner of a viewing session. Fetches, timers
//! and the playback observer run as spawned tasks that only post events back;
//! `step` applies one event at a time. Every posted event carries the lesson
//! and selection generation it was issued for, and anything that no longer
//! matches the current selection is dropped.

use std::sync::Arc;

use course_core::model::{Course, CourseId, Lesson, LessonId, LessonProgress};
use course_core::{Advance, NavigationEngine, NavigationError, Transition};
use storage::repository::{CourseRepository, Storage, StorageError};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::config::ViewerConfig;
use crate::error::ViewerError;
use crate::notify::{Notice, Notifier};
use crate::playback::{ObserverEvent, PlaybackObserver, PlayerHandle, PlayerState};
use crate::progress_store::ProgressStoreClient;
use crate::session::SessionContext;
use crate::task::ScheduledTask;

mod snapshot;

pub use snapshot::{LessonView, ViewerSnapshot};

/// Lifecycle of a viewing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerPhase {
    Idle,
    /// Unauthenticated; the front end offers "sign in" or "back to catalog".
    LoginRequired,
    Ready,
    /// The course could not be loaded or the learner left the login prompt.
    RedirectToCatalog,
    Closed,
}

/// Something the front end should react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerSignal {
    LoginRequired,
    RedirectToCatalog,
    LessonChanged(LessonId),
    LessonCompleted(LessonId),
    CourseFinished,
}

#[derive(Debug)]
enum ViewerEvent {
    ProgressLoaded {
        lesson: LessonId,
        generation: u64,
        progress: LessonProgress,
    },
    AutoAdvance {
        from: LessonId,
        generation: u64,
    },
}

pub struct CourseViewer {
    config: ViewerConfig,
    courses: Arc<dyn CourseRepository>,
    store: ProgressStoreClient,
    player: Arc<dyn PlayerHandle>,
    notifier: Arc<dyn Notifier>,
    observer: PlaybackObserver,
    observer_rx: UnboundedReceiver<ObserverEvent>,
    events_tx: UnboundedSender<ViewerEvent>,
    events_rx: UnboundedReceiver<ViewerEvent>,
    phase: ViewerPhase,
    course_id: Option<CourseId>,
    engine: Option<NavigationEngine>,
    current: Option<LessonId>,
    generation: u64,
    playing: bool,
    player_ready: bool,
    loaded: bool,
    pending_seek: Option<f64>,
    fetch: Option<ScheduledTask>,
    auto_advance: Option<ScheduledTask>,
    signals: Vec<ViewerSignal>,
}

impl CourseViewer {
    #[must_use]
    pub fn new(
        config: ViewerConfig,
        courses: Arc<dyn CourseRepository>,
        store: ProgressStoreClient,
        player: Arc<dyn PlayerHandle>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (observer_tx, observer_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let observer = PlaybackObserver::new(
            Arc::clone(&player),
            observer_tx,
            config.sample_interval,
        );
        Self {
            config,
            courses,
            store,
            player,
            notifier,
            observer,
            observer_rx,
            events_tx,
            events_rx,
            phase: ViewerPhase::Idle,
            course_id: None,
            engine: None,
            current: None,
            generation: 0,
            playing: false,
            player_ready: false,
            loaded: false,
            pending_seek: None,
            fetch: None,
            auto_advance: None,
            signals: Vec::new(),
        }
    }

    /// Wire a viewer to a storage backend, with a progress store timed by `config`.
    #[must_use]
    pub fn from_storage(
        config: ViewerConfig,
        storage: &Storage,
        player: Arc<dyn PlayerHandle>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let store = ProgressStoreClient::new(Arc::clone(&storage.progress), Arc::clone(&notifier))
            .with_windows(config.save_window, config.completion_flush);
        Self::new(
            config,
            Arc::clone(&storage.courses),
            store,
            player,
            notifier,
        )
    }

    #[must_use]
    pub fn phase(&self) -> ViewerPhase {
        self.phase
    }

    #[must_use]
    pub fn engine(&self) -> Option<&NavigationEngine> {
        self.engine.as_ref()
    }

    #[must_use]
    pub fn current(&self) -> Option<LessonId> {
        self.current
    }

    #[must_use]
    pub fn store(&self) -> &ProgressStoreClient {
        &self.store
    }

    /// Signals raised since the last call, oldest first.
    pub fn take_signals(&mut self) -> Vec<ViewerSignal> {
        std::mem::take(&mut self.signals)
    }

    /// Load a course and select its first lesson.
    ///
    /// An anonymous session stops at `LoginRequired` without touching the
    /// backend. A course that cannot be loaded ends in `RedirectToCatalog`
    /// with a destructive notice.
    ///
    /// # Errors
    ///
    /// Returns `ViewerError::NotReady` once the viewer is closed.
    pub async fn open(
        &mut self,
        session: &SessionContext,
        course_id: CourseId,
    ) -> Result<(), ViewerError> {
        if self.phase == ViewerPhase::Closed {
            return Err(ViewerError::NotReady(self.phase));
        }
        self.settle().await;
        self.engine = None;
        self.current = None;
        self.course_id = Some(course_id);

        if !session.is_authenticated() {
            self.require_login();
            return Ok(());
        }

        let course = match self.courses.get_structure(course_id).await {
            Ok(raw) => Course::normalize(raw).map_err(|e| e.to_string()),
            Err(StorageError::Unauthorized) => {
                self.require_login();
                return Ok(());
            }
            Err(e) => Err(e.to_string()),
        };
        let course = match course {
            Ok(course) => course,
            Err(reason) => {
                warn!(%course_id, %reason, "course structure unavailable");
                self.notifier.notify(Notice::destructive(
                    "Course not found",
                    "This course could not be loaded.",
                ));
                self.phase = ViewerPhase::RedirectToCatalog;
                self.emit(ViewerSignal::RedirectToCatalog);
                return Ok(());
            }
        };

        info!(%course_id, title = course.title(), "course opened");
        let engine = NavigationEngine::new(course, self.config.lock_policy);
        let first = engine.sequence().first().map(Lesson::id);
        self.engine = Some(engine);
        self.phase = ViewerPhase::Ready;
        if let Some(first) = first {
            self.enter(first).await;
        }
        Ok(())
    }

    /// Retry the last course after the learner signed in.
    ///
    /// # Errors
    ///
    /// Returns `ViewerError::NotReady` unless the viewer is waiting for a login.
    pub async fn resume(&mut self, session: &SessionContext) -> Result<(), ViewerError> {
        match (self.phase, self.course_id) {
            (ViewerPhase::LoginRequired, Some(course_id)) => self.open(session, course_id).await,
            (phase, _) => Err(ViewerError::NotReady(phase)),
        }
    }

    /// The learner chose "back to catalog" on the login prompt.
    pub fn decline_login(&mut self) {
        if self.phase == ViewerPhase::LoginRequired {
            self.phase = ViewerPhase::RedirectToCatalog;
            self.emit(ViewerSignal::RedirectToCatalog);
        }
    }

    /// Apply the next posted event, waiting for one if none is queued.
    ///
    /// Returns `false` once the viewer is closed.
    pub async fn step(&mut self) -> bool {
        if self.phase == ViewerPhase::Closed {
            return false;
        }
        tokio::select! {
            Some(event) = self.observer_rx.recv() => self.on_observer_event(event),
            Some(event) = self.events_rx.recv() => self.on_event(event).await,
            else => return false,
        }
        true
    }

    /// Open a lesson.
    ///
    /// # Errors
    ///
    /// Returns `NavigationError::UnknownLesson` or `NavigationError::Locked`
    /// wrapped in `ViewerError`, or `NotReady` before a course is loaded.
    pub async fn select_lesson(&mut self, id: LessonId) -> Result<(), ViewerError> {
        let engine = self.ready_engine()?;
        if engine.lesson(id).is_none() {
            return Err(NavigationError::UnknownLesson(id).into());
        }
        if engine.is_locked(id) {
            return Err(NavigationError::Locked(id).into());
        }
        if self.current != Some(id) {
            self.enter(id).await;
        }
        Ok(())
    }

    /// Move to the following lesson; only allowed once the current one is completed.
    ///
    /// # Errors
    ///
    /// Returns `ViewerError::NextBlocked` when the current lesson is not
    /// completed or is the last one.
    pub async fn next(&mut self) -> Result<LessonId, ViewerError> {
        let engine = self.ready_engine()?;
        let current = self.current.ok_or(ViewerError::NoLessonSelected)?;
        let next = engine
            .next(current)
            .filter(|_| engine.can_go_next(current))
            .map(Lesson::id)
            .ok_or(ViewerError::NextBlocked)?;
        self.select_lesson(next).await?;
        Ok(next)
    }

    /// Move to the preceding lesson.
    ///
    /// # Errors
    ///
    /// Returns `ViewerError::NoPreviousLesson` on the first lesson.
    pub async fn prev(&mut self) -> Result<LessonId, ViewerError> {
        let engine = self.ready_engine()?;
        let current = self.current.ok_or(ViewerError::NoLessonSelected)?;
        let prev = engine
            .prev(current)
            .map(Lesson::id)
            .ok_or(ViewerError::NoPreviousLesson)?;
        self.select_lesson(prev).await?;
        Ok(prev)
    }

    /// Ask the player to play or pause. The resulting state arrives through
    /// `on_player_state`.
    ///
    /// # Errors
    ///
    /// Returns `ViewerError::NoLessonSelected` when nothing is loaded.
    pub fn toggle_play(&mut self) -> Result<(), ViewerError> {
        self.ready_engine()?;
        if self.current.is_none() {
            return Err(ViewerError::NoLessonSelected);
        }
        if self.playing {
            self.player.pause();
        } else {
            self.player.play();
        }
        Ok(())
    }

    /// Feed a state change reported by the player.
    pub fn on_player_state(&mut self, state: PlayerState) {
        if self.phase != ViewerPhase::Ready {
            return;
        }
        self.playing = state == PlayerState::Playing;
        self.observer.on_state(state);
    }

    /// The player finished loading the current video.
    pub fn on_player_ready(&mut self) {
        self.player_ready = true;
        if let Some(position) = self.pending_seek.take() {
            debug!(position, "resuming at last position");
            self.player.seek_to(position);
        }
    }

    /// Complete the current lesson by hand.
    ///
    /// # Errors
    ///
    /// Returns `NavigationError::BelowThreshold` (wrapped) unless the lesson
    /// is already watched past the completion threshold.
    pub fn mark_completed(&mut self) -> Result<(), ViewerError> {
        self.ready_engine()?;
        let current = self.current.ok_or(ViewerError::NoLessonSelected)?;
        let Some(engine) = self.engine.as_mut() else {
            return Err(ViewerError::NotReady(self.phase));
        };
        if engine.mark_completed(current)? == Transition::Completed {
            self.save(current);
            self.on_completed(current);
        }
        Ok(())
    }

    /// Whether a lesson is closed to the learner. Everything is locked until
    /// a course is loaded.
    #[must_use]
    pub fn is_locked(&self, id: LessonId) -> bool {
        self.engine.as_ref().is_none_or(|e| e.is_locked(id))
    }

    #[must_use]
    pub fn snapshot(&self) -> ViewerSnapshot {
        let Some(engine) = self.engine.as_ref() else {
            return ViewerSnapshot::empty(self.phase);
        };
        let current = self.current;
        ViewerSnapshot {
            phase: self.phase,
            course_title: Some(engine.course().title().to_owned()),
            lesson: current.and_then(|id| LessonView::build(engine, id)),
            playing: self.playing,
            can_go_prev: current.is_some_and(|id| engine.can_go_prev(id)),
            can_go_next: current.is_some_and(|id| engine.can_go_next(id)),
            course_progress: engine.course_progress(),
            standing: Some(engine.standing()),
        }
    }

    /// End the session: stop sampling, cancel timers and send every pending write.
    pub async fn close(&mut self) {
        if self.phase == ViewerPhase::Closed {
            return;
        }
        self.settle().await;
        if self.playing {
            self.player.pause();
        }
        self.playing = false;
        self.store.flush_all().await;
        self.phase = ViewerPhase::Closed;
        info!("viewer closed");
    }

    fn ready_engine(&self) -> Result<&NavigationEngine, ViewerError> {
        match (self.phase, self.engine.as_ref()) {
            (ViewerPhase::Ready, Some(engine)) => Ok(engine),
            (phase, _) => Err(ViewerError::NotReady(phase)),
        }
    }

    fn emit(&mut self, signal: ViewerSignal) {
        self.signals.push(signal);
    }

    fn require_login(&mut self) {
        info!("login required to view course");
        self.phase = ViewerPhase::LoginRequired;
        self.emit(ViewerSignal::LoginRequired);
    }

    fn is_current(&self, lesson: LessonId, generation: u64) -> bool {
        self.current == Some(lesson) && self.generation == generation
    }

    /// Release everything tied to the current lesson and flush its pending write.
    async fn settle(&mut self) {
        self.observer.stop();
        self.auto_advance = None;
        self.fetch = None;
        if let Some(previous) = self.current {
            if !self.loaded {
                self.save_unloaded(previous).await;
            }
            self.store.flush(previous).await;
        }
    }

    /// Queue progress sampled before the lesson's remote record arrived.
    ///
    /// The remote record is read and merged first so the write cannot lower it.
    async fn save_unloaded(&mut self, lesson: LessonId) {
        let Some(engine) = self.engine.as_ref() else {
            return;
        };
        if engine.progress(lesson) == LessonProgress::zero() {
            return;
        }
        let remote = self.store.fetch_progress(lesson).await;
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        if let Err(err) = engine.load_remote(lesson, remote) {
            warn!(%err, "loaded progress rejected");
            return;
        }
        debug!(%lesson, "saving progress sampled before load");
        self.save(lesson);
    }

    async fn enter(&mut self, id: LessonId) {
        self.settle().await;
        let Some(engine) = self.engine.as_ref() else {
            return;
        };
        let Some(lesson) = engine.lesson(id) else {
            return;
        };
        let video = lesson.video_id().cloned();
        let completed = engine.is_completed(id);

        self.generation += 1;
        let generation = self.generation;
        self.current = Some(id);
        self.playing = false;
        self.player_ready = false;
        self.loaded = false;
        self.pending_seek = None;

        self.player.load(video.as_ref());
        self.observer.start(id, generation, completed);

        let store = self.store.clone();
        let events = self.events_tx.clone();
        self.fetch = Some(ScheduledTask::spawn(async move {
            let progress = store.fetch_progress(id).await;
            let _ = events.send(ViewerEvent::ProgressLoaded {
                lesson: id,
                generation,
                progress,
            });
        }));

        debug!(lesson = %id, generation, "lesson selected");
        self.emit(ViewerSignal::LessonChanged(id));
    }

    fn save(&self, id: LessonId) {
        if let Some(engine) = self.engine.as_ref() {
            let progress = engine.progress(id);
            self.store
                .save_progress(id, progress.watched_time, progress.completed);
        }
    }

    fn on_observer_event(&mut self, event: ObserverEvent) {
        let sample = event.sample();
        if !self.is_current(sample.lesson, sample.generation) {
            debug!(lesson = %sample.lesson, "discarding stale sample");
            return;
        }
        if matches!(event, ObserverEvent::ThresholdReached(_)) {
            self.playing = false;
        }
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        let transition = match engine.apply_sample(sample.lesson, sample.position, sample.duration)
        {
            Ok(transition) => transition,
            Err(err) => {
                warn!(%err, "sample rejected");
                return;
            }
        };
        // Remote progress is not known yet; saving now could overwrite it.
        if self.loaded {
            self.save(sample.lesson);
        }
        match transition {
            Transition::Completed => self.on_completed(sample.lesson),
            Transition::Started => debug!(lesson = %sample.lesson, "lesson started"),
            Transition::None => {}
        }
    }

    async fn on_event(&mut self, event: ViewerEvent) {
        match event {
            ViewerEvent::ProgressLoaded {
                lesson,
                generation,
                progress,
            } => self.on_progress_loaded(lesson, generation, progress),
            ViewerEvent::AutoAdvance { from, generation } => {
                self.on_auto_advance(from, generation).await;
            }
        }
    }

    fn on_progress_loaded(&mut self, lesson: LessonId, generation: u64, progress: LessonProgress) {
        if !self.is_current(lesson, generation) {
            debug!(%lesson, "discarding stale progress");
            return;
        }
        self.fetch = None;
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        let merged = match engine.load_remote(lesson, progress) {
            Ok(merged) => merged,
            Err(err) => {
                warn!(%err, "loaded progress rejected");
                return;
            }
        };
        let position = engine.position(lesson);
        self.loaded = true;

        if merged.completed {
            self.observer.mark_completed();
        }
        if merged != progress {
            self.save(lesson);
        }
        if position > 0.0 {
            if self.player_ready {
                self.player.seek_to(position);
            } else {
                self.pending_seek = Some(position);
            }
        }
    }

    fn on_completed(&mut self, lesson: LessonId) {
        self.observer.mark_completed();
        self.observer.halt();
        if self.playing {
            self.player.pause();
            self.playing = false;
        }
        let title = self
            .engine
            .as_ref()
            .and_then(|e| e.lesson(lesson))
            .map(|l| l.title().to_owned())
            .unwrap_or_default();
        info!(%lesson, "lesson completed");
        self.notifier
            .notify(Notice::info("Lesson completed", format!("You finished \"{title}\".")));
        self.emit(ViewerSignal::LessonCompleted(lesson));

        let events = self.events_tx.clone();
        let generation = self.generation;
        self.auto_advance = Some(ScheduledTask::after(
            self.config.auto_advance_delay,
            async move {
                let _ = events.send(ViewerEvent::AutoAdvance {
                    from: lesson,
                    generation,
                });
            },
        ));
    }

    async fn on_auto_advance(&mut self, from: LessonId, generation: u64) {
        if !self.is_current(from, generation) {
            debug!(lesson = %from, "discarding stale auto-advance");
            return;
        }
        self.auto_advance = None;
        let Some(engine) = self.engine.as_ref() else {
            return;
        };
        let advance = engine.advance_from(from);
        let locked = matches!(advance, Advance::To(next) if engine.is_locked(next));
        match advance {
            Advance::To(next) if locked => {
                debug!(lesson = %next, "next lesson locked; staying");
            }
            Advance::To(next) => self.enter(next).await,
            Advance::Finished => {
                info!("course finished");
                self.notifier.notify(Notice::info(
                    "Course finished",
                    "You reached the end of this course.",
                ));
                self.emit(ViewerSignal::CourseFinished);
            }
        }
    }
}
