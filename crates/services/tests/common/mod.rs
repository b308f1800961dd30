#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use course_core::model::{
    CourseId, LessonId, RawCourse, RawDuration, RawId, RawLesson, RawLevel, RawModule, VideoId,
};
use services::{
    CourseViewer, PlayerHandle, PlayerState, RecordingNotifier, SessionContext, ViewerConfig,
    ViewerSignal,
};
use storage::repository::{InMemoryRepository, Storage};
use storage::token::InMemoryTokenStore;
use tokio::time::Instant;

pub const COURSE: CourseId = CourseId::new(1);

pub fn lesson_id(n: u64) -> LessonId {
    LessonId::new(n)
}

#[derive(Default)]
struct PlayerInner {
    base: f64,
    started: Option<Instant>,
    seeks: Vec<f64>,
    loads: Vec<Option<String>>,
}

/// Player whose clock follows tokio time, so paused-time tests can play through a video.
pub struct FakePlayer {
    duration: f64,
    reports_duration: bool,
    inner: Mutex<PlayerInner>,
}

impl FakePlayer {
    pub fn new(duration: f64) -> Arc<Self> {
        Arc::new(Self {
            duration,
            reports_duration: true,
            inner: Mutex::new(PlayerInner::default()),
        })
    }

    /// A video of `duration` seconds whose length the player reports as 0.
    pub fn without_duration(duration: f64) -> Arc<Self> {
        Arc::new(Self {
            duration,
            reports_duration: false,
            inner: Mutex::new(PlayerInner::default()),
        })
    }

    pub fn seeks(&self) -> Vec<f64> {
        self.inner.lock().unwrap().seeks.clone()
    }

    pub fn loads(&self) -> Vec<Option<String>> {
        self.inner.lock().unwrap().loads.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.inner.lock().unwrap().started.is_some()
    }
}

impl PlayerHandle for FakePlayer {
    fn current_time(&self) -> f64 {
        let inner = self.inner.lock().unwrap();
        let running = inner.started.map_or(0.0, |s| s.elapsed().as_secs_f64());
        (inner.base + running).min(self.duration)
    }

    fn duration(&self) -> f64 {
        if self.reports_duration {
            self.duration
        } else {
            0.0
        }
    }

    fn seek_to(&self, seconds: f64) {
        let mut inner = self.inner.lock().unwrap();
        inner.base = seconds;
        if inner.started.is_some() {
            inner.started = Some(Instant::now());
        }
        inner.seeks.push(seconds);
    }

    fn play(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.started.is_none() {
            inner.started = Some(Instant::now());
        }
    }

    fn pause(&self) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(started) = inner.started.take() {
            inner.base = (inner.base + started.elapsed().as_secs_f64()).min(self.duration);
        }
    }

    fn load(&self, video: Option<&VideoId>) {
        let mut inner = self.inner.lock().unwrap();
        inner.base = 0.0;
        inner.started = None;
        inner.loads.push(video.map(|v| v.as_str().to_owned()));
    }
}

fn raw_lesson(id: u64, order: i64) -> RawLesson {
    RawLesson {
        id: Some(RawId::Number(id)),
        title: Some(format!("Lesson {id}")),
        duration: Some(RawDuration::Seconds(100.0)),
        video_url: Some("https://youtu.be/dQw4w9WgXcQ".into()),
        order: Some(order),
        ..RawLesson::default()
    }
}

/// Two modules of two 100-second lessons: module 10 holds lessons 1 and 2,
/// module 20 holds lessons 3 and 4.
pub fn two_by_two() -> RawCourse {
    let module = |id: u64, order: i64, lessons: Vec<RawLesson>| RawModule {
        id: Some(RawId::Number(id)),
        name: Some(format!("Module {id}")),
        order: Some(order),
        lessons,
        ..RawModule::default()
    };
    RawCourse {
        id: Some(RawId::Number(COURSE.value())),
        title: Some("Rust in Practice".into()),
        levels: vec![RawLevel {
            id: Some(RawId::Number(1)),
            name: Some("Beginner".into()),
            order: Some(1),
            modules: vec![
                module(20, 2, vec![raw_lesson(4, 2), raw_lesson(3, 1)]),
                module(10, 1, vec![raw_lesson(1, 1), raw_lesson(2, 2)]),
            ],
            ..RawLevel::default()
        }],
        ..RawCourse::default()
    }
}

pub fn seeded_repo() -> InMemoryRepository {
    let repo = InMemoryRepository::new();
    repo.insert_course(two_by_two()).unwrap();
    repo
}

pub fn signed_in() -> SessionContext {
    SessionContext::new(Arc::new(InMemoryTokenStore::with_token("token")))
}

pub fn anonymous() -> SessionContext {
    SessionContext::new(Arc::new(InMemoryTokenStore::new()))
}

pub struct Harness {
    pub viewer: CourseViewer,
    pub repo: InMemoryRepository,
    pub player: Arc<FakePlayer>,
    pub notifier: RecordingNotifier,
}

pub fn harness(repo: InMemoryRepository, config: ViewerConfig) -> Harness {
    harness_with_player(repo, config, FakePlayer::new(100.0))
}

pub fn harness_with_player(
    repo: InMemoryRepository,
    config: ViewerConfig,
    player: Arc<FakePlayer>,
) -> Harness {
    let notifier = RecordingNotifier::new();
    let storage = Storage::from(repo.clone());
    let viewer = CourseViewer::from_storage(
        config,
        &storage,
        player.clone(),
        Arc::new(notifier.clone()),
    );
    Harness {
        viewer,
        repo,
        player,
        notifier,
    }
}

/// Start playback the way a front end would: player ready, play, state change.
pub fn play(viewer: &mut CourseViewer) {
    viewer.on_player_ready();
    viewer.toggle_play().unwrap();
    viewer.on_player_state(PlayerState::Playing);
}

/// Step the viewer until a signal matches, returning every signal seen.
pub async fn pump_until(
    viewer: &mut CourseViewer,
    mut want: impl FnMut(&ViewerSignal) -> bool,
) -> Vec<ViewerSignal> {
    let wait = async {
        let mut seen = Vec::new();
        loop {
            for signal in viewer.take_signals() {
                seen.push(signal);
                if want(&signal) {
                    return seen;
                }
            }
            viewer.step().await;
        }
    };
    tokio::time::timeout(Duration::from_secs(600), wait)
        .await
        .expect("signal never raised")
}

/// Keep stepping the viewer for a span of (paused) time.
pub async fn pump_for(viewer: &mut CourseViewer, span: Duration) {
    let _ = tokio::time::timeout(span, async {
        loop {
            viewer.step().await;
        }
    })
    .await;
}
