#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod notify;
pub mod playback;
pub mod progress_store;
pub mod session;
pub mod task;
pub mod viewer;

pub use config::ViewerConfig;
pub use error::{AuthError, ViewerError};
pub use notify::{Notice, NoticeKind, Notifier, RecordingNotifier, TracingNotifier};
pub use playback::{ObserverEvent, PlaybackObserver, PlayerHandle, PlayerState, Sample};
pub use progress_store::ProgressStoreClient;
pub use session::SessionContext;
pub use task::ScheduledTask;
pub use viewer::{CourseViewer, LessonView, ViewerPhase, ViewerSignal, ViewerSnapshot};
