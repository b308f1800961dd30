//! Seam to the embedded video player and the observer that samples it.

use course_core::model::VideoId;

mod observer;

pub use observer::{ObserverEvent, PlaybackObserver, Sample};

/// Player state as reported by the embedded player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Unstarted,
    Playing,
    Paused,
    Ended,
    Buffering,
}

/// Live handle to the video player.
///
/// Times are in seconds. A duration of zero means the player does not know it yet.
pub trait PlayerHandle: Send + Sync {
    fn current_time(&self) -> f64;

    fn duration(&self) -> f64;

    fn seek_to(&self, seconds: f64);

    fn play(&self);

    fn pause(&self);

    /// Cue a lesson's video, or clear the player when the lesson has none.
    fn load(&self, video: Option<&VideoId>);
}
