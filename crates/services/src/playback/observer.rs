use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use course_core::model::{LessonId, crosses_threshold};
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::debug;

use super::{PlayerHandle, PlayerState};
use crate::task::ScheduledTask;

/// One reading of the player, tagged with the lesson it belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub lesson: LessonId,
    /// Selection the sample was taken under; stale ones are discarded.
    pub generation: u64,
    pub position: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObserverEvent {
    Sample(Sample),
    /// The sample crossed the completion threshold; sampling stopped and
    /// the player was paused.
    ThresholdReached(Sample),
}

impl ObserverEvent {
    #[must_use]
    pub fn sample(&self) -> Sample {
        match self {
            Self::Sample(s) | Self::ThresholdReached(s) => *s,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Target {
    lesson: LessonId,
    generation: u64,
}

/// Samples the player while it plays and reports through a channel.
///
/// Reports completion at most once per observed lesson.
pub struct PlaybackObserver {
    player: Arc<dyn PlayerHandle>,
    events: UnboundedSender<ObserverEvent>,
    interval: Duration,
    target: Option<Target>,
    completed: Arc<AtomicBool>,
    sampler: Option<ScheduledTask>,
}

impl PlaybackObserver {
    #[must_use]
    pub fn new(
        player: Arc<dyn PlayerHandle>,
        events: UnboundedSender<ObserverEvent>,
        interval: Duration,
    ) -> Self {
        Self {
            player,
            events,
            interval,
            target: None,
            completed: Arc::new(AtomicBool::new(false)),
            sampler: None,
        }
    }

    /// Observe a new lesson. Sampling starts on the next `Playing` state.
    pub fn start(&mut self, lesson: LessonId, generation: u64, already_completed: bool) {
        self.stop();
        self.target = Some(Target { lesson, generation });
        self.completed = Arc::new(AtomicBool::new(already_completed));
    }

    pub fn stop(&mut self) {
        self.sampler = None;
        self.target = None;
    }

    /// Stop sampling but keep observing the lesson; a later `Playing` restarts it.
    pub fn halt(&mut self) {
        if self.sampler.take().is_some() {
            debug!("sampling halted");
        }
    }

    #[must_use]
    pub fn is_sampling(&self) -> bool {
        self.sampler.as_ref().is_some_and(|s| !s.is_finished())
    }

    /// Record completion decided elsewhere so it is not reported again.
    pub fn mark_completed(&self) {
        self.completed.store(true, Ordering::SeqCst);
    }

    pub fn on_state(&mut self, state: PlayerState) {
        let Some(target) = self.target else {
            return;
        };
        match state {
            PlayerState::Playing => {
                if !self.is_sampling() {
                    self.sampler = Some(self.spawn_sampler(target));
                }
            }
            PlayerState::Paused | PlayerState::Ended => {
                self.sampler = None;
                let event = observe(self.player.as_ref(), target, &self.completed);
                let _ = self.events.send(event);
            }
            PlayerState::Unstarted | PlayerState::Buffering => {
                self.sampler = None;
            }
        }
    }

    fn spawn_sampler(&self, target: Target) -> ScheduledTask {
        let player = Arc::clone(&self.player);
        let events = self.events.clone();
        let completed = Arc::clone(&self.completed);
        let period = self.interval;
        debug!(lesson = %target.lesson, "sampling started");
        ScheduledTask::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let event = observe(player.as_ref(), target, &completed);
                let reached = matches!(event, ObserverEvent::ThresholdReached(_));
                if events.send(event).is_err() {
                    break;
                }
                if reached {
                    player.pause();
                    debug!(lesson = %target.lesson, "threshold reached; sampling stopped");
                    break;
                }
            }
        })
    }
}

fn observe(player: &dyn PlayerHandle, target: Target, completed: &AtomicBool) -> ObserverEvent {
    let sample = Sample {
        lesson: target.lesson,
        generation: target.generation,
        position: player.current_time(),
        duration: player.duration(),
    };
    if crosses_threshold(sample.position, sample.duration) && !completed.swap(true, Ordering::SeqCst)
    {
        ObserverEvent::ThresholdReached(sample)
    } else {
        ObserverEvent::Sample(sample)
    }
}
