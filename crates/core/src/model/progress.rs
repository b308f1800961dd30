/// Watch ratio at which a lesson counts as completed.
pub const COMPLETION_THRESHOLD: f64 = 0.90;

/// Fraction of a lesson observed; zero when the duration is unknown.
#[must_use]
pub fn watch_ratio(watched_time: f64, duration: f64) -> f64 {
    if duration > 0.0 && watched_time.is_finite() {
        (watched_time / duration).max(0.0)
    } else {
        0.0
    }
}

/// True once `watched_time / duration` reaches [`COMPLETION_THRESHOLD`].
#[must_use]
pub fn crosses_threshold(watched_time: f64, duration: f64) -> bool {
    watch_ratio(watched_time, duration) >= COMPLETION_THRESHOLD
}

/// Per-lesson state derived from progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LessonState {
    NotStarted,
    InProgress,
    Completed,
}

/// Watched time and completion for one lesson.
///
/// `watched_time` is a high-water mark in seconds. `completed` only ever moves
/// from `false` to `true` within a session.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LessonProgress {
    pub watched_time: f64,
    pub completed: bool,
}

impl LessonProgress {
    #[must_use]
    pub fn new(watched_time: f64, completed: bool) -> Self {
        let watched_time = if watched_time.is_finite() {
            watched_time.max(0.0)
        } else {
            0.0
        };
        Self {
            watched_time,
            completed,
        }
    }

    /// The assumed-unseen default.
    #[must_use]
    pub fn zero() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> LessonState {
        if self.completed {
            LessonState::Completed
        } else if self.watched_time > 0.0 {
            LessonState::InProgress
        } else {
            LessonState::NotStarted
        }
    }

    #[must_use]
    pub fn ratio(&self, duration: f64) -> f64 {
        watch_ratio(self.watched_time, duration)
    }

    /// Lesson percentage in `[0, 100]`.
    #[must_use]
    pub fn percent(&self, duration: f64) -> f64 {
        if self.completed {
            return 100.0;
        }
        (self.ratio(duration) * 100.0).min(100.0)
    }

    /// Combine with another observation of the same lesson.
    ///
    /// Watched time keeps the larger value and completion never reverts.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            watched_time: self.watched_time.max(other.watched_time),
            completed: self.completed || other.completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_inclusive() {
        assert!(crosses_threshold(90.0, 100.0));
        assert!(crosses_threshold(27.0, 30.0));
        assert!(!crosses_threshold(89.0, 100.0));
    }

    #[test]
    fn unknown_duration_never_completes() {
        assert!(!crosses_threshold(500.0, 0.0));
        assert!(watch_ratio(10.0, 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn state_follows_progress() {
        assert_eq!(LessonProgress::zero().state(), LessonState::NotStarted);
        assert_eq!(LessonProgress::new(3.0, false).state(), LessonState::InProgress);
        assert_eq!(LessonProgress::new(0.0, true).state(), LessonState::Completed);
    }

    #[test]
    fn merge_is_monotonic() {
        let local = LessonProgress::new(40.0, true);
        let remote = LessonProgress::new(55.0, false);
        let merged = local.merge(remote);
        assert!((merged.watched_time - 55.0).abs() < f64::EPSILON);
        assert!(merged.completed);
    }

    #[test]
    fn sanitizes_bad_numbers() {
        assert!(LessonProgress::new(f64::NAN, false).watched_time.abs() < f64::EPSILON);
        assert!(LessonProgress::new(-4.0, false).watched_time.abs() < f64::EPSILON);
    }
}
