//! Lesson navigation state machine.
//!
//! Each lesson moves `NotStarted → InProgress → Completed` and never back.
//! The engine owns the session's progress map and answers navigation
//! questions (next/previous, locks, aggregates) as pure lookups over the
//! flat lesson sequence.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::model::{
    Course, CourseStanding, Lesson, LessonId, LessonProgress, LessonState, ModuleId,
    crosses_threshold,
};
use crate::sequence::FlatLessonSequence;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum NavigationError {
    #[error("lesson {0} is not part of this course")]
    UnknownLesson(LessonId),

    #[error("lesson {0} is locked")]
    Locked(LessonId),

    #[error("lesson {lesson} is only {percent:.0}% watched")]
    BelowThreshold { lesson: LessonId, percent: f64 },
}

//
// ─── POLICY & OUTCOMES ─────────────────────────────────────────────────────────
//

/// Which lessons a learner may open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockPolicy {
    /// Every lesson is accessible.
    #[default]
    Open,
    /// A lesson opens once every lesson before it is completed.
    Sequential,
}

impl FromStr for LockPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "sequential" => Ok(Self::Sequential),
            other => Err(format!("unknown lock policy: {other}")),
        }
    }
}

impl fmt::Display for LockPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => f.write_str("open"),
            Self::Sequential => f.write_str("sequential"),
        }
    }
}

/// Edge produced by feeding progress into the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    None,
    Started,
    Completed,
}

/// What happens after a lesson completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    To(LessonId),
    Finished,
}

#[derive(Debug, Clone, Copy, Default)]
struct Tracked {
    progress: LessonProgress,
    /// Live playback position; may go down on a backward seek.
    position: f64,
    /// Duration reported by the player, zero until observed.
    observed_duration: f64,
}

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone)]
pub struct NavigationEngine {
    course: Course,
    sequence: FlatLessonSequence,
    tracked: HashMap<LessonId, Tracked>,
    lock_policy: LockPolicy,
}

impl NavigationEngine {
    #[must_use]
    pub fn new(course: Course, lock_policy: LockPolicy) -> Self {
        let sequence = FlatLessonSequence::from_course(&course);
        Self {
            course,
            sequence,
            tracked: HashMap::new(),
            lock_policy,
        }
    }

    #[must_use]
    pub fn course(&self) -> &Course {
        &self.course
    }

    #[must_use]
    pub fn sequence(&self) -> &FlatLessonSequence {
        &self.sequence
    }

    #[must_use]
    pub fn lock_policy(&self) -> LockPolicy {
        self.lock_policy
    }

    #[must_use]
    pub fn lesson(&self, id: LessonId) -> Option<&Lesson> {
        self.sequence.get(id)
    }

    #[must_use]
    pub fn progress(&self, id: LessonId) -> LessonProgress {
        self.tracked.get(&id).map(|t| t.progress).unwrap_or_default()
    }

    #[must_use]
    pub fn position(&self, id: LessonId) -> f64 {
        self.tracked.get(&id).map_or(0.0, |t| t.position)
    }

    #[must_use]
    pub fn state(&self, id: LessonId) -> LessonState {
        self.progress(id).state()
    }

    #[must_use]
    pub fn is_completed(&self, id: LessonId) -> bool {
        self.progress(id).completed
    }

    /// Player-reported duration when known, otherwise the declared one.
    #[must_use]
    pub fn duration(&self, id: LessonId) -> f64 {
        let observed = self.tracked.get(&id).map_or(0.0, |t| t.observed_duration);
        if observed > 0.0 {
            observed
        } else {
            self.lesson(id).map_or(0.0, |l| l.duration().as_secs_f64())
        }
    }

    #[must_use]
    pub fn lesson_percent(&self, id: LessonId) -> f64 {
        self.progress(id).percent(self.duration(id))
    }

    /// Feed one playback sample for a lesson.
    ///
    /// The position always updates; watched time only grows. Crossing the
    /// completion threshold yields `Transition::Completed` exactly once.
    ///
    /// # Errors
    ///
    /// Returns `NavigationError::UnknownLesson` if the lesson is not in the course.
    pub fn apply_sample(
        &mut self,
        id: LessonId,
        position: f64,
        duration: f64,
    ) -> Result<Transition, NavigationError> {
        if self.lesson(id).is_none() {
            return Err(NavigationError::UnknownLesson(id));
        }
        if !position.is_finite() || position < 0.0 {
            return Ok(Transition::None);
        }

        let before = self.state(id);
        let declared = self.duration(id);
        let tracked = self.tracked.entry(id).or_default();
        tracked.position = position;
        if duration.is_finite() && duration > 0.0 {
            tracked.observed_duration = duration;
        }
        if position > tracked.progress.watched_time {
            tracked.progress.watched_time = position;
        }

        let effective = if tracked.observed_duration > 0.0 {
            tracked.observed_duration
        } else {
            declared
        };
        if !tracked.progress.completed && crosses_threshold(tracked.progress.watched_time, effective)
        {
            tracked.progress.completed = true;
        }

        Ok(edge(before, tracked.progress.state()))
    }

    /// Merge progress loaded from the backend for a lesson.
    ///
    /// Completion is never cleared and watched time keeps the larger value.
    /// When nothing was observed locally yet, the position starts at the
    /// loaded watched time.
    ///
    /// # Errors
    ///
    /// Returns `NavigationError::UnknownLesson` if the lesson is not in the course.
    pub fn load_remote(
        &mut self,
        id: LessonId,
        remote: LessonProgress,
    ) -> Result<LessonProgress, NavigationError> {
        if self.lesson(id).is_none() {
            return Err(NavigationError::UnknownLesson(id));
        }
        let tracked = self.tracked.entry(id).or_default();
        tracked.progress = tracked.progress.merge(remote);
        if tracked.position <= 0.0 {
            tracked.position = tracked.progress.watched_time;
        }
        Ok(tracked.progress)
    }

    /// Explicitly complete a lesson that is already past the threshold.
    ///
    /// # Errors
    ///
    /// Returns `NavigationError::BelowThreshold` when the lesson has not been
    /// watched far enough, or `UnknownLesson` if it is not in the course.
    pub fn mark_completed(&mut self, id: LessonId) -> Result<Transition, NavigationError> {
        if self.lesson(id).is_none() {
            return Err(NavigationError::UnknownLesson(id));
        }
        if self.is_completed(id) {
            return Ok(Transition::None);
        }
        let progress = self.progress(id);
        let duration = self.duration(id);
        if !crosses_threshold(progress.watched_time, duration) {
            return Err(NavigationError::BelowThreshold {
                lesson: id,
                percent: progress.ratio(duration) * 100.0,
            });
        }
        let before = progress.state();
        let tracked = self.tracked.entry(id).or_default();
        tracked.progress.completed = true;
        Ok(edge(before, LessonState::Completed))
    }

    /// Whether a lesson is closed to the learner under the current policy.
    ///
    /// Unknown lessons are always locked.
    #[must_use]
    pub fn is_locked(&self, id: LessonId) -> bool {
        let Some(prior) = self.sequence.before(id) else {
            return true;
        };
        match self.lock_policy {
            LockPolicy::Open => false,
            LockPolicy::Sequential => prior.iter().any(|l| !self.is_completed(l.id())),
        }
    }

    #[must_use]
    pub fn next(&self, id: LessonId) -> Option<&Lesson> {
        self.sequence.next(id)
    }

    #[must_use]
    pub fn prev(&self, id: LessonId) -> Option<&Lesson> {
        self.sequence.prev(id)
    }

    #[must_use]
    pub fn can_go_prev(&self, id: LessonId) -> bool {
        self.prev(id).is_some()
    }

    /// Forward navigation requires the current lesson to be completed.
    #[must_use]
    pub fn can_go_next(&self, id: LessonId) -> bool {
        self.is_completed(id) && self.next(id).is_some()
    }

    #[must_use]
    pub fn advance_from(&self, id: LessonId) -> Advance {
        self.next(id).map_or(Advance::Finished, |l| Advance::To(l.id()))
    }

    /// Completed lessons of a module as a percentage; 0 for an empty or unknown module.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn module_progress(&self, id: ModuleId) -> f64 {
        let Some(module) = self.course.module(id) else {
            return 0.0;
        };
        let total = module.lessons().len();
        if total == 0 {
            return 0.0;
        }
        let done = module
            .lessons()
            .iter()
            .filter(|l| self.is_completed(l.id()))
            .count();
        done as f64 / total as f64 * 100.0
    }

    /// Unweighted mean of module percentages; 0 when the course has no modules.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn course_progress(&self) -> f64 {
        let (sum, count) = self
            .course
            .modules()
            .fold((0.0, 0_usize), |(sum, count), m| {
                (sum + self.module_progress(m.id()), count + 1)
            });
        if count == 0 {
            return 0.0;
        }
        sum / count as f64
    }

    #[must_use]
    pub fn standing(&self) -> CourseStanding {
        let started = self
            .tracked
            .values()
            .any(|t| t.progress.state() != LessonState::NotStarted);
        CourseStanding::from_progress(started, self.course_progress())
    }
}

fn edge(before: LessonState, after: LessonState) -> Transition {
    match (before, after) {
        (LessonState::Completed, _) => Transition::None,
        (_, LessonState::Completed) => Transition::Completed,
        (LessonState::NotStarted, LessonState::InProgress) => Transition::Started,
        _ => Transition::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{course, level, lesson, module, two_by_two};
    use crate::model::CourseStatus;

    fn id(n: u64) -> LessonId {
        LessonId::new(n)
    }

    fn engine() -> NavigationEngine {
        NavigationEngine::new(two_by_two(), LockPolicy::Open)
    }

    #[test]
    fn walks_the_state_machine_forward_only() {
        let mut nav = engine();
        assert_eq!(nav.state(id(1)), LessonState::NotStarted);
        assert_eq!(nav.apply_sample(id(1), 10.0, 100.0).unwrap(), Transition::Started);
        assert_eq!(nav.apply_sample(id(1), 20.0, 100.0).unwrap(), Transition::None);
        assert_eq!(nav.apply_sample(id(1), 95.0, 100.0).unwrap(), Transition::Completed);
        assert_eq!(nav.apply_sample(id(1), 5.0, 100.0).unwrap(), Transition::None);
        assert!(nav.is_completed(id(1)));
    }

    #[test]
    fn threshold_boundary() {
        let mut nav = engine();
        assert_eq!(nav.apply_sample(id(1), 89.0, 100.0).unwrap(), Transition::Started);
        assert!(!nav.is_completed(id(1)));
        assert_eq!(nav.apply_sample(id(1), 90.0, 100.0).unwrap(), Transition::Completed);
    }

    #[test]
    fn seeking_back_keeps_high_water_mark() {
        let mut nav = engine();
        nav.apply_sample(id(2), 60.0, 100.0).unwrap();
        nav.apply_sample(id(2), 15.0, 100.0).unwrap();
        assert!((nav.position(id(2)) - 15.0).abs() < f64::EPSILON);
        assert!((nav.progress(id(2)).watched_time - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn falls_back_to_declared_duration() {
        let mut nav = engine();
        assert_eq!(nav.apply_sample(id(3), 92.0, 0.0).unwrap(), Transition::Completed);
    }

    #[test]
    fn remote_progress_never_uncompletes() {
        let mut nav = engine();
        nav.apply_sample(id(1), 95.0, 100.0).unwrap();
        let merged = nav.load_remote(id(1), LessonProgress::zero()).unwrap();
        assert!(merged.completed);

        let loaded = nav.load_remote(id(2), LessonProgress::new(42.0, false)).unwrap();
        assert!((loaded.watched_time - 42.0).abs() < f64::EPSILON);
        assert!((nav.position(id(2)) - 42.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_lessons_are_rejected() {
        let mut nav = engine();
        assert_eq!(
            nav.apply_sample(id(77), 1.0, 1.0),
            Err(NavigationError::UnknownLesson(id(77)))
        );
        assert!(nav.is_locked(id(77)));
    }

    #[test]
    fn manual_completion_requires_threshold() {
        let mut nav = engine();
        nav.apply_sample(id(1), 50.0, 0.0).unwrap();
        assert!(matches!(
            nav.mark_completed(id(1)),
            Err(NavigationError::BelowThreshold { .. })
        ));

        let mut nav = engine();
        nav.load_remote(id(1), LessonProgress::new(91.0, false)).unwrap();
        assert_eq!(nav.mark_completed(id(1)).unwrap(), Transition::Completed);
        assert_eq!(nav.mark_completed(id(1)).unwrap(), Transition::None);
    }

    #[test]
    fn open_policy_unlocks_everything() {
        let nav = engine();
        assert!(nav.sequence().lessons().iter().all(|l| !nav.is_locked(l.id())));
    }

    #[test]
    fn sequential_policy_requires_prior_completion() {
        let mut nav = NavigationEngine::new(two_by_two(), LockPolicy::Sequential);
        assert!(!nav.is_locked(id(1)));
        assert!(nav.is_locked(id(2)));
        nav.apply_sample(id(1), 100.0, 100.0).unwrap();
        assert!(!nav.is_locked(id(2)));
        assert!(nav.is_locked(id(3)));
    }

    #[test]
    fn forward_navigation_is_gated_on_completion() {
        let mut nav = engine();
        assert!(!nav.can_go_prev(id(1)));
        assert!(!nav.can_go_next(id(1)));
        nav.apply_sample(id(1), 95.0, 100.0).unwrap();
        assert!(nav.can_go_next(id(1)));
        assert_eq!(nav.advance_from(id(1)), Advance::To(id(2)));
        assert_eq!(nav.advance_from(id(4)), Advance::Finished);
    }

    #[test]
    fn module_progress_stays_in_range() {
        let mut nav = engine();
        assert!(nav.module_progress(ModuleId::new(10)).abs() < f64::EPSILON);
        nav.apply_sample(id(1), 95.0, 100.0).unwrap();
        assert!((nav.module_progress(ModuleId::new(10)) - 50.0).abs() < f64::EPSILON);
        nav.apply_sample(id(2), 95.0, 100.0).unwrap();
        assert!((nav.module_progress(ModuleId::new(10)) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_module_and_course_report_zero() {
        let empty = Course::normalize(course(vec![level(1, 1, vec![module(5, 1, vec![])])])).unwrap();
        let nav = NavigationEngine::new(empty, LockPolicy::Open);
        assert!(nav.module_progress(ModuleId::new(5)).abs() < f64::EPSILON);
        assert!(nav.course_progress().abs() < f64::EPSILON);

        let bare = Course::normalize(course(vec![])).unwrap();
        let nav = NavigationEngine::new(bare, LockPolicy::Open);
        assert!(nav.course_progress().abs() < f64::EPSILON);
    }

    #[test]
    fn course_progress_is_mean_of_module_percentages() {
        let small = module(1, 1, vec![lesson(1, 1, 100.0)]);
        let big = module(2, 2, (2..=11).map(|n| lesson(n, 0, 100.0)).collect());
        let raw = course(vec![level(1, 1, vec![small, big])]);
        let mut nav = NavigationEngine::new(Course::normalize(raw).unwrap(), LockPolicy::Open);

        nav.apply_sample(id(1), 100.0, 100.0).unwrap();
        nav.apply_sample(id(2), 100.0, 100.0).unwrap();

        assert!((nav.course_progress() - 55.0).abs() < 1e-9);
    }

    #[test]
    fn standing_reflects_activity() {
        let mut nav = engine();
        assert_eq!(nav.standing().status, CourseStatus::NotEnrolled);
        nav.apply_sample(id(1), 5.0, 100.0).unwrap();
        assert_eq!(nav.standing().status, CourseStatus::Enrolled);
        for n in 1..=4 {
            nav.apply_sample(id(n), 100.0, 100.0).unwrap();
        }
        assert_eq!(nav.standing().status, CourseStatus::Completed);
        assert!((nav.course_progress() - 100.0).abs() < f64::EPSILON);
    }
}
