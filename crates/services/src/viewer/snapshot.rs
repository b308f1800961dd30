use course_core::model::{
    CourseStanding, LessonDuration, LessonId, ModuleId, VideoId, format_clock,
};
use course_core::NavigationEngine;

use super::ViewerPhase;

/// Display state of the selected lesson.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonView {
    pub id: LessonId,
    pub module_id: ModuleId,
    pub title: String,
    pub description: Option<String>,
    /// `None` renders as "video unavailable".
    pub video: Option<VideoId>,
    pub position: f64,
    pub watched_time: f64,
    pub duration: f64,
    pub percent: f64,
    pub completed: bool,
    pub module_progress: f64,
}

impl LessonView {
    pub(crate) fn build(engine: &NavigationEngine, id: LessonId) -> Option<Self> {
        let lesson = engine.lesson(id)?;
        let progress = engine.progress(id);
        Some(Self {
            id,
            module_id: lesson.module_id(),
            title: lesson.title().to_owned(),
            description: lesson.description().map(str::to_owned),
            video: lesson.video_id().cloned(),
            position: engine.position(id),
            watched_time: progress.watched_time,
            duration: engine.duration(id),
            percent: engine.lesson_percent(id),
            completed: progress.completed,
            module_progress: engine.module_progress(lesson.module_id()),
        })
    }

    /// Position as `M:SS`.
    #[must_use]
    pub fn position_label(&self) -> String {
        format_clock(self.position)
    }

    /// Duration as `M:SS`, or `N/A` when unknown.
    #[must_use]
    pub fn duration_label(&self) -> String {
        if self.duration > 0.0 {
            LessonDuration::from_seconds(self.duration).to_string()
        } else {
            LessonDuration::Unknown.to_string()
        }
    }
}

/// Everything display components need to render the viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerSnapshot {
    pub phase: ViewerPhase,
    pub course_title: Option<String>,
    pub lesson: Option<LessonView>,
    pub playing: bool,
    pub can_go_prev: bool,
    pub can_go_next: bool,
    pub course_progress: f64,
    pub standing: Option<CourseStanding>,
}

impl ViewerSnapshot {
    pub(crate) fn empty(phase: ViewerPhase) -> Self {
        Self {
            phase,
            course_title: None,
            lesson: None,
            playing: false,
            can_go_prev: false,
            can_go_next: false,
            course_progress: 0.0,
            standing: None,
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<LessonId> {
        self.lesson.as_ref().map(|l| l.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(position: f64, duration: f64) -> LessonView {
        LessonView {
            id: LessonId::new(1),
            module_id: ModuleId::new(1),
            title: "Intro".into(),
            description: None,
            video: None,
            position,
            watched_time: position,
            duration,
            percent: 0.0,
            completed: false,
            module_progress: 0.0,
        }
    }

    #[test]
    fn labels_use_clock_format() {
        let v = view(75.0, 630.0);
        assert_eq!(v.position_label(), "1:15");
        assert_eq!(v.duration_label(), "10:30");
        assert_eq!(view(0.0, 0.0).duration_label(), "N/A");
    }
}
