use crate::model::{Course, Lesson, LessonId};

/// Every lesson of a course in traversal order: level, then module, then lesson.
///
/// Derived from a [`Course`] and never mutated; rebuild it when the course changes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlatLessonSequence {
    lessons: Vec<Lesson>,
}

impl FlatLessonSequence {
    #[must_use]
    pub fn from_course(course: &Course) -> Self {
        Self {
            lessons: course.lessons().cloned().collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }

    #[must_use]
    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    #[must_use]
    pub fn first(&self) -> Option<&Lesson> {
        self.lessons.first()
    }

    #[must_use]
    pub fn index_of(&self, id: LessonId) -> Option<usize> {
        self.lessons.iter().position(|l| l.id() == id)
    }

    #[must_use]
    pub fn get(&self, id: LessonId) -> Option<&Lesson> {
        self.lessons.iter().find(|l| l.id() == id)
    }

    /// Lesson after `id`; `None` when `id` is last or unknown.
    #[must_use]
    pub fn next(&self, id: LessonId) -> Option<&Lesson> {
        self.index_of(id).and_then(|i| self.lessons.get(i + 1))
    }

    /// Lesson before `id`; `None` when `id` is first or unknown.
    #[must_use]
    pub fn prev(&self, id: LessonId) -> Option<&Lesson> {
        self.index_of(id)
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| self.lessons.get(i))
    }

    /// Lessons strictly before `id`, or `None` when `id` is unknown.
    #[must_use]
    pub fn before(&self, id: LessonId) -> Option<&[Lesson]> {
        self.index_of(id).map(|i| &self.lessons[..i])
    }
}
