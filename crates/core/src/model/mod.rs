mod course;
mod duration;
mod ids;
mod progress;
pub mod raw;
mod standing;
mod video;

pub use course::{Course, CourseError, Lesson, Level, Module};
pub use duration::{LessonDuration, format_clock};
pub use ids::{CourseId, LessonId, LevelId, ModuleId, ParseIdError};
pub use progress::{COMPLETION_THRESHOLD, LessonProgress, LessonState, crosses_threshold, watch_ratio};
pub use raw::{RawCourse, RawDuration, RawId, RawLesson, RawLevel, RawModule};
pub use standing::{CourseStanding, CourseStatus};
pub use video::VideoId;
