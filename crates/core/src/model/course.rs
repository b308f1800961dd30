use std::collections::HashSet;

use thiserror::Error;
use url::Url;

use crate::model::duration::LessonDuration;
use crate::model::ids::{CourseId, LessonId, LevelId, ModuleId};
use crate::model::raw::{RawCourse, RawDuration, RawId, RawLesson, RawLevel, RawModule};
use crate::model::video::VideoId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("malformed course structure: {0}")]
    MalformedStructure(String),
}

impl CourseError {
    fn malformed(what: impl Into<String>) -> Self {
        Self::MalformedStructure(what.into())
    }
}

//
// ─── STRUCTURE ─────────────────────────────────────────────────────────────────
//

/// A single video lesson. Structural data only; progress is tracked elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct Lesson {
    id: LessonId,
    module_id: ModuleId,
    title: String,
    description: Option<String>,
    duration: LessonDuration,
    video_id: Option<VideoId>,
    video_url: Option<String>,
    order: i64,
}

impl Lesson {
    #[must_use]
    pub fn id(&self) -> LessonId {
        self.id
    }

    /// Module this lesson belongs to.
    #[must_use]
    pub fn module_id(&self) -> ModuleId {
        self.module_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn duration(&self) -> LessonDuration {
        self.duration
    }

    /// `None` means the lesson has no playable video.
    #[must_use]
    pub fn video_id(&self) -> Option<&VideoId> {
        self.video_id.as_ref()
    }

    #[must_use]
    pub fn video_url(&self) -> Option<&str> {
        self.video_url.as_deref()
    }

    #[must_use]
    pub fn has_video(&self) -> bool {
        self.video_id.is_some()
    }

    #[must_use]
    pub fn order(&self) -> i64 {
        self.order
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    id: ModuleId,
    name: String,
    order: i64,
    lessons: Vec<Lesson>,
}

impl Module {
    #[must_use]
    pub fn id(&self) -> ModuleId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn order(&self) -> i64 {
        self.order
    }

    #[must_use]
    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    id: LevelId,
    name: String,
    order: i64,
    modules: Vec<Module>,
}

impl Level {
    #[must_use]
    pub fn id(&self) -> LevelId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn order(&self) -> i64 {
        self.order
    }

    #[must_use]
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }
}

/// A normalized course: levels, modules and lessons sorted by their `order`.
///
/// Immutable for the duration of a viewing session.
#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    id: CourseId,
    title: String,
    description: Option<String>,
    cover_image: Option<Url>,
    levels: Vec<Level>,
}

impl Course {
    /// Normalize a raw structure response.
    ///
    /// Children are sorted by `order` (stable, a missing order sorts as 0),
    /// durations and video ids are resolved leniently.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::MalformedStructure` when an id or a name is
    /// missing, or when a lesson id appears twice.
    pub fn normalize(raw: RawCourse) -> Result<Self, CourseError> {
        let id = CourseId::new(parse_id(raw.id.as_ref(), "course")?);
        let title = non_empty(raw.title).ok_or_else(|| CourseError::malformed("course title"))?;

        let mut seen = HashSet::new();
        let mut raw_levels = raw.levels;
        raw_levels.sort_by_key(|l| l.order.unwrap_or(0));
        let levels = raw_levels
            .into_iter()
            .map(|level| normalize_level(level, &mut seen))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id,
            title,
            description: non_empty(raw.description),
            cover_image: raw
                .cover_image_url
                .as_deref()
                .and_then(|u| Url::parse(u.trim()).ok()),
            levels,
        })
    }

    #[must_use]
    pub fn id(&self) -> CourseId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn cover_image(&self) -> Option<&Url> {
        self.cover_image.as_ref()
    }

    #[must_use]
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// All modules in traversal order.
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.levels.iter().flat_map(|l| l.modules.iter())
    }

    /// All lessons in traversal order.
    pub fn lessons(&self) -> impl Iterator<Item = &Lesson> {
        self.modules().flat_map(|m| m.lessons.iter())
    }

    #[must_use]
    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.modules().find(|m| m.id == id)
    }

    #[must_use]
    pub fn lesson(&self, id: LessonId) -> Option<&Lesson> {
        self.lessons().find(|l| l.id == id)
    }
}

//
// ─── NORMALIZATION ─────────────────────────────────────────────────────────────
//

fn parse_id(raw: Option<&RawId>, what: &str) -> Result<u64, CourseError> {
    raw.and_then(RawId::as_u64)
        .ok_or_else(|| CourseError::malformed(format!("{what} id")))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
}

fn normalize_level(raw: RawLevel, seen: &mut HashSet<LessonId>) -> Result<Level, CourseError> {
    let id = LevelId::new(parse_id(raw.id.as_ref(), "level")?);
    let name = non_empty(raw.name)
        .or_else(|| non_empty(raw.title))
        .ok_or_else(|| CourseError::malformed(format!("name of level {id}")))?;

    let mut raw_modules = raw.modules;
    raw_modules.sort_by_key(|m| m.order.unwrap_or(0));
    let modules = raw_modules
        .into_iter()
        .map(|module| normalize_module(module, seen))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Level {
        id,
        name,
        order: raw.order.unwrap_or(0),
        modules,
    })
}

fn normalize_module(raw: RawModule, seen: &mut HashSet<LessonId>) -> Result<Module, CourseError> {
    let id = ModuleId::new(parse_id(raw.id.as_ref(), "module")?);
    let name = non_empty(raw.name)
        .or_else(|| non_empty(raw.title))
        .ok_or_else(|| CourseError::malformed(format!("name of module {id}")))?;

    let mut raw_lessons = raw.lessons;
    raw_lessons.sort_by_key(|l| l.order.unwrap_or(0));
    let lessons = raw_lessons
        .into_iter()
        .map(|lesson| {
            let lesson = normalize_lesson(lesson, id)?;
            if !seen.insert(lesson.id) {
                return Err(CourseError::malformed(format!(
                    "lesson {} appears more than once",
                    lesson.id
                )));
            }
            Ok(lesson)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Module {
        id,
        name,
        order: raw.order.unwrap_or(0),
        lessons,
    })
}

fn normalize_lesson(raw: RawLesson, module_id: ModuleId) -> Result<Lesson, CourseError> {
    let id = LessonId::new(parse_id(raw.id.as_ref(), "lesson")?);
    let title = non_empty(raw.title)
        .or_else(|| non_empty(raw.name))
        .ok_or_else(|| CourseError::malformed(format!("title of lesson {id}")))?;

    let duration = match raw.duration {
        Some(RawDuration::Seconds(s)) => LessonDuration::from_seconds(s),
        Some(RawDuration::Clock(s)) => LessonDuration::parse(&s),
        None => LessonDuration::Unknown,
    };

    // `video_id` wins over `video_url` when both are present.
    let video_id = non_empty(raw.video_id)
        .or_else(|| non_empty(raw.video_url.clone()))
        .and_then(|v| VideoId::resolve(&v));

    Ok(Lesson {
        id,
        module_id,
        title,
        description: non_empty(raw.description),
        duration,
        video_id,
        video_url: non_empty(raw.video_url),
        order: raw.order.unwrap_or(0),
    })
}
