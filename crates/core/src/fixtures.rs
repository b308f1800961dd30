//! Raw course builders shared by unit tests.

use crate::model::{Course, RawCourse, RawDuration, RawId, RawLesson, RawLevel, RawModule};

pub(crate) fn lesson(id: u64, order: i64, seconds: f64) -> RawLesson {
    RawLesson {
        id: Some(RawId::Number(id)),
        title: Some(format!("Lesson {id}")),
        duration: Some(RawDuration::Seconds(seconds)),
        video_id: Some("dQw4w9WgXcQ".into()),
        order: Some(order),
        ..RawLesson::default()
    }
}

pub(crate) fn module(id: u64, order: i64, lessons: Vec<RawLesson>) -> RawModule {
    RawModule {
        id: Some(RawId::Number(id)),
        name: Some(format!("Module {id}")),
        order: Some(order),
        lessons,
        ..RawModule::default()
    }
}

pub(crate) fn level(id: u64, order: i64, modules: Vec<RawModule>) -> RawLevel {
    RawLevel {
        id: Some(RawId::Number(id)),
        name: Some(format!("Level {id}")),
        order: Some(order),
        modules,
        ..RawLevel::default()
    }
}

pub(crate) fn course(levels: Vec<RawLevel>) -> RawCourse {
    RawCourse {
        id: Some(RawId::Number(1)),
        title: Some("Course".into()),
        levels,
        ..RawCourse::default()
    }
}

/// Two modules with two 100-second lessons each (lessons 1..=4).
pub(crate) fn two_by_two() -> Course {
    Course::normalize(course(vec![level(
        1,
        1,
        vec![
            module(10, 1, vec![lesson(1, 1, 100.0), lesson(2, 2, 100.0)]),
            module(20, 2, vec![lesson(3, 1, 100.0), lesson(4, 2, 100.0)]),
        ],
    )]))
    .unwrap()
}
