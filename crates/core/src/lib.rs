#![forbid(unsafe_code)]

pub mod model;
pub mod navigation;
pub mod sequence;

pub use navigation::{Advance, LockPolicy, NavigationEngine, NavigationError, Transition};
pub use sequence::FlatLessonSequence;

#[cfg(test)]
mod fixtures;
