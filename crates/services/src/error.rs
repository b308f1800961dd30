//! Shared error types for the services crate.

use thiserror::Error;

use course_core::NavigationError;
use storage::repository::StorageError;

use crate::viewer::ViewerPhase;

/// Errors emitted by `CourseViewer` commands.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ViewerError {
    #[error("viewer is not ready (phase: {0:?})")]
    NotReady(ViewerPhase),
    #[error("no lesson is selected")]
    NoLessonSelected,
    #[error("there is no previous lesson")]
    NoPreviousLesson,
    #[error("the next lesson is not available yet")]
    NextBlocked,
    #[error(transparent)]
    Navigation(#[from] NavigationError),
}

/// Errors emitted by `SessionContext`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error("email and password are required")]
    MissingCredentials,
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
