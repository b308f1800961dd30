/// Where the learner stands with a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseStatus {
    NotEnrolled,
    Enrolled,
    Completed,
}

/// Course status plus progress, kept as separate fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CourseStanding {
    pub status: CourseStatus,
    /// Course progress percentage in `[0, 100]`.
    pub progress: f64,
}

impl CourseStanding {
    /// Derive a standing from whether any lesson was started and the course percentage.
    #[must_use]
    pub fn from_progress(started: bool, progress: f64) -> Self {
        let progress = progress.clamp(0.0, 100.0);
        let status = if progress >= 100.0 {
            CourseStatus::Completed
        } else if started || progress > 0.0 {
            CourseStatus::Enrolled
        } else {
            CourseStatus::NotEnrolled
        };
        Self { status, progress }
    }
}
