use std::fmt;

/// Length of a lesson video as declared by the course structure.
///
/// The backend sends either whole seconds or a clock string (`"MM:SS"` /
/// `"H:MM:SS"`). Anything else collapses to `Unknown`, which renders as
/// `N/A` and counts as zero seconds in progress math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LessonDuration {
    Known(u32),
    #[default]
    Unknown,
}

impl LessonDuration {
    /// Parses a clock string such as `"10:32"` or `"1:02:03"`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("n/a") {
            return Self::Unknown;
        }
        if let Ok(seconds) = raw.parse::<u32>() {
            return Self::Known(seconds);
        }

        let parts: Option<Vec<u32>> = raw.split(':').map(|p| p.parse::<u32>().ok()).collect();
        match parts.as_deref() {
            Some([m, s]) if *s < 60 => m
                .checked_mul(60)
                .and_then(|v| v.checked_add(*s))
                .map_or(Self::Unknown, Self::Known),
            Some([h, m, s]) if *m < 60 && *s < 60 => h
                .checked_mul(3600)
                .and_then(|v| v.checked_add(m * 60 + s))
                .map_or(Self::Unknown, Self::Known),
            _ => Self::Unknown,
        }
    }

    /// Accepts a numeric second count; negative or non-finite values are unknown.
    #[must_use]
    pub fn from_seconds(seconds: f64) -> Self {
        if !seconds.is_finite() || seconds < 0.0 || seconds > f64::from(u32::MAX) {
            return Self::Unknown;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Self::Known(seconds.round() as u32)
    }

    #[must_use]
    pub fn seconds(self) -> Option<u32> {
        match self {
            Self::Known(s) => Some(s),
            Self::Unknown => None,
        }
    }

    /// Seconds for progress math; `Unknown` counts as zero.
    #[must_use]
    pub fn as_secs_f64(self) -> f64 {
        self.seconds().map_or(0.0, f64::from)
    }

    #[must_use]
    pub fn is_known(self) -> bool {
        matches!(self, Self::Known(_))
    }
}

impl fmt::Display for LessonDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(s) => f.pad(&format_clock(f64::from(*s))),
            Self::Unknown => f.pad("N/A"),
        }
    }
}

/// Formats seconds as `M:SS`, the way lesson timers are shown.
#[must_use]
pub fn format_clock(seconds: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}
