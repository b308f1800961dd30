use std::env;
use std::time::Duration;

use course_core::LockPolicy;
use tracing::warn;

/// Timing and policy knobs for a viewing session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewerConfig {
    /// How often playback is sampled while playing.
    pub sample_interval: Duration,
    /// Minimum spacing between two ordinary progress writes for one lesson.
    pub save_window: Duration,
    /// Delay before a first `completed = true` write goes out.
    pub completion_flush: Duration,
    /// Feedback pause between completing a lesson and moving on.
    pub auto_advance_delay: Duration,
    pub lock_policy: LockPolicy,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_secs(1),
            save_window: Duration::from_secs(5),
            completion_flush: Duration::from_millis(200),
            auto_advance_delay: Duration::from_millis(1300),
            lock_policy: LockPolicy::Open,
        }
    }
}

impl ViewerConfig {
    /// Defaults, with the lock policy taken from `LEARN_LOCK_POLICY` when set.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = env::var("LEARN_LOCK_POLICY") {
            match raw.parse::<LockPolicy>() {
                Ok(policy) => config.lock_policy = policy,
                Err(err) => warn!(%err, "ignoring LEARN_LOCK_POLICY"),
            }
        }
        config
    }

    #[must_use]
    pub fn with_lock_policy(mut self, lock_policy: LockPolicy) -> Self {
        self.lock_policy = lock_policy;
        self
    }
}
