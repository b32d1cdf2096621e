use serde::Serialize;
use std::time::Duration;

use crate::window::WindowKind;

/// Usage of a single sliding window at snapshot time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowUsage {
    /// Which window this is
    pub window: WindowKind,
    /// Grants currently within the window's span
    pub used: usize,
    /// The window's cap, or `None` for unlimited
    pub capacity: Option<usize>,
}

impl WindowUsage {
    /// Slots left before the cap, or `None` for an unlimited window
    #[must_use]
    pub fn remaining(&self) -> Option<usize> {
        self.capacity.map(|capacity| capacity.saturating_sub(self.used))
    }
}

/// A point-in-time snapshot of the controller's state, safe to log or
/// serialize for dashboards. Taking a snapshot evicts stale window entries
/// but has no effect on any timer.
#[derive(Debug, Clone, Serialize)]
pub struct AdmissionStats {
    /// Usage per window, ordered minute, hour, day
    pub windows: Vec<WindowUsage>,

    /// The spacing currently enforced between grants
    #[serde(with = "humantime_serde")]
    pub min_interval: Duration,

    /// The configured floor the interval decays back to
    #[serde(with = "humantime_serde")]
    pub base_min_interval: Duration,

    /// Time left until throttle back-off expires, zero when none is active
    #[serde(with = "humantime_serde")]
    pub cooldown_remaining: Duration,

    /// Time since the last granted request, `None` before the first grant
    #[serde(with = "humantime_serde")]
    pub since_last_grant: Option<Duration>,
}

impl AdmissionStats {
    /// Usage of one particular window
    #[must_use]
    pub fn usage(&self, kind: WindowKind) -> Option<&WindowUsage> {
        self.windows.iter().find(|usage| usage.window == kind)
    }

    /// Whether the controller is currently backing off or running at a
    /// widened interval
    #[must_use]
    pub fn is_throttled(&self) -> bool {
        self.cooldown_remaining > Duration::ZERO || self.min_interval > self.base_min_interval
    }

    /// One-line human summary, e.g.
    /// `3/8 per minute, 12/60 per hour, 40/400 per day; interval 5.0s (base 5.0s)`
    #[must_use]
    pub fn summary(&self) -> String {
        let windows = self
            .windows
            .iter()
            .map(|usage| match usage.capacity {
                Some(capacity) => format!("{}/{} per {}", usage.used, capacity, usage.window),
                None => format!("{} per {}", usage.used, usage.window),
            })
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "{windows}; interval {:.1}s (base {:.1}s)",
            self.min_interval.as_secs_f64(),
            self.base_min_interval.as_secs_f64()
        )
    }
}
