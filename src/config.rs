use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default floor for the spacing between two admitted requests
const DEFAULT_BASE_MIN_INTERVAL: Duration = Duration::from_secs(5);

/// Default ceiling the adaptive interval may grow to under throttling
const DEFAULT_MAX_MIN_INTERVAL: Duration = Duration::from_secs(45);

/// Default per-minute request cap
const DEFAULT_MAX_PER_MINUTE: usize = 8;

/// Default per-hour request cap
const DEFAULT_MAX_PER_HOUR: usize = 60;

/// Default per-day request cap
const DEFAULT_MAX_PER_DAY: usize = 400;

/// Default quiet period after a throttle signal before the interval decays
const DEFAULT_THROTTLE_COOLDOWN: Duration = Duration::from_secs(420);

/// Lowest cooldown the controller will accept; shorter values are raised
/// to this floor.
pub(crate) const MIN_THROTTLE_COOLDOWN: Duration = Duration::from_secs(60);

/// Configuration for an [`AdmissionController`], fixed at construction.
///
/// All durations accept humantime strings (`"5s"`, `"2m"`) when loaded from
/// a config file. A cap of `None` means that window is unlimited.
///
/// [`AdmissionController`]: crate::AdmissionController
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdmissionConfig {
    /// Floor for the spacing between two admitted requests; the enforced
    /// interval never shrinks below this.
    #[serde(default = "default_base_min_interval", with = "humantime_serde")]
    pub base_min_interval: Duration,

    /// Ceiling the enforced interval may grow to under repeated throttling.
    #[serde(default = "default_max_min_interval", with = "humantime_serde")]
    pub max_min_interval: Duration,

    /// Maximum requests admitted within any 60 second window. Exhaustion
    /// blocks callers until the oldest grant ages out. Raised to 1 if
    /// configured as 0.
    #[serde(default = "default_max_per_minute")]
    pub max_per_minute: usize,

    /// Maximum requests admitted within any rolling hour, or `None` for
    /// unlimited. Exhaustion fails the call instead of blocking.
    #[serde(
        default = "default_max_per_hour",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_per_hour: Option<usize>,

    /// Maximum requests admitted within any rolling day, or `None` for
    /// unlimited. Exhaustion fails the call instead of blocking.
    #[serde(
        default = "default_max_per_day",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_per_day: Option<usize>,

    /// Quiet period after the last throttle signal before the widened
    /// interval starts decaying back to the base. Floored at 60 seconds.
    #[serde(default = "default_throttle_cooldown", with = "humantime_serde")]
    pub throttle_cooldown: Duration,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            base_min_interval: default_base_min_interval(),
            max_min_interval: default_max_min_interval(),
            max_per_minute: default_max_per_minute(),
            max_per_hour: default_max_per_hour(),
            max_per_day: default_max_per_day(),
            throttle_cooldown: default_throttle_cooldown(),
        }
    }
}

const fn default_base_min_interval() -> Duration {
    DEFAULT_BASE_MIN_INTERVAL
}

const fn default_max_min_interval() -> Duration {
    DEFAULT_MAX_MIN_INTERVAL
}

const fn default_max_per_minute() -> usize {
    DEFAULT_MAX_PER_MINUTE
}

const fn default_max_per_hour() -> Option<usize> {
    Some(DEFAULT_MAX_PER_HOUR)
}

const fn default_max_per_day() -> Option<usize> {
    Some(DEFAULT_MAX_PER_DAY)
}

const fn default_throttle_cooldown() -> Duration {
    DEFAULT_THROTTLE_COOLDOWN
}

impl AdmissionConfig {
    /// A less conservative profile for upstreams that tolerate more
    /// traffic: 3s spacing, 15 requests per minute, 180 per hour,
    /// 1500 per day, 30s interval ceiling, 5 minute cooldown.
    #[must_use]
    pub const fn relaxed() -> Self {
        Self {
            base_min_interval: Duration::from_secs(3),
            max_min_interval: Duration::from_secs(30),
            max_per_minute: 15,
            max_per_hour: Some(180),
            max_per_day: Some(1500),
            throttle_cooldown: Duration::from_secs(300),
        }
    }

    /// Clamp out-of-range values instead of rejecting them: the cooldown is
    /// floored at 60s, the interval ceiling is raised to at least the base,
    /// and a zero per-minute cap becomes 1.
    pub(crate) fn normalized(mut self) -> Self {
        if self.throttle_cooldown < MIN_THROTTLE_COOLDOWN {
            self.throttle_cooldown = MIN_THROTTLE_COOLDOWN;
        }
        if self.max_min_interval < self.base_min_interval {
            self.max_min_interval = self.base_min_interval;
        }
        if self.max_per_minute == 0 {
            self.max_per_minute = 1;
        }
        self
    }
}
