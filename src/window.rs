use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

/// Fraction of a window's capacity at which it counts as near capacity.
const NEAR_CAPACITY_RATIO: f64 = 0.8;

/// Minimum spacing between repeated near-capacity warnings for the same
/// window.
const WARNING_INTERVAL: Duration = Duration::from_secs(60);

/// The three spans the controller tracks grants over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    /// The rolling 60 second window
    Minute,
    /// The rolling 3600 second window
    Hour,
    /// The rolling 86400 second window
    Day,
}

impl WindowKind {
    /// The span grants are retained for
    #[must_use]
    pub const fn span(&self) -> Duration {
        match self {
            Self::Minute => Duration::from_secs(60),
            Self::Hour => Duration::from_secs(3600),
            Self::Day => Duration::from_secs(86_400),
        }
    }
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minute => write!(f, "minute"),
            Self::Hour => write!(f, "hour"),
            Self::Day => write!(f, "day"),
        }
    }
}

/// A sliding window of grant timestamps with an optional capacity.
///
/// Entries older than the span are evicted before any capacity check, so
/// `used()` is always the count of grants within the last span. The window
/// also remembers when it last logged a near-capacity warning so repeats
/// stay at least [`WARNING_INTERVAL`] apart.
#[derive(Debug, Clone)]
pub(crate) struct SlidingWindow {
    kind: WindowKind,
    capacity: Option<usize>,
    grants: VecDeque<Instant>,
    last_warning: Option<Instant>,
}

impl SlidingWindow {
    pub(crate) fn new(kind: WindowKind, capacity: Option<usize>) -> Self {
        Self {
            kind,
            capacity,
            grants: VecDeque::new(),
            last_warning: None,
        }
    }

    pub(crate) const fn kind(&self) -> WindowKind {
        self.kind
    }

    pub(crate) const fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Drop entries older than the span
    pub(crate) fn evict(&mut self, now: Instant) {
        let span = self.kind.span();
        while let Some(&oldest) = self.grants.front() {
            if now.saturating_duration_since(oldest) >= span {
                self.grants.pop_front();
            } else {
                break;
            }
        }
    }

    /// Append a grant timestamp
    pub(crate) fn record(&mut self, now: Instant) {
        self.grants.push_back(now);
    }

    pub(crate) fn used(&self) -> usize {
        self.grants.len()
    }

    /// Whether the capacity (if any) is fully used. Call [`evict`] first.
    ///
    /// [`evict`]: Self::evict
    pub(crate) fn is_exhausted(&self) -> bool {
        self.capacity.is_some_and(|capacity| self.grants.len() >= capacity)
    }

    /// Time until the oldest grant ages out and frees a slot
    pub(crate) fn time_until_vacancy(&self, now: Instant) -> Duration {
        self.grants.front().map_or(Duration::ZERO, |&oldest| {
            (oldest + self.kind.span()).saturating_duration_since(now)
        })
    }

    /// Whether a near-capacity warning should be emitted now. Updates the
    /// warning mark when returning true, so the caller must actually log.
    pub(crate) fn should_warn(&mut self, now: Instant) -> bool {
        let Some(capacity) = self.capacity else {
            return false;
        };
        if capacity == 0 {
            return false;
        }
        #[allow(clippy::cast_precision_loss)]
        let ratio = self.grants.len() as f64 / capacity as f64;
        if ratio < NEAR_CAPACITY_RATIO {
            return false;
        }
        match self.last_warning {
            Some(mark) if now.saturating_duration_since(mark) < WARNING_INTERVAL => false,
            _ => {
                self.last_warning = Some(now);
                true
            }
        }
    }

    /// Drop all grants and the warning mark
    pub(crate) fn clear(&mut self) {
        self.grants.clear();
        self.last_warning = None;
    }
}
