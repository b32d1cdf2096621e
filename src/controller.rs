use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::config::AdmissionConfig;
use crate::error::{AdmissionError, Result};
use crate::severity::ThrottleSeverity;
use crate::stats::{AdmissionStats, WindowUsage};
use crate::window::{SlidingWindow, WindowKind};

/// Factor applied to the enforced interval on each decay step
const DECAY_FACTOR: f64 = 0.7;

/// Distance from the base interval below which decay snaps to the base
const DECAY_SNAP: Duration = Duration::from_millis(500);

/// Gates outbound requests to a rate-limited upstream.
///
/// One controller is shared by every caller in the process. Each caller
/// awaits [`acquire`] before its downstream request; the call returns once
/// the minimum spacing, the per-minute cap, and any active throttle
/// back-off all allow another request. Hour and day caps fail the call
/// instead of blocking, since those spans are too long to wait out
/// silently.
///
/// When the upstream signals throttling (e.g. an HTTP 429), the caller
/// reports it with [`record_throttle`]; the enforced spacing widens
/// immediately and decays back to the configured base after a quiet
/// period.
///
/// All state lives behind a single async mutex. The lock is deliberately
/// held across the sleep inside [`acquire`], so admissions are strictly
/// serialized: while one caller waits out its delay, no other caller can
/// evaluate the windows or slip in a grant.
///
/// [`acquire`]: Self::acquire
/// [`record_throttle`]: Self::record_throttle
#[derive(Debug)]
pub struct AdmissionController {
    config: AdmissionConfig,
    state: Mutex<ControllerState>,
}

#[derive(Debug)]
struct ControllerState {
    /// Spacing currently enforced between grants; widens on throttle
    /// events and decays back toward the configured base
    min_interval: Duration,
    /// Time of the last grant, `None` before the first
    last_grant: Option<Instant>,
    /// Absolute time before which every caller must wait; only ever moves
    /// forward
    throttle_until: Option<Instant>,
    /// Time of the most recent throttle event, gates decay
    last_throttle: Option<Instant>,
    /// Grant timestamps over the minute, hour and day spans
    windows: [SlidingWindow; 3],
}

impl ControllerState {
    fn new(config: &AdmissionConfig) -> Self {
        Self {
            min_interval: config.base_min_interval,
            last_grant: None,
            throttle_until: None,
            last_throttle: None,
            windows: [
                SlidingWindow::new(WindowKind::Minute, Some(config.max_per_minute)),
                SlidingWindow::new(WindowKind::Hour, config.max_per_hour),
                SlidingWindow::new(WindowKind::Day, config.max_per_day),
            ],
        }
    }

    /// One evaluation pass: returns `None` when a request may be granted
    /// right now, or the single delay to sleep before re-evaluating. The
    /// delay is the maximum over all pending wait reasons, so one sleep
    /// satisfies every constraint known at this pass.
    fn required_wait(
        &mut self,
        now: Instant,
        config: &AdmissionConfig,
    ) -> Result<Option<Duration>> {
        self.decay(now, config);

        let mut wait = Duration::ZERO;

        for window in &mut self.windows {
            window.evict(now);
            if window.is_exhausted() {
                let vacancy = window.time_until_vacancy(now);
                match window.kind() {
                    WindowKind::Minute => {
                        log::warn!(
                            "per-minute cap of {} reached, waiting {:.1}s for a free slot",
                            window.capacity().unwrap_or_default(),
                            vacancy.as_secs_f64()
                        );
                        wait = wait.max(vacancy);
                    }
                    kind => {
                        return Err(AdmissionError::CapacityExceeded {
                            window: kind,
                            retry_after: vacancy,
                        });
                    }
                }
            } else if window.should_warn(now) {
                log::warn!(
                    "{} window at {}/{} requests, nearing the cap",
                    window.kind(),
                    window.used(),
                    window.capacity().unwrap_or_default()
                );
            }
        }

        if let Some(until) = self.throttle_until {
            wait = wait.max(until.saturating_duration_since(now));
        }

        if let Some(last) = self.last_grant {
            let since = now.saturating_duration_since(last);
            if since < self.min_interval {
                wait = wait.max(self.min_interval - since);
            }
        }

        Ok((wait > Duration::ZERO).then_some(wait))
    }

    /// Record a grant: the same timestamp goes to `last_grant` and all
    /// three windows.
    fn record_grant(&mut self, now: Instant) {
        self.last_grant = Some(now);
        for window in &mut self.windows {
            window.record(now);
        }
    }

    /// Relax the enforced interval one step toward the base, once the
    /// cooldown since the last throttle event has elapsed.
    fn decay(&mut self, now: Instant, config: &AdmissionConfig) {
        if self.min_interval <= config.base_min_interval {
            return;
        }
        if let Some(last) = self.last_throttle
            && now.saturating_duration_since(last) < config.throttle_cooldown
        {
            return;
        }

        let mut next = self
            .min_interval
            .mul_f64(DECAY_FACTOR)
            .max(config.base_min_interval);
        if next.saturating_sub(config.base_min_interval) < DECAY_SNAP {
            next = config.base_min_interval;
        }
        self.min_interval = next;

        if next == config.base_min_interval {
            // One last short pause before returning to the base cadence
            self.push_throttle_until(now + config.base_min_interval);
            log::debug!(
                "request interval decayed back to base {:.1}s",
                next.as_secs_f64()
            );
        } else {
            log::debug!("request interval decayed to {:.1}s", next.as_secs_f64());
        }
    }

    /// Widen the interval and compute the back-off penalty for a reported
    /// throttle signal.
    fn apply_throttle(
        &mut self,
        now: Instant,
        severity: ThrottleSeverity,
        config: &AdmissionConfig,
    ) -> Duration {
        let multiplier = severity.interval_multiplier();

        self.min_interval = self
            .min_interval
            .mul_f64(multiplier)
            .clamp(config.base_min_interval, config.max_min_interval);
        self.last_throttle = Some(now);

        // min before max: if the floor ever exceeds the cap, the floor wins
        let penalty = self
            .min_interval
            .mul_f64(multiplier)
            .min(config.max_min_interval * 2)
            .max(severity.penalty_floor());
        self.push_throttle_until(now + penalty);

        penalty
    }

    /// Advance `throttle_until`, never moving it backward
    fn push_throttle_until(&mut self, until: Instant) {
        self.throttle_until = Some(self.throttle_until.map_or(until, |prior| prior.max(until)));
    }

    fn snapshot(&mut self, now: Instant, config: &AdmissionConfig) -> AdmissionStats {
        for window in &mut self.windows {
            window.evict(now);
        }
        AdmissionStats {
            windows: self
                .windows
                .iter()
                .map(|window| WindowUsage {
                    window: window.kind(),
                    used: window.used(),
                    capacity: window.capacity(),
                })
                .collect(),
            min_interval: self.min_interval,
            base_min_interval: config.base_min_interval,
            cooldown_remaining: self
                .throttle_until
                .map_or(Duration::ZERO, |until| until.saturating_duration_since(now)),
            since_last_grant: self
                .last_grant
                .map(|last| now.saturating_duration_since(last)),
        }
    }
}

impl AdmissionController {
    /// Create a controller with the given configuration. Out-of-range
    /// values are clamped, not rejected (see [`AdmissionConfig`]).
    #[must_use]
    pub fn new(config: AdmissionConfig) -> Self {
        let config = config.normalized();
        log::debug!(
            "admission controller ready: interval {:.1}s, {} per minute",
            config.base_min_interval.as_secs_f64(),
            config.max_per_minute
        );
        Self {
            state: Mutex::new(ControllerState::new(&config)),
            config,
        }
    }

    /// The normalized configuration this controller runs with
    #[must_use]
    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    /// Wait until the next downstream request may be issued, then record
    /// the grant.
    ///
    /// Blocks the calling task as long as the minimum spacing, the
    /// per-minute cap, or an active throttle back-off require. The state
    /// lock stays held across the sleep, so concurrent callers are
    /// admitted strictly one after another and the recorded grants always
    /// keep the enforced spacing. Dropping the future while it waits
    /// releases the lock without recording anything.
    ///
    /// # Errors
    ///
    /// Returns [`AdmissionError::CapacityExceeded`] when the hourly or
    /// daily cap is exhausted. The minute cap never errors; it is waited
    /// out.
    pub async fn acquire(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        loop {
            let now = Instant::now();
            match state.required_wait(now, &self.config)? {
                Some(wait) => {
                    log::debug!("admission delayed {:.1}s", wait.as_secs_f64());
                    tokio::time::sleep(wait).await;
                }
                None => {
                    state.record_grant(Instant::now());
                    return Ok(());
                }
            }
        }
    }

    /// Report that the upstream throttled us (e.g. an HTTP 429).
    ///
    /// Widens the enforced interval according to the severity and starts a
    /// back-off every caller must wait out. Returns the back-off duration
    /// so the reporting caller can use it directly, e.g. before retrying
    /// the request that failed.
    pub async fn record_throttle(&self, severity: ThrottleSeverity) -> Duration {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        let penalty = state.apply_throttle(now, severity, &self.config);
        log::warn!(
            "upstream throttling ({severity}): interval now {:.1}s, backing off {:.1}s",
            state.min_interval.as_secs_f64(),
            penalty.as_secs_f64()
        );
        penalty
    }

    /// Clear all windows and timers and return to the base interval.
    /// Meant for the boundary between unrelated work sessions.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        *state = ControllerState::new(&self.config);
        log::debug!("admission state reset to base interval");
    }

    /// Snapshot current usage and timers. Evicts stale window entries but
    /// changes no timer.
    pub async fn stats(&self) -> AdmissionStats {
        let mut state = self.state.lock().await;
        state.snapshot(Instant::now(), &self.config)
    }
}
