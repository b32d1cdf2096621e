use std::time::Duration;
use thiserror::Error;

use crate::window::WindowKind;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, AdmissionError>;

/// Errors surfaced by the admission controller
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    /// The hourly or daily request cap is exhausted. These spans are too
    /// long to silently block a caller, so the call fails instead and the
    /// caller decides whether to abort or defer. The minute window never
    /// produces this error; it is waited out.
    #[error(
        "{window} request cap exhausted, frees up in about {} minute(s)",
        .retry_after.as_secs().div_ceil(60).max(1)
    )]
    CapacityExceeded {
        /// The window that is out of capacity
        window: WindowKind,
        /// Time until the oldest grant ages out of the window
        retry_after: Duration,
    },
}

impl AdmissionError {
    /// Minutes until the offending window frees a slot, rounded up and
    /// never less than one. Matches the hint rendered by `Display`.
    #[must_use]
    pub fn minutes_until_reset(&self) -> u64 {
        match self {
            Self::CapacityExceeded { retry_after, .. } => {
                retry_after.as_secs().div_ceil(60).max(1)
            }
        }
    }
}
