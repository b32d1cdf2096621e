//! `pacer` paces outbound requests to a rate-limited upstream API.
//!
//! One [`AdmissionController`] is shared by every caller in the process.
//! A caller awaits [`AdmissionController::acquire`] before each downstream
//! request; the call returns once the minimum spacing, the per-minute cap,
//! and any active back-off all allow another request. Hourly and daily
//! caps fail fast with [`AdmissionError::CapacityExceeded`] instead of
//! blocking. When the upstream signals throttling (e.g. an HTTP 429), the
//! caller reports it with [`AdmissionController::record_throttle`]; the
//! spacing widens immediately and relaxes back to the configured base
//! after a quiet period.
//!
//! ```
//! use pacer::{AdmissionConfig, AdmissionController};
//!
//! #[tokio::main]
//! async fn main() -> pacer::Result<()> {
//!     let controller = AdmissionController::new(AdmissionConfig::default());
//!     controller.acquire().await?;
//!     // ... perform the upstream call here ...
//!     Ok(())
//! }
//! ```
//!
//! Collectors that share one controller receive it through a
//! [`ControllerRegistry`] constructed once at startup:
//!
//! ```
//! use pacer::{AdmissionConfig, ControllerRegistry, ThrottleSeverity};
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = ControllerRegistry::new(AdmissionConfig::default());
//!     let controller = registry.get();
//!
//!     // after observing an HTTP 429 from the upstream:
//!     let backoff = controller.record_throttle(ThrottleSeverity::High).await;
//!     println!("upstream throttled, backing off for {backoff:?}");
//! }
//! ```

#[cfg(doctest)]
doc_comment::doctest!("../README.md");

mod config;
mod controller;
mod error;
mod registry;
mod severity;
mod stats;
mod window;

pub use config::AdmissionConfig;
pub use controller::AdmissionController;
pub use error::{AdmissionError, Result};
pub use registry::ControllerRegistry;
pub use severity::ThrottleSeverity;
pub use stats::{AdmissionStats, WindowUsage};
pub use window::WindowKind;
